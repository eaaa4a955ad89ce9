use std::future::Future;

use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// One page of a paginated listing.
///
/// Listing endpoints name their items `faces` or `photos` and report the
/// page number as `page` or `current_page`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "faces", alias = "photos", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_next: bool,
    #[serde(alias = "current_page", default)]
    pub page: Option<u32>,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Walk a paginated listing from `start` as a stream of items.
///
/// Pages are fetched lazily as the stream is polled. The stream ends after
/// a page reports `has_next == false` or comes back empty, and after the
/// first error (which is yielded).
pub fn paginate<'a, T, F, Fut>(
    start: u32,
    fetch: F,
) -> impl Stream<Item = Result<T, ApiError>> + 'a
where
    T: 'a,
    F: FnMut(u32) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>, ApiError>> + 'a,
{
    stream::unfold(Some((start, fetch)), |state| async move {
        let (page, mut fetch) = state?;
        match fetch(page).await {
            Ok(result) => {
                let next = if result.has_next && !result.is_empty() {
                    Some((page + 1, fetch))
                } else {
                    None
                };
                let items: Vec<Result<T, ApiError>> = result.items.into_iter().map(Ok).collect();
                Some((stream::iter(items), next))
            }
            Err(e) => Some((stream::iter(vec![Err(e)]), None)),
        }
    })
    .flatten()
}

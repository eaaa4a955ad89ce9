//! Data models for Face Album entities.
//!
//! This module contains the data structures returned by the backend:
//!
//! - `Face`, `LinkedFace`: people clusters detected across photos
//! - `Photo`: an uploaded image
//! - `Page`: one page of a paginated listing, plus `paginate` for walking
//!   every page as a stream
//! - `Envelope`: the `{success, message}` wrapper every response carries

pub mod envelope;
pub mod face;
pub mod page;
pub mod photo;

pub use envelope::Envelope;
pub use face::{Face, LinkedFace};
pub use page::{paginate, Page};
pub use photo::Photo;

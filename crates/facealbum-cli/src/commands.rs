use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::warn;

use facealbum_core::{
    paginate, ApiClient, Config, Face, FileTokenStore, GoogleLogin, LinkedFace, Page, Photo,
    TokenBackend,
};

use crate::Command;

/// Most photos accepted by one `upload` command
const MAX_UPLOAD_BATCH: usize = 50;

#[derive(Serialize)]
struct StatusReport<'a> {
    api_domain: &'a str,
    token_stored: bool,
    /// Only known for the file backend
    #[serde(skip_serializing_if = "Option::is_none")]
    token_age_minutes: Option<i64>,
    authenticated: bool,
}

pub async fn run(command: Command, client: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { email } => login(client, config, email).await,
        Command::GoogleUrl { domain } => {
            println!("{}", client.google_auth_url(&domain).await?);
            Ok(())
        }
        Command::GoogleCallback { code, state } => {
            match client.google_callback(&code, state.as_deref()).await? {
                GoogleLogin::Web => println!("Login successful!"),
                GoogleLogin::AppRedirect { deep_link } => {
                    println!("Open this link on the device running the app:\n{}", deep_link)
                }
            }
            Ok(())
        }
        Command::Status => status(client, config).await,
        Command::Logout { all_devices } => {
            client.logout(all_devices).await?;
            println!("Logged out.");
            Ok(())
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                bail!("Refusing to delete the account without --yes");
            }
            println!("{}", client.delete_account().await?);
            Ok(())
        }
        Command::Faces { page } => {
            print_faces(&client.faces(page).await?);
            Ok(())
        }
        Command::Photos { page, all } => {
            if all {
                let photos: Vec<Photo> = paginate(1, |page| client.photos(page))
                    .try_collect()
                    .await?;
                print_photos(&photos);
            } else {
                let result = client.photos(page).await?;
                print_photos(&result.items);
                print_more_hint(&result);
            }
            Ok(())
        }
        Command::Face { id } => print_json(&client.face(id).await?),
        Command::FacePhotos { id, page } => {
            let result = client.photos_by_face(id, page).await?;
            print_photos(&result.items);
            print_more_hint(&result);
            Ok(())
        }
        Command::Capacity => {
            if client.upload_capacity().await? {
                println!("Maximum number of photos reached.");
            } else {
                println!("Uploads are open.");
            }
            Ok(())
        }
        Command::Upload { files } => upload(client, files).await,
        Command::DeletePhoto { id } => {
            println!("{}", client.delete_photo(id).await?);
            Ok(())
        }
        Command::DeleteFace { id } => {
            println!("{}", client.delete_face(id).await?);
            Ok(())
        }
        Command::RenameFace { id, name } => {
            println!("{}", client.update_face_name(id, &name).await?);
            Ok(())
        }
        Command::PhotoFaces { photo_id, page } => {
            let result = client.faces_for_photo(photo_id, page).await?;
            print_linked_faces(&result.items);
            print_more_hint(&result);
            Ok(())
        }
        Command::Link { photo_id, face_id } => {
            println!("{}", client.link_photo_with_face(photo_id, face_id, true).await?);
            Ok(())
        }
        Command::Unlink { photo_id, face_id } => {
            println!("{}", client.link_photo_with_face(photo_id, face_id, false).await?);
            Ok(())
        }
    }
}

async fn login(client: &ApiClient, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };

    client.send_otp(&email).await?;
    println!("A one-time password was sent to {}.", email);

    let otp = rpassword::prompt_password("OTP: ").context("Failed to read OTP")?;
    let verification = client.verify_otp(&email, &otp).await?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    if verification.need_name_update {
        let name = prompt("Your name: ")?;
        client.change_name(&name).await?;
    }

    println!("Login successful!");
    Ok(())
}

async fn status(client: &ApiClient, config: &Config) -> Result<()> {
    let token_stored = client.token_store().get()?.is_some();
    let token_age_minutes = match config.token_backend {
        TokenBackend::File => FileTokenStore::new(config.cache_dir()?)
            .load()?
            .map(|record| record.age_minutes()),
        TokenBackend::Keyring => None,
    };

    let report = StatusReport {
        api_domain: client.base_url(),
        token_stored,
        token_age_minutes,
        authenticated: client.check_session().await,
    };
    print_json(&report)
}

/// Drop repeated file names and enforce the batch limit.
fn plan_uploads(files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let files: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| {
            let fresh = seen.insert(path.file_name().map(|n| n.to_os_string()));
            if !fresh {
                warn!(file = %path.display(), "File already exists, skipping");
            }
            fresh
        })
        .collect();

    if files.len() > MAX_UPLOAD_BATCH {
        bail!("You can only upload up to {} files at once.", MAX_UPLOAD_BATCH);
    }
    Ok(files)
}

async fn upload(client: &ApiClient, files: Vec<PathBuf>) -> Result<()> {
    let files = plan_uploads(files)?;
    if client.upload_capacity().await? {
        bail!("Maximum number of photos reached");
    }

    // One at a time, matching the server's per-request processing
    let results: Vec<_> = futures::stream::iter(files)
        .then(|path| async move {
            let result = client.upload_photo_file(&path).await;
            (path, result)
        })
        .collect()
        .await;

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(message) => println!("{}: {}", path.display(), message),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} upload(s) failed", failed);
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_faces(page: &Page<Face>) {
    for face in &page.items {
        println!("{:>8}  {:<20} {:>5} photos", face.id, face.display_name(), face.face_count);
    }
    print_more_hint(page);
}

fn print_linked_faces(faces: &[LinkedFace]) {
    for face in faces {
        let mark = if face.linked { "[x]" } else { "[ ]" };
        println!("{} {:>8}  {}", mark, face.id, face.display_name());
    }
}

fn print_photos(photos: &[Photo]) {
    for photo in photos {
        println!("{:>8}  {}", photo.id, photo.photo_url);
    }
}

fn print_more_hint<T>(page: &Page<T>) {
    if page.has_next {
        let next = page.page.map(|p| p + 1);
        match next {
            Some(next) => println!("(more available, use --page {})", next),
            None => println!("(more available)"),
        }
    }
}

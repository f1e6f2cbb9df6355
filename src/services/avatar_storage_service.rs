use std::path::{Path, PathBuf};

use derive_new::new;
use tracing::{debug, error, warn};

use crate::errors::problem::Problem;

pub const AVATAR_URL_PREFIX: &str = "/uploads/avatars/";

/// Stores profile pictures on local disk and serves them under [`AVATAR_URL_PREFIX`].
#[derive(new, Debug, Clone)]
pub struct AvatarStorageService {
        directory: PathBuf,
        max_bytes: usize,
}

impl AvatarStorageService {
        pub fn extension_for(content_type: Option<&str>) -> Result<&'static str, Problem> {
                match content_type.map(|value| value.to_ascii_lowercase()).as_deref() {
                        Some("image/jpeg") | Some("image/jpg") => Ok("jpg"),
                        Some("image/png") => Ok("png"),
                        Some("image/webp") => Ok("webp"),
                        Some("image/gif") => Ok("gif"),
                        _ => Err(Problem::BadRequest(
                                "Avatar must be a JPEG, PNG, WebP or GIF image".to_string(),
                        )),
                }
        }

        /// Writes the image and returns the public url it is served from.
        pub async fn store(
                &self,
                profile_id: i64,
                unique: i64,
                content_type: Option<&str>,
                bytes: &[u8],
        ) -> Result<String, Problem> {
                let extension = Self::extension_for(content_type)?;

                if bytes.is_empty() {
                        return Err(Problem::BadRequest("Avatar file is empty".to_string()));
                }
                if bytes.len() > self.max_bytes {
                        return Err(Problem::BadRequest(format!(
                                "Avatar exceeds the {} byte limit",
                                self.max_bytes
                        )));
                }

                tokio::fs::create_dir_all(&self.directory).await.map_err(|err| {
                        error!("failed to create avatar directory {:?}: {err}", self.directory);
                        Problem::InternalServerError("failed to store avatar".to_string())
                })?;

                let file_name = format!("avatar-{profile_id}-{unique}.{extension}");
                tokio::fs::write(self.directory.join(&file_name), bytes).await.map_err(|err| {
                        error!("failed to write avatar {file_name}: {err}");
                        Problem::InternalServerError("failed to store avatar".to_string())
                })?;

                debug!("stored avatar {file_name} ({} bytes)", bytes.len());
                Ok(format!("{AVATAR_URL_PREFIX}{file_name}"))
        }

        /// Deletes a previously stored avatar. Urls this service did not hand out are ignored.
        pub async fn remove(&self, url: &str) {
                let Some(path) = self.path_for(url) else {
                        debug!("not removing foreign avatar url {url}");
                        return;
                };

                if let Err(err) = tokio::fs::remove_file(&path).await {
                        warn!("failed to remove avatar {path:?}: {err}");
                }
        }

        fn path_for(&self, url: &str) -> Option<PathBuf> {
                let file_name = url.strip_prefix(AVATAR_URL_PREFIX)?;
                let is_plain = !file_name.is_empty()
                        && Path::new(file_name).file_name().and_then(|name| name.to_str()) == Some(file_name)
                        && file_name != ".."
                        && file_name != ".";

                is_plain.then(|| self.directory.join(file_name))
        }
}

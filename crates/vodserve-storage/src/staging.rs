use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::pin::pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vodserve_core::AppError;

/// Smallest header that still identifies the allowed containers.
const SNIFF_LEN: usize = 12;

/// A raw upload staged on local disk, owned by the caller for the duration
/// of one ingestion. The caller deletes it once the transcoder has read it.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl StagedFile {
    pub async fn remove(&self) -> std::io::Result<()> {
        fs::remove_file(&self.path).await
    }
}

/// Streams uploads to disk under a fresh random name, enforcing the MIME
/// allow-list, a magic-byte sniff and the configured size cap. Rejections
/// never leave a file behind.
#[derive(Clone)]
pub struct StagingStore {
    dir: PathBuf,
    max_bytes: u64,
    allowed_content_types: Vec<String>,
}

impl StagingStore {
    pub async fn new(
        dir: impl Into<PathBuf>,
        max_bytes: u64,
        allowed_content_types: Vec<String>,
    ) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::StagingIo(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        Ok(StagingStore {
            dir,
            max_bytes,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.to_lowercase())
                .collect(),
        })
    }

    /// Write one upload stream to durable local storage.
    ///
    /// The declared MIME type is checked before any byte is written; the
    /// first [`SNIFF_LEN`] bytes are additionally sniffed since the declared
    /// type is client-controlled. The destination name is a fresh UUID plus
    /// the sanitized original extension - never the client filename.
    pub async fn stage<S, E>(
        &self,
        stream: S,
        declared_mime: &str,
        declared_filename: &str,
    ) -> Result<StagedFile, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let content_type = normalize_mime(declared_mime);
        if !self.allowed_content_types.contains(&content_type) {
            return Err(AppError::UnsupportedMediaType(format!(
                "Invalid file type '{}'. Allowed types: {}",
                content_type,
                self.allowed_content_types.join(", ")
            )));
        }

        let extension = sanitized_extension(declared_filename, &content_type);
        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), extension));

        let mut guard = PartialFileGuard::new(path.clone());
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| AppError::StagingIo(format!("Failed to create staged file: {}", e)))?;

        let mut written: u64 = 0;
        let mut header: Vec<u8> = Vec::with_capacity(SNIFF_LEN);
        let mut sniffed = false;

        let mut stream = pin!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    return self
                        .abort(&mut guard, AppError::StagingIo(format!("Upload stream failed: {}", e)))
                        .await;
                }
            };

            written += chunk.len() as u64;
            if written > self.max_bytes {
                return self
                    .abort(
                        &mut guard,
                        AppError::PayloadTooLarge(format!(
                            "File exceeds maximum allowed size of {} bytes",
                            self.max_bytes
                        )),
                    )
                    .await;
            }

            if !sniffed {
                let take = (SNIFF_LEN - header.len()).min(chunk.len());
                header.extend_from_slice(&chunk[..take]);
                if header.len() >= SNIFF_LEN {
                    sniffed = true;
                    if !looks_like_video(&header) {
                        return self
                            .abort(
                                &mut guard,
                                AppError::UnsupportedMediaType(
                                    "File content does not match a supported video container"
                                        .to_string(),
                                ),
                            )
                            .await;
                    }
                }
            }

            if let Err(e) = file.write_all(&chunk).await {
                return self
                    .abort(&mut guard, AppError::StagingIo(format!("Failed to write staged file: {}", e)))
                    .await;
            }
        }

        if written == 0 {
            return self
                .abort(&mut guard, AppError::InvalidInput("File is empty".to_string()))
                .await;
        }
        if !sniffed {
            return self
                .abort(
                    &mut guard,
                    AppError::UnsupportedMediaType(
                        "File too small to be a valid video".to_string(),
                    ),
                )
                .await;
        }

        if let Err(e) = file.sync_all().await {
            return self
                .abort(&mut guard, AppError::StagingIo(format!("Failed to sync staged file: {}", e)))
                .await;
        }

        guard.disarm();

        tracing::info!(
            path = %path.display(),
            size_bytes = written,
            content_type = %content_type,
            "Upload staged"
        );

        Ok(StagedFile {
            path,
            original_filename: declared_filename.to_string(),
            content_type,
            size_bytes: written,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn abort<T>(
        &self,
        guard: &mut PartialFileGuard,
        err: AppError,
    ) -> Result<T, AppError> {
        if let Some(path) = guard.disarm() {
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial staged file");
            }
        }
        Err(err)
    }
}

/// Removes the partial file if the upload future is dropped mid-stream
/// (client disconnect). Disarmed on both success and handled-error paths.
struct PartialFileGuard {
    path: Option<PathBuf>,
}

impl PartialFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) -> Option<PathBuf> {
        self.path.take()
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            tokio::spawn(async move {
                let _ = fs::remove_file(&path).await;
            });
        }
    }
}

fn normalize_mime(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Extension derived from the client filename, reduced to safe characters.
/// Falls back to the MIME subtype so the staged name always has one.
fn sanitized_extension(filename: &str, content_type: &str) -> String {
    let from_name: String = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase();

    if !from_name.is_empty() {
        return from_name;
    }

    content_type
        .split('/')
        .nth(1)
        .filter(|s| s.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_string()
}

/// Magic-byte check for the allowed containers: MP4 (`ftyp` box), WebM /
/// Matroska (EBML header) and Ogg.
fn looks_like_video(header: &[u8]) -> bool {
    if header.len() < SNIFF_LEN {
        return false;
    }
    &header[4..8] == b"ftyp"
        || header.starts_with(&[0x1a, 0x45, 0xdf, 0xa3])
        || header.starts_with(b"OggS")
}

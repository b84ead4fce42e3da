//! External-process transcoding: HLS segmenting plus thumbnail generation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use vodserve_core::{AppError, ThumbnailStrategy};

const PLAYLIST_NAME: &str = "index.m3u8";
const SEGMENT_PATTERN: &str = "segment%03d.ts";
const THUMBNAIL_NAME: &str = "thumbnail.jpg";
const FRAME_NAME: &str = "frame.png";

/// Filesystem layout produced by one transcode run. A directory containing
/// the playlist is by definition a complete, playable asset.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub dir: PathBuf,
    pub playlist_path: PathBuf,
    pub thumbnail_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("transcoder binary '{0}' not available on this host")]
    Unavailable(String),

    #[error("input is unreadable or corrupt: {0}")]
    CorruptInput(String),

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("transcode failed: {0}")]
    Failed(String),

    /// The playlist stage succeeded but the thumbnail did not. Reported
    /// separately so the orchestrator can decide the policy; by default a
    /// video without a thumbnail is not publishable.
    #[error("thumbnail generation failed: {0}")]
    Thumbnail(String),
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Unavailable(msg) => AppError::TranscodeUnavailable(msg),
            TranscodeError::Thumbnail(msg) => AppError::ThumbnailFailed(msg),
            TranscodeError::CorruptInput(_)
            | TranscodeError::UnsupportedCodec(_)
            | TranscodeError::Failed(_) => AppError::TranscodeFailed(err.to_string()),
        }
    }
}

/// Seam between the orchestrator and the external transcoding capability.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `input_path` into an HLS segment set, playlist and
    /// thumbnail under `output_dir`, creating the directory. No retries;
    /// classification of transient failures is the caller's concern.
    async fn transcode(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<TranscodeOutput, TranscodeError>;
}

/// Drives an external `ffmpeg` process. Every path and option is passed as a
/// discrete argument token; untrusted filenames never touch a shell.
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    segment_duration: u64,
    thumbnail_width: u32,
    thumbnail_height: u32,
    strategy: ThumbnailStrategy,
}

impl FfmpegTranscoder {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        segment_duration: u64,
        thumbnail_width: u32,
        thumbnail_height: u32,
        strategy: ThumbnailStrategy,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            segment_duration,
            thumbnail_width,
            thumbnail_height,
            strategy,
        }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), TranscodeError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::Unavailable(self.ffmpeg_path.clone())
                } else {
                    TranscodeError::Failed(format!("failed to spawn ffmpeg: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                exit = ?output.status.code(),
                stderr = %stderr,
                "ffmpeg exited with failure"
            );
            return Err(classify_failure(&stderr, output.status.code()));
        }

        Ok(())
    }

    async fn generate_thumbnail_two_step(
        &self,
        input_path: &Path,
        output_dir: &Path,
        thumbnail_path: &Path,
    ) -> Result<(), TranscodeError> {
        let frame_path = output_dir.join(FRAME_NAME);

        self.run(frame_args(input_path, &frame_path))
            .await
            .map_err(|e| TranscodeError::Thumbnail(e.to_string()))?;

        let (width, height) = (self.thumbnail_width, self.thumbnail_height);
        let frame = frame_path.clone();
        let thumb = thumbnail_path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), image::ImageError> {
            let img = image::open(&frame)?;
            img.resize_exact(width, height, image::imageops::FilterType::Triangle)
                .save(&thumb)
        })
        .await
        .map_err(|e| TranscodeError::Thumbnail(format!("scale task panicked: {}", e)))?
        .map_err(|e| TranscodeError::Thumbnail(format!("frame scaling failed: {}", e)))?;

        if let Err(e) = fs::remove_file(&frame_path).await {
            tracing::warn!(path = %frame_path.display(), error = %e, "Failed to remove intermediate frame");
        }

        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[tracing::instrument(skip(self, input_path, output_dir), fields(
        process.executable.path = %self.ffmpeg_path,
        output_dir = %output_dir.display()
    ))]
    async fn transcode(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<TranscodeOutput, TranscodeError> {
        fs::create_dir_all(output_dir)
            .await
            .map_err(|e| TranscodeError::Failed(format!("failed to create output dir: {}", e)))?;

        let playlist_path = output_dir.join(PLAYLIST_NAME);
        let segment_pattern = output_dir.join(SEGMENT_PATTERN);
        let thumbnail_path = output_dir.join(THUMBNAIL_NAME);

        let start = std::time::Instant::now();

        let single_pass_thumbnail = match self.strategy {
            ThumbnailStrategy::SinglePass => Some((
                thumbnail_path.clone(),
                self.thumbnail_width,
                self.thumbnail_height,
            )),
            ThumbnailStrategy::ExtractThenScale => None,
        };

        self.run(hls_args(
            input_path,
            &playlist_path,
            &segment_pattern,
            self.segment_duration,
            single_pass_thumbnail,
        ))
        .await?;

        // A success exit without a playlist is still a failed transcode.
        if !nonempty_file(&playlist_path).await {
            return Err(TranscodeError::Failed(
                "ffmpeg reported success but produced no playlist".to_string(),
            ));
        }

        if self.strategy == ThumbnailStrategy::ExtractThenScale {
            self.generate_thumbnail_two_step(input_path, output_dir, &thumbnail_path)
                .await?;
        }

        // The playlist stage succeeded by now; a missing thumbnail is the
        // distinct thumbnail failure, never folded into TranscodeFailed.
        if !nonempty_file(&thumbnail_path).await {
            return Err(TranscodeError::Thumbnail(
                "no thumbnail was produced".to_string(),
            ));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            playlist = %playlist_path.display(),
            "Transcode completed"
        );

        Ok(TranscodeOutput {
            dir: output_dir.to_path_buf(),
            playlist_path,
            thumbnail_path,
        })
    }
}

async fn nonempty_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.len() > 0).unwrap_or(false)
}

/// Arguments for the HLS pass. When `thumbnail` is set, the same invocation
/// derives the still image as a second output.
fn hls_args(
    input: &Path,
    playlist: &Path,
    segment_pattern: &Path,
    segment_duration: u64,
    thumbnail: Option<(PathBuf, u32, u32)>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-i".into(),
        input.into(),
        "-codec:v".into(),
        "libx264".into(),
        "-codec:a".into(),
        "aac".into(),
        "-hls_time".into(),
        segment_duration.to_string().into(),
        "-hls_playlist_type".into(),
        "vod".into(),
        "-hls_segment_filename".into(),
        segment_pattern.into(),
        "-start_number".into(),
        "0".into(),
        playlist.into(),
    ];

    if let Some((thumbnail_path, width, height)) = thumbnail {
        args.extend([
            "-vf".into(),
            format!("thumbnail,scale={}:{}", width, height).into(),
            "-frames:v".into(),
            "1".into(),
            thumbnail_path.into(),
        ]);
    }

    args
}

/// Arguments for the full-resolution frame extraction of the two-step
/// thumbnail strategy.
fn frame_args(input: &Path, frame: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.into(),
        "-vf".into(),
        "thumbnail".into(),
        "-frames:v".into(),
        "1".into(),
        frame.into(),
    ]
}

/// Map ffmpeg stderr to the distinct failure kinds the orchestrator reports.
fn classify_failure(stderr: &str, exit_code: Option<i32>) -> TranscodeError {
    let tail: String = stderr
        .lines()
        .rev()
        .take(5)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join(" | ");

    if stderr.contains("Invalid data found when processing input")
        || stderr.contains("moov atom not found")
        || stderr.contains("Header missing")
    {
        TranscodeError::CorruptInput(tail)
    } else if stderr.contains("Decoder not found")
        || stderr.contains("decoder not found")
        || stderr.contains("codec not currently supported")
        || stderr.contains("Could not find codec")
    {
        TranscodeError::UnsupportedCodec(tail)
    } else {
        TranscodeError::Failed(format!("exit code {:?}: {}", exit_code, tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_hls_args_are_discrete_tokens() {
        // A filename with shell metacharacters must survive as one token.
        let input = Path::new("/staging/evil; rm -rf $(x).mp4");
        let args = to_strings(&hls_args(
            input,
            Path::new("/out/index.m3u8"),
            Path::new("/out/segment%03d.ts"),
            10,
            None,
        ));

        assert!(args.contains(&"/staging/evil; rm -rf $(x).mp4".to_string()));
        assert!(args.contains(&"-hls_playlist_type".to_string()));
        assert!(args.contains(&"vod".to_string()));
        assert_eq!(args[args.len() - 1], "/out/index.m3u8");
        assert!(!args.iter().any(|a| a.contains("sh -c")));
    }

    #[test]
    fn test_hls_args_segment_duration_configurable() {
        let args = to_strings(&hls_args(
            Path::new("in.mp4"),
            Path::new("out/index.m3u8"),
            Path::new("out/segment%03d.ts"),
            6,
            None,
        ));
        let pos = args.iter().position(|a| a == "-hls_time").unwrap();
        assert_eq!(args[pos + 1], "6");
    }

    #[test]
    fn test_single_pass_appends_thumbnail_output() {
        let args = to_strings(&hls_args(
            Path::new("in.mp4"),
            Path::new("out/index.m3u8"),
            Path::new("out/segment%03d.ts"),
            10,
            Some((PathBuf::from("out/thumbnail.jpg"), 640, 360)),
        ));
        assert!(args.contains(&"thumbnail,scale=640:360".to_string()));
        assert_eq!(args[args.len() - 1], "out/thumbnail.jpg");
    }

    #[test]
    fn test_frame_args_extract_single_frame() {
        let args = to_strings(&frame_args(Path::new("in.mp4"), Path::new("out/frame.png")));
        let pos = args.iter().position(|a| a == "-frames:v").unwrap();
        assert_eq!(args[pos + 1], "1");
        assert_eq!(args[args.len() - 1], "out/frame.png");
    }

    #[test]
    fn test_classify_corrupt_input() {
        let err = classify_failure(
            "[mov,mp4] moov atom not found\nin.mp4: Invalid data found when processing input",
            Some(1),
        );
        assert!(matches!(err, TranscodeError::CorruptInput(_)));
    }

    #[test]
    fn test_classify_unsupported_codec() {
        let err = classify_failure("Decoder not found for codec av1", Some(1));
        assert!(matches!(err, TranscodeError::UnsupportedCodec(_)));
    }

    #[test]
    fn test_classify_generic_failure() {
        let err = classify_failure("Conversion failed!", Some(137));
        assert!(matches!(err, TranscodeError::Failed(_)));
    }

    #[test]
    fn test_error_mapping_to_app_error() {
        assert!(matches!(
            AppError::from(TranscodeError::Unavailable("ffmpeg".into())),
            AppError::TranscodeUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(TranscodeError::Thumbnail("x".into())),
            AppError::ThumbnailFailed(_)
        ));
        assert!(matches!(
            AppError::from(TranscodeError::CorruptInput("x".into())),
            AppError::TranscodeFailed(_)
        ));
    }
}

//! Multipart video upload handler.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    Json,
};
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use utoipa::ToSchema;
use vodserve_core::models::VideoRecord;
use vodserve_core::AppError;
use vodserve_storage::StagedFile;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const DESCRIPTION_FIELD: &str = "description";

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub video: VideoRecord,
}

/// Accept one video upload and run it through the full pipeline.
///
/// Multipart fields arrive in the order the client wrote them, so the file
/// is staged as soon as its field is seen and the pipeline runs only after
/// the whole request has been read (the description may follow the file).
#[utoipa::path(
    post,
    path = "/upload",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video uploaded and published", body = UploadResponse),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported media type", body = ErrorResponse),
        (status = 500, description = "Pipeline failure", body = ErrorResponse),
        (status = 503, description = "Transcoder unavailable", body = ErrorResponse)
    )
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let mut staged: Option<StagedFile> = None;
    let mut description: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_staged(&mut staged).await;
                return Err(multipart_error(e).into());
            }
        };

        match field.name() {
            Some(FILE_FIELD) => {
                if staged.is_some() {
                    discard_staged(&mut staged).await;
                    return Err(AppError::InvalidInput(
                        "Multiple file fields in one request".to_string(),
                    )
                    .into());
                }

                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "video".to_string());
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_default();

                staged = Some(
                    state
                        .orchestrator
                        .staging()
                        .stage(field_stream(field), &content_type, &filename)
                        .await?,
                );
            }
            Some(DESCRIPTION_FIELD) => match field.text().await {
                Ok(text) => description = Some(text),
                Err(e) => {
                    discard_staged(&mut staged).await;
                    return Err(multipart_error(e).into());
                }
            },
            // Unknown fields are read past and ignored.
            _ => {}
        }
    }

    let Some(staged) = staged else {
        return Err(AppError::InvalidInput("No file provided".to_string()).into());
    };

    let video = state.orchestrator.ingest_staged(staged, description).await?;

    Ok(Json(UploadResponse {
        message: "Video uploaded successfully".to_string(),
        video,
    }))
}

/// Adapts one multipart field to the byte stream the staging store consumes.
fn field_stream(field: Field<'_>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + '_ {
    futures::stream::unfold(field, |mut field| async move {
        match field.chunk().await {
            Ok(Some(chunk)) => Some((Ok(chunk), field)),
            Ok(None) => None,
            Err(e) => Some((Err(std::io::Error::other(e)), field)),
        }
    })
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Invalid multipart request: {}", e.body_text()))
}

/// A file staged earlier in the request must not outlive a failed request.
async fn discard_staged(staged: &mut Option<StagedFile>) {
    if let Some(staged) = staged.take() {
        if let Err(e) = staged.remove().await {
            tracing::warn!(
                path = %staged.path.display(),
                error = %e,
                "Failed to remove staged file after request error"
            );
        }
    }
}

//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use vodserve_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "vodserve API",
        version = "0.1.0",
        description = "Video ingestion and playback API. Uploads are transcoded \
            to HLS and served with a generated thumbnail; published videos are \
            listed and fetched by id."
    ),
    paths(
        handlers::upload::upload_video,
        handlers::videos::list_videos,
        handlers::videos::get_video,
    ),
    components(schemas(
        models::VideoRecord,
        handlers::upload::UploadResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "videos", description = "Video upload and retrieval")
    )
)]
pub struct ApiDoc;

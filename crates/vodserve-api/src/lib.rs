//! HTTP surface: upload, listing, playback metadata and static file serving.
//!
//! The router is built by [`setup::routes::setup_routes`] from an
//! [`state::AppState`], so integration tests can assemble one with in-memory
//! components and drive it without a socket.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;

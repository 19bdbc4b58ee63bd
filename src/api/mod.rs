//! API Module
//!
//! HTTP handlers and routing for the media cache REST API.
//!
//! # Endpoints
//! - `GET /image`, `GET /image/set` - Image URL resolution
//! - `POST /preload` - Batch preloading
//! - `DELETE /cache`, `PUT /network` - Cache and size policy control
//! - `/collections` - Saved items, queued while offline
//! - `PUT /connectivity`, `GET /offline/queue` - Offline state
//! - `GET /stats`, `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

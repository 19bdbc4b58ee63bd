//! Request and Response models for the media cache API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    ConnectivityRequest, ImageQuery, ImageSetQuery, NetworkRequest, PreloadRequest,
    MAX_PRELOAD_PATHS,
};
pub use responses::{
    CollectionsResponse, ConnectivityResponse, HealthResponse, MessageResponse, MutationResponse,
    NetworkResponse, PreloadResponse, QueueResponse, StatsResponse, UrlResponse,
};

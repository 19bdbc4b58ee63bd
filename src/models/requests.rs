//! Request DTOs for the media cache API
//!
//! Defines query strings and incoming HTTP request bodies.

use serde::Deserialize;

use crate::images::{NetworkClass, SizeToken};

/// Maximum paths accepted by a single preload request.
pub const MAX_PRELOAD_PATHS: usize = 100;

/// Query for `GET /image`
///
/// # Fields
/// - `path`: Image path relative to the CDN base, may be absent
/// - `size`: Size token or alias; omitted means "pick from network class"
/// - `fallback`: Returned instead of the placeholder when `path` is absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub size: Option<SizeToken>,
    #[serde(default)]
    pub fallback: Option<String>,
}

/// Query for `GET /image/set`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSetQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub size: Option<SizeToken>,
}

/// Request body for `POST /preload`
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    pub paths: Vec<String>,
    /// Defaults to the smallest defined size
    #[serde(default)]
    pub size: Option<SizeToken>,
}

impl PreloadRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.paths.len() > MAX_PRELOAD_PATHS {
            return Some(format!(
                "At most {} paths can be preloaded at once",
                MAX_PRELOAD_PATHS
            ));
        }
        None
    }
}

/// Request body for `PUT /network`
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkRequest {
    /// Unrecognized classes fall back to `unknown`
    pub class: NetworkClass,
}

/// Request body for `PUT /connectivity`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_query_resolves_alias() {
        let query: ImageQuery = serde_json::from_str(r#"{"path": "/a.jpg", "size": "large"}"#).unwrap();
        assert_eq!(query.path.as_deref(), Some("/a.jpg"));
        assert_eq!(query.size, Some(SizeToken::LARGE));
        assert!(query.fallback.is_none());
    }

    #[test]
    fn test_preload_request_defaults() {
        let req: PreloadRequest = serde_json::from_str(r#"{"paths": ["/a.jpg", ""]}"#).unwrap();
        assert_eq!(req.paths.len(), 2);
        assert!(req.size.is_none());
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_preload_request_too_many_paths() {
        let req = PreloadRequest {
            paths: vec!["/a.jpg".to_string(); MAX_PRELOAD_PATHS + 1],
            size: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_network_request_unknown_class() {
        let req: NetworkRequest = serde_json::from_str(r#"{"class": "5g"}"#).unwrap();
        assert_eq!(req.class, NetworkClass::Unknown);

        let req: NetworkRequest = serde_json::from_str(r#"{"class": "4g"}"#).unwrap();
        assert_eq!(req.class, NetworkClass::Cellular4g);
    }
}

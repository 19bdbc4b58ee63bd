//! Response DTOs for the media cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::images::{NetworkClass, SizeToken};
use crate::offline::{CollectionItem, MutationOutcome, OfflineOperation};

/// Response body for `GET /image`
#[derive(Debug, Clone, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

impl UrlResponse {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Response body for `POST /preload`
///
/// One entry per non-blank requested path, `null` where loading failed.
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    pub results: Vec<Option<String>>,
    /// Number of entries that loaded
    pub loaded: usize,
}

impl PreloadResponse {
    pub fn new(results: Vec<Option<String>>) -> Self {
        let loaded = results.iter().filter(|r| r.is_some()).count();
        Self { results, loaded }
    }
}

/// Response body for the stats endpoint (`GET /stats`)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub capacity: usize,
    pub network_class: NetworkClass,
    pub collection_items: usize,
    pub pending_operations: usize,
}

/// Response body for `PUT /network`
#[derive(Debug, Clone, Serialize)]
pub struct NetworkResponse {
    pub class: NetworkClass,
    pub preferred_size: SizeToken,
}

/// Response body for `GET /collections`
#[derive(Debug, Clone, Serialize)]
pub struct CollectionsResponse {
    pub items: Vec<CollectionItem>,
    pub count: usize,
}

impl CollectionsResponse {
    pub fn new(items: Vec<CollectionItem>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Response body for collection mutations
#[derive(Debug, Clone, Serialize)]
pub struct MutationResponse {
    /// Affected item id, absent for a clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub outcome: MutationOutcome,
}

impl MutationResponse {
    pub fn new(id: Option<String>, outcome: MutationOutcome) -> Self {
        Self { id, outcome }
    }
}

/// Response body for `PUT /connectivity`
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub pending_operations: usize,
}

/// Response body for `GET /offline/queue`
#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    pub operations: Vec<OfflineOperation>,
    pub online: bool,
}

/// Response body for operations that only report success (`DELETE /cache`)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the health endpoint (`GET /health`)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_response_counts_loaded() {
        let resp = PreloadResponse::new(vec![Some("a".into()), None, Some("b".into())]);
        assert_eq!(resp.loaded, 2);

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["results"][1].is_null());
    }

    #[test]
    fn test_stats_response_flattens_cache_stats() {
        let resp = StatsResponse {
            cache: CacheStats {
                size: 1,
                keys: vec!["/a.jpg|w342".into()],
                hits: 3,
                misses: 1,
                evictions: 0,
            },
            hit_rate: 0.75,
            capacity: 1000,
            network_class: NetworkClass::Wifi,
            collection_items: 0,
            pending_operations: 0,
        };
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["size"], 1);
        assert_eq!(json["keys"][0], "/a.jpg|w342");
        assert_eq!(json["network_class"], "wifi");
    }

    #[test]
    fn test_mutation_response_omits_missing_id() {
        let json = serde_json::to_string(&MutationResponse::new(None, MutationOutcome::Queued)).unwrap();
        assert_eq!(json, r#"{"outcome":"queued"}"#);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}

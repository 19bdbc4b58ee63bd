//! API Handlers
//!
//! HTTP request handlers for each media cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;

use crate::cache::ResourceCache;
use crate::config::Config;
use crate::error::{MediaError, Result};
use crate::images::{preferred_size, HttpProbe, Preloader, ProgressiveSet, SizeToken, UrlBuilder};
use crate::models::{
    CollectionsResponse, ConnectivityRequest, ConnectivityResponse, HealthResponse, ImageQuery,
    ImageSetQuery, MessageResponse, MutationResponse, NetworkRequest, NetworkResponse,
    PreloadRequest, PreloadResponse, QueueResponse, StatsResponse, UrlResponse,
};
use crate::offline::{CollectionItem, CollectionStore, KeyValueStore, OfflineQueue};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub builder: Arc<UrlBuilder>,
    pub preloader: Arc<Preloader>,
    pub collections: Arc<CollectionStore>,
    /// Broadcasts connectivity changes to the replay task
    pub connectivity: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Creates a new AppState from already built components.
    pub fn new(
        builder: Arc<UrlBuilder>,
        preloader: Arc<Preloader>,
        collections: Arc<CollectionStore>,
    ) -> Self {
        let (connectivity, _) = watch::channel(collections.is_online());
        Self {
            builder,
            preloader,
            collections,
            connectivity: Arc::new(connectivity),
        }
    }

    /// Creates a new AppState from configuration over the given durable store.
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let cache = Arc::new(Mutex::new(ResourceCache::new(config.max_entries)));
        let builder = Arc::new(UrlBuilder::from_config(config, cache));
        let preloader = Arc::new(Preloader::new(
            builder.clone(),
            Arc::new(HttpProbe::default()),
            Some(config.preload_timeout()),
        ));

        let queue = Arc::new(OfflineQueue::open(store.clone())?);
        let collections = Arc::new(CollectionStore::open(store, queue, config.suppression())?);

        Ok(Self::new(builder, preloader, collections))
    }

    /// Receiver for the replay task.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.connectivity.subscribe()
    }
}

fn requested_size(size: Option<SizeToken>) -> Option<SizeToken> {
    size.filter(|s| !s.as_str().is_empty())
}

/// Handler for GET /image
///
/// Resolves one image URL. Without a size the network class decides.
pub async fn image_handler(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Json<UrlResponse> {
    let path = query.path.as_deref();
    let fallback = query.fallback.as_deref();

    let url = match requested_size(query.size) {
        Some(size) => state.builder.resolve(path, &size, fallback),
        None => state.builder.resolve_auto(path, fallback),
    };
    Json(UrlResponse::new(url))
}

/// Handler for GET /image/set
pub async fn image_set_handler(
    State(state): State<AppState>,
    Query(query): Query<ImageSetQuery>,
) -> Json<ProgressiveSet> {
    let size = requested_size(query.size).unwrap_or_default();
    Json(ProgressiveSet::build(&state.builder, query.path.as_deref(), &size))
}

/// Handler for POST /preload
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(MediaError::InvalidRequest(error_msg));
    }

    let size = requested_size(req.size).unwrap_or(SizeToken::SMALL);
    let results = state.preloader.preload(&req.paths, &size).await;
    Ok(Json(PreloadResponse::new(results)))
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    let dropped = {
        let mut cache = state.builder.cache().lock();
        let dropped = cache.len();
        cache.clear();
        dropped
    };
    info!(dropped, "Resource cache cleared");
    Json(MessageResponse::new(format!("Cleared {} cached URLs", dropped)))
}

/// Handler for PUT /network
pub async fn network_handler(
    State(state): State<AppState>,
    Json(req): Json<NetworkRequest>,
) -> Json<NetworkResponse> {
    state.builder.set_network_class(req.class);
    Json(NetworkResponse {
        class: req.class,
        preferred_size: preferred_size(req.class),
    })
}

/// Handler for GET /collections
pub async fn list_collections_handler(State(state): State<AppState>) -> Json<CollectionsResponse> {
    Json(CollectionsResponse::new(state.collections.items()))
}

/// Handler for POST /collections
pub async fn add_collection_handler(
    State(state): State<AppState>,
    Json(item): Json<CollectionItem>,
) -> Result<Json<MutationResponse>> {
    let id = item.id.clone();
    let outcome = state.collections.add(item)?;
    Ok(Json(MutationResponse::new(Some(id), outcome)))
}

/// Handler for DELETE /collections/:id
pub async fn remove_collection_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>> {
    let outcome = state.collections.remove(&id)?;
    Ok(Json(MutationResponse::new(Some(id), outcome)))
}

/// Handler for DELETE /collections
pub async fn clear_collections_handler(
    State(state): State<AppState>,
) -> Result<Json<MutationResponse>> {
    let outcome = state.collections.clear()?;
    Ok(Json(MutationResponse::new(None, outcome)))
}

/// Handler for PUT /connectivity
///
/// Going online wakes the replay task, which drains the queue.
pub async fn connectivity_handler(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    state.collections.set_online(req.online);
    state.connectivity.send_replace(req.online);

    Json(ConnectivityResponse {
        online: req.online,
        pending_operations: state.collections.queue().len(),
    })
}

/// Handler for GET /offline/queue
pub async fn queue_handler(State(state): State<AppState>) -> Json<QueueResponse> {
    Json(QueueResponse {
        operations: state.collections.queue().pending(),
        online: state.collections.is_online(),
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let (cache, capacity) = {
        let cache = state.builder.cache().lock();
        (cache.stats(), cache.capacity())
    };

    Json(StatsResponse {
        hit_rate: cache.hit_rate(),
        cache,
        capacity,
        network_class: state.builder.network_class(),
        collection_items: state.collections.len(),
        pending_operations: state.collections.queue().len(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

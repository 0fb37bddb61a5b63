//! ============================================================================
//! Application State
//! ============================================================================
//! The memory manager is installed once a backend connection succeeds. Until
//! then the server runs degraded: memory requests and health checks retry the
//! connection, one attempt at a time and at most once per cooldown.
//! ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use memory_core::MemoryManager;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::ApiError;

/// Builds a connected memory manager
#[async_trait]
pub trait MemoryConnector: Send + Sync {
    async fn connect(&self) -> memory_core::Result<MemoryManager>;
}

/// Connects to Qdrant and the OpenAI embeddings API from [`Settings`]
pub struct QdrantConnector {
    settings: Arc<Settings>,
}

impl QdrantConnector {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl MemoryConnector for QdrantConnector {
    async fn connect(&self) -> memory_core::Result<MemoryManager> {
        info!("Attempting to connect to Qdrant at {}", self.settings.qdrant_url);
        MemoryManager::connect(
            &self.settings.qdrant_config(),
            self.settings.embedding_service(),
        )
        .await
    }
}

/// Minimum gap between reconnect attempts after a failure
pub const RECONNECT_COOLDOWN: Duration = Duration::from_secs(5);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    memory: Arc<RwLock<Option<MemoryManager>>>,
    connector: Option<Arc<dyn MemoryConnector>>,
    // Held for the duration of a connect attempt; records the last failure
    last_failure: Arc<Mutex<Option<Instant>>>,
    reconnect_cooldown: Duration,
}

impl AppState {
    /// State without a backend yet; `connector` is used to (re)connect
    pub fn new(settings: Arc<Settings>, connector: Option<Arc<dyn MemoryConnector>>) -> Self {
        Self {
            settings,
            memory: Arc::new(RwLock::new(None)),
            connector,
            last_failure: Arc::new(Mutex::new(None)),
            reconnect_cooldown: RECONNECT_COOLDOWN,
        }
    }

    /// State around an already connected manager
    pub fn with_manager(settings: Arc<Settings>, manager: MemoryManager) -> Self {
        Self {
            memory: Arc::new(RwLock::new(Some(manager))),
            ..Self::new(settings, None)
        }
    }

    pub fn with_reconnect_cooldown(mut self, cooldown: Duration) -> Self {
        self.reconnect_cooldown = cooldown;
        self
    }

    /// Connect the backend, waiting for any attempt already running.
    /// Failure is logged and leaves the server degraded.
    pub async fn initialize(&self) -> bool {
        let Some(connector) = &self.connector else {
            return self.memory.read().await.is_some();
        };

        let mut last_failure = self.last_failure.lock().await;
        self.connect_locked(connector, &mut last_failure).await
    }

    /// Reconnect without queueing: gives up at once while another attempt
    /// is running or while the last failure is within the cooldown.
    pub async fn try_reconnect(&self) -> bool {
        if self.memory.read().await.is_some() {
            return true;
        }
        let Some(connector) = &self.connector else {
            return false;
        };

        let Ok(mut last_failure) = self.last_failure.try_lock() else {
            debug!("Reconnect already in progress");
            return false;
        };
        if let Some(failed_at) = *last_failure {
            if failed_at.elapsed() < self.reconnect_cooldown {
                debug!("Reconnect skipped, last attempt failed {:?} ago", failed_at.elapsed());
                return false;
            }
        }

        self.connect_locked(connector, &mut last_failure).await
    }

    /// Run [`try_reconnect`](Self::try_reconnect) on a background task
    pub fn spawn_reconnect(&self) {
        let state = self.clone();
        tokio::spawn(async move {
            state.try_reconnect().await;
        });
    }

    async fn connect_locked(
        &self,
        connector: &Arc<dyn MemoryConnector>,
        last_failure: &mut Option<Instant>,
    ) -> bool {
        if self.memory.read().await.is_some() {
            return true;
        }

        match connector.connect().await {
            Ok(manager) => {
                *self.memory.write().await = Some(manager);
                *last_failure = None;
                info!("Memory backend initialized (collection: {})", self.settings.collection);
                true
            }
            Err(e) => {
                *last_failure = Some(Instant::now());
                warn!("Could not initialize memory backend: {}", e);
                warn!(
                    "Memory service will be unavailable until Qdrant becomes available (QDRANT_URL: {})",
                    self.settings.qdrant_url
                );
                false
            }
        }
    }

    /// Current manager, if connected
    pub async fn current(&self) -> Option<MemoryManager> {
        self.memory.read().await.clone()
    }

    /// Manager for a memory request, reconnecting if allowed
    pub async fn memory(&self) -> Result<MemoryManager, ApiError> {
        if let Some(manager) = self.current().await {
            return Ok(manager);
        }

        if self.try_reconnect().await {
            if let Some(manager) = self.current().await {
                return Ok(manager);
            }
        }

        Err(ApiError::Unavailable(
            "Memory service not initialized".to_string(),
        ))
    }

    /// Drop the backend connection
    pub async fn close(&self) {
        if self.memory.write().await.take().is_some() {
            info!("Memory backend connection closed");
        }
    }
}

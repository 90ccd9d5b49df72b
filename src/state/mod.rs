pub mod game;
pub mod registry;
pub mod session;
pub mod sse;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dao::users::UserStore;

use self::session::SessionPool;
use self::sse::SseRegistry;

pub type SharedState = Arc<AppState>;

/// How many events each per-user SSE hub buffers for slow browsers.
const SSE_HUB_CAPACITY: usize = 32;

/// Central bridge state: configuration, the persistent user store, the
/// per-username TCP session pool, and the per-username SSE hubs.
pub struct AppState {
    config: AppConfig,
    users: UserStore,
    sessions: SessionPool,
    sse: SseRegistry,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply into handlers and background tasks.
    pub fn new(config: AppConfig, users: UserStore) -> SharedState {
        Arc::new(Self {
            config,
            users,
            sessions: SessionPool::new(),
            sse: SseRegistry::new(SSE_HUB_CAPACITY),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    pub fn sse(&self) -> &SseRegistry {
        &self.sse
    }
}

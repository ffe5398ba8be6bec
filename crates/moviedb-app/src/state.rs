use std::{sync::Arc, time::Duration};

use moviedb_dal::Pool;
use moviedb_types::config::Environment;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { app_config, pool }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub query_timeout: Duration,
    pub default_page_size: u32,
    pub body_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::Development,
            query_timeout: moviedb_dal::DEFAULT_QUERY_TIMEOUT,
            default_page_size: 20,
            body_limit: 1024 * 1024,
        }
    }
}

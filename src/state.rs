use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, services::statistics::UserLocks, store::QuizStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuizStore>,
    pub locks: Arc<UserLocks>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn QuizStore>, config: Config) -> Self {
        Self {
            store,
            locks: Arc::new(UserLocks::new()),
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn QuizStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

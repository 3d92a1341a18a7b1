use crate::config::Config;
use crate::storage::AppData;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub data: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(config: Config, data: AppData) -> Self {
        Self {
            config: Arc::new(config),
            data: Arc::new(Mutex::new(data)),
        }
    }
}

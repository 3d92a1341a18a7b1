use crate::document::{SettingsDocument, UserDocument};
use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use tracing::error;

/// The whole document store: user documents and settings documents, each
/// keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub users: BTreeMap<String, UserDocument>,
    #[serde(default)]
    pub settings: BTreeMap<String, SettingsDocument>,
}

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}

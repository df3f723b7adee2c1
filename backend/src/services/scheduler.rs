//! Registry of per-user event stores
//!
//! Each user gets one `EventStore`, opened lazily on first access and kept
//! behind its own async mutex so that operations for one user run one at a
//! time while different users proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use shared::enrichment::{NoWeather, WeatherProvider};
use shared::storage::{FileStore, KeyValueStore, PersistenceError};
use shared::{EventStore, StoreOptions};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::OpenWeatherProvider;

/// Handle to one user's store
pub type StoreHandle = Arc<Mutex<EventStore>>;

/// Event store registry
#[derive(Clone)]
pub struct SchedulerService {
    storage: Arc<dyn KeyValueStore>,
    weather: Arc<dyn WeatherProvider>,
    options: StoreOptions,
    stores: Arc<Mutex<HashMap<String, StoreHandle>>>,
}

impl SchedulerService {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        weather: Arc<dyn WeatherProvider>,
        options: StoreOptions,
    ) -> Self {
        Self {
            storage,
            weather,
            options,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wire file-backed storage and, if an API key is set, OpenWeatherMap
    pub fn from_config(config: &Config) -> Result<Self, PersistenceError> {
        let storage = FileStore::open(&config.scheduler.data_dir)?;

        let weather: Arc<dyn WeatherProvider> = if config.weather.is_enabled() {
            Arc::new(OpenWeatherProvider::from_config(&config.weather))
        } else {
            tracing::warn!("No weather API key configured; events will not be enriched");
            Arc::new(NoWeather)
        };

        let options = StoreOptions {
            enrichment_timeout: config.scheduler.enrichment_timeout(),
            ..StoreOptions::default()
        };

        Ok(Self::new(Arc::new(storage), weather, options))
    }

    /// Store for `email`, opening it on first use
    pub async fn store_for(&self, email: &str) -> AppResult<StoreHandle> {
        let user_id = shared::normalize_email(email);
        if user_id.is_empty() {
            return Err(AppError::bad_request("Email required"));
        }
        shared::validate_email(&user_id).map_err(|message| AppError::Validation {
            field: "email".to_string(),
            message: message.to_string(),
        })?;

        let mut stores = self.stores.lock().await;
        let handle = stores.entry(user_id).or_insert_with_key(|user_id| {
            tracing::debug!(user_id, "Opening event store");
            Arc::new(Mutex::new(EventStore::open(
                user_id.clone(),
                self.storage.clone(),
                self.weather.clone(),
                self.options.clone(),
            )))
        });

        Ok(handle.clone())
    }

    /// Number of stores opened so far
    pub async fn open_stores(&self) -> usize {
        self.stores.lock().await.len()
    }
}

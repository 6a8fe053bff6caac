use crate::config::Config;
use crate::queue::ReoptQueue;
use crate::results::store::ResultStore;
use crate::results::ticket::DownloadSigner;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: ResultStore,
    pub signer: DownloadSigner,
    pub queue: ReoptQueue,
    pub config: Config,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        AppState {
            store: ResultStore::new(&config.storage_root),
            signer: DownloadSigner::new(&config.download_secret, config.download_ttl),
            queue: ReoptQueue::new(&config.storage_root),
            config,
        }
    }
}

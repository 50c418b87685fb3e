use crate::config::settings::AppConfig;
use crate::infrastructure::storage::local::StorageService;
use crate::workers::pool::TranscodePool;
use crate::workers::transcoder::Transcoder;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: StorageService,
    pub transcoder: Transcoder,
    pub pool: TranscodePool,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        storage: StorageService,
        transcoder: Transcoder,
        pool: TranscodePool,
    ) -> Self {
        Self {
            config,
            storage,
            transcoder,
            pool,
        }
    }

    /// Wires storage, the transcoder and the worker pool from configuration.
    pub async fn from_config(config: AppConfig) -> std::io::Result<Self> {
        let storage = StorageService::new(config.upload_dir.clone()).await?;
        let transcoder = Transcoder::from_config(&config);
        let pool = TranscodePool::new(config.max_concurrent_transcodes, config.transcode_queue_depth);
        Ok(Self::new(config, storage, transcoder, pool))
    }
}

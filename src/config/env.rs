use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvKey {
    ServerPort,
    UploadDir,
    PublicBaseUrl,
    CorsAllowedOrigins,
    FfmpegBin,
    MaxConcurrentTranscodes,
    TranscodeQueueDepth,
    TranscodeTimeoutSecs,
    HlsSegmentSeconds,
    X264Preset,
    RenditionLadder,
    MaxUploadBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::UploadDir => "UPLOAD_DIR",
            EnvKey::PublicBaseUrl => "PUBLIC_BASE_URL",
            EnvKey::CorsAllowedOrigins => "CORS_ALLOWED_ORIGINS",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::MaxConcurrentTranscodes => "MAX_CONCURRENT_TRANSCODES",
            EnvKey::TranscodeQueueDepth => "TRANSCODE_QUEUE_DEPTH",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::HlsSegmentSeconds => "HLS_SEGMENT_SECONDS",
            EnvKey::X264Preset => "X264_PRESET",
            EnvKey::RenditionLadder => "RENDITION_LADDER",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
        }
    }
}

/// Reads a key from the process environment. Empty values count as unset.
pub fn lookup(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

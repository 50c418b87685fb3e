use crate::config::env::{self, EnvKey};
use crate::modules::lesson::model::Rendition;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_LADDER: &str = "1080p:1920x1080:5000,720p:1280x720:2500,480p:854x480:1000";
const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: EnvKey, value: &str, reason: impl Display) -> Self {
        ConfigError::Invalid {
            key: key.as_str(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Which browser origins may call the API.
///
/// `Any` is the bare `*` setting and never carries credentials; a named list
/// does. The two cannot be combined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl FromStr for AllowedOrigins {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let origins: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() {
            return Err("at least one origin is required".to_string());
        }

        if origins.iter().any(|o| o == "*") {
            if origins.len() > 1 {
                return Err("`*` cannot be combined with named origins".to_string());
            }
            return Ok(AllowedOrigins::Any);
        }

        // Stored in the serialized form browsers send in `Origin`.
        let mut normalized = Vec::with_capacity(origins.len());
        for origin in &origins {
            let parsed = Url::parse(origin).map_err(|e| format!("`{}`: {}", origin, e))?;
            let serialized = parsed.origin().ascii_serialization();
            if serialized != origin.trim_end_matches('/') {
                return Err(format!("`{}` is not a bare scheme://host[:port] origin", origin));
            }
            normalized.push(serialized);
        }

        Ok(AllowedOrigins::List(normalized))
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub upload_dir: PathBuf,
    /// Absolute base for published playlist URLs, without a trailing slash.
    pub public_base_url: String,
    pub cors: AllowedOrigins,
    pub ffmpeg_bin: PathBuf,
    pub max_concurrent_transcodes: usize,
    pub transcode_queue_depth: usize,
    pub transcode_timeout: Duration,
    pub hls_segment_seconds: u32,
    pub x264_preset: String,
    pub renditions: Vec<Rendition>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(env::lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(EnvKey) -> Option<String>,
    {
        let raw_base = lookup(EnvKey::PublicBaseUrl)
            .unwrap_or_else(|| "http://localhost:8000".to_string());
        let base = Url::parse(&raw_base)
            .map_err(|e| ConfigError::invalid(EnvKey::PublicBaseUrl, &raw_base, e))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                EnvKey::PublicBaseUrl,
                &raw_base,
                "scheme must be http or https",
            ));
        }

        let max_concurrent_transcodes: usize = parsed(&lookup, EnvKey::MaxConcurrentTranscodes, 2)?;
        if max_concurrent_transcodes == 0 {
            return Err(ConfigError::invalid(
                EnvKey::MaxConcurrentTranscodes,
                "0",
                "must be at least 1",
            ));
        }

        let hls_segment_seconds: u32 = parsed(&lookup, EnvKey::HlsSegmentSeconds, 10)?;
        if hls_segment_seconds == 0 {
            return Err(ConfigError::invalid(EnvKey::HlsSegmentSeconds, "0", "must be at least 1"));
        }

        let renditions = parse_ladder(
            &lookup(EnvKey::RenditionLadder).unwrap_or_else(|| DEFAULT_LADDER.to_string()),
        )?;

        Ok(Self {
            server_port: parsed(&lookup, EnvKey::ServerPort, 8000)?,
            upload_dir: lookup(EnvKey::UploadDir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            public_base_url: raw_base.trim_end_matches('/').to_string(),
            cors: parsed(
                &lookup,
                EnvKey::CorsAllowedOrigins,
                AllowedOrigins::from_str(DEFAULT_ORIGINS).map_err(|e| {
                    ConfigError::invalid(EnvKey::CorsAllowedOrigins, DEFAULT_ORIGINS, e)
                })?,
            )?,
            ffmpeg_bin: lookup(EnvKey::FfmpegBin)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            max_concurrent_transcodes,
            transcode_queue_depth: parsed(&lookup, EnvKey::TranscodeQueueDepth, 4)?,
            transcode_timeout: Duration::from_secs(parsed(
                &lookup,
                EnvKey::TranscodeTimeoutSecs,
                3600,
            )?),
            hls_segment_seconds,
            x264_preset: lookup(EnvKey::X264Preset).unwrap_or_else(|| "fast".to_string()),
            renditions,
            max_upload_bytes: parsed(&lookup, EnvKey::MaxUploadBytes, 2 * 1024 * 1024 * 1024)?,
        })
    }
}

fn parsed<F, T>(lookup: &F, key: EnvKey, default: T) -> Result<T, ConfigError>
where
    F: Fn(EnvKey) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(key, &raw, e)),
        None => Ok(default),
    }
}

fn parse_ladder(raw: &str) -> Result<Vec<Rendition>, ConfigError> {
    let renditions = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Rendition::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::invalid(EnvKey::RenditionLadder, raw, e))?;

    if renditions.is_empty() {
        return Err(ConfigError::invalid(
            EnvKey::RenditionLadder,
            raw,
            "at least one rendition is required",
        ));
    }

    for (i, r) in renditions.iter().enumerate() {
        if renditions[..i].iter().any(|other| other.label == r.label) {
            return Err(ConfigError::invalid(
                EnvKey::RenditionLadder,
                raw,
                format!("duplicate label `{}`", r.label),
            ));
        }
    }

    Ok(renditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(EnvKey, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<EnvKey, String> = pairs
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(&key).cloned())
    }

    #[test]
    fn defaults_cover_local_frontends() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server_port, 8000);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.public_base_url, "http://localhost:8000");
        assert_eq!(
            config.cors,
            AllowedOrigins::List(vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ])
        );

        let labels: Vec<&str> = config.renditions.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["1080p", "720p", "480p"]);
        let rates: Vec<u32> = config.renditions.iter().map(|r| r.video_kbps).collect();
        assert_eq!(rates, [5000, 2500, 1000]);
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let config = config_from(&[(EnvKey::PublicBaseUrl, "https://cdn.example.com/")]).unwrap();
        assert_eq!(config.public_base_url, "https://cdn.example.com");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = config_from(&[(EnvKey::PublicBaseUrl, "ftp://example.com")]).unwrap_err();
        assert!(err.to_string().contains("PUBLIC_BASE_URL"));
    }

    #[test]
    fn rejects_unparseable_port() {
        let err = config_from(&[(EnvKey::ServerPort, "eighty")]).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(config_from(&[(EnvKey::MaxConcurrentTranscodes, "0")]).is_err());
    }

    #[test]
    fn wildcard_origin_stands_alone() {
        let config = config_from(&[(EnvKey::CorsAllowedOrigins, "*")]).unwrap();
        assert_eq!(config.cors, AllowedOrigins::Any);
    }

    #[test]
    fn wildcard_mixed_with_named_origins_is_rejected() {
        let err = config_from(&[(
            EnvKey::CorsAllowedOrigins,
            "http://localhost:3000,http://localhost:5173,*",
        )])
        .unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn origin_with_path_is_rejected() {
        assert!("http://localhost:3000/app".parse::<AllowedOrigins>().is_err());
    }

    #[test]
    fn trailing_slash_is_dropped_from_origins() {
        let origins: AllowedOrigins = "http://localhost:3000/, https://app.example.com"
            .parse()
            .unwrap();
        assert_eq!(
            origins,
            AllowedOrigins::List(vec![
                "http://localhost:3000".to_string(),
                "https://app.example.com".to_string(),
            ])
        );
    }

    #[test]
    fn custom_ladder_is_parsed_in_order() {
        let config = config_from(&[(EnvKey::RenditionLadder, "360p:640x360:800, 240p:426x240:400")])
            .unwrap();
        assert_eq!(config.renditions.len(), 2);
        assert_eq!(config.renditions[0].label, "360p");
        assert_eq!(config.renditions[1].width, 426);
    }

    #[test]
    fn duplicate_ladder_labels_are_rejected() {
        let err = config_from(&[(EnvKey::RenditionLadder, "720p:1280x720:2500,720p:1280x720:1500")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}

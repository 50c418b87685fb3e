//! Master playlist serialization and post-transcode output checks.

use super::model::{JobDescriptor, Rendition};
use crate::common::error::PipelineError;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub uri: String,
}

impl From<&Rendition> for VariantStream {
    fn from(r: &Rendition) -> Self {
        Self {
            bandwidth: r.bandwidth(),
            width: r.width,
            height: r.height,
            uri: r.playlist_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn from_renditions(renditions: &[Rendition]) -> Self {
        Self {
            variants: renditions.iter().map(VariantStream::from).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "#EXTM3U");
        let _ = writeln!(out, "#EXT-X-VERSION:3");
        for v in &self.variants {
            let _ = writeln!(
                out,
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}",
                v.bandwidth, v.width, v.height
            );
            let _ = writeln!(out, "{}", v.uri);
        }
        out
    }
}

/// URI lines of a playlist (everything that is not blank or a tag).
pub fn playlist_uris(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
}

fn is_plain_file_name(uri: &str) -> bool {
    !uri.is_empty()
        && !uri.contains(['/', '\\'])
        && uri != "."
        && uri != ".."
        && !uri.contains("://")
}

async fn require_file(dir: &Path, name: &str) -> Result<(), PipelineError> {
    if !is_plain_file_name(name) {
        return Err(PipelineError::IncompleteOutput(format!(
            "`{}` points outside the lesson directory",
            name
        )));
    }
    match tokio::fs::metadata(dir.join(name)).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(PipelineError::IncompleteOutput(format!("{} is missing", name))),
    }
}

/// Confirms every rendition playlist exists and every segment it lists is on disk.
pub async fn verify_renditions(job: &JobDescriptor) -> Result<(), PipelineError> {
    for rendition in &job.renditions {
        let name = rendition.playlist_name();
        let path = job.rendition_playlist(rendition);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| PipelineError::IncompleteOutput(format!("{} is missing", name)))?;

        let segments = playlist_uris(&text);
        if segments.is_empty() {
            return Err(PipelineError::IncompleteOutput(format!(
                "{} lists no segments",
                name
            )));
        }
        for segment in segments {
            require_file(&job.output_dir, segment).await?;
        }
    }
    Ok(())
}

/// Serializes the master playlist next to the renditions. Written to a temp
/// file first so readers never observe a half-written manifest.
pub async fn write_master(job: &JobDescriptor) -> Result<MasterPlaylist, PipelineError> {
    let playlist = MasterPlaylist::from_renditions(&job.renditions);
    let tmp = job.manifest_path.with_extension("m3u8.tmp");

    let io_err = |source: std::io::Error| PipelineError::Filesystem {
        path: job.manifest_path.clone(),
        source,
    };
    tokio::fs::write(&tmp, playlist.render()).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, &job.manifest_path).await.map_err(io_err)?;

    info!(lesson_id = %job.lesson_id, "Master playlist written to {}", job.manifest_path.display());
    Ok(playlist)
}

/// Re-reads the published master and checks every variant it names is present.
pub async fn verify_master(job: &JobDescriptor) -> Result<(), PipelineError> {
    let text = tokio::fs::read_to_string(&job.manifest_path)
        .await
        .map_err(|_| PipelineError::IncompleteOutput("master playlist is missing".to_string()))?;

    let uris = playlist_uris(&text);
    if uris.len() != job.renditions.len() {
        return Err(PipelineError::IncompleteOutput(format!(
            "master lists {} variants, expected {}",
            uris.len(),
            job.renditions.len()
        )));
    }
    for uri in uris {
        require_file(&job.output_dir, uri).await?;
    }
    Ok(())
}

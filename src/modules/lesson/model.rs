use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

pub const MASTER_PLAYLIST: &str = "index.m3u8";

/// One rung of the bitrate ladder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendition {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub video_kbps: u32,
}

impl Rendition {
    pub fn new(label: &str, width: u32, height: u32, video_kbps: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            video_kbps,
        }
    }

    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.label)
    }

    /// ffmpeg segment pattern, e.g. `720p_%03d.ts`.
    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d.ts", self.label)
    }

    /// Declared `BANDWIDTH` in bits per second.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.video_kbps) * 1000
    }
}

/// Parses `label:WIDTHxHEIGHT:KBPS`, e.g. `720p:1280x720:2500`.
impl FromStr for Rendition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let (Some(label), Some(size), Some(kbps), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("`{}` is not label:WIDTHxHEIGHT:KBPS", s));
        };

        if label.is_empty()
            || !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("label `{}` must be alphanumeric", label));
        }

        let (w, h) = size
            .split_once('x')
            .ok_or_else(|| format!("size `{}` is not WIDTHxHEIGHT", size))?;
        let width: u32 = w.parse().map_err(|_| format!("bad width `{}`", w))?;
        let height: u32 = h.parse().map_err(|_| format!("bad height `{}`", h))?;
        let video_kbps: u32 = kbps.parse().map_err(|_| format!("bad bitrate `{}`", kbps))?;

        if width == 0 || height == 0 || video_kbps == 0 {
            return Err(format!("`{}` has a zero dimension or bitrate", s));
        }
        // libx264 rejects odd frame sizes in yuv420p.
        if width % 2 != 0 || height % 2 != 0 {
            return Err(format!("`{}` must have even dimensions", s));
        }

        Ok(Self::new(label, width, height, video_kbps))
    }
}

/// Everything the invoker needs to run one transcode. Built once per upload.
#[derive(Clone, Debug)]
pub struct JobDescriptor {
    pub lesson_id: Uuid,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub renditions: Vec<Rendition>,
    pub manifest_path: PathBuf,
}

impl JobDescriptor {
    pub fn new(
        lesson_id: Uuid,
        input_path: PathBuf,
        output_dir: PathBuf,
        renditions: Vec<Rendition>,
    ) -> Self {
        let manifest_path = output_dir.join(MASTER_PLAYLIST);
        Self {
            lesson_id,
            input_path,
            output_dir,
            renditions,
            manifest_path,
        }
    }

    pub fn rendition_playlist(&self, rendition: &Rendition) -> PathBuf {
        self.output_dir.join(rendition.playlist_name())
    }

    pub fn segment_pattern(&self, rendition: &Rendition) -> PathBuf {
        self.output_dir.join(rendition.segment_pattern())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Received,
    Staged,
    DescriptorBuilt,
    Transcoding,
    Published,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Published | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Received, Staged)
            | (Staged, DescriptorBuilt)
            | (DescriptorBuilt, Transcoding)
            | (Transcoding, Published) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Received => "received",
            JobState::Staged => "staged",
            JobState::DescriptorBuilt => "descriptor_built",
            JobState::Transcoding => "transcoding",
            JobState::Published => "published",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

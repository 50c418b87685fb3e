//! Single-pass multi-rendition HLS transcode via an external ffmpeg.

use crate::common::error::PipelineError;
use crate::config::settings::AppConfig;
use crate::modules::lesson::model::JobDescriptor;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a finished transcoder process.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Clone, Debug)]
pub struct Transcoder {
    program: PathBuf,
    timeout: Duration,
    segment_seconds: u32,
    preset: String,
}

impl Transcoder {
    pub fn new(program: PathBuf, timeout: Duration, segment_seconds: u32, preset: &str) -> Self {
        Self {
            program,
            timeout,
            segment_seconds,
            preset: preset.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.ffmpeg_bin.clone(),
            config.transcode_timeout,
            config.hls_segment_seconds,
            &config.x264_preset,
        )
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// `[0:v]split=N[v0]..;[v0]scale=W:H[v0out];..`
    pub fn filter_graph(job: &JobDescriptor) -> String {
        let n = job.renditions.len();
        let mut graph = format!("[0:v]split={}", n);
        for i in 0..n {
            graph.push_str(&format!("[v{}]", i));
        }
        for (i, r) in job.renditions.iter().enumerate() {
            graph.push_str(&format!(";[v{i}]scale={}:{}[v{i}out]", r.width, r.height));
        }
        graph
    }

    /// The full argument vector. Passed straight to the process; no shell is involved.
    pub fn build_args(&self, job: &JobDescriptor) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            job.input_path.to_string_lossy().into_owned(),
            "-filter_complex".into(),
            Self::filter_graph(job),
        ];

        for (i, r) in job.renditions.iter().enumerate() {
            args.extend([
                "-map".to_string(),
                format!("[v{}out]", i),
                "-map".to_string(),
                "0:a?".to_string(),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-b:v".to_string(),
                format!("{}k", r.video_kbps),
                "-preset".to_string(),
                self.preset.clone(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-f".to_string(),
                "hls".to_string(),
                "-hls_time".to_string(),
                self.segment_seconds.to_string(),
                "-hls_playlist_type".to_string(),
                "vod".to_string(),
                "-hls_segment_filename".to_string(),
                job.segment_pattern(r).to_string_lossy().into_owned(),
                job.rendition_playlist(r).to_string_lossy().into_owned(),
            ]);
        }

        args
    }

    /// Runs the transcode to completion. Exit status is the only success signal.
    ///
    /// The child is killed if the deadline passes or if this future is dropped.
    pub async fn run(&self, job: &JobDescriptor) -> Result<TranscodeOutput, PipelineError> {
        let tool = self.program_name();
        let args = self.build_args(job);

        info!(
            lesson_id = %job.lesson_id,
            renditions = job.renditions.len(),
            "Spawning {} for {}",
            tool,
            job.input_path.display()
        );
        debug!(lesson_id = %job.lesson_id, ?args, "transcoder argv");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::Transcode {
                tool: tool.clone(),
                message: format!("failed to spawn: {}", e),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PipelineError::Transcode {
                    tool,
                    message: format!("I/O error waiting for process: {}", e),
                });
            }
            Err(_elapsed) => {
                return Err(PipelineError::Transcode {
                    tool,
                    message: format!("timed out after {:?}", self.timeout),
                });
            }
        };

        let result = TranscodeOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!(lesson_id = %job.lesson_id, "{} stdout: {}", tool, result.stdout);
        debug!(lesson_id = %job.lesson_id, "{} stderr: {}", tool, result.stderr);

        if !result.status.success() {
            let tail = stderr_tail(&result.stderr);
            error!(lesson_id = %job.lesson_id, status = %result.status, "{} failed:\n{}", tool, tail);
            return Err(PipelineError::Transcode {
                tool,
                message: format!("exited with status {}", result.status),
            });
        }

        Ok(result)
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

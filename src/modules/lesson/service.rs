use super::dto::UploadResponse;
use super::manifest;
use super::model::{JobDescriptor, JobState, MASTER_PLAYLIST};
use crate::common::error::PipelineError;
use crate::common::upload::{multipart_error, stream_to_disk, StagedUpload};
use crate::state::AppState;
use axum::extract::Multipart;
use tracing::{info, warn};
use uuid::Uuid;

pub const UPLOAD_FIELD: &str = "file";
pub const PUBLISHED_MESSAGE: &str = "Video converted to HLS with multiple qualities";

/// Tracks where one upload is in its lifecycle.
#[derive(Debug)]
pub struct LessonJob {
    lesson_id: Uuid,
    state: JobState,
}

impl LessonJob {
    pub fn new(lesson_id: Uuid) -> Self {
        info!(%lesson_id, state = %JobState::Received, "job received");
        Self {
            lesson_id,
            state: JobState::Received,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn advance(&mut self, next: JobState) {
        if self.state.can_transition_to(next) {
            info!(lesson_id = %self.lesson_id, from = %self.state, to = %next, "job state change");
            self.state = next;
        } else {
            warn!(lesson_id = %self.lesson_id, from = %self.state, to = %next, "illegal job state change ignored");
        }
    }

    pub fn fail(&mut self, err: &PipelineError) {
        if !self.state.is_terminal() {
            warn!(lesson_id = %self.lesson_id, at = %self.state, error = %err, "job failed");
        }
        self.advance(JobState::Failed);
    }
}

pub struct LessonService;

impl LessonService {
    /// Pulls the `file` field off the request and stages it. Other fields are drained.
    pub async fn stage_upload(
        state: &AppState,
        multipart: &mut Multipart,
    ) -> Result<StagedUpload, PipelineError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            if field.name() == Some(UPLOAD_FIELD) {
                return stream_to_disk(&state.storage, UPLOAD_FIELD, field).await;
            }
        }

        Err(PipelineError::UploadMissing)
    }

    /// New lesson id, its output directory, and the configured ladder.
    pub async fn build_descriptor(
        state: &AppState,
        lesson_id: Uuid,
        staged: &StagedUpload,
    ) -> Result<JobDescriptor, PipelineError> {
        let output_dir = state.storage.create_course_dir(lesson_id).await?;

        Ok(JobDescriptor::new(
            lesson_id,
            staged.path.clone(),
            output_dir,
            state.config.renditions.clone(),
        ))
    }

    /// Runs the encoder, then checks its output and writes the master playlist.
    pub async fn transcode(state: &AppState, job: &JobDescriptor) -> Result<(), PipelineError> {
        state.transcoder.run(job).await?;
        manifest::verify_renditions(job).await?;
        manifest::write_master(job).await?;
        manifest::verify_master(job).await
    }

    pub fn video_url(base_url: &str, lesson_id: Uuid) -> String {
        format!(
            "{}/uploads/courses/{}/{}",
            base_url.trim_end_matches('/'),
            lesson_id,
            MASTER_PLAYLIST
        )
    }

    pub fn publish(state: &AppState, job: &JobDescriptor) -> UploadResponse {
        UploadResponse {
            message: PUBLISHED_MESSAGE.to_string(),
            video_url: Self::video_url(&state.config.public_base_url, job.lesson_id),
            lesson_id: job.lesson_id,
        }
    }

    /// Upload -> stage -> descriptor -> transcode -> publish, all within the request.
    pub async fn process_upload(
        state: AppState,
        mut multipart: Multipart,
    ) -> Result<UploadResponse, PipelineError> {
        let lesson_id = Uuid::new_v4();
        let mut job = LessonJob::new(lesson_id);

        // Turn callers away before reading the body if the pool is full.
        let _slot = match state.pool.acquire().await {
            Ok(slot) => slot,
            Err(e) => {
                job.fail(&e);
                return Err(e);
            }
        };

        let result = Self::run_pipeline(&state, &mut job, &mut multipart).await;
        match &result {
            Ok(_) => job.advance(JobState::Published),
            Err(e) => job.fail(e),
        }
        result
    }

    async fn run_pipeline(
        state: &AppState,
        job: &mut LessonJob,
        multipart: &mut Multipart,
    ) -> Result<UploadResponse, PipelineError> {
        let staged = Self::stage_upload(state, multipart).await?;
        info!(
            lesson_id = %job.lesson_id,
            file = ?staged.original_name,
            content_type = ?staged.content_type,
            bytes = staged.size,
            "upload staged"
        );
        job.advance(JobState::Staged);

        let descriptor = Self::build_descriptor(state, job.lesson_id, &staged).await?;
        job.advance(JobState::DescriptorBuilt);

        job.advance(JobState::Transcoding);
        Self::transcode(state, &descriptor).await?;

        Ok(Self::publish(state, &descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_url_embeds_lesson_id() {
        let id = Uuid::new_v4();
        let url = LessonService::video_url("http://localhost:8000/", id);
        assert_eq!(
            url,
            format!("http://localhost:8000/uploads/courses/{id}/index.m3u8")
        );
    }

    #[test]
    fn job_reaches_published_through_every_stage() {
        let mut job = LessonJob::new(Uuid::new_v4());
        for next in [
            JobState::Staged,
            JobState::DescriptorBuilt,
            JobState::Transcoding,
            JobState::Published,
        ] {
            job.advance(next);
            assert_eq!(job.state(), next);
        }
    }

    #[test]
    fn failed_job_stays_failed() {
        let mut job = LessonJob::new(Uuid::new_v4());
        job.advance(JobState::Staged);
        job.fail(&PipelineError::UploadMissing);
        assert_eq!(job.state(), JobState::Failed);

        job.advance(JobState::Published);
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    fn skipping_a_stage_is_refused() {
        let mut job = LessonJob::new(Uuid::new_v4());
        job.advance(JobState::Transcoding);
        assert_eq!(job.state(), JobState::Received);
    }
}

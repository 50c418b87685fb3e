use crate::common::error::PipelineError;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

const COURSES_DIR: &str = "courses";

/// On-disk layout under the upload root:
/// `<root>/<field>-<uuid>.<ext>` for raw uploads and
/// `<root>/courses/<lessonId>/` for transcoded output.
#[derive(Clone, Debug)]
pub struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub async fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(COURSES_DIR)).await?;

        info!("✅ Upload root ready at {}", root.display());

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh, collision-free staging path for an incoming upload.
    pub fn staging_path(&self, field: &str, original_name: Option<&str>) -> PathBuf {
        let mut name = format!("{}-{}", sanitize_field(field), Uuid::new_v4());
        if let Some(ext) = original_name.and_then(extension_of) {
            name.push('.');
            name.push_str(&ext);
        }
        self.root.join(name)
    }

    pub fn course_dir(&self, lesson_id: Uuid) -> PathBuf {
        self.root.join(COURSES_DIR).join(lesson_id.to_string())
    }

    /// Creates (recursively) the output directory for a lesson.
    pub async fn create_course_dir(&self, lesson_id: Uuid) -> Result<PathBuf, PipelineError> {
        let dir = self.course_dir(lesson_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PipelineError::Filesystem {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }
}

fn sanitize_field(field: &str) -> String {
    let cleaned: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn extension_of(original_name: &str) -> Option<String> {
    // Client names may carry either separator.
    let base = original_name.rsplit(['/', '\\']).next()?;
    let ext = Path::new(base).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

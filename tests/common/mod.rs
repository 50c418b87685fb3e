//! Shared harness for the HTTP integration tests.
//!
//! Each harness owns a temp directory holding the upload root and a stand-in
//! `ffmpeg` shell script, so tests never touch a real encoder.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lesson_hls::config::env::EnvKey;
use lesson_hls::config::settings::AppConfig;
use lesson_hls::state::AppState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "lesson-hls-test-boundary";

/// Writes one segment and a media playlist for every HLS output it is handed.
pub const FAKE_FFMPEG: &str = r#"#!/bin/sh
prev=""
seg=""
for arg in "$@"; do
  if [ "$prev" = "-hls_segment_filename" ]; then
    seg=$(printf "$arg" 0)
    : > "$seg"
  fi
  case "$arg" in
    *.m3u8)
      printf '#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.0,\n%s\n#EXT-X-ENDLIST\n' "$(basename "$seg")" > "$arg"
      ;;
  esac
  prev="$arg"
done
exit 0
"#;

pub const FAILING_FFMPEG: &str = "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n";

/// Never finishes on its own.
pub const STALLED_FFMPEG: &str = "#!/bin/sh\nexec sleep 30\n";

/// Exits cleanly but only writes the first rendition.
pub const PARTIAL_FFMPEG: &str = r#"#!/bin/sh
prev=""
for arg in "$@"; do
  if [ "$prev" = "-hls_segment_filename" ]; then
    seg=$(printf "$arg" 0)
    : > "$seg"
    printf '#EXTM3U\n#EXTINF:10.0,\n%s\n' "$(basename "$seg")" > "${arg%_%03d.ts}.m3u8"
    exit 0
  fi
  prev="$arg"
done
exit 0
"#;

pub struct TestHarness {
    pub dir: TempDir,
    pub state: AppState,
    pub app: Router,
}

impl TestHarness {
    pub async fn new(script: &str) -> Self {
        Self::with_env(script, &[]).await
    }

    pub async fn with_env(script: &str, extra: &[(EnvKey, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let ffmpeg = write_script(dir.path(), script);
        let uploads = dir.path().join("uploads");

        let mut vars: HashMap<EnvKey, String> = HashMap::from([
            (EnvKey::UploadDir, uploads.to_string_lossy().to_string()),
            (EnvKey::FfmpegBin, ffmpeg.to_string_lossy().to_string()),
            (EnvKey::PublicBaseUrl, "http://localhost:8000".to_string()),
            (EnvKey::TranscodeTimeoutSecs, "30".to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(*key, value.to_string());
        }

        let config = AppConfig::from_lookup(|key| vars.get(&key).cloned()).expect("config");
        let state = AppState::from_config(config).await.expect("state");
        let app = lesson_hls::app::create_app(state.clone());

        Self { dir, state, app }
    }

    pub fn uploads(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn courses(&self) -> PathBuf {
        self.uploads().join("courses")
    }

    /// Every `index.m3u8` under the courses directory.
    pub fn manifests(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.courses())
            .expect("courses dir")
            .filter_map(Result::ok)
            .map(|e| e.path().join("index.m3u8"))
            .filter(|p| p.exists())
            .collect()
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.expect("router is infallible")
    }

    pub async fn upload(&self, field: &str, filename: &str, content_type: &str) -> Response<Body> {
        self.send(upload_request(field, filename, content_type, b"\x00\x00\x00\x18ftypmp42"))
            .await
    }
}

fn write_script(dir: &Path, script: &str) -> PathBuf {
    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).expect("bin dir");
    let path = bin.join("ffmpeg");
    std::fs::write(&path, script).expect("write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    path
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let body = multipart_body(field, filename, content_type, data);
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(resp).await).expect("json body")
}

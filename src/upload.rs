use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use uuid::Uuid;

use crate::metadata::{MetadataRecorder, VideoRecord};
use crate::s3_client::{ObjectStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("S3 upload failed: {0}")]
    S3(#[from] StorageError),
}

/// What to upload, built from interactive input and consumed once.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    /// Used as the directory part of the object key and as `author_id`.
    pub user_id: String,
    /// Defaults to the file stem when absent or empty.
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Outcome of a successful transfer. The metadata save is reported here
/// rather than as an error: it succeeds or fails independently of the
/// upload itself.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub video_id: Uuid,
    pub object_key: String,
    pub bucket: String,
    pub file_name: String,
    pub file_size: u64,
    pub content_type: String,
    pub upload_seconds: f64,
    pub title: String,
    pub public_url: Option<String>,
    pub metadata_saved: bool,
    pub metadata_error: Option<String>,
}

/// Content type by file extension, case-insensitive. A lookup, not sniffing.
pub fn content_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".webm") {
        "video/webm"
    } else if lower.ends_with(".mov") {
        "video/quicktime"
    } else {
        "video/mp4"
    }
}

/// Object key layout shared with the rest of the project.
pub fn object_key(user_id: &str, video_id: Uuid, file_name: &str) -> String {
    format!("{user_id}/{video_id}-{file_name}")
}

fn derive_title(title: Option<String>, path: &Path) -> String {
    title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| match path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => path.to_string_lossy().into_owned(),
        })
}

/// Uploads one local file and records its metadata.
///
/// Any failure up to and including the transfer aborts the operation with a
/// typed error. A recorder failure does not: the transfer has already
/// happened, so the error text is captured into the result instead.
pub async fn upload_video(
    store: &dyn ObjectStore,
    recorder: Option<&dyn MetadataRecorder>,
    public_domain: Option<&str>,
    request: UploadRequest,
) -> Result<UploadResult, UploadError> {
    let path = request.file_path.as_path();

    let file_size = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(UploadError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(UploadError::Io(e)),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| std::io::Error::other("path has no file name"))?;

    let title = derive_title(request.title, path);
    let video_id = Uuid::new_v4();
    let key = object_key(&request.user_id, video_id, &file_name);
    let content_type = content_type_for(&file_name);

    println!("Starting upload");
    println!("  video id:   {video_id}");
    println!("  file:       {file_name}");
    println!("  size:       {:.2} MB", file_size as f64 / 1_048_576.0);
    println!("  title:      {title}");
    println!("  object key: {key}");

    let body = ByteStream::from_path(path)
        .await
        .map_err(|e| UploadError::Io(std::io::Error::other(e)))?;

    let started = Instant::now();
    store.put_object(&key, body, content_type).await?;
    let upload_seconds = started.elapsed().as_secs_f64();
    println!("Upload done in {upload_seconds:.2}s");

    let public_url = public_domain.map(|domain| format!("https://{domain}/{key}"));

    let (metadata_saved, metadata_error) = match recorder {
        Some(recorder) => {
            let record = VideoRecord {
                id: video_id,
                r2_object_key: key.clone(),
                title: title.clone(),
                description: request.description.clone(),
                author_id: request.user_id.clone(),
            };
            match recorder.insert_video(&record).await {
                Ok(()) => {
                    println!("Metadata saved");
                    (true, None)
                }
                Err(e) => {
                    eprintln!("Metadata save failed: {e}");
                    (false, Some(e.to_string()))
                }
            }
        }
        None => (false, Some("metadata recorder is not configured".to_string())),
    };

    Ok(UploadResult {
        video_id,
        object_key: key,
        bucket: store.bucket().to_string(),
        file_name,
        file_size,
        content_type: content_type.to_string(),
        upload_seconds,
        title,
        public_url,
        metadata_saved,
        metadata_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataError;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    struct RecordedPut {
        key: String,
        content_type: String,
        body: Vec<u8>,
    }

    #[derive(Default)]
    struct FakeStore {
        puts: Mutex<Vec<RecordedPut>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put_object(
            &self,
            key: &str,
            body: ByteStream,
            content_type: &str,
        ) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::Operation("connection reset".to_string()));
            }
            let bytes = body.collect().await.unwrap().into_bytes().to_vec();
            self.puts.lock().unwrap().push(RecordedPut {
                key: key.to_string(),
                content_type: content_type.to_string(),
                body: bytes,
            });
            Ok(())
        }

        fn bucket(&self) -> &str {
            "test-bucket"
        }
    }

    #[derive(Default)]
    struct FakeRecorder {
        records: Mutex<Vec<VideoRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl MetadataRecorder for FakeRecorder {
        async fn insert_video(&self, record: &VideoRecord) -> Result<(), MetadataError> {
            if self.fail {
                return Err(MetadataError::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "row level security".to_string(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn write_temp(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn request(path: PathBuf) -> UploadRequest {
        UploadRequest {
            file_path: path,
            user_id: "u1".to_string(),
            title: None,
            description: None,
        }
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for("a.webm"), "video/webm");
        assert_eq!(content_type_for("a.mov"), "video/quicktime");
        assert_eq!(content_type_for("CLIP.MOV"), "video/quicktime");
        assert_eq!(content_type_for("a.WEBM"), "video/webm");
        assert_eq!(content_type_for("a.mp4"), "video/mp4");
        assert_eq!(content_type_for("a.avi"), "video/mp4");
        assert_eq!(content_type_for("noextension"), "video/mp4");
    }

    #[test]
    fn key_is_user_then_id_then_name() {
        let id = Uuid::new_v4();
        assert_eq!(
            object_key("u1", id, "clip.mp4"),
            format!("u1/{id}-clip.mp4")
        );
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let path = Path::new("/tmp/clip.mov");
        assert_eq!(derive_title(None, path), "clip");
        assert_eq!(derive_title(Some(String::new()), path), "clip");
        assert_eq!(derive_title(Some("My video".to_string()), path), "My video");
    }

    #[tokio::test]
    async fn uploads_mov_with_derived_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.mov", b"not really a video");
        let store = FakeStore::default();

        let result = upload_video(&store, None, None, request(path))
            .await
            .unwrap();

        assert_eq!(result.title, "clip");
        assert_eq!(result.content_type, "video/quicktime");
        assert_eq!(result.file_name, "clip.mov");
        assert_eq!(result.file_size, 18);
        assert_eq!(result.bucket, "test-bucket");
        assert_eq!(
            result.object_key,
            format!("u1/{}-clip.mov", result.video_id)
        );
        assert!(result.public_url.is_none());

        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].key, result.object_key);
        assert_eq!(puts[0].content_type, "video/quicktime");
        assert_eq!(puts[0].body, b"not really a video");
    }

    #[tokio::test]
    async fn video_ids_are_distinct_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.mp4", b"data");
        let store = FakeStore::default();

        let first = upload_video(&store, None, None, request(path.clone()))
            .await
            .unwrap();
        let second = upload_video(&store, None, None, request(path))
            .await
            .unwrap();

        assert_ne!(first.video_id, second.video_id);
    }

    #[tokio::test]
    async fn public_url_uses_configured_domain() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.mp4", b"data");
        let store = FakeStore::default();

        let result = upload_video(&store, None, Some("videos.example.com"), request(path))
            .await
            .unwrap();

        assert_eq!(
            result.public_url.as_deref(),
            Some(format!("https://videos.example.com/{}", result.object_key).as_str())
        );
    }

    #[tokio::test]
    async fn missing_file_is_reported_before_any_transfer() {
        let store = FakeStore::default();

        let err = upload_video(&store, None, None, request(PathBuf::from("/no/such/file.mp4")))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::FileNotFound(_)));
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_operation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.mp4", b"data");
        let store = FakeStore {
            fail: true,
            ..FakeStore::default()
        };
        let recorder = FakeRecorder::default();

        let err = upload_video(&store, Some(&recorder), None, request(path))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::S3(_)));
        // Recorder must not run for a transfer that never happened.
        assert!(recorder.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recorder_receives_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.webm", b"data");
        let store = FakeStore::default();
        let recorder = FakeRecorder::default();

        let mut req = request(path);
        req.title = Some("My clip".to_string());
        req.description = Some("demo".to_string());

        let result = upload_video(&store, Some(&recorder), None, req)
            .await
            .unwrap();

        assert!(result.metadata_saved);
        assert!(result.metadata_error.is_none());

        let records = recorder.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, result.video_id);
        assert_eq!(records[0].r2_object_key, result.object_key);
        assert_eq!(records[0].title, "My clip");
        assert_eq!(records[0].description.as_deref(), Some("demo"));
        assert_eq!(records[0].author_id, "u1");
    }

    #[tokio::test]
    async fn recorder_failure_does_not_fail_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.mp4", b"data");
        let store = FakeStore::default();
        let recorder = FakeRecorder {
            fail: true,
            ..FakeRecorder::default()
        };

        let result = upload_video(&store, Some(&recorder), None, request(path))
            .await
            .unwrap();

        assert!(!result.metadata_saved);
        let message = result.metadata_error.unwrap();
        assert!(message.contains("500"));
        assert!(message.contains("row level security"));
    }

    #[tokio::test]
    async fn absent_recorder_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "clip.mp4", b"data");
        let store = FakeStore::default();

        let result = upload_video(&store, None, None, request(path))
            .await
            .unwrap();

        assert!(!result.metadata_saved);
        assert_eq!(
            result.metadata_error.as_deref(),
            Some("metadata recorder is not configured")
        );
    }
}

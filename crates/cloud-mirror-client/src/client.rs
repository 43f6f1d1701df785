use std::time::Duration;

use async_trait::async_trait;
use file_lifecycle::{CloudMirror, MirrorError, MirrorUpload};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use crate::error::{CloudMirrorError, Result};

const DEFAULT_USER_AGENT: &str = "cloud-mirror-client-rs/0.1";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Object store client that streams files from disk
pub struct HttpMirrorClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMirrorClient {
    /// Create a client rooted at `base_url`; object keys are appended to it
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(CloudMirrorError::InvalidUrl(base_url.to_string()));
        }
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the object stored under `key`
    pub fn object_url(&self, key: &str) -> Result<Url> {
        Ok(self.base_url.join(&urlencoding::encode(key))?)
    }

    /// Stream the file at `upload.path` to the store; returns its location
    pub async fn put_object(&self, upload: &MirrorUpload) -> Result<String> {
        let url = self.object_url(&upload.key)?;
        let file = tokio::fs::File::open(&upload.path).await?;

        let mut request = self
            .client
            .put(url.clone())
            .header(CONTENT_LENGTH, upload.size_bytes)
            .body(reqwest::Body::from(file));
        if let Some(media_type) = &upload.media_type {
            request = request.header(CONTENT_TYPE, media_type);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CloudMirrorError::Status {
                status: response.status().as_u16(),
                key: upload.key.clone(),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string());

        info!(key = %upload.key, size = upload.size_bytes, location = %location, "Uploaded object");
        Ok(location)
    }

    /// Remove the object under `key`; a missing object counts as removed
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let response = self.client.delete(url).send().await?;

        match response.status() {
            status if status.is_success() => {
                debug!(key = %key, "Deleted object");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                debug!(key = %key, "Object already absent");
                Ok(())
            }
            status => Err(CloudMirrorError::Status {
                status: status.as_u16(),
                key: key.to_string(),
            }),
        }
    }
}

#[async_trait]
impl CloudMirror for HttpMirrorClient {
    async fn put(&self, upload: &MirrorUpload) -> std::result::Result<String, MirrorError> {
        self.put_object(upload)
            .await
            .map_err(|e| MirrorError::Upload(e.to_string()))
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), MirrorError> {
        self.delete_object(key)
            .await
            .map_err(|e| MirrorError::Delete(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::put;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    type Objects = Arc<Mutex<HashMap<String, (Vec<u8>, Option<String>)>>>;

    async fn put_object(
        State(objects): State<Objects>,
        Path(key): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> AxumStatus {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        objects
            .lock()
            .unwrap()
            .insert(key, (body.to_vec(), content_type));
        AxumStatus::CREATED
    }

    async fn delete_object(State(objects): State<Objects>, Path(key): Path<String>) -> AxumStatus {
        match objects.lock().unwrap().remove(&key) {
            Some(_) => AxumStatus::NO_CONTENT,
            None => AxumStatus::NOT_FOUND,
        }
    }

    async fn reject() -> AxumStatus {
        AxumStatus::SERVICE_UNAVAILABLE
    }

    /// Start a throwaway object store; returns its base URL
    async fn spawn_store() -> (String, Objects) {
        let objects = Objects::default();
        let app = Router::new()
            .route("/objects/{key}", put(put_object).delete(delete_object))
            .route("/broken/{key}", put(reject).delete(reject))
            .with_state(objects.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), objects)
    }

    fn upload_for(path: &std::path::Path, key: &str, size: u64) -> MirrorUpload {
        MirrorUpload {
            key: key.to_string(),
            path: path.to_path_buf(),
            size_bytes: size,
            media_type: Some("text/plain".to_string()),
        }
    }

    #[test]
    fn test_object_url_joins_key() {
        let client = HttpMirrorClient::new("https://storage.example.com/bucket").unwrap();
        assert_eq!(client.base_url().as_str(), "https://storage.example.com/bucket/");
        assert_eq!(
            client.object_url("abc.txt").unwrap().as_str(),
            "https://storage.example.com/bucket/abc.txt"
        );
        assert_eq!(
            client.object_url("a b").unwrap().as_str(),
            "https://storage.example.com/bucket/a%20b"
        );
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(matches!(
            HttpMirrorClient::new("not a url"),
            Err(CloudMirrorError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpMirrorClient::new("mailto:someone@example.com"),
            Err(CloudMirrorError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_put_streams_file() {
        let (base, objects) = spawn_store().await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"hello world!").unwrap();

        let client = HttpMirrorClient::new(&format!("{}/objects", base)).unwrap();
        let location = client
            .put(&upload_for(&path, "abc.txt", 12))
            .await
            .unwrap();

        assert_eq!(location, format!("{}/objects/abc.txt", base));
        let stored = objects.lock().unwrap().get("abc.txt").cloned().unwrap();
        assert_eq!(stored.0, b"hello world!");
        assert_eq!(stored.1.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_tolerates_missing() {
        let (base, objects) = spawn_store().await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let client = HttpMirrorClient::new(&format!("{}/objects", base)).unwrap();
        client.put(&upload_for(&path, "abc.txt", 3)).await.unwrap();

        client.delete("abc.txt").await.unwrap();
        assert!(objects.lock().unwrap().is_empty());
        client.delete("abc.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_maps_to_mirror_error() {
        let (base, _objects) = spawn_store().await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let client = HttpMirrorClient::new(&format!("{}/broken", base)).unwrap();

        let err = client.put(&upload_for(&path, "abc.txt", 3)).await.unwrap_err();
        assert_eq!(
            err,
            MirrorError::Upload("Object store returned status 503 for abc.txt".to_string())
        );
        let err = client.delete("abc.txt").await.unwrap_err();
        assert!(matches!(err, MirrorError::Delete(_)));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let client = HttpMirrorClient::new("http://127.0.0.1:9/objects").unwrap();
        let dir = tempdir().unwrap();
        let err = client
            .put_object(&upload_for(&dir.path().join("gone.txt"), "gone.txt", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudMirrorError::Io(_)));
    }
}

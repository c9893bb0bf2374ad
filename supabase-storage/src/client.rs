use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Credentials, CredentialsProvider, StorageURL};

/// Client for the Supabase Storage REST API, scoped to a single bucket.
///
/// If the credentials provider could not supply both the endpoint and the
/// access key, the client is still constructed but every call fails with
/// [`StorageError::ConfigMissing`].
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    bucket: String,
    credentials: Option<Credentials>,
}

impl StorageClient {
    pub fn new(provider: &dyn CredentialsProvider, bucket: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), provider, bucket)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        provider: &dyn CredentialsProvider,
        bucket: impl Into<String>,
    ) -> Self {
        let credentials = provider.credentials();
        if credentials.is_none() {
            tracing::error!("storage endpoint or access key missing, all storage calls will fail");
        }

        Self {
            http,
            bucket: bucket.into(),
            credentials,
        }
    }

    fn credentials(&self) -> Result<&Credentials, StorageError> {
        self.credentials.as_ref().ok_or(StorageError::ConfigMissing)
    }

    fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
        credentials: &Credentials,
    ) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&credentials.access_key)
            .header("apikey", &credentials.access_key)
    }

    /// Uploads `bytes` to `path` inside the bucket. With `upsert` set, an
    /// existing object at the same path is replaced.
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        let credentials = self.credentials()?;
        let url = StorageURL::new(&credentials.endpoint).object(&self.bucket, path);
        let size = bytes.len();

        let request = self
            .http
            .post(url.as_ref())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);

        let resp = self
            .authorized(request, credentials)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        check_status(resp).await?;

        tracing::debug!(bucket = %self.bucket, path, size, "uploaded object");
        Ok(())
    }

    /// Issues a signed read URL for `path`, valid for `expires_in`.
    ///
    /// The returned string is the full URL,
    /// `{endpoint}/storage/v1/{signedPath}`.
    pub async fn create_signed_url(
        &self,
        path: &str,
        expires_in: time::Duration,
    ) -> Result<String, StorageError> {
        let credentials = self.credentials()?;
        let url = StorageURL::new(&credentials.endpoint).sign(&self.bucket, path);

        let request = self.http.post(url.as_ref()).json(&SignRequest {
            expires_in: expires_in.whole_seconds().max(1),
        });

        let resp = self
            .authorized(request, credentials)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        let resp = check_status(resp).await?;

        let signed = resp.json::<SignResponse>().await.map_err(|e| {
            StorageError::Parsing(format!("Failed to parse sign response as JSON: {}", e))
        })?;

        let full_url = StorageURL::new(&credentials.endpoint)
            .append_path(&signed.signed_url)
            .into_string();

        tracing::debug!(bucket = %self.bucket, path, "created signed url");
        Ok(full_url)
    }

    /// Removes the object at `path`. A missing object is not an error.
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let credentials = self.credentials()?;
        let url = StorageURL::new(&credentials.endpoint)
            .append_path("object")
            .append_path(&self.bucket);

        let request = self.http.delete(url.as_ref()).json(&DeleteRequest {
            prefixes: vec![path.to_string()],
        });

        let resp = self
            .authorized(request, credentials)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        match check_status(resp).await {
            Ok(_) | Err(StorageError::NotFound) => {
                tracing::debug!(bucket = %self.bucket, path, "deleted object");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether `url` is a signed URL for the object at `path` in this bucket,
    /// i.e. `{endpoint}/storage/v1/object/sign/{bucket}/{path}?...`.
    pub fn is_signed_url_for(&self, path: &str, url: &str) -> bool {
        let Ok(credentials) = self.credentials() else {
            return false;
        };
        let object = StorageURL::new(&credentials.endpoint).sign(&self.bucket, path);

        match (normalize(object.as_ref()), normalize(url)) {
            (Some(object), Some(url)) => url
                .strip_prefix(&object)
                .is_some_and(|rest| rest.starts_with('?')),
            _ => false,
        }
    }

    /// Fetches the bytes behind a signed URL issued for this bucket. Any other
    /// URL is refused without being requested.
    pub async fn download(&self, signed_url: &str) -> Result<Vec<u8>, StorageError> {
        let credentials = self.credentials()?;

        let prefix = StorageURL::new(&credentials.endpoint)
            .append_path("object/sign")
            .append_path(&self.bucket)
            .into_string()
            + "/";
        let url = normalize(signed_url)
            .filter(|url| normalize(&prefix).is_some_and(|prefix| url.starts_with(&prefix)))
            .ok_or_else(|| StorageError::ForeignUrl(signed_url.to_string()))?;

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        let resp = check_status(resp).await?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

/// Parses `url`, resolving dot segments and case, so prefixes compare on
/// what would actually be requested.
fn normalize(url: &str) -> Option<String> {
    reqwest::Url::parse(url).ok().map(String::from)
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(StorageError::from_response(status.as_u16(), &body))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage endpoint or access key not configured")]
    ConfigMissing,
    #[error("TransportError: {0}")]
    Transport(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("object not found")]
    NotFound,
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("ParsingError: {0}")]
    Parsing(String),
    #[error("not a signed url for this bucket: {0}")]
    ForeignUrl(String),
}

impl StorageError {
    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. })
    }

    fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();

        // The storage API reports some 404s as HTTP 400 with the real code in the body.
        let effective_status = parsed
            .as_ref()
            .and_then(|b| b.status_code.as_deref())
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(status);

        let message = parsed
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| body.to_string());

        match effective_status {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            s if s >= 500 => Self::Server {
                status: s,
                message,
            },
            s => Self::Rejected {
                status: s,
                message,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest {
    prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, Method, StatusCode, Uri},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use serde_json::json;

    use super::*;
    use crate::StaticCredentials;

    const KEY: &str = "test-key";

    #[derive(Clone, Default)]
    struct FakeStorage {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    async fn handle(
        State(state): State<FakeStorage>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let Some(rest) = uri.path().strip_prefix("/storage/v1/object/") else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let rest = rest.to_string();

        // Signed downloads carry their own token and need no key.
        if method == Method::GET {
            let Some(object) = rest.strip_prefix("sign/") else {
                return StatusCode::NOT_FOUND.into_response();
            };
            if uri.query() != Some("token=tok") {
                return StatusCode::BAD_REQUEST.into_response();
            }
            return match state.objects.lock().unwrap().get(object) {
                Some(bytes) => bytes.clone().into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            };
        }

        let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
        let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
        if bearer != Some("Bearer test-key") || apikey != Some(KEY) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid key"})))
                .into_response();
        }

        if rest.contains("boom") {
            return (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response();
        }

        match method {
            Method::POST if rest.starts_with("sign/") => {
                let object = rest.trim_start_matches("sign/").to_string();
                if !state.objects.lock().unwrap().contains_key(&object) {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"statusCode": "404", "error": "not_found", "message": "Object not found"})),
                    )
                        .into_response();
                }
                Json(json!({"signedURL": format!("/object/sign/{object}?token=tok")}))
                    .into_response()
            }
            Method::POST => {
                let upsert = headers.get("x-upsert").and_then(|v| v.to_str().ok()) == Some("true");
                let mut objects = state.objects.lock().unwrap();
                if objects.contains_key(&rest) && !upsert {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"statusCode": "409", "error": "Duplicate", "message": "The resource already exists"})),
                    )
                        .into_response();
                }
                objects.insert(rest.clone(), body.to_vec());
                Json(json!({"Key": rest})).into_response()
            }
            Method::DELETE => {
                let request: serde_json::Value = serde_json::from_slice(&body).unwrap();
                let mut objects = state.objects.lock().unwrap();
                let mut removed = Vec::new();
                for prefix in request["prefixes"].as_array().unwrap() {
                    let key = format!("{}/{}", rest, prefix.as_str().unwrap());
                    if objects.remove(&key).is_some() {
                        removed.push(json!({"name": prefix}));
                    }
                }
                Json(json!(removed)).into_response()
            }
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        }
    }

    async fn spawn_fake() -> (String, FakeStorage) {
        let state = FakeStorage::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), state)
    }

    fn client(endpoint: &str, key: &str) -> StorageClient {
        StorageClient::new(&StaticCredentials::new(endpoint, key), "palate")
    }

    #[tokio::test]
    async fn upload_sign_and_download() {
        let (endpoint, state) = spawn_fake().await;
        let client = client(&endpoint, KEY);
        let bytes = vec![7u8; 2048];

        client
            .upload("pfp/u1.jpg", bytes.clone(), "image/jpeg", true)
            .await
            .unwrap();
        assert_eq!(
            state.objects.lock().unwrap().get("palate/pfp/u1.jpg"),
            Some(&bytes)
        );

        let url = client
            .create_signed_url("pfp/u1.jpg", time::Duration::days(365))
            .await
            .unwrap();
        assert_eq!(
            url,
            format!("{endpoint}/storage/v1/object/sign/palate/pfp/u1.jpg?token=tok")
        );

        assert_eq!(client.download(&url).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_object() {
        let (endpoint, state) = spawn_fake().await;
        let client = client(&endpoint, KEY);

        client
            .upload("pfp/u1.jpg", vec![1, 2, 3], "image/jpeg", true)
            .await
            .unwrap();
        client
            .upload("pfp/u1.jpg", vec![4, 5, 6], "image/jpeg", true)
            .await
            .unwrap();

        assert_eq!(
            state.objects.lock().unwrap().get("palate/pfp/u1.jpg"),
            Some(&vec![4, 5, 6])
        );
    }

    #[tokio::test]
    async fn upload_without_upsert_is_rejected_when_present() {
        let (endpoint, _) = spawn_fake().await;
        let client = client(&endpoint, KEY);

        client
            .upload("pfp/u1.jpg", vec![1], "image/jpeg", false)
            .await
            .unwrap();
        let err = client
            .upload("pfp/u1.jpg", vec![2], "image/jpeg", false)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Rejected { status: 409, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn missing_credentials_fail_every_call() {
        let client = StorageClient::new(&StaticCredentials::missing(), "palate");

        assert_eq!(
            client
                .upload("pfp/u1.jpg", vec![1], "image/jpeg", true)
                .await
                .unwrap_err(),
            StorageError::ConfigMissing
        );
        assert_eq!(
            client
                .create_signed_url("pfp/u1.jpg", time::Duration::days(1))
                .await
                .unwrap_err(),
            StorageError::ConfigMissing
        );
        assert_eq!(
            client.delete("pfp/u1.jpg").await.unwrap_err(),
            StorageError::ConfigMissing
        );
        assert!(!client.is_signed_url_for(
            "pfp/u1.jpg",
            "https://x.supabase.co/storage/v1/object/sign/palate/pfp/u1.jpg?token=t"
        ));
    }

    #[test]
    fn signed_url_must_match_endpoint_bucket_and_key() {
        let client = client("https://project.supabase.co", KEY);
        let own = "https://project.supabase.co/storage/v1/object/sign/palate/pfp/U1.jpg?token=t";

        assert!(client.is_signed_url_for("pfp/U1.jpg", own));
        for url in [
            "http://169.254.169.254/latest/meta-data?x=pfp/U1.jpg",
            "https://evil.example/storage/v1/object/sign/palate/pfp/U1.jpg?token=t",
            "https://project.supabase.co/storage/v1/object/sign/other/pfp/U1.jpg?token=t",
            "https://project.supabase.co/storage/v1/object/sign/palate/pfp/U2.jpg?k=pfp/U1.jpg",
            "https://project.supabase.co/storage/v1/object/sign/palate/pfp/U1.jpg.bak?token=t",
            "https://project.supabase.co/storage/v1/object/sign/palate/pfp/U1.jpg",
            "https://project.supabase.co.evil.example/storage/v1/object/sign/palate/pfp/U1.jpg?t=1",
            "not a url",
        ] {
            assert!(!client.is_signed_url_for("pfp/U1.jpg", url), "{url}");
        }
    }

    #[tokio::test]
    async fn download_refuses_urls_outside_the_bucket() {
        let (endpoint, _) = spawn_fake().await;
        let (elsewhere, secrets) = spawn_fake().await;
        secrets
            .objects
            .lock()
            .unwrap()
            .insert("palate/pfp/U1.jpg".to_string(), b"internal-secret".to_vec());
        let client = client(&endpoint, KEY);

        for url in [
            format!("{elsewhere}/storage/v1/object/sign/palate/pfp/U1.jpg?token=tok"),
            format!("{endpoint}/storage/v1/object/sign/other/pfp/U1.jpg?token=tok"),
            format!("{endpoint}/storage/v1/object/sign/palate/../../secret?pfp/U1.jpg"),
        ] {
            assert!(
                matches!(
                    client.download(&url).await,
                    Err(StorageError::ForeignUrl(_))
                ),
                "{url}"
            );
        }
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized() {
        let (endpoint, _) = spawn_fake().await;
        let client = client(&endpoint, "nope");

        let err = client
            .upload("pfp/u1.jpg", vec![1], "image/jpeg", true)
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::Unauthorized);
    }

    #[tokio::test]
    async fn signing_missing_object_is_not_found() {
        let (endpoint, _) = spawn_fake().await;
        let client = client(&endpoint, KEY);

        let err = client
            .create_signed_url("pfp/ghost.jpg", time::Duration::days(1))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::NotFound);
    }

    #[tokio::test]
    async fn deleting_missing_object_succeeds() {
        let (endpoint, state) = spawn_fake().await;
        let client = client(&endpoint, KEY);

        client
            .upload("pfp/u1.jpg", vec![1], "image/jpeg", true)
            .await
            .unwrap();
        client.delete("pfp/u1.jpg").await.unwrap();
        assert!(state.objects.lock().unwrap().is_empty());

        client.delete("pfp/u1.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let (endpoint, _) = spawn_fake().await;
        let client = client(&endpoint, KEY);

        let err = client
            .upload("pfp/boom.jpg", vec![1], "image/jpeg", true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Server { status: 500, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let client = client("http://127.0.0.1:1", KEY);

        let err = client
            .upload("pfp/u1.jpg", vec![1], "image/jpeg", true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn error_body_status_code_wins_over_http_status() {
        let err = StorageError::from_response(
            400,
            r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#,
        );
        assert_eq!(err, StorageError::NotFound);

        let err = StorageError::from_response(502, "bad gateway");
        assert_eq!(
            err,
            StorageError::Server {
                status: 502,
                message: "bad gateway".to_string()
            }
        );
    }
}

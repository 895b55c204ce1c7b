//! The remote chat endpoint.
//!
//! [`ChatEndpoint`] is the seam between the widget and the network.
//! [`HttpEndpoint`] is the reqwest implementation used in production; tests
//! substitute scripted endpoints.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::types::{ChatRequest, ChatResponse, PHOTO_FIELD, PhotoUpload, UploadResponse};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";

/// Path of the chat turn route, relative to the base URL.
pub const DEFAULT_CHAT_PATH: &str = "chat";

/// Path of the photo upload route, relative to the base URL.
pub const DEFAULT_UPLOAD_PATH: &str = "upload-photo";

/// Header that carries the session identifier on every request.
pub const SESSION_HEADER: &str = "X-Session-ID";

/// Transport timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The two calls the widget makes.
#[async_trait::async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Post one chat turn.  Any non-success status is an error.
    async fn send_turn(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Upload a photo for `session_id`.  Any non-success status is an error.
    async fn upload_photo(&self, session_id: &str, photo: &PhotoUpload) -> Result<UploadResponse>;
}

/// [`ChatEndpoint`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: ReqwestClient,
    chat_url: Url,
    upload_url: Url,
    timeout: Duration,
}

impl HttpEndpoint {
    /// Create an endpoint rooted at `base_url` with the default routes and timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None, None, None)
    }

    /// Create an endpoint with custom routes and timeout.
    pub fn with_options(
        base_url: &str,
        chat_path: Option<&str>,
        upload_path: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base = base_url_with_slash(base_url)?;
        let chat_url = base.join(chat_path.unwrap_or(DEFAULT_CHAT_PATH).trim_start_matches('/'))?;
        let upload_url =
            base.join(upload_path.unwrap_or(DEFAULT_UPLOAD_PATH).trim_start_matches('/'))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            chat_url,
            upload_url,
            timeout,
        })
    }

    /// Where chat turns are posted.
    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Where photos are posted.
    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    fn session_headers(session_id: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let value = HeaderValue::from_str(session_id).map_err(|_| {
            Error::validation(
                "session identifier is not a valid header value",
                Some("session_id".to_string()),
            )
        })?;
        headers.insert(SESSION_HEADER, value);
        Ok(headers)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Convert a non-success response into an [`Error::Api`].
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.error)
            .unwrap_or(body);
        Error::api(status_code, message)
    }
}

#[async_trait::async_trait]
impl ChatEndpoint for HttpEndpoint {
    async fn send_turn(&self, request: &ChatRequest) -> Result<ChatResponse> {
        tracing::debug!(
            url = %self.chat_url,
            session_id = %request.session_id,
            "posting chat turn"
        );
        let response = self
            .client
            .post(self.chat_url.clone())
            .headers(Self::session_headers(&request.session_id)?)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse chat response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn upload_photo(&self, session_id: &str, photo: &PhotoUpload) -> Result<UploadResponse> {
        tracing::debug!(
            url = %self.upload_url,
            file_name = %photo.file_name,
            bytes = photo.len(),
            "uploading photo"
        );
        let mut part = Part::bytes(photo.data.to_vec()).file_name(photo.file_name.clone());
        if let Some(content_type) = photo.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| {
                Error::http_client(
                    format!("Invalid content type {content_type}: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        }
        let form = Form::new().part(PHOTO_FIELD, part);

        let response = self
            .client
            .post(self.upload_url.clone())
            .headers(Self::session_headers(session_id)?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<UploadResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse upload response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

/// Parse `base_url`, making sure relative joins append to its path.
fn base_url_with_slash(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(
            format!("{base_url} cannot be used as a base URL"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

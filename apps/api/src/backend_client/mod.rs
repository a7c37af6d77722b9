//! Backend client: the single point of entry for calls to the CV backend,
//! which owns the library and runs the rules engine.
//!
//! Other modules depend on the `LibrarySource` and `RulesEngine` traits, never
//! on this client directly, so sessions can be driven by fakes in tests.
//!
//! Calls are not retried and carry no client-side timeout. A failure surfaces
//! once, as a channel-scoped error on the session that issued it.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::library::{Library, Profile};
use crate::models::preview::CvPreview;
use crate::models::variant::CvVariant;
use crate::preview::theme::CvTheme;
use crate::reconcile::ManualOverride;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Input of both rules-engine calls. The structured preview ignores `theme`
/// and `manual_overrides`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub job_tags: Vec<String>,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<CvTheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_overrides: Option<ManualOverride>,
}

impl PreviewRequest {
    pub fn new(job_tags: Vec<String>, template: impl Into<String>) -> Self {
        Self {
            job_tags,
            template: template.into(),
            theme: None,
            manual_overrides: None,
        }
    }
}

/// Read access to the user's library.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn load_library(&self) -> Result<Library, BackendError>;
}

/// The remote rules engine: turns job tags and a template into an
/// auto-selected preview, or a rendered document.
#[async_trait]
pub trait RulesEngine: Send + Sync {
    async fn preview(&self, request: &PreviewRequest) -> Result<CvPreview, BackendError>;

    async fn render(&self, request: &PreviewRequest) -> Result<Bytes, BackendError>;

    /// Renders a stored variant. The variant's own tags and template are
    /// resolved by the engine.
    async fn export_variant(
        &self,
        variant: &CvVariant,
        theme: Option<&CvTheme>,
        manual_overrides: Option<&ManualOverride>,
    ) -> Result<Bytes, BackendError>;
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    error: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<&'a CvTheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manual_overrides: Option<&'a ManualOverride>,
    job_tags: &'a [String],
    template: &'a str,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        let text = response.text().await?;
        debug!("GET {path} returned {} bytes", text.len());
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_bytes<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Bytes, BackendError> {
        let response = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        let bytes = response.bytes().await?;
        debug!("POST {path} returned a {} byte document", bytes.len());
        Ok(bytes)
    }
}

#[async_trait]
impl LibrarySource for BackendClient {
    async fn load_library(&self) -> Result<Library, BackendError> {
        let (profile, skills, projects, experience, education, languages) = tokio::try_join!(
            self.get_json::<Profile>("/profile"),
            self.get_json("/skills"),
            self.get_json("/projects"),
            self.get_json("/experience"),
            self.get_json("/education"),
            self.get_json("/languages"),
        )?;

        Ok(Library {
            profile,
            skills,
            projects,
            experience,
            education,
            languages,
        })
    }
}

#[async_trait]
impl RulesEngine for BackendClient {
    async fn preview(&self, request: &PreviewRequest) -> Result<CvPreview, BackendError> {
        self.post_json(
            "/cv/preview",
            &PreviewRequest::new(request.job_tags.clone(), request.template.clone()),
        )
        .await
    }

    async fn render(&self, request: &PreviewRequest) -> Result<Bytes, BackendError> {
        self.post_bytes("/cv/preview/pdf", request).await
    }

    async fn export_variant(
        &self,
        variant: &CvVariant,
        theme: Option<&CvTheme>,
        manual_overrides: Option<&ManualOverride>,
    ) -> Result<Bytes, BackendError> {
        let body = ExportBody {
            theme,
            manual_overrides,
            job_tags: &variant.job_tags,
            template: &variant.template,
        };
        self.post_bytes("/cv/preview/pdf", &body).await
    }
}

/// Extracts the `error` field of a JSON error body, falling back to the raw
/// body and then to the status reason.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<BackendErrorBody>(body) {
        return match parsed.error {
            serde_json::Value::String(message) => message,
            other => other.to_string(),
        };
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    reason.unwrap_or("Request failed").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_json_body() {
        assert_eq!(
            error_message(r#"{"error": "Invalid template"}"#, Some("Bad Request")),
            "Invalid template"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_text_then_reason() {
        assert_eq!(error_message("upstream down", Some("Bad Gateway")), "upstream down");
        assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("", None), "Request failed");
    }

    #[test]
    fn test_preview_request_omits_absent_optionals() {
        let request = PreviewRequest::new(vec!["rust".to_string()], "ats");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["jobTags"][0], "rust");
        assert_eq!(json["template"], "ats");
        assert!(json.get("theme").is_none());
        assert!(json.get("manualOverrides").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = BackendClient::new("http://backend/api/".to_string(), "t".to_string());
        assert_eq!(client.url("/skills"), "http://backend/api/skills");
    }
}

//! Client for the advanced per-lesson content service

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AdvancedConfig;
use crate::error::AdvancedContentError;
use crate::pipeline::{ContentType, GenerationRequest};

/// Body sent to the advanced content service
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdvancedContentRequest<'a> {
    transcription: &'a str,
    title: &'a str,
    content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_of_lessons: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    difficulty_level: Option<&'a str>,
    include_examples: bool,
    include_test_cases: bool,
    include_hints: bool,
}

pub struct AdvancedContentClient {
    url: Option<String>,
    client: reqwest::Client,
}

impl AdvancedContentClient {
    pub fn new(config: &AdvancedConfig) -> Result<Self, AdvancedContentError> {
        let url = config.base_url.as_deref().map(|base| {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                config.path.trim_start_matches('/')
            )
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { url, client })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Ask the service for richer content; the response body is passed through as-is
    pub async fn generate(
        &self,
        transcript: &str,
        title: &str,
        request: &GenerationRequest,
    ) -> Result<Value, AdvancedContentError> {
        let url = self.url.as_deref().ok_or(AdvancedContentError::NotConfigured)?;

        let body = AdvancedContentRequest {
            transcription: transcript,
            title,
            content_type: request.content_type,
            number_of_lessons: request.number_of_lessons,
            selected_language: request.selected_language.as_deref(),
            difficulty_level: request.difficulty_level.as_deref(),
            include_examples: request.include_examples,
            include_test_cases: request.include_test_cases,
            include_hints: request.include_hints,
        };

        debug!("Requesting advanced content from {}", url);

        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvancedContentError::Status { status, body });
        }

        let content: Value = response.json().await?;
        info!("✨ Advanced content received for '{}'", title);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: Option<String>) -> AdvancedContentClient {
        AdvancedContentClient::new(&AdvancedConfig {
            base_url,
            timeout_seconds: 5,
            ..AdvancedConfig::default()
        })
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            url: "https://video.example/watch?v=1".to_string(),
            generate_advanced_content: true,
            content_type: ContentType::Quiz,
            number_of_lessons: Some(4),
            selected_language: Some("es".to_string()),
            difficulty_level: Some("beginner".to_string()),
            include_examples: true,
            include_test_cases: false,
            include_hints: true,
        }
    }

    #[tokio::test]
    async fn test_request_fields_are_forwarded() {
        let router = Router::new().route(
            "/api/generate-advanced-content",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["transcription"], "texto");
                assert_eq!(body["contentType"], "quiz");
                assert_eq!(body["numberOfLessons"], 4);
                assert_eq!(body["selectedLanguage"], "es");
                assert_eq!(body["includeHints"], true);
                Json(json!({"lessons": [{"title": "Intro"}]}))
            }),
        );
        let base = serve(router).await;

        let content = client_for(Some(format!("{}/", base)))
            .generate("texto", "Video", &request())
            .await
            .unwrap();

        assert_eq!(content["lessons"][0]["title"], "Intro");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/api/generate-advanced-content",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = serve(router).await;

        let err = client_for(Some(base))
            .generate("texto", "Video", &request())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvancedContentError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_not_configured() {
        let client = client_for(None);
        assert!(!client.is_configured());
        assert!(matches!(
            client.generate("texto", "Video", &request()).await,
            Err(AdvancedContentError::NotConfigured)
        ));
    }
}

//! Résumé analysis: match scoring against a job description, plus the
//! Pro-tier single-section rewrite.

use serde::{Deserialize, Serialize};

use crate::gateway::{ApiError, ApiGateway};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    /// Either a URL for the backend to scrape, or the pasted text.
    pub job_url: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResult {
    pub match_score: f32,
    pub suggestions: Vec<String>,
    /// Section name → AI-rewritten text. Shape is backend-defined.
    pub rewritten_sections: serde_json::Value,
    pub keywords_missing: Vec<String>,
    pub keywords_present: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewrittenSection {
    pub rewritten_section: String,
}

pub async fn analyze(
    gateway: &ApiGateway,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, ApiError> {
    gateway.post_json("/api/analyze", request).await
}

/// Rewrites one résumé section. The backend binds these as query
/// parameters, not a JSON body.
pub async fn rewrite_section(
    gateway: &ApiGateway,
    section: &str,
    resume_text: &str,
    job_description: &str,
) -> Result<RewrittenSection, ApiError> {
    gateway
        .post_query(
            "/api/rewrite-section",
            &[
                ("section", section),
                ("resume_text", resume_text),
                ("job_description", job_description),
            ],
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionStore;
    use crate::config::Config;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn demo_gateway(server: &MockServer) -> ApiGateway {
        let store = Arc::new(SessionStore::initialize(&Config {
            api_base_url: server.uri(),
            identity: None,
            token_retries: 0,
            rust_log: "info".to_string(),
        }));
        ApiGateway::new(&server.uri(), store)
    }

    #[tokio::test]
    async fn analyze_round_trips_the_result_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .and(body_string_contains("resume_text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "match_score": 72.5,
                "suggestions": ["Quantify your impact"],
                "rewritten_sections": {"summary": "Seasoned engineer..."},
                "keywords_missing": ["kubernetes"],
                "keywords_present": ["rust", "postgres"],
            })))
            .mount(&server)
            .await;

        let gateway = demo_gateway(&server);
        let result = analyze(
            &gateway,
            &AnalysisRequest {
                resume_text: "…".to_string(),
                job_url: None,
                job_description: Some("…".to_string()),
            },
        )
        .await
        .unwrap();

        assert!((result.match_score - 72.5).abs() < f32::EPSILON);
        assert_eq!(result.keywords_present.len(), 2);
        assert_eq!(result.suggestions, vec!["Quantify your impact"]);
    }

    #[tokio::test]
    async fn rewrite_section_sends_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/rewrite-section"))
            .and(wiremock::matchers::query_param("section", "summary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rewritten_section": "Rewritten."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = demo_gateway(&server);
        let rewritten = rewrite_section(&gateway, "summary", "resume", "jd")
            .await
            .unwrap();
        assert_eq!(rewritten.rewritten_section, "Rewritten.");
    }
}

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::gateway::{ApiError, ApiGateway};

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedResume {
    pub resume_text: String,
}

/// Uploads a résumé file (PDF, DOCX, TXT) and gets back the extracted
/// text. Parsing happens server-side; the client ships raw bytes.
pub async fn upload_resume(
    gateway: &ApiGateway,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<UploadedResume, ApiError> {
    let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
    gateway.post_multipart("/api/upload-resume", form).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionStore;
    use crate::config::Config;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn upload_posts_multipart_and_returns_extracted_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload-resume"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resume_text": "Jane Doe\nSenior Engineer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(SessionStore::initialize(&Config {
            api_base_url: server.uri(),
            identity: None,
            token_retries: 0,
            rust_log: "info".to_string(),
        }));
        let gateway = ApiGateway::new(&server.uri(), store);

        let uploaded = upload_resume(&gateway, "resume.pdf", b"%PDF-1.4".to_vec())
            .await
            .unwrap();
        assert!(uploaded.resume_text.starts_with("Jane Doe"));
    }
}

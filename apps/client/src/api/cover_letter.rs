use serde::{Deserialize, Serialize};

use crate::gateway::{ApiError, ApiGateway};

#[derive(Debug, Clone, Serialize)]
pub struct CoverLetterRequest {
    pub resume_text: String,
    pub job_description: String,
    pub recipient_name: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetter {
    pub cover_letter: String,
}

/// Generates a tailored cover letter. Pro-tier on the backend; free users
/// get a 403 passed through like any other server error.
pub async fn generate(
    gateway: &ApiGateway,
    request: &CoverLetterRequest,
) -> Result<CoverLetter, ApiError> {
    gateway.post_json("/api/generate-cover-letter", request).await
}

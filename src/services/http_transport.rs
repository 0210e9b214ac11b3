// ============================================================================
// FETCH TRANSPORT - HttpTransport sobre gloo-net (navegador)
// ============================================================================

use gloo_net::http::Request;
use web_sys::RequestCredentials;

use crate::services::api_client::{ApiError, HttpReply, HttpTransport};

/// POST JSON con cookies (el backend valida la sesión de Google)
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl HttpTransport for FetchTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<HttpReply, ApiError> {
        let response = Request::post(url)
            .credentials(RequestCredentials::Include)
            .header("Content-Type", "application/json")
            .body(body)
            .map_err(|e| ApiError::Encode(format!("Request build error: {}", e)))?
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}

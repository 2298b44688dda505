use reqwest::Client;

use crate::error::IntegrationError;
use crate::types::{ResponsesRequest, ResponsesResponse};

/// API client for the model's responses endpoint
pub struct ChatApi {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatApi {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Send the conversation and get the model's response
    pub async fn respond(
        &self,
        request: &ResponsesRequest,
    ) -> Result<ResponsesResponse, IntegrationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IntegrationError::ServerError {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(response.json().await?)
    }
}

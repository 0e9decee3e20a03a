//! HTTP client wrapper for the broker bridge.

use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::api_types::BridgeErrorResponse;
use super::config::BridgeConfig;
use super::error::BridgeError;

/// Shared HTTP client; cheap to clone.
#[derive(Debug, Clone)]
pub struct BridgeHttpClient {
    client: Client,
}

impl BridgeHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Make a GET request, mapping 404 to `None`.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, BridgeError> {
        let response = self.send_raw(Method::GET, url, None::<&()>).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(check_status(response).await?).await.map(Some)
    }

    /// Make a POST request with a JSON body.
    pub async fn post<T, B>(&self, url: &str, body: &B) -> Result<T, BridgeError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let response = self.send(Method::POST, url, Some(body)).await?;
        decode(response).await
    }

    /// Make a DELETE request, ignoring the body.
    pub async fn delete(&self, url: &str) -> Result<(), BridgeError> {
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    async fn send<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, BridgeError>
    where
        B: Serialize + Sync + ?Sized,
    {
        check_status(self.send_raw(method, url, body).await?).await
    }

    async fn send_raw<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, BridgeError>
    where
        B: Serialize + Sync + ?Sized,
    {
        tracing::trace!(%method, url, "Bridge request");

        let mut request = self.client.request(method, url);
        if let Some(b) = body {
            request = request.json(b);
        }
        request
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))
    }
}

/// Pass 2xx responses through; turn everything else into `BridgeError::Api`.
async fn check_status(response: Response) -> Result<Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    Err(BridgeError::Api {
        status: status.as_u16(),
        message: error_message(status, &error_body),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<BridgeErrorResponse>(body) {
        Ok(err) => err.error,
        Err(_) if body.trim().is_empty() => format!("Broker bridge returned HTTP {status}"),
        Err(_) => body.trim().to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BridgeError> {
    let text = response
        .text()
        .await
        .map_err(|e| BridgeError::Network(e.to_string()))?;
    let text = if text.is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| BridgeError::JsonParse(e.to_string()))
}

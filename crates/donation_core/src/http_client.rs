//! `PaymentCollaborator` backed by an HTTP JSON payment gateway.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{PayRequest, PayResponse, PaymentStatusRequest, PaymentStatusResponse},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::PaymentCollaborator;

const PAYMENTS_PATH: &str = "v1/payments";
const PAYMENT_STATUS_PATH: &str = "v1/payments/status";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid gateway url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment gateway returned {status} ({code}): {message}")]
    Rejected {
        status: reqwest::StatusCode,
        code: ErrorCode,
        message: String,
    },
}

pub struct HttpPaymentClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpPaymentClient {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_http_client(Client::new(), base_url)
    }

    pub fn with_http_client(http: Client, base_url: &str) -> Result<Self, GatewayError> {
        // Url::join drops the last path segment unless it ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|source| GatewayError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            http,
            base_url,
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|source| GatewayError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "payment gateway request");
        let res = self
            .authorize(self.http.post(url))
            .json(body)
            .send()
            .await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }
}

async fn check_status(res: Response) -> Result<Response, GatewayError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let ApiError { code, message } = match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => api_error,
        Err(_) => {
            let code = ErrorCode::from_http_status(status.as_u16());
            if body.trim().is_empty() {
                ApiError::new(code, status.canonical_reason().unwrap_or("unknown error"))
            } else {
                ApiError::new(code, body)
            }
        }
    };
    Err(GatewayError::Rejected {
        status,
        code,
        message,
    })
}

#[async_trait]
impl PaymentCollaborator for HttpPaymentClient {
    async fn pay(&self, request: PayRequest) -> Result<PayResponse> {
        Ok(self.post_json(PAYMENTS_PATH, &request).await?)
    }

    async fn payment_status(&self, request: PaymentStatusRequest) -> Result<PaymentStatusResponse> {
        Ok(self.post_json(PAYMENT_STATUS_PATH, &request).await?)
    }
}

#[cfg(test)]
#[path = "tests/http_client_tests.rs"]
mod tests;

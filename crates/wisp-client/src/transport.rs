//! HTTP transport for the relay's send/poll/consume endpoints. Transient
//! failures (connection errors, timeouts, 429, 5xx) retry with exponential
//! backoff; any other 4xx is terminal and returned immediately.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::warn;

use wisp_crypto::Envelope;

use crate::error::TransportError;
use crate::wire::{
    MessagesResponseBody, SendRequestBody, SendResponseBody, StoredMessageView, TokenRequestBody,
};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
}

/// Whether a failed attempt is worth retrying, and why.
enum Outcome<T> {
    Done(T),
    Retry,
    Terminal(TransportError),
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::NetworkError(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        })
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.base_delay = base_delay;
        self
    }

    pub async fn send(&self, envelope: &Envelope) -> Result<SendResponseBody, TransportError> {
        let url = format!("{}/api/v1/send", self.base_url);
        let body = SendRequestBody {
            token: envelope.token.clone(),
            ciphertext: envelope.ciphertext.clone(),
            nonce: envelope.nonce.clone(),
            sender_public_key: envelope.sender_public_key.clone(),
            ttl: envelope.ttl,
        };
        self.retrying(|| async {
            let resp = self.client.post(&url).json(&body).send().await;
            classify::<SendResponseBody>(resp).await
        })
        .await
    }

    pub async fn poll(&self, token: &str) -> Result<Vec<StoredMessageView>, TransportError> {
        self.token_call("poll", token).await
    }

    pub async fn consume(&self, token: &str) -> Result<Vec<StoredMessageView>, TransportError> {
        self.token_call("consume", token).await
    }

    async fn token_call(
        &self,
        endpoint: &str,
        token: &str,
    ) -> Result<Vec<StoredMessageView>, TransportError> {
        let url = format!("{}/api/v1/{}", self.base_url, endpoint);
        let body = TokenRequestBody {
            token: token.to_string(),
        };
        let response: MessagesResponseBody = self
            .retrying(|| async {
                let resp = self.client.post(&url).json(&body).send().await;
                classify::<MessagesResponseBody>(resp).await
            })
            .await?;
        Ok(response.messages)
    }

    async fn retrying<F, Fut, T>(&self, mut attempt: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Outcome<T>>,
    {
        let mut delay = self.base_delay;
        for attempt_num in 1..=self.max_attempts {
            match attempt().await {
                Outcome::Done(value) => return Ok(value),
                Outcome::Terminal(err) => return Err(err),
                Outcome::Retry => {
                    if attempt_num == self.max_attempts {
                        return Err(TransportError::NetworkError(
                            "exhausted retries".to_string(),
                        ));
                    }
                    warn!(attempt = attempt_num, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
        unreachable!("loop always returns before exhausting max_attempts")
    }
}

async fn classify<T: serde::de::DeserializeOwned>(
    result: Result<reqwest::Response, reqwest::Error>,
) -> Outcome<T> {
    let response = match result {
        Ok(r) => r,
        Err(_) => return Outcome::Retry,
    };

    match response.status() {
        StatusCode::OK => match response.json::<T>().await {
            Ok(value) => Outcome::Done(value),
            Err(e) => Outcome::Terminal(TransportError::BadResponse(e.to_string())),
        },
        StatusCode::TOO_MANY_REQUESTS => Outcome::Retry,
        status if status.is_server_error() => Outcome::Retry,
        status => {
            let body = response.text().await.unwrap_or_default();
            Outcome::Terminal(TransportError::BadRequest(format!("{status}: {body}")))
        }
    }
}

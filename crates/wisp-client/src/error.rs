#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failure, timeout, or 5xx/429 after exhausting retries.
    #[error("network error: {0}")]
    NetworkError(String),
    /// Any 4xx other than 429 — the request itself is wrong, retrying won't help.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A 2xx response whose body didn't parse as the expected schema.
    #[error("bad response: {0}")]
    BadResponse(String),
}

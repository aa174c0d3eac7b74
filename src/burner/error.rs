//! Error taxonomy for the swap-burn cycle.
//!
//! Every network leg returns a [`BurnError`]. The retry executor only ever
//! looks at [`BurnError::is_rate_limited`]; everything else is either
//! terminal for the cycle or, for reward claims, logged and ignored.

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use thiserror::Error;

/// JSON-RPC code some providers use for throttled requests.
const RPC_THROTTLED_CODE: i64 = 429;

/// JSON-RPC "invalid params", returned for unknown token accounts.
const RPC_INVALID_PARAMS_CODE: i64 = -32602;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BurnError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("{operation}: max retries exceeded after {attempts} attempts (last error: {last})")]
    MaxRetriesExceeded {
        operation: String,
        attempts: usize,
        last: String,
    },

    #[error("no route found for {amount} of {input} -> {output}")]
    NoRouteFound {
        input: String,
        output: String,
        amount: u64,
    },

    #[error("insufficient balance: {balance} lamports does not exceed reserve of {reserve}")]
    InsufficientBalance { balance: u64, reserve: u64 },

    #[error("token account balance is zero")]
    ZeroTokenBalance,

    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("confirmation failed: {0}")]
    ConfirmationFailed(String),

    #[error("confirmation timed out after {0}s")]
    ConfirmationTimeout(u64),

    #[error("reward claim failed: {0}")]
    ClaimFailed(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl BurnError {
    /// The only condition the retry executor retries on.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BurnError::RateLimited(_))
    }

    /// Short kebab-case tag used in cycle reports.
    pub fn kind(&self) -> &'static str {
        match self {
            BurnError::RateLimited(_) => "rate-limited",
            BurnError::MaxRetriesExceeded { .. } => "max-retries-exceeded",
            BurnError::NoRouteFound { .. } => "no-route",
            BurnError::InsufficientBalance { .. } => "insufficient-balance",
            BurnError::ZeroTokenBalance => "zero-token-balance",
            BurnError::SubmissionFailed(_) => "submission-failed",
            BurnError::ConfirmationFailed(_) | BurnError::ConfirmationTimeout(_) => {
                "confirmation-failed"
            }
            BurnError::ClaimFailed(_) => "claim-failed",
            BurnError::Rpc(_) => "rpc",
            BurnError::Http(_) => "http",
            BurnError::Decode(_) => "decode",
            BurnError::InvalidAmount(_) => "invalid-amount",
        }
    }

    /// Map an HTTP response status from the aggregator.
    pub fn from_http_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            BurnError::RateLimited(format!("aggregator returned {}", status))
        } else {
            BurnError::Http(format!("aggregator returned {}: {}", status, body))
        }
    }
}

impl From<reqwest::Error> for BurnError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            BurnError::RateLimited(err.to_string())
        } else {
            BurnError::Http(err.to_string())
        }
    }
}

/// Whether an RPC client error is the provider throttling us.
pub fn is_rpc_throttled(err: &ClientError) -> bool {
    let by_kind = match err.kind() {
        ClientErrorKind::Reqwest(e) => e.status().map(|s| s.as_u16()) == Some(429),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            *code == RPC_THROTTLED_CODE
        }
        _ => false,
    };
    by_kind
        || err
            .to_string()
            .to_ascii_lowercase()
            .contains("too many requests")
}

/// Whether an RPC error means the queried account does not exist yet.
pub fn is_account_missing(err: &ClientError) -> bool {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            *code == RPC_INVALID_PARAMS_CODE && message.contains("could not find account")
        }
        ClientErrorKind::RpcError(RpcError::ForUser(message)) => {
            message.starts_with("AccountNotFound")
        }
        _ => false,
    }
}

impl From<ClientError> for BurnError {
    fn from(err: ClientError) -> Self {
        if is_rpc_throttled(&err) {
            BurnError::RateLimited(err.to_string())
        } else {
            BurnError::Rpc(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limited_is_retryable() {
        assert!(BurnError::RateLimited("429".into()).is_rate_limited());
        assert!(!BurnError::Rpc("boom".into()).is_rate_limited());
        assert!(!BurnError::MaxRetriesExceeded {
            operation: "get_balance".into(),
            attempts: 3,
            last: "429".into(),
        }
        .is_rate_limited());
    }

    #[test]
    fn test_http_status_mapping() {
        let throttled = BurnError::from_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(throttled.is_rate_limited());

        let server = BurnError::from_http_status(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(server.kind(), "http");
        assert!(server.to_string().contains("upstream"));
    }

    #[test]
    fn test_rpc_throttle_detection() {
        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: 429,
            message: "Too many requests for a specific RPC call".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        }));
        assert!(is_rpc_throttled(&err));
        assert!(BurnError::from(err).is_rate_limited());

        let err = ClientError::from(ClientErrorKind::Custom("connection reset".to_string()));
        assert!(!is_rpc_throttled(&err));
        assert_eq!(BurnError::from(err).kind(), "rpc");
    }

    #[test]
    fn test_missing_account_detection() {
        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: -32602,
            message: "Invalid param: could not find account".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        }));
        assert!(is_account_missing(&err));
    }

    #[test]
    fn test_digits_429_in_message_are_not_throttling() {
        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: -32005,
            message: "Node is behind by 429 slots".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        }));
        assert!(!is_rpc_throttled(&err));
        assert!(!BurnError::from(err).is_rate_limited());

        let err = ClientError::from(ClientErrorKind::Custom(
            "HTTP status client error (429 TOO MANY REQUESTS)".to_string(),
        ));
        assert!(is_rpc_throttled(&err));
    }

    #[test]
    fn test_account_missing_requires_matching_code() {
        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: -32000,
            message: "could not find account".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        }));
        assert!(!is_account_missing(&err));

        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::ForUser(
            "AccountNotFound: pubkey=11111111111111111111111111111111".to_string(),
        )));
        assert!(is_account_missing(&err));

        let err = ClientError::from(ClientErrorKind::Custom("AccountNotFound".to_string()));
        assert!(!is_account_missing(&err));
    }
}

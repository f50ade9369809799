//! Error taxonomy for calls against the VAP API.
//!
//! Every failure is classified exactly once, at the transport boundary,
//! into an [`ApiError`]. The classification ([`ErrorKind`]) drives retry
//! eligibility; callers never re-derive it from the raw status code.

use serde_json::Value;

/// Maximum number of characters of a raw error body kept as the message.
pub const MAX_RAW_ERROR_CHARS: usize = 500;

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    InsufficientBalance,
    RateLimit,
    Validation,
    Server,
    Connection,
    Timeout,
    Generic,
}

impl ErrorKind {
    /// Whether a failure of this kind may be retried by the retry policy.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Server | ErrorKind::Connection | ErrorKind::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Generic => "generic",
        }
    }
}

/// A classified API failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401: the API key is missing or invalid.
    #[error("[401] {message}")]
    Authentication { message: String },

    /// 402: the account cannot cover the requested operation.
    #[error("[402] {message}")]
    InsufficientBalance {
        message: String,
        balance: Option<f64>,
        required: Option<f64>,
    },

    /// 429: callers should honor `retry_after` when present.
    #[error("[429] {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
        limit_type: Option<String>,
    },

    /// 400 from the API, or a request rejected locally before sending
    /// (`status` is `None`).
    #[error("{}", render_validation(.status, .message))]
    Validation {
        message: String,
        status: Option<u16>,
        errors: Vec<Value>,
    },

    /// 5xx.
    #[error("{}", render(Some(.status), .message, .attempts))]
    Server {
        status: u16,
        message: String,
        attempts: u32,
    },

    /// The remote host could not be reached.
    #[error("{}", render(None, .message, .attempts))]
    Connection { message: String, attempts: u32 },

    /// The call exceeded its timeout tier.
    #[error("{}", render(None, .message, .attempts))]
    Timeout { message: String, attempts: u32 },

    /// Any other non-2xx status.
    #[error("[{status}] {message}")]
    Api { status: u16, message: String },

    /// A 2xx response whose body could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// The HTTP client itself could not be built or the request was malformed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

fn render_validation(status: &Option<u16>, message: &str) -> String {
    render(status.as_ref(), message, &1)
}

fn render(status: Option<&u16>, message: &str, attempts: &u32) -> String {
    let mut out = match status {
        Some(code) => format!("[{}] {}", code, message),
        None => message.to_string(),
    };
    if *attempts > 1 {
        out.push_str(&format!(" (after {} attempts)", attempts));
    }
    out
}

impl ApiError {
    /// Classify a non-2xx response from its status code and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let json: Option<Value> = serde_json::from_str(body).ok();
        let message =
            extract_message(json.as_ref(), body).unwrap_or_else(|| default_message(status));

        match status {
            401 => ApiError::Authentication { message },
            402 => ApiError::InsufficientBalance {
                message,
                balance: field(json.as_ref(), "balance").and_then(as_f64),
                required: field(json.as_ref(), "required").and_then(as_f64),
            },
            429 => ApiError::RateLimited {
                message,
                retry_after: field(json.as_ref(), "retry_after").and_then(as_seconds),
                limit_type: field(json.as_ref(), "limit_type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            400 => ApiError::Validation {
                message,
                status: Some(400),
                errors: field(json.as_ref(), "errors")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
            s if s >= 500 => ApiError::Server {
                status: s,
                message,
                attempts: 1,
            },
            s => ApiError::Api { status: s, message },
        }
    }

    /// A request rejected locally, before any HTTP call.
    pub fn local_validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            status: None,
            errors: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Authentication { .. } => ErrorKind::Authentication,
            ApiError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            ApiError::RateLimited { .. } => ErrorKind::RateLimit,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Connection { .. } => ErrorKind::Connection,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::Api { .. } | ApiError::InvalidResponse { .. } | ApiError::Client(_) => {
                ErrorKind::Generic
            }
        }
    }

    /// The HTTP status that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { .. } => Some(401),
            ApiError::InsufficientBalance { .. } => Some(402),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::Validation { status, .. } => *status,
            ApiError::Server { status, .. } | ApiError::Api { status, .. } => Some(*status),
            ApiError::Connection { .. }
            | ApiError::Timeout { .. }
            | ApiError::InvalidResponse { .. }
            | ApiError::Client(_) => None,
        }
    }

    /// The primary error text, without status or attempt decoration.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Authentication { message }
            | ApiError::InsufficientBalance { message, .. }
            | ApiError::RateLimited { message, .. }
            | ApiError::Validation { message, .. }
            | ApiError::Server { message, .. }
            | ApiError::Connection { message, .. }
            | ApiError::Timeout { message, .. }
            | ApiError::Api { message, .. }
            | ApiError::InvalidResponse { message } => message,
            ApiError::Client(message) => message,
        }
    }

    /// Number of attempts made before this error was surfaced.
    pub fn attempts(&self) -> u32 {
        match self {
            ApiError::Server { attempts, .. }
            | ApiError::Connection { attempts, .. }
            | ApiError::Timeout { attempts, .. } => *attempts,
            _ => 1,
        }
    }

    /// Record the attempt count on retryable variants. No-op otherwise.
    pub fn with_attempts(mut self, n: u32) -> Self {
        match &mut self {
            ApiError::Server { attempts, .. }
            | ApiError::Connection { attempts, .. }
            | ApiError::Timeout { attempts, .. } => *attempts = n,
            _ => {}
        }
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                message: format!("Request timed out: {}", err),
                attempts: 1,
            }
        } else if err.is_builder() {
            ApiError::Client(err.to_string())
        } else {
            ApiError::Connection {
                message: format!("Connection failed: {}", err),
                attempts: 1,
            }
        }
    }
}

/// Pull the most specific error text out of an error body.
///
/// Precedence: `detail.message` (or the whole `detail` object), a string
/// `detail`, a string `error`, a string `message`, then the raw body
/// bounded to [`MAX_RAW_ERROR_CHARS`].
pub fn extract_message(json: Option<&Value>, raw: &str) -> Option<String> {
    if let Some(Value::Object(obj)) = json {
        match obj.get("detail") {
            Some(Value::Object(detail)) => {
                return Some(match detail.get("message").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => Value::Object(detail.clone()).to_string(),
                });
            }
            Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
            _ => {}
        }
        for key in ["error", "message"] {
            if let Some(msg) = obj.get(key).and_then(Value::as_str) {
                if !msg.is_empty() {
                    return Some(msg.to_string());
                }
            }
        }
    }

    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.chars().take(MAX_RAW_ERROR_CHARS).collect())
    }
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Authentication failed".to_string(),
        402 => "Insufficient balance".to_string(),
        429 => "Rate limit exceeded".to_string(),
        400 => "Validation error".to_string(),
        s if s >= 500 => "Server error".to_string(),
        s => format!("Request failed with status {}", s),
    }
}

/// Look a field up inside an object `detail` first, then at the top level.
fn field<'a>(json: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    let json = json?;
    json.get("detail")
        .filter(|d| d.is_object())
        .and_then(|d| d.get(key))
        .or_else(|| json.get(key))
        .filter(|v| !v.is_null())
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_seconds(value: &Value) -> Option<u64> {
    as_f64(value)
        .filter(|secs| *secs >= 0.0)
        .map(|secs| secs.ceil() as u64)
}

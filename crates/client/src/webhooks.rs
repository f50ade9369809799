//! Webhook signature helpers.
//!
//! Signatures are hex-encoded HMAC-SHA256 over `"{timestamp}.{canonical}"`,
//! where `canonical` is the payload re-serialized as compact JSON with
//! sorted keys and non-ASCII characters escaped. Payloads that are not
//! JSON are signed verbatim.

use hmac::{Hmac, Mac};
use serde_json::{Number, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-VAP-Signature";
pub const TIMESTAMP_HEADER: &str = "X-VAP-Timestamp";
pub const DEFAULT_MAX_AGE_SECS: i64 = 300;

/// Known webhook event types and what they mean.
pub const WEBHOOK_EVENTS: &[(&str, &str)] = &[
    ("generation.complete", "Image generation completed"),
    ("balance.low", "Account balance is low"),
    ("balance.depleted", "Account balance is depleted"),
    ("rate.limit.exceeded", "Rate limit exceeded"),
    ("test", "Test webhook"),
];

/// A webhook body, either already parsed or as received on the wire.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Json(&'a Value),
    Raw(&'a [u8]),
}

impl<'a> From<&'a Value> for Payload<'a> {
    fn from(value: &'a Value) -> Self {
        Payload::Json(value)
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(s: &'a str) -> Self {
        Payload::Raw(s.as_bytes())
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(s: &'a String) -> Self {
        Payload::Raw(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Payload::Raw(bytes)
    }
}

impl Payload<'_> {
    /// The exact string that gets signed after the timestamp.
    fn canonical(&self) -> String {
        match self {
            Payload::Json(value) => canonical_json(value),
            Payload::Raw(bytes) => match serde_json::from_slice::<Value>(bytes) {
                Ok(value) => canonical_json(&value),
                Err(_) => String::from_utf8_lossy(bytes).into_owned(),
            },
        }
    }

    fn to_value(self) -> Value {
        match self {
            Payload::Json(value) => value.clone(),
            Payload::Raw(bytes) => serde_json::from_slice(bytes).unwrap_or_else(|_| {
                serde_json::json!({ "raw": String::from_utf8_lossy(bytes) })
            }),
        }
    }
}

/// Sign `payload`, returning `(hex_signature, timestamp)`.
///
/// `timestamp` defaults to the current unix time.
pub fn generate_webhook_signature<'a>(
    payload: impl Into<Payload<'a>>,
    secret: &str,
    timestamp: Option<i64>,
) -> (String, i64) {
    let timestamp = timestamp.unwrap_or_else(now);
    let mac = mac_for(&payload.into(), secret, timestamp);
    (hex::encode(mac.finalize().into_bytes()), timestamp)
}

/// Check a webhook signature against the current time.
///
/// Returns `false` for a malformed timestamp or signature, for a timestamp
/// further than `max_age_secs` from now, or for a signature mismatch.
pub fn verify_webhook_signature<'a>(
    payload: impl Into<Payload<'a>>,
    signature: &str,
    timestamp: &str,
    secret: &str,
    max_age_secs: i64,
) -> bool {
    verify_at(payload, signature, timestamp, secret, max_age_secs, now())
}

/// [`verify_webhook_signature`] with an explicit notion of "now".
pub fn verify_at<'a>(
    payload: impl Into<Payload<'a>>,
    signature: &str,
    timestamp: &str,
    secret: &str,
    max_age_secs: i64,
    now: i64,
) -> bool {
    let Ok(ts) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    if (now - ts).abs() > max_age_secs {
        return false;
    }
    // Signatures are lowercase hex; any other spelling is a mismatch.
    let signature = signature.trim();
    if signature.bytes().any(|b| b.is_ascii_uppercase()) {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac_for(&payload.into(), secret, ts)
        .verify_slice(&expected)
        .is_ok()
}

fn mac_for(payload: &Payload<'_>, secret: &str, timestamp: i64) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(format!("{}.{}", timestamp, payload.canonical()).as_bytes());
    mac
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Compact JSON with recursively sorted keys and ASCII-only output.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        Value::Number(n) => write_number(n, out),
        other => out.push_str(&other.to_string()),
    }
}

/// Integers keep their exact digits; fractional and exponent forms are
/// re-rendered from their `f64` value so `1.50` and `1.5` sign alike.
fn write_number(n: &Number, out: &mut String) {
    let text = n.to_string();
    if !text.contains(['.', 'e', 'E']) {
        out.push_str(&text);
        return;
    }
    match n.as_f64().and_then(Number::from_f64) {
        Some(normalized) => out.push_str(&normalized.to_string()),
        None => out.push_str(&text),
    }
}

fn write_string(s: &str, out: &mut String) {
    let quoted = Value::String(s.to_string()).to_string();
    for c in quoted.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
}

/// A received webhook with its verification outcome.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub payload: Value,
    pub is_valid: bool,
    pub event_type: String,
    pub timestamp: String,
}

impl WebhookEvent {
    /// Verify and parse a webhook request. Non-JSON bodies become
    /// `{"raw": <body>}`.
    pub fn from_request<'a>(
        payload: impl Into<Payload<'a>>,
        signature: &str,
        timestamp: &str,
        secret: &str,
        max_age_secs: i64,
    ) -> Self {
        let payload = payload.into();
        let is_valid =
            verify_webhook_signature(payload, signature, timestamp, secret, max_age_secs);
        let payload = payload.to_value();
        let event_type = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Self {
            payload,
            is_valid,
            event_type,
            timestamp: timestamp.to_string(),
        }
    }

    /// Description of a known event type.
    pub fn description(&self) -> Option<&'static str> {
        WEBHOOK_EVENTS
            .iter()
            .find(|(name, _)| *name == self.event_type)
            .map(|(_, desc)| *desc)
    }
}

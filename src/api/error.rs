use serde_json::Value;
use std::fmt;

/// Failure taxonomy for the HTTP layer. `Clone` matters: a single refresh
/// failure is fanned out to every continuation queued behind it.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 401 and the refresh protocol could not recover (or never ran).
    Unauthorized,
    /// 404; routing fallbacks key off this variant.
    NotFound,
    /// 400 with a field-keyed error payload, kept in response order.
    Validation(Vec<(String, String)>),
    /// 403; owner-only mutation attempted by someone else.
    Forbidden,
    /// Any other non-success status.
    Http(u16, String),
    /// Transport-level failure (DNS, refused connection, closed socket).
    Network(String),
}

impl ApiError {
    /// Classify a settled response. 2xx never reaches this.
    pub fn from_status(status: u16, body: &Value) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            400 => ApiError::Validation(field_errors(body)),
            _ => ApiError::Http(status, compact_body(body)),
        }
    }

    /// Message suitable for the status line. Validation failures surface
    /// the server's field errors verbatim; permission failures stay generic.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Session expired. Please log in again.".to_string(),
            ApiError::NotFound => "Not found.".to_string(),
            ApiError::Validation(fields) => {
                if fields.is_empty() {
                    "Invalid input.".to_string()
                } else {
                    fields
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join("; ")
                }
            }
            ApiError::Forbidden => "You are not permitted to do that.".to_string(),
            ApiError::Http(status, body) => {
                if body.is_empty() {
                    format!("Server error ({})", status)
                } else {
                    format!("Server error ({}): {}", status, body)
                }
            }
            ApiError::Network(msg) => format!("Network error: {}", msg),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Flatten a DRF-style error body (`{"field": ["msg", ...], ...}`) into an
/// ordered field/message list. String values and bare lists are tolerated.
fn field_errors(body: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    match body {
        Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    Value::Array(msgs) => {
                        for m in msgs {
                            if let Some(s) = m.as_str() {
                                out.push((key.clone(), s.to_string()));
                            }
                        }
                    }
                    Value::String(s) => out.push((key.clone(), s.clone())),
                    other => out.push((key.clone(), other.to_string())),
                }
            }
        }
        Value::Array(msgs) => {
            for m in msgs {
                if let Some(s) = m.as_str() {
                    out.push(("error".to_string(), s.to_string()));
                }
            }
        }
        Value::String(s) => out.push(("error".to_string(), s.clone())),
        _ => {}
    }
    out
}

fn compact_body(body: &Value) -> String {
    match body {
        Value::Null => String::new(),
        Value::String(s) => s.chars().take(200).collect(),
        other => other.to_string().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_errors_join_field_and_message() {
        let err = ApiError::from_status(
            400,
            &json!({"title": ["This field is required."], "password": ["Too short."]}),
        );
        let msg = err.user_message();
        assert!(msg.contains("title: This field is required."));
        assert!(msg.contains("password: Too short."));
    }

    #[test]
    fn forbidden_stays_generic() {
        let err = ApiError::from_status(403, &json!({"detail": "nope"}));
        assert_eq!(err, ApiError::Forbidden);
        assert!(!err.user_message().contains("nope"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::from_status(401, &Value::Null), ApiError::Unauthorized);
        assert_eq!(ApiError::from_status(404, &Value::Null), ApiError::NotFound);
        assert!(matches!(
            ApiError::from_status(500, &Value::Null),
            ApiError::Http(500, _)
        ));
    }
}

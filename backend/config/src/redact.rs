//! Config redaction: safe-to-print config snapshots with secrets masked.

use serde_json::Value;

/// Keys whose string values are secrets.
static SECRET_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "token",
    "accessToken",
    "access_token",
    "secret",
    "password",
];

/// Redact a config JSON value, masking every secret string.
///
/// Unresolved `${VAR}` references are kept; they name a variable, not a value.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if !is_secret_key(key) || s.is_empty() || crate::env::contains_env_var_reference(s) {
        return Value::String(s.to_string());
    }
    // Keep a short prefix as a hint.
    let hint: String = s.chars().take(4).collect();
    if s.chars().count() > 8 {
        Value::String(format!("{hint}***"))
    } else {
        Value::String("***".to_string())
    }
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_key() {
        let v = json!({"gateway": {"apiKey": "sk-1234567890abcdef", "model": "smart"}});
        let r = redact(&v);
        assert_eq!(r["gateway"]["apiKey"], "sk-1***");
        assert_eq!(r["gateway"]["model"], "smart");
    }

    #[test]
    fn short_secrets_fully_masked() {
        let r = redact(&json!({"apiKey": "abc"}));
        assert_eq!(r["apiKey"], "***");
    }

    #[test]
    fn env_references_are_kept() {
        let r = redact(&json!({"apiKey": "${OPENAI_API_KEY}"}));
        assert_eq!(r["apiKey"], "${OPENAI_API_KEY}");
    }
}

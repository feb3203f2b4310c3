//! Success detection on completed HTTP responses.

use serde_json::Value;

use super::executor::HttpReply;

/// Result of evaluating one response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    pub is_success: bool,
    pub flag: Option<String>,
}

impl Verdict {
    fn rejected() -> Self {
        Self::default()
    }

    fn accepted(flag: Option<String>) -> Self {
        Self {
            is_success: true,
            flag,
        }
    }
}

/// Decides whether a response means the PIN was accepted.
///
/// Any 2xx response is a success. When a flag key is configured the body is
/// parsed as JSON and the key's value becomes the flag; a body that does not
/// parse, or lacks the key, still counts as a success without a flag.
#[derive(Debug, Clone, Default)]
pub struct SuccessDetector {
    flag_key: Option<String>,
}

impl SuccessDetector {
    pub fn new(flag_key: Option<String>) -> Self {
        Self {
            flag_key: flag_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn evaluate(&self, reply: &HttpReply) -> Verdict {
        if !(200..300).contains(&reply.status) {
            return Verdict::rejected();
        }

        let flag = self
            .flag_key
            .as_deref()
            .and_then(|key| extract_flag(&reply.body, key));
        Verdict::accepted(flag)
    }
}

fn extract_flag(body: &str, key: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Success body is not JSON, no flag extracted");
            return None;
        }
    };

    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> HttpReply {
        HttpReply {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_success_with_flag() {
        let detector = SuccessDetector::new(Some("flag".to_string()));
        let verdict = detector.evaluate(&reply(200, r#"{"flag": "CTF{x}"}"#));
        assert_eq!(verdict, Verdict::accepted(Some("CTF{x}".to_string())));
    }

    #[test]
    fn test_success_without_flag_key_or_body() {
        let detector = SuccessDetector::new(None);
        let verdict = detector.evaluate(&reply(204, ""));
        assert!(verdict.is_success);
        assert_eq!(verdict.flag, None);
    }

    #[test]
    fn test_forbidden_is_not_success() {
        let detector = SuccessDetector::new(Some("flag".to_string()));
        let verdict = detector.evaluate(&reply(403, r#"{"flag": "CTF{x}"}"#));
        assert_eq!(verdict, Verdict::rejected());
    }

    #[test]
    fn test_malformed_body_is_flagless_success() {
        let detector = SuccessDetector::new(Some("flag".to_string()));
        let verdict = detector.evaluate(&reply(200, "<html>welcome</html>"));
        assert!(verdict.is_success);
        assert_eq!(verdict.flag, None);
    }

    #[test]
    fn test_missing_key_and_non_string_values() {
        let detector = SuccessDetector::new(Some("token".to_string()));
        assert_eq!(
            detector.evaluate(&reply(200, r#"{"flag": "x"}"#)).flag,
            None
        );
        assert_eq!(
            detector.evaluate(&reply(200, r#"{"token": 1234}"#)).flag.as_deref(),
            Some("1234")
        );
        assert_eq!(detector.evaluate(&reply(200, r#"[1, 2]"#)).flag, None);
    }

    #[test]
    fn test_empty_flag_key_disables_extraction() {
        let detector = SuccessDetector::new(Some(String::new()));
        assert_eq!(detector.evaluate(&reply(200, r#"{"": "x"}"#)).flag, None);
    }
}

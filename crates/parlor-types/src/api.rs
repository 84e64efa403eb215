use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Participants --

/// Fields are optional and untyped so a missing or wrong-typed field is
/// reported as a validation failure instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<Value>,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    pub to: Option<Value>,
    pub text: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
}

/// `limit` is kept raw; anything other than a positive integer means "no limit".
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub limit: Option<String>,
}

impl MessageQuery {
    pub fn limit(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
    }
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: Option<&str>) -> MessageQuery {
        MessageQuery { limit: raw.map(str::to_string) }
    }

    #[test]
    fn wrong_typed_fields_still_deserialize() {
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"to": 5, "text": null, "type": ["message"]}"#).unwrap();
        assert_eq!(req.to, Some(Value::from(5)));
        // serde maps an explicit null to None
        assert_eq!(req.text, None);
        assert!(req.kind.unwrap().is_array());
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(query(Some("2")).limit(), Some(2));
        assert_eq!(query(Some(" 7 ")).limit(), Some(7));
        assert_eq!(query(Some("0")).limit(), None);
        assert_eq!(query(Some("-3")).limit(), None);
        assert_eq!(query(Some("abc")).limit(), None);
        assert_eq!(query(None).limit(), None);
    }
}

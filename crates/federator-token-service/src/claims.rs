//! The JWT claims the token service cares about. Unknown claims are ignored rather than
//! rejected: the IdP is free to add fields the federator doesn't use.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub iss: Option<String>,
    pub exp: Option<i64>,
    /// "authorized party", the OAuth2 client id that requested the token. Not every IdP
    /// sets this; when absent, callers fall back to `client_id`.
    pub azp: Option<String>,
    pub client_id: Option<String>,
    /// `aud` is either a single string or an array of strings per RFC 7519 §4.1.3.
    pub aud: Option<Value>,
}

impl Claims {
    /// The OAuth2 client id this token was issued to, preferring `azp` over `client_id`
    /// since `azp` is the claim explicitly reserved for this purpose.
    pub fn client_id(&self) -> Option<&str> {
        self.azp.as_deref().or(self.client_id.as_deref())
    }

    /// All audiences on the token, normalised to a list regardless of whether `aud` was
    /// encoded as a single string or an array.
    pub fn audiences(&self) -> Vec<String> {
        match &self.aud {
            Some(Value::String(single)) => vec![single.clone()],
            Some(Value::Array(many)) => many
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_prefers_azp() {
        let claims = Claims {
            sub: None,
            iss: None,
            exp: None,
            azp: Some("azp-client".to_string()),
            client_id: Some("other-client".to_string()),
            aud: None,
        };
        assert_eq!(claims.client_id(), Some("azp-client"));
    }

    #[test]
    fn audiences_normalises_single_string() {
        let claims = Claims {
            sub: None,
            iss: None,
            exp: None,
            azp: None,
            client_id: None,
            aud: Some(Value::String("topic-stream".to_string())),
        };
        assert_eq!(claims.audiences(), vec!["topic-stream".to_string()]);
    }

    #[test]
    fn audiences_normalises_array() {
        let claims = Claims {
            sub: None,
            iss: None,
            exp: None,
            azp: None,
            client_id: None,
            aud: Some(serde_json::json!(["topic-stream", "file-exchange"])),
        };
        assert_eq!(
            claims.audiences(),
            vec!["topic-stream".to_string(), "file-exchange".to_string()]
        );
    }
}

//! Session token claims.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer};

/// Decoded session token payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionClaims {
    /// Token ID, used as the subject identifier
    #[serde(rename = "jti", default)]
    pub id: Option<String>,
    /// Audience (string or list of strings)
    #[serde(default, deserialize_with = "one_or_many")]
    pub aud: Vec<String>,
    /// Expiration time (Unix timestamp)
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,
    /// Not valid before (Unix timestamp)
    #[serde(default, deserialize_with = "optional_numeric_date")]
    pub nbf: Option<i64>,
    /// Issued at (Unix timestamp)
    #[serde(default, deserialize_with = "optional_numeric_date")]
    pub iat: Option<i64>,
    /// Username
    #[serde(default)]
    pub login: String,
    /// Roles in the order they were issued
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub email: String,
}

/// Errors returned by [`decode`].
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("Malformed claims: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Missing subject identifier")]
    MissingSubject,
}

/// Decode raw claim bytes. Rejects payloads without a subject identifier or
/// with an unparseable expiry.
pub fn decode(raw: &[u8]) -> Result<SessionClaims, ClaimsError> {
    let claims: SessionClaims = serde_json::from_slice(raw)?;
    match claims.id.as_deref() {
        Some(id) if !id.trim().is_empty() => Ok(claims),
        _ => Err(ClaimsError::MissingSubject),
    }
}

impl SessionClaims {
    /// Subject identifier. Always present after a successful [`decode`].
    pub fn subject_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Whether the claims are live at `now`: after issuance and before expiry.
    pub fn is_live_at(&self, now: SystemTime) -> bool {
        let now = match now.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => return false,
        };

        if self.exp <= now {
            return false;
        }
        if self.nbf.is_some_and(|nbf| nbf > now) {
            return false;
        }
        if self.iat.is_some_and(|iat| iat > now) {
            return false;
        }
        true
    }
}

fn to_seconds<E: serde::de::Error>(value: f64) -> Result<i64, E> {
    if value.is_finite() {
        Ok(value.trunc() as i64)
    } else {
        Err(E::custom("numeric date out of range"))
    }
}

fn numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    to_seconds(f64::deserialize(deserializer)?)
}

fn optional_numeric_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Option::<f64>::deserialize(deserializer)?
        .map(to_seconds)
        .transpose()
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(aud)) => vec![aud],
        Some(OneOrMany::Many(aud)) => aud,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn raw(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_decode_full_claims() {
        let claims = decode(&raw(json!({
            "jti": "65f1c0e2a4",
            "aud": ["user"],
            "exp": 1_700_000_000,
            "login": "alice",
            "roles": ["user", "admin"],
            "email": "alice@example.com",
        })))
        .unwrap();

        assert_eq!(claims.subject_id(), "65f1c0e2a4");
        assert_eq!(claims.aud, vec!["user"]);
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.login, "alice");
        assert_eq!(claims.roles, vec!["user", "admin"]);
        assert_eq!(claims.email, "alice@example.com");
    }

    #[test]
    fn test_roles_keep_issued_order() {
        let claims = decode(&raw(json!({
            "jti": "id",
            "exp": 1,
            "roles": ["zeta", "alpha", "zeta"],
        })))
        .unwrap();

        assert_eq!(claims.roles, vec!["zeta", "alpha", "zeta"]);
    }

    #[test]
    fn test_missing_roles_is_empty() {
        let claims = decode(&raw(json!({"jti": "id", "exp": 1}))).unwrap();
        assert!(claims.roles.is_empty());
        assert!(claims.aud.is_empty());
    }

    #[test]
    fn test_single_audience_string() {
        let claims = decode(&raw(json!({"jti": "id", "exp": 1, "aud": "user"}))).unwrap();
        assert_eq!(claims.aud, vec!["user"]);
    }

    #[test]
    fn test_fractional_expiry() {
        let claims = decode(&raw(json!({"jti": "id", "exp": 1_700_000_000.75}))).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
    }

    #[test]
    fn test_missing_subject_rejected() {
        assert!(matches!(
            decode(&raw(json!({"exp": 1, "login": "alice"}))),
            Err(ClaimsError::MissingSubject)
        ));
        assert!(matches!(
            decode(&raw(json!({"jti": "  ", "exp": 1}))),
            Err(ClaimsError::MissingSubject)
        ));
    }

    #[test]
    fn test_bad_expiry_rejected() {
        assert!(matches!(
            decode(&raw(json!({"jti": "id", "exp": "tomorrow"}))),
            Err(ClaimsError::Malformed(_))
        ));
        assert!(matches!(
            decode(&raw(json!({"jti": "id"}))),
            Err(ClaimsError::Malformed(_))
        ));
    }

    #[test]
    fn test_not_json_rejected() {
        assert!(decode(b"not json").is_err());
        assert!(decode(b"[1,2,3]").is_err());
    }

    #[test]
    fn test_liveness_window() {
        let claims = decode(&raw(json!({
            "jti": "id",
            "iat": 100,
            "nbf": 100,
            "exp": 200,
        })))
        .unwrap();

        assert!(!claims.is_live_at(at(99)));
        assert!(claims.is_live_at(at(100)));
        assert!(claims.is_live_at(at(199)));
        assert!(!claims.is_live_at(at(200)));
        assert!(!claims.is_live_at(at(500)));
    }
}

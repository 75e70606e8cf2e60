// Access-token claims as seen by the client.
//
// The client never verifies signatures: it only reads the payload segment to learn who is
// signed in and when the token stops being usable. The server stays the authority.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the account email
    pub sub: String,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Issued-at, unix seconds
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub authorities: Vec<String>,
    #[serde(default, rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, rename = "userId", alias = "id", skip_serializing_if = "Option::is_none", deserialize_with = "lenient_id")]
    pub user_id: Option<String>,
}

impl TokenClaims {
    /// Expired once `exp` lies strictly before `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool { self.exp < now }

    pub fn is_expired(&self) -> bool { self.is_expired_at(chrono::Utc::now().timestamp()) }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

// Backends emit numeric or string ids; both end up as a string.
fn lenient_id<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode the payload segment of a compact JWT without checking its signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(AuthError::malformed_token("Session token is malformed"));
    };
    if payload.is_empty() {
        return Err(AuthError::malformed_token("Session token is malformed"));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::malformed_token(format!("Session token payload is not base64url: {}", e)))?;
    let claims: TokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed_token(format!("Session token has no usable claims: {}", e)))?;
    if claims.sub.trim().is_empty() {
        return Err(AuthError::malformed_token("Session token has no subject"));
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) fn encode_for_test(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
    format!("{}.{}.sig", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorKind;
    use base64::Engine as _;
    use serde_json::json;

    #[test]
    fn decodes_standard_claims() {
        let t = encode_for_test(&json!({"sub":"a@b.com","exp":2000,"iat":1000,"authorities":["ROLE_DONOR"]}));
        let c = decode_claims(&t).unwrap();
        assert_eq!(c.sub, "a@b.com");
        assert_eq!(c.exp, 2000);
        assert_eq!(c.iat, 1000);
        assert!(c.has_authority("ROLE_DONOR"));
        assert!(!c.has_authority("ROLE_ADMIN"));
        assert_eq!(c.user_id, None);
    }

    #[test]
    fn optional_profile_claims_and_numeric_id() {
        let t = encode_for_test(&json!({"sub":"a@b.com","exp":1,"firstName":"Ada","lastName":"L","id":17}));
        let c = decode_claims(&t).unwrap();
        assert_eq!(c.first_name.as_deref(), Some("Ada"));
        assert_eq!(c.last_name.as_deref(), Some("L"));
        assert_eq!(c.user_id.as_deref(), Some("17"));
        assert!(c.authorities.is_empty());
    }

    #[test]
    fn expiry_is_strict() {
        let t = encode_for_test(&json!({"sub":"a@b.com","exp":100}));
        let c = decode_claims(&t).unwrap();
        assert!(!c.is_expired_at(99));
        assert!(!c.is_expired_at(100));
        assert!(c.is_expired_at(101));
    }

    #[test]
    fn tolerates_padding() {
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"x@y.z","exp":5}"#);
        let c = decode_claims(&format!("h.{}.s", body)).unwrap();
        assert_eq!(c.sub, "x@y.z");
    }

    #[test]
    fn rejects_garbage() {
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode(b"not json"));
        for bad in ["", "abc", "a..c", "a.!!!.c", not_json.as_str()] {
            let e = decode_claims(bad).unwrap_err();
            assert_eq!(e.kind, AuthErrorKind::MalformedToken, "token {:?}", bad);
        }
        // payload without subject / expiry has no usable claims
        let no_exp = encode_for_test(&json!({"sub":"a@b.com"}));
        assert!(decode_claims(&no_exp).is_err());
        let blank_sub = encode_for_test(&json!({"sub":"","exp":1}));
        assert!(decode_claims(&blank_sub).is_err());
    }
}

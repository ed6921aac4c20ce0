use anyhow::anyhow;
pub use anyhow::Result;
use serde_json::Value;
use time::OffsetDateTime;

/// The parts of an access token the client cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Option<i64>,
    pub expires_at: Option<OffsetDateTime>,
}

impl TokenClaims {
    /// Tokens without an `exp` claim never count as expired
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}

/// Reads claims from a JWT payload segment. The signature is not checked; only the server can
/// do that.
pub fn parse_jwt_claims(jwt: &str) -> Result<TokenClaims> {
    let second_b64 = jwt.split('.').nth(1).ok_or(anyhow!("couldn't parse JWT"))?;
    let second_json: Vec<u8> =
        base64::decode_config(second_b64.trim_end_matches('='), base64::URL_SAFE_NO_PAD)?;
    let obj: Value = serde_json::from_slice(&second_json)?;
    if !obj.is_object() {
        return Err(anyhow!("JWT payload is not a JSON object"));
    }
    // user_id shows up as either a number or a numeric string depending on server settings
    let user_id = match &obj["user_id"] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    let expires_at = match obj["exp"].as_i64() {
        Some(ts) => Some(OffsetDateTime::from_unix_timestamp(ts)?),
        None => None,
    };
    Ok(TokenClaims {
        user_id,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fake_jwt(payload: Value) -> String {
        let header = base64::encode_config(r#"{"alg":"HS256","typ":"JWT"}"#, base64::URL_SAFE_NO_PAD);
        let body = base64::encode_config(payload.to_string(), base64::URL_SAFE_NO_PAD);
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_parse_jwt_claims() {
        assert!(parse_jwt_claims(".").is_err());
        assert!(parse_jwt_claims("not-a-token").is_err());
        assert!(parse_jwt_claims("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9").is_err());
        assert!(parse_jwt_claims(&fake_jwt(json!([1, 2]))).is_err());

        let claims = parse_jwt_claims(&fake_jwt(json!({
            "token_type": "access",
            "exp": 1710000000,
            "jti": "c0ffee",
            "user_id": 7
        })))
        .unwrap();
        assert_eq!(claims.user_id, Some(7));
        assert_eq!(
            claims.expires_at,
            Some(OffsetDateTime::from_unix_timestamp(1710000000).unwrap())
        );

        let claims = parse_jwt_claims(&fake_jwt(json!({"user_id": "12"}))).unwrap();
        assert_eq!(claims.user_id, Some(12));
        assert_eq!(claims.expires_at, None);
    }

    #[test]
    fn test_is_expired() {
        let claims = TokenClaims {
            user_id: None,
            expires_at: Some(OffsetDateTime::from_unix_timestamp(1000).unwrap()),
        };
        assert!(claims.is_expired(OffsetDateTime::from_unix_timestamp(1000).unwrap()));
        assert!(!claims.is_expired(OffsetDateTime::from_unix_timestamp(999).unwrap()));
        let forever = TokenClaims {
            user_id: None,
            expires_at: None,
        };
        assert!(!forever.is_expired(OffsetDateTime::now_utc()));
    }
}

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Claims carried by an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub pubkey: String,
    pub exp: i64,
}

/// HS256 token signer and verifier keyed by the instance secret.
#[derive(Clone)]
pub struct JwtAuth {
    secret: Vec<u8>,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Issue a token for a pubkey with the default lifetime.
    pub fn issue(&self, pubkey: &str) -> Result<String, String> {
        let exp = chrono::Utc::now().timestamp() + TOKEN_LIFETIME_DAYS * 24 * 60 * 60;
        self.issue_with_expiry(pubkey, exp)
    }

    /// Issue a token with an explicit expiry timestamp in unix seconds.
    pub fn issue_with_expiry(&self, pubkey: &str, exp: i64) -> Result<String, String> {
        if pubkey.is_empty() || pubkey.contains(|c| "!@#$%^&*()".contains(c)) {
            return Err("invalid public key".to_string());
        }

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = Claims {
            pubkey: pubkey.to_string(),
            exp,
        };
        let payload = serde_json::to_vec(&claims).map_err(|e| e.to_string())?;
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let signing_input = format!("{}.{}", header, payload);
        let signature = self.sign(&signing_input)?;
        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Decode and verify a token. Fails on a malformed structure, a wrong
    /// signature, a missing pubkey or an expired token.
    pub fn decode(&self, token: &str) -> Result<Claims, String> {
        let mut parts = token.split('.');
        let (header, payload, signature) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err("malformed token".to_string()),
            };

        let signing_input = format!("{}.{}", header, payload);
        let expected = self.sign(&signing_input)?;
        if expected != signature {
            return Err("signature mismatch".to_string());
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| e.to_string())?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|e| e.to_string())?;

        if claims.pubkey.is_empty() {
            return Err("token carries no pubkey".to_string());
        }
        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err("token has expired".to_string());
        }
        Ok(claims)
    }

    fn sign(&self, signing_input: &str) -> Result<String, String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| format!("Failed to create HMAC: {}", e))?;
        mac.update(signing_input.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

//! SignatureVerifier - 受信した配送の署名を検証する
//!
//! 署名ヘッダは HS256 の JWT:
//!
//! - `iss`: `Upstash`
//! - `sub`: 送信先の callback URL
//! - `exp` / `nbf`: トークンの有効期間
//! - `body`: `base64url(sha256(raw body))`
//!
//! # 設計原則
//! - current → next の順に 2 つの鍵で試す（鍵ローテーション対応）
//! - 失敗理由はすべて `SignatureError::Invalid` にまとめる

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::config::{Settings, SigningKeys};
use crate::domain::SignatureError;

pub const SIGNATURE_HEADER: &str = "upstash-signature";
pub const ISSUER: &str = "Upstash";

/// Allowed clock skew between the delivery service and this process.
const CLOCK_TOLERANCE_SECS: u64 = 5;

/// Lifetime of tokens produced by [`sign`].
const TOKEN_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureClaims {
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    pub jti: String,
    pub body: String,
}

/// Which configured key accepted the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    Current,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    pub claims: SignatureClaims,
    pub key: KeySlot,
}

pub struct SignatureVerifier {
    keys: SigningKeys,
    force_https: bool,
}

impl SignatureVerifier {
    pub fn new(settings: &Settings) -> Self {
        Self {
            keys: settings.signing_keys().clone(),
            force_https: settings.force_https(),
        }
    }

    /// Applies the force-HTTPS policy to an observed URL.
    pub fn normalize_url(&self, url: &str) -> String {
        match url.strip_prefix("http://") {
            Some(rest) if self.force_https => format!("https://{rest}"),
            _ => url.to_string(),
        }
    }

    pub fn verify(
        &self,
        body: &[u8],
        signature: Option<&str>,
        url: &str,
    ) -> Result<VerifiedSignature, SignatureError> {
        let token = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::Missing)?;
        let url = self.normalize_url(url);

        let mut causes = Vec::with_capacity(2);
        for (slot, key) in [KeySlot::Current, KeySlot::Next].into_iter().zip(self.keys.in_order()) {
            match verify_with_key(key, token, body, &url) {
                Ok(claims) => {
                    debug!(key = ?slot, "signature accepted");
                    return Ok(VerifiedSignature { claims, key: slot });
                }
                Err(cause) => causes.push(format!("{slot:?}: {cause}")),
            }
        }

        let cause = causes.join("; ");
        warn!(url = %url, cause = %cause, "signature rejected");
        Err(SignatureError::Invalid(cause))
    }
}

fn verify_with_key(key: &str, token: &str, body: &[u8], url: &str) -> Result<SignatureClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
    validation.sub = Some(url.to_string());
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = CLOCK_TOLERANCE_SECS;

    let data = jsonwebtoken::decode::<SignatureClaims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &validation,
    )
    .map_err(|e| e.to_string())?;

    if data.claims.body.trim_end_matches('=') != body_hash(body) {
        return Err("body hash mismatch".to_string());
    }
    Ok(data.claims)
}

/// `base64url(sha256(body))` without padding.
pub fn body_hash(body: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(body))
}

/// Produces a signature the way the delivery service does.
///
/// Used for local simulation and tests.
pub fn sign(
    key: &str,
    body: &[u8],
    url: &str,
    now: DateTime<Utc>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SignatureClaims {
        iss: ISSUER.to_string(),
        sub: url.to_string(),
        exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        nbf: now.timestamp(),
        iat: now.timestamp(),
        jti: format!("jwt_{}", Ulid::new()),
        body: body_hash(body),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
}

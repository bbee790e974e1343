//! Service-account authentication for Google Cloud APIs.
//!
//! Signs an RS256 JWT with the key from a service-account JSON file and
//! exchanges it for an OAuth access token at the key's `token_uri`.
//! Tokens are cached until shortly before they expire.

use std::path::Path;
use std::sync::Mutex;

use base64::Engine as _;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::{Deserialize, Serialize};

use super::cloud_ocr::CloudOcrError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Requested assertion lifetime (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A cached token is refreshed this long before its advertised expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Fields of a service-account key file used for the token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, CloudOcrError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CloudOcrError::Auth(format!("Cannot read credentials {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, CloudOcrError> {
        serde_json::from_str(json)
            .map_err(|e| CloudOcrError::Auth(format!("Invalid service-account key: {e}")))
    }
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now + REFRESH_MARGIN_SECS < self.expires_at
    }
}

/// Issues OAuth access tokens for one service account.
pub struct TokenProvider {
    key: ServiceAccountKey,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
    http: reqwest::blocking::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Parse the key's PEM private key. Fails on anything but an RSA PKCS#8 key.
    pub fn new(key: ServiceAccountKey, http: reqwest::blocking::Client) -> Result<Self, CloudOcrError> {
        let der = pem_to_der(&key.private_key)?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| CloudOcrError::Auth(format!("Rejected private key: {e}")))?;

        Ok(Self {
            key,
            key_pair,
            rng: SystemRandom::new(),
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }

    /// A valid access token, from cache when still fresh.
    pub fn access_token(&self) -> Result<String, CloudOcrError> {
        let now = chrono::Utc::now().timestamp();

        let mut cached = self
            .cached
            .lock()
            .map_err(|_| CloudOcrError::Auth("Token cache lock poisoned".into()))?;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = self.signed_assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| CloudOcrError::Auth(format!("Token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CloudOcrError::Auth(format!(
                "Token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| CloudOcrError::Auth(format!("Invalid token response: {e}")))?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = parsed.expires_in,
            "Obtained cloud OCR access token"
        );

        *cached = Some(CachedToken {
            value: parsed.access_token.clone(),
            expires_at: now + parsed.expires_in,
        });
        Ok(parsed.access_token)
    }

    /// `header.claims.signature`, each segment base64url without padding.
    fn signed_assertion(&self, now: i64) -> Result<String, CloudOcrError> {
        let signing_input = signing_input(&self.key, now)?;

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, signing_input.as_bytes(), &mut signature)
            .map_err(|_| CloudOcrError::Auth("JWT signing failed".into()))?;

        Ok(format!("{signing_input}.{}", b64url(&signature)))
    }
}

fn signing_input(key: &ServiceAccountKey, now: i64) -> Result<String, CloudOcrError> {
    let header = JwtHeader {
        alg: "RS256",
        typ: "JWT",
    };
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: VISION_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    let header = serde_json::to_vec(&header)
        .map_err(|e| CloudOcrError::Auth(format!("JWT header encoding: {e}")))?;
    let claims = serde_json::to_vec(&claims)
        .map_err(|e| CloudOcrError::Auth(format!("JWT claims encoding: {e}")))?;

    Ok(format!("{}.{}", b64url(&header), b64url(&claims)))
}

fn b64url(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Strip PEM armor and decode the base64 body.
fn pem_to_der(pem: &str) -> Result<Vec<u8>, CloudOcrError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(CloudOcrError::Auth("Private key is empty".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(body)
        .map_err(|e| CloudOcrError::Auth(format!("Private key is not valid base64: {e}")))
}

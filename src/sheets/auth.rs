//! Service-account authentication (OAuth2 JWT-bearer flow).
//!
//! A service-account key holds an RSA private key. To call a Google API the
//! key signs a one-hour JWT assertion naming the requested scope; the token
//! endpoint swaps that assertion for a bearer access token.

use crate::error::{Error, SheetError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// OAuth2 scope granting read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Token endpoint used when the key file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion. Google rejects anything above one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a Google service-account JSON key that authentication needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccountKey {
    /// Parse a JSON key payload.
    ///
    /// The private key is test-parsed here so a broken credential fails at
    /// startup rather than on the first append.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| Error::InvalidCredential(format!("not a service-account JSON key: {e}")))?;

        if let Some(ref t) = key.key_type {
            if t != "service_account" {
                return Err(Error::InvalidCredential(format!(
                    "expected type \"service_account\", got {t:?}"
                )));
            }
        }
        if key.client_email.trim().is_empty() {
            return Err(Error::InvalidCredential("client_email is empty".into()));
        }
        EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::InvalidCredential(format!("private_key is not an RSA PEM key: {e}")))?;

        debug!("Loaded service-account key for {}", key.client_email);
        Ok(key)
    }

    /// Load a key from either an inline JSON payload or a path to a key file.
    pub fn load(source: &str) -> Result<Self, Error> {
        let trimmed = source.trim();
        if trimmed.starts_with('{') {
            return Self::from_json(trimmed);
        }
        let path = Path::new(trimmed);
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidCredential(format!("cannot read key file '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Claims for an assertion issued at `now`.
    pub fn claims(&self, scope: &str, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }

    /// Sign an RS256 assertion for `scope`, issued at `now`.
    pub fn assertion(&self, scope: &str, now: DateTime<Utc>) -> Result<String, SheetError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SheetError::Signing(e.to_string()))?;

        encode(&header, &self.claims(scope, now), &key).map_err(|e| SheetError::Signing(e.to_string()))
    }
}

/// A bearer token for API calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Seconds until expiry, as reported by the token endpoint.
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange a freshly signed assertion for an access token.
pub async fn fetch_access_token(
    client: &reqwest::Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<AccessToken, SheetError> {
    let assertion = key.assertion(scope, Utc::now())?;

    info!("Requesting access token for {}", key.client_email);
    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| SheetError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {}", err.error, desc),
                None => err.error,
            },
            Err(_) => body,
        };
        return Err(SheetError::Auth {
            status: status.as_u16(),
            message,
        });
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| SheetError::Transport(format!("unreadable token response: {e}")))?;

    Ok(AccessToken {
        token: token.access_token,
        expires_in: token.expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};

    const KEY_JSON: &str = include_str!("../../tests/fixtures/service_account.json");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/test_key.pub.pem");

    #[test]
    fn parses_fixture_key() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        assert_eq!(
            key.client_email,
            "sheet-writer@shot2sheet-test.iam.gserviceaccount.com"
        );
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(key.private_key_id.as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn debug_redacts_private_key() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let dump = format!("{key:?}");
        assert!(dump.contains("<redacted>"));
        assert!(!dump.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn rejects_wrong_key_type() {
        let json = KEY_JSON.replace("\"service_account\"", "\"authorized_user\"");
        let err = ServiceAccountKey::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("authorized_user"));
    }

    #[test]
    fn rejects_garbage_private_key() {
        let json = r#"{"private_key": "nope", "client_email": "a@b.c"}"#;
        assert!(ServiceAccountKey::from_json(json).is_err());
    }

    #[test]
    fn load_reads_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, KEY_JSON).unwrap();

        let key = ServiceAccountKey::load(path.to_str().unwrap()).unwrap();
        assert_eq!(key.project_id.as_deref(), Some("shot2sheet-test"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ServiceAccountKey::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("cannot read key file"));
    }

    #[test]
    fn assertion_is_verifiable_rs256() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let now = Utc::now();
        let jwt = key.assertion(SPREADSHEETS_SCOPE, now).unwrap();

        let header = decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("0123456789abcdef"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        validation.set_issuer(&[key.client_email.as_str()]);
        let decoded = decode::<AssertionClaims>(
            &jwt,
            &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims, key.claims(SPREADSHEETS_SCOPE, now));
    }

    #[test]
    fn claims_last_one_hour() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let claims = key.claims(SPREADSHEETS_SCOPE, now);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.scope, SPREADSHEETS_SCOPE);
        assert_eq!(claims.aud, key.token_uri);
    }
}

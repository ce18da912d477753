//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Url;
use sha1::Sha1;

use common::config::CredentialsConfig;

use super::StreamError;

type HmacSha1 = Hmac<Sha1>;

const NONCE_LEN: usize = 32;

#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl From<&CredentialsConfig> for OAuthCredentials {
    fn from(c: &CredentialsConfig) -> Self {
        Self {
            consumer_key: c.consumer_key.clone(),
            consumer_secret: c.consumer_secret.clone(),
            token: c.access_token.clone(),
            token_secret: c.access_token_secret.clone(),
        }
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

pub fn nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// `Authorization` header value for a request, with a fresh nonce and timestamp.
///
/// Query parameters already present in `url` are included in the signature,
/// as are `params` (form body fields).
pub fn authorization_header(
    creds: &OAuthCredentials,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String, StreamError> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(creds, method, url, params, &nonce(), &timestamp)
}

pub fn authorization_header_with(
    creds: &OAuthCredentials,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> Result<String, StreamError> {
    let parsed = Url::parse(url).map_err(|e| StreamError::Signing(format!("bad url: {e}")))?;

    let mut oauth = vec![
        ("oauth_consumer_key", creds.consumer_key.clone()),
        ("oauth_nonce", nonce.to_string()),
        ("oauth_signature_method", "HMAC-SHA1".to_string()),
        ("oauth_timestamp", timestamp.to_string()),
        ("oauth_token", creds.token.clone()),
        ("oauth_version", "1.0".to_string()),
    ];

    let mut signed: Vec<(String, String)> = oauth
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .chain(parsed.query_pairs().map(|(k, v)| (encode(&k), encode(&v))))
        .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    signed.sort();

    let param_string = signed
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut base_url = parsed.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    let base_string = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url.as_str()),
        encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        encode(&creds.consumer_secret),
        encode(&creds.token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| StreamError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    oauth.push(("oauth_signature", signature));
    oauth.sort();

    let fields = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

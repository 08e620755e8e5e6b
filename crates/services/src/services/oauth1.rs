//! OAuth 1.0a request signing (HMAC-SHA1) for the Twitter/X API.
//!
//! [`sign`] and [`authorization_header`] are pure: given the same inputs,
//! including timestamp and nonce, they return the same output. [`authorize`]
//! supplies the current time and a fresh nonce.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::{Rng, distr::Alphanumeric};
use sha1::Sha1;

/// Everything except the RFC 3986 unreserved set `A-Z a-z 0-9 - . _ ~`.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const NONCE_LEN: usize = 32;

/// Consumer and token credentials for one signed request.
///
/// `token` is `None` while requesting a request token; `token_secret` is
/// empty in that case.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: &'a str,
}

/// Percent-encode with uppercase hex; space becomes `%20`.
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

fn normalized_params(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute `oauth_signature` for `params` (every parameter that takes part in
/// the signature, including the oauth_* ones).
pub fn sign(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let base = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&normalized_params(params))
    );
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac = match Hmac::<Sha1>::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA1 accepts any key length"),
    };
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Build the `Authorization` header value.
///
/// `extra` carries step-specific oauth parameters such as `oauth_callback`
/// or `oauth_verifier`; they are signed and emitted with the others.
pub fn authorization_header(
    method: &str,
    url: &str,
    credentials: Credentials<'_>,
    extra: &[(&str, &str)],
    timestamp: &str,
    nonce: &str,
) -> String {
    let mut params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.consumer_key),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_nonce", nonce),
        ("oauth_version", "1.0"),
    ];
    if let Some(token) = credentials.token {
        params.push(("oauth_token", token));
    }
    params.extend_from_slice(extra);

    let signature = sign(
        method,
        url,
        &params,
        credentials.consumer_secret,
        credentials.token_secret,
    );
    params.push(("oauth_signature", &signature));

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    pairs.sort();
    let header = pairs
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {header}")
}

pub fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// [`authorization_header`] with the current Unix time and a random nonce.
pub fn authorize(
    method: &str,
    url: &str,
    credentials: Credentials<'_>,
    extra: &[(&str, &str)],
) -> String {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header(method, url, credentials, extra, &timestamp, &generate_nonce())
}

#[cfg(test)]
mod tests {
    use super::*;

    // https://developer.twitter.com/en/docs/authentication/oauth-1-0a/creating-a-signature
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";

    fn published_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ]
    }

    fn credentials() -> Credentials<'static> {
        Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog",
            consumer_secret: CONSUMER_SECRET,
            token: Some("370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            token_secret: TOKEN_SECRET,
        }
    }

    #[test]
    fn matches_published_signature() {
        let signature = sign("POST", URL, &published_params(), CONSUMER_SECRET, TOKEN_SECRET);
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let mut reversed = published_params();
        reversed.reverse();
        assert_eq!(
            sign("post", URL, &reversed, CONSUMER_SECRET, TOKEN_SECRET),
            "hCtSmYh+iHYCEqBWrE7C7hYmtUk="
        );
    }

    #[test]
    fn encodes_rfc3986() {
        assert_eq!(percent_encode("Hello Ladies + Gentlemen"), "Hello%20Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("!*'()"), "%21%2A%27%28%29");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn header_is_deterministic_and_sorted() {
        let first = authorization_header("POST", URL, credentials(), &[], "1318622958", "abc");
        let second = authorization_header("POST", URL, credentials(), &[], "1318622958", "abc");
        assert_eq!(first, second);

        let keys: Vec<&str> = first
            .trim_start_matches("OAuth ")
            .split(", ")
            .map(|pair| pair.split('=').next().unwrap_or_default())
            .collect();
        assert_eq!(
            keys,
            [
                "oauth_consumer_key",
                "oauth_nonce",
                "oauth_signature",
                "oauth_signature_method",
                "oauth_timestamp",
                "oauth_token",
                "oauth_version",
            ]
        );
    }

    #[test]
    fn header_signature_covers_oauth_params_only() {
        let header = authorization_header("GET", URL, credentials(), &[], "1318622958", "nonce");
        let expected = sign(
            "GET",
            URL,
            &[
                ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
                ("oauth_nonce", "nonce"),
                ("oauth_signature_method", "HMAC-SHA1"),
                ("oauth_timestamp", "1318622958"),
                ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
                ("oauth_version", "1.0"),
            ],
            CONSUMER_SECRET,
            TOKEN_SECRET,
        );
        assert!(header.contains(&format!("oauth_signature=\"{}\"", percent_encode(&expected))));
    }

    #[test]
    fn request_token_step_omits_token_and_includes_callback() {
        let creds = Credentials {
            consumer_key: "key",
            consumer_secret: "secret",
            token: None,
            token_secret: "",
        };
        let header = authorization_header(
            "POST",
            "https://api.twitter.com/oauth/request_token",
            creds,
            &[("oauth_callback", "https://example.com/cb?x=1")],
            "1",
            "n",
        );
        assert!(!header.contains("oauth_token="));
        assert!(header.contains("oauth_callback=\"https%3A%2F%2Fexample.com%2Fcb%3Fx%3D1\""));
    }

    #[test]
    fn nonce_is_alphanumeric() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(nonce, generate_nonce());
    }
}

//! AWS Signature V4 verification for the S3 data-plane router.
//!
//! Reference: <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-authenticating-requests.html>

use crate::error::AuthError;
use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use http::Request;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Components parsed out of the request's Authorization header, before the
/// access key has been resolved against the metadata store.
pub struct ParsedAuth {
    pub access_key_id: String,
    pub region: String,
    pub signed_headers: Vec<String>,
    pub signature: String,
}

/// Parse an `AWS4-HMAC-SHA256` Authorization header.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuth, AuthError> {
    if !header.starts_with("AWS4-HMAC-SHA256") {
        return Err(AuthError::InvalidSignatureVersion);
    }

    let re = Regex::new(
        r"AWS4-HMAC-SHA256\s+Credential=([^/]+)/([^/]+)/([^/]+)/([^/]+)/aws4_request,\s*SignedHeaders=([^,]+),\s*Signature=(\w+)",
    )
    .expect("static regex is valid");

    let captures = re.captures(header).ok_or(AuthError::InvalidAuthHeader)?;

    if &captures[4] != "s3" {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(ParsedAuth {
        access_key_id: captures[1].to_string(),
        region: captures[3].to_string(),
        signed_headers: captures[5]
            .split(';')
            .map(str::to_lowercase)
            .collect(),
        signature: captures[6].to_string(),
    })
}

fn get_request_date<B>(request: &Request<B>) -> Result<String, AuthError> {
    if let Some(date) = request.headers().get("x-amz-date") {
        return date
            .to_str()
            .map(ToString::to_string)
            .map_err(|_| AuthError::InvalidDateFormat);
    }
    if let Some(date) = request.headers().get("date") {
        return date
            .to_str()
            .map(ToString::to_string)
            .map_err(|_| AuthError::InvalidDateFormat);
    }
    Err(AuthError::MissingDateHeader)
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>, AuthError> {
    NaiveDateTime::parse_from_str(date_str, "%Y%m%dT%H%M%SZ")
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .map_err(|_| AuthError::InvalidDateFormat)
}

fn build_canonical_request<B>(
    request: &Request<B>,
    signed_headers: &[String],
) -> Result<String, AuthError> {
    let method = request.method().as_str();
    let uri = request.uri();
    let path = uri.path();
    let canonical_uri = if path.is_empty() { "/" } else { path };
    let canonical_query = build_canonical_query_string(uri.query().unwrap_or(""));

    let mut headers_map: BTreeMap<String, String> = BTreeMap::new();
    for header_name in signed_headers {
        let value = request
            .headers()
            .get(header_name.as_str())
            .ok_or_else(|| AuthError::MissingSignedHeader(header_name.clone()))?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?
            .trim()
            .to_string();
        headers_map.insert(header_name.clone(), value);
    }

    let canonical_headers: String = headers_map
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    let signed_headers_str = signed_headers.join(";");

    let payload_hash = request
        .headers()
        .get("x-amz-content-sha256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("UNSIGNED-PAYLOAD");

    Ok(format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers_str}\n{payload_hash}"
    ))
}

fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter_map(|param| {
            let mut parts = param.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((url_encode(&url_decode(key)), url_encode(&url_decode(value))))
        })
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn build_string_to_sign(canonical_request: &str, date_str: &str, credential_scope: &str) -> String {
    let canonical_request_hash = hex_sha256(canonical_request.as_bytes());
    format!("AWS4-HMAC-SHA256\n{date_str}\n{credential_scope}\n{canonical_request_hash}")
}

fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{secret_key}");
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn calculate_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn url_encode(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(c),
            _ => {
                for byte in c.to_string().as_bytes() {
                    result.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    result
}

fn url_decode(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else if c == '+' {
            result.push(' ');
        } else {
            result.push(c);
        }
    }
    result
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Verify a parsed request against the tenant's secret access key.
///
/// The caller is responsible for resolving `parsed.access_key_id` to a
/// secret (via the metadata store) before calling this; unknown access
/// keys never reach here.
pub fn verify<B>(request: &Request<B>, parsed: &ParsedAuth, secret_key: &str) -> Result<(), AuthError> {
    let date_str = get_request_date(request)?;
    let date = parse_date(&date_str)?;

    let now = Utc::now();
    if now.signed_duration_since(date).num_minutes().abs() > 15 {
        return Err(AuthError::RequestExpired);
    }

    let canonical_request = build_canonical_request(request, &parsed.signed_headers)?;

    let date_stamp = date.format("%Y%m%d").to_string();
    let credential_scope = format!("{date_stamp}/{}/s3/aws4_request", parsed.region);
    let string_to_sign = build_string_to_sign(&canonical_request, &date_str, &credential_scope);

    let signing_key = derive_signing_key(secret_key, &date_stamp, &parsed.region, "s3");
    let calculated_signature = calculate_signature(&signing_key, &string_to_sign);

    if !constant_time_eq(&calculated_signature, &parsed.signature) {
        tracing::debug!(
            "signature mismatch:\n  canonical request:\n{canonical_request}\n  string to sign:\n{string_to_sign}\n  calculated: {calculated_signature}\n  provided: {}",
            parsed.signature
        );
        return Err(AuthError::SignatureMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encode_matches_aws_rules() {
        assert_eq!(url_encode("hello"), "hello");
        assert_eq!(url_encode("hello world"), "hello%20world");
        assert_eq!(url_encode("a/b"), "a%2Fb");
    }

    #[test]
    fn hex_sha256_matches_known_vector() {
        assert_eq!(
            hex_sha256(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn constant_time_eq_rejects_mismatches() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello!"));
    }

    #[test]
    fn derive_signing_key_produces_32_bytes() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            "20130524",
            "us-east-1",
            "s3",
        );
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn parses_credential_scope_region() {
        let header = "AWS4-HMAC-SHA256 Credential=AKIA123/20260728/us-east-1/s3/aws4_request, SignedHeaders=host;x-amz-date, Signature=abcdef";
        let parsed = parse_authorization_header(header).unwrap();
        assert_eq!(parsed.access_key_id, "AKIA123");
        assert_eq!(parsed.region, "us-east-1");
        assert_eq!(parsed.signed_headers, vec!["host", "x-amz-date"]);
        assert_eq!(parsed.signature, "abcdef");
    }

    #[test]
    fn region_is_not_confused_with_the_date_stamp() {
        let header = "AWS4-HMAC-SHA256 Credential=AKIA123/20260728/us-east-1/s3/aws4_request, SignedHeaders=host;x-amz-date, Signature=abcdef";
        let parsed = parse_authorization_header(header).unwrap();
        assert_eq!(parsed.region, "us-east-1");
        assert_ne!(parsed.region, "s3");
    }

    #[test]
    fn rejects_credential_scope_for_a_non_s3_service() {
        let header = "AWS4-HMAC-SHA256 Credential=AKIA123/20260728/us-east-1/ec2/aws4_request, SignedHeaders=host;x-amz-date, Signature=abcdef";
        assert!(matches!(
            parse_authorization_header(header),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn rejects_non_sigv4_header() {
        assert!(matches!(
            parse_authorization_header("AWS AKIA123:sig"),
            Err(AuthError::InvalidSignatureVersion)
        ));
    }
}

//! Azure Storage service SAS tokens for single blobs
//!
//! Implements the blob service SAS for `sv=2022-11-02`: the string-to-sign is
//! the sixteen newline-separated fields below, signed with HMAC-SHA256 keyed
//! by the base64-decoded account key.

use super::StorageError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SAS_VERSION: &str = "2022-11-02";

/// Permission set carried by a token (`sp`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasPermission {
    Read,
    CreateWrite,
    Delete,
}

impl SasPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            SasPermission::Read => "r",
            SasPermission::CreateWrite => "cw",
            SasPermission::Delete => "d",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SasParams<'a> {
    pub account: &'a str,
    pub container: &'a str,
    pub blob: &'a str,
    pub permission: SasPermission,
    pub start: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    /// `https`, or `https,http` for local emulators
    pub protocol: &'a str,
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn string_to_sign(params: &SasParams<'_>) -> String {
    let resource = format!("/blob/{}/{}/{}", params.account, params.container, params.blob);

    [
        params.permission.as_str(),
        &format_time(params.start),
        &format_time(params.expiry),
        &resource,
        "", // signed identifier
        "", // signed IP
        params.protocol,
        SAS_VERSION,
        "b", // signed resource: blob
        "", // snapshot time
        "", // encryption scope
        "", // rscc
        "", // rscd
        "", // rsce
        "", // rscl
        "", // rsct
    ]
    .join("\n")
}

/// Base64 HMAC-SHA256 signature of the string-to-sign
pub fn sign(account_key_b64: &str, params: &SasParams<'_>) -> Result<String, StorageError> {
    let key = STANDARD
        .decode(account_key_b64.trim())
        .map_err(|e| StorageError::Signing(format!("account key is not base64: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| StorageError::Signing(format!("invalid key length: {e}")))?;
    mac.update(string_to_sign(params).as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Query string (without leading `?`) for a blob URL
pub fn query_string(account_key_b64: &str, params: &SasParams<'_>) -> Result<String, StorageError> {
    let signature = sign(account_key_b64, params)?;

    Ok(format!(
        "sv={}&st={}&se={}&sr=b&sp={}&spr={}&sig={}",
        SAS_VERSION,
        urlencoding::encode(&format_time(params.start)),
        urlencoding::encode(&format_time(params.expiry)),
        params.permission.as_str(),
        urlencoding::encode(params.protocol),
        urlencoding::encode(&signature),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KEY: &str = "YmF6YXJpLXRlc3QtYWNjb3VudC1rZXktMDEyMzQ1Njc4OQ==";

    fn params() -> SasParams<'static> {
        SasParams {
            account: "bazaridev",
            container: "listings",
            blob: "u1/img.jpg",
            permission: SasPermission::Read,
            start: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            expiry: Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap(),
            protocol: "https",
        }
    }

    #[test]
    fn test_string_to_sign_layout() {
        let sts = string_to_sign(&params());
        let fields: Vec<&str> = sts.split('\n').collect();

        assert_eq!(fields.len(), 16);
        assert_eq!(fields[0], "r");
        assert_eq!(fields[1], "2026-01-01T00:00:00Z");
        assert_eq!(fields[3], "/blob/bazaridev/listings/u1/img.jpg");
        assert_eq!(fields[6], "https");
        assert_eq!(fields[7], SAS_VERSION);
        assert_eq!(fields[8], "b");
    }

    #[test]
    fn test_known_signature() {
        assert_eq!(
            sign(KEY, &params()).unwrap(),
            "VNS2fXE2Rs1fXQIwd5zzSiYj6kSJkeBPEsxqNlrDOqA="
        );
    }

    #[test]
    fn test_query_string_is_url_encoded() {
        let query = query_string(KEY, &params()).unwrap();
        assert!(query.starts_with("sv=2022-11-02&st=2026-01-01T00%3A00%3A00Z"));
        assert!(query.contains("&sr=b&sp=r&spr=https&"));
        assert!(query.ends_with("sig=VNS2fXE2Rs1fXQIwd5zzSiYj6kSJkeBPEsxqNlrDOqA%3D"));
    }

    #[test]
    fn test_non_base64_key_rejected() {
        assert!(matches!(
            sign("not base64!!", &params()),
            Err(StorageError::Signing(_))
        ));
    }
}

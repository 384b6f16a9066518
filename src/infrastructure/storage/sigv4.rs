//! AWS Signature Version 4 for S3-compatible object stores.
//!
//! Only what the artifact cache needs: header-signed requests with a single
//! payload hash, and query-signed (pre-signed) GET URLs.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub(crate) struct Signer {
    access_key_id: String,
    secret_access_key: String,
    region: String,
}

/// Headers to attach to a header-signed request.
#[derive(Debug)]
pub(crate) struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub(crate) fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Sign a request whose only signed headers are `host`,
    /// `x-amz-content-sha256` and `x-amz-date`.
    pub(crate) fn sign_headers(
        &self,
        method: &str,
        host: &str,
        canonical_uri: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> SignedHeaders {
        let amz_date = amz_date(now);
        let scope = self.scope(now);
        let content_sha256 = hex::encode(Sha256::digest(payload));

        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "{method}\n{canonical_uri}\n\nhost:{host}\nx-amz-content-sha256:{content_sha256}\nx-amz-date:{amz_date}\n\n{signed_headers}\n{content_sha256}"
        );
        let signature = self.signature(&canonical_request, &amz_date, &scope, now);

        SignedHeaders {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.access_key_id
            ),
            amz_date,
            content_sha256,
        }
    }

    /// Build the query string (including `X-Amz-Signature`) of a pre-signed GET.
    pub(crate) fn presign_get(
        &self,
        host: &str,
        canonical_uri: &str,
        expires: Duration,
        now: DateTime<Utc>,
    ) -> String {
        let amz_date = amz_date(now);
        let scope = self.scope(now);
        let credential = format!("{}/{scope}", self.access_key_id);

        // Already in lexical order.
        let query = format!(
            "X-Amz-Algorithm={ALGORITHM}&X-Amz-Credential={}&X-Amz-Date={amz_date}&X-Amz-Expires={}&X-Amz-SignedHeaders=host",
            uri_encode(&credential, true),
            expires.as_secs(),
        );
        let canonical_request =
            format!("GET\n{canonical_uri}\n{query}\nhost:{host}\n\nhost\n{UNSIGNED_PAYLOAD}");
        let signature = self.signature(&canonical_request, &amz_date, &scope, now);

        format!("{query}&X-Amz-Signature={signature}")
    }

    fn scope(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{SERVICE}/aws4_request",
            now.format("%Y%m%d"),
            self.region
        )
    }

    fn signature(
        &self,
        canonical_request: &str,
        amz_date: &str,
        scope: &str,
        now: DateTime<Utc>,
    ) -> String {
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let date = now.format("%Y%m%d").to_string();
        let key = hmac(
            format!("AWS4{}", self.secret_access_key).as_bytes(),
            date.as_bytes(),
        );
        let key = hmac(&key, self.region.as_bytes());
        let key = hmac(&key, SERVICE.as_bytes());
        let key = hmac(&key, b"aws4_request");

        hex::encode(hmac(&key, string_to_sign.as_bytes()))
    }
}

fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// RFC 3986 percent-encoding as S3 expects it. `/` is kept in paths and
/// encoded in query values.
pub(crate) fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b'/' if !encode_slash => out.push('/'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

//! AWS Signature Version 4 for SQS-compatible endpoints.
//!
//! Only what the queue transport needs: header-based signing of requests with
//! no query string and a fully buffered body.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::QueueError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static credentials plus the scope they sign for.
pub(crate) struct SigningParams<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

/// Headers to attach to the signed request.
#[derive(Debug)]
pub(crate) struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
}

/// Sign a request.
///
/// `headers` must contain every header to be signed except `x-amz-date`,
/// which is added here. Names are matched case-insensitively.
pub(crate) fn sign(
    params: &SigningParams<'_>,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<SignedHeaders, QueueError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let mut canonical: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    canonical.push(("x-amz-date".to_string(), amz_date.clone()));
    canonical.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = canonical
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = canonical
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let path = if path.is_empty() { "/" } else { path };
    let canonical_request = format!(
        "{method}\n{path}\n\n{canonical_headers}\n{signed_headers}\n{}",
        hex::encode(Sha256::digest(payload))
    );

    let scope = format!(
        "{date_stamp}/{}/{}/aws4_request",
        params.region, params.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(params, &date_stamp)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            params.access_key_id
        ),
        amz_date,
    })
}

fn signing_key(params: &SigningParams<'_>, date_stamp: &str) -> Result<Vec<u8>, QueueError> {
    let secret = format!("AWS4{}", params.secret_access_key);
    let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, params.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, params.service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, QueueError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| QueueError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

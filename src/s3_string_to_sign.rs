use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Request;
use sha2::{Digest, Sha256};

use crate::s3_constant::{S3_ALGO_VALUE, S3_CONTENT_KEY};
use crate::Policy;

#[derive(Debug, Clone)]
pub enum StringToSignType<'a> {
    AuthorizationHeader((&'a Request, &'a str, DateTime<Utc>)),
    PostUploadPresigned(&'a Policy),
}

impl<'a> StringToSignType<'a> {
    pub fn new_authorization_header(
        req: &'a Request,
        region: &'a str,
        date: DateTime<Utc>,
    ) -> Self {
        Self::AuthorizationHeader((req, region, date))
    }

    pub fn new_post_presigned(policy: &'a Policy) -> Self {
        Self::PostUploadPresigned(policy)
    }

    pub fn string_to_sign(self) -> String {
        match self {
            StringToSignType::AuthorizationHeader((req, region, date)) => {
                string_to_sign(req.canonical_hex(), region, date)
            }
            // POST uploads sign the encoded policy itself.
            StringToSignType::PostUploadPresigned(policy) => policy.encode(),
        }
    }
}

pub trait CanonicalRequest {
    fn payload_hex(&self) -> String;
    fn signed_header(&self) -> String;
    fn canonical_header(&self) -> String;
    fn canonical_hex(&self) -> String;
}

impl CanonicalRequest for Request {
    fn payload_hex(&self) -> String {
        let payload: &[u8] = self.body().and_then(|b| b.as_bytes()).unwrap_or_default();
        hex::encode(Sha256::digest(payload))
    }

    fn signed_header(&self) -> String {
        sorted_headers(self)
            .into_keys()
            .collect::<Vec<String>>()
            .join(";")
    }

    fn canonical_header(&self) -> String {
        let mut res = String::new();

        for (name, values) in sorted_headers(self) {
            res.push_str(&format!(
                "{headerName}:{headerValue}\n",
                headerName = name,
                headerValue = values.join(","),
            ))
        }

        res
    }

    fn canonical_hex(&self) -> String {
        let payload = self
            .headers()
            .get(S3_CONTENT_KEY)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| self.payload_hex());

        let mut canonical = String::new();
        canonical.push_str(&format!("{method}\n", method = self.method().as_str()));
        canonical.push_str(&format!("{path}\n", path = self.url().path()));
        canonical.push_str(&format!(
            "{query}\n",
            query = self.url().query().unwrap_or("")
        ));
        canonical.push_str(&format!("{header}\n", header = self.canonical_header()));
        canonical.push_str(&format!(
            "{signed_headers}\n",
            signed_headers = self.signed_header()
        ));
        canonical.push_str(&payload);

        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

/// Lowercased header names in sorted order, repeated headers grouped.
fn sorted_headers(req: &Request) -> BTreeMap<String, Vec<String>> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in req.headers() {
        let value = value.to_str().unwrap_or("").trim().to_string();
        headers
            .entry(name.as_str().to_lowercase())
            .or_default()
            .push(value);
    }
    headers
}

#[inline]
pub fn scope(region: &str, date: DateTime<Utc>) -> String {
    format!(
        "{date}/{region}/s3/aws4_request",
        date = date.format("%Y%m%d"),
        region = region,
    )
}

#[inline]
fn string_to_sign(canonical_hex: String, region: &str, date: DateTime<Utc>) -> String {
    let formatted_date = date.format("%Y%m%dT%H%M%SZ").to_string();

    let mut s = String::new();
    s.push_str(&format!("{}\n", S3_ALGO_VALUE));
    s.push_str(&format!("{}\n", formatted_date));
    s.push_str(&format!("{}\n", scope(region, date)));
    s.push_str(&canonical_hex);

    s
}

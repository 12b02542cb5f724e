use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::{Policy, StringToSignType};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Signs browser POST policies the way S3's signature version 2 form
/// upload expects: `base64(HMAC-SHA1(secret_key, base64_policy))`.
///
/// See <https://docs.aws.amazon.com/AmazonS3/latest/dev/HTTPPOSTForms.html#HTTPPOSTConstructingPolicySignature>
pub struct PolicySigner<'s> {
    secret_key: &'s str,
}

impl<'s> PolicySigner<'s> {
    #[inline]
    pub fn new(secret_key: &'s str) -> Self {
        Self { secret_key }
    }

    #[inline]
    pub fn sign_policy(&self, policy: &Policy) -> Result<String, InvalidLength> {
        let string_to_sign = StringToSignType::new_post_presigned(policy).string_to_sign();
        self.sign(&string_to_sign)
    }

    #[inline]
    pub fn sign(&self, encoded_policy: &str) -> Result<String, InvalidLength> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())?;
        mac.update(encoded_policy.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// AWS Signature Version 4 signer for the object requests the S3 storage
/// backend issues.
pub struct Signer<'s> {
    secret_key: &'s str,
    region: &'s str,
}

impl<'s> Signer<'s> {
    #[inline]
    pub fn new(secret_key: &'s str, region: &'s str) -> Self {
        Self { secret_key, region }
    }

    #[inline]
    pub fn sign(&self, date: DateTime<Utc>, string_to_sign: &str) -> Result<String, InvalidLength> {
        let mut key = self.signing_hasher(date)?;
        key.update(string_to_sign.as_bytes());
        let msg = key.finalize().into_bytes();
        Ok(hex::encode(msg))
    }

    #[inline]
    fn signing_hasher(&self, date: DateTime<Utc>) -> Result<HmacSha256, InvalidLength> {
        let date = date.format("%Y%m%d").to_string();
        let secret = format!("AWS4{}", self.secret_key);

        // date -> region -> service -> request
        let date_key = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let date_region_key = hmac_sha256(&date_key, self.region.as_bytes())?;
        let date_region_service_key = hmac_sha256(&date_region_key, b"s3")?;
        let signing_key = hmac_sha256(&date_region_service_key, b"aws4_request")?;

        HmacSha256::new_from_slice(&signing_key)
    }
}

#[inline]
fn hmac_sha256(key: &[u8], msg: &[u8]) -> Result<Vec<u8>, InvalidLength> {
    let mut h = HmacSha256::new_from_slice(key)?;
    h.update(msg);
    Ok(h.finalize().into_bytes().to_vec())
}

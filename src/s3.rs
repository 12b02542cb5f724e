use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_DISPOSITION,
    CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HOST, RANGE,
};
use reqwest::{Client, Method, Request, Response, StatusCode, Url};

use crate::s3_constant::*;
use crate::{
    join_key, CanonicalRequest, Error, ObjectInfo, Result, Signer, Storage, StorageSettings,
    StringToSignType,
};

/// Characters left bare in an encoded object key. `/` stays so the key
/// keeps its path segments.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Headers S3 stores on the object itself rather than as user metadata.
const OBJECT_HEADERS: [HeaderName; 4] =
    [CACHE_CONTROL, CONTENT_TYPE, CONTENT_DISPOSITION, CONTENT_ENCODING];

/// S3 bucket reached over HTTPS with SigV4-signed requests.
#[derive(Debug, Clone)]
pub struct S3 {
    bucket: String,
    region: String,
    endpoint: String,
    access_key: String,
    secret_key: String,
    location: String,
    default_acl: String,
    headers: HashMap<String, String>,
    client: Client,
}

impl S3 {
    #[inline]
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        let region = region.into();
        let endpoint = endpoint.into();
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        Self {
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
            location: String::new(),
            default_acl: "public-read".into(),
            headers: HashMap::new(),
            client: Client::new(),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        let mut s3 = Self::new(
            &settings.bucket,
            &settings.region,
            &settings.endpoint,
            &settings.access_key,
            &settings.secret_key,
        )
        .with_location(&settings.location)
        .with_default_acl(&settings.default_acl);
        if let Some(cache_control) = &settings.cache_control {
            s3 = s3.with_cache_control(cache_control);
        }
        s3
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_default_acl(mut self, acl: impl Into<String>) -> Self {
        self.default_acl = acl.into();
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.headers
            .insert("Cache-Control".into(), cache_control.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[inline]
    pub fn public_url(&self) -> String {
        format!(
            "https://{bucket}.{region}.{endpoint}",
            bucket = self.bucket,
            region = self.region,
            endpoint = self.endpoint,
        )
    }

    #[inline]
    pub fn head_object(&self, key: &str) -> Result<Request> {
        self.prepare_object_method(key, Method::HEAD, HeaderMap::new())
    }

    /// GET of the first `max_bytes` of the object.
    pub fn get_object_range(&self, key: &str, max_bytes: usize) -> Result<Request> {
        let mut headers = HeaderMap::new();
        let last = max_bytes.saturating_sub(1);
        headers.insert(RANGE, HeaderValue::from_str(&format!("bytes=0-{}", last))?);
        self.prepare_object_method(key, Method::GET, headers)
    }

    /// PUT-copy of `src_key` onto `dst_key`, replacing metadata.
    pub fn copy_object(
        &self,
        src_key: &str,
        dst_key: &str,
        metadata: &HashMap<String, String>,
        acl: &str,
    ) -> Result<Request> {
        let mut headers = HeaderMap::new();
        let source = format!("/{}/{}", self.bucket, encode_key(src_key));
        headers.insert(S3_COPY_SOURCE_HEADER, HeaderValue::from_str(&source)?);
        headers.insert(S3_METADATA_DIRECTIVE_HEADER, HeaderValue::from_static("REPLACE"));
        headers.insert(S3_ACL_HEADER, HeaderValue::from_str(acl)?);
        for (name, value) in metadata {
            let header = match OBJECT_HEADERS
                .iter()
                .find(|h| h.as_str().eq_ignore_ascii_case(name))
            {
                Some(h) => h.clone(),
                None => HeaderName::from_bytes(
                    format!("{}{}", S3_META_PREFIX, name.to_lowercase()).as_bytes(),
                )?,
            };
            headers.insert(header, HeaderValue::from_str(value)?);
        }
        self.prepare_object_method(dst_key, Method::PUT, headers)
    }

    #[inline]
    pub fn delete_object(&self, key: &str) -> Result<Request> {
        self.prepare_object_method(key, Method::DELETE, HeaderMap::new())
    }

    /// Fails for keys the URL parser would rewrite, such as ones with `..`
    /// segments.
    fn object_url(&self, key: &str) -> Result<Url> {
        let path = format!("/{}", encode_key(key));
        let url = Url::parse(&format!("{}{}", self.public_url(), path))?;
        if url.path() != path {
            return Err(Error::KeyError(key.into()));
        }
        Ok(url)
    }

    fn prepare_object_method(
        &self,
        key: &str,
        method: Method,
        extra_headers: HeaderMap,
    ) -> Result<Request> {
        let now = Utc::now();
        let formatted_now = now.format("%Y%m%dT%H%M%SZ").to_string();

        let url = self.object_url(key)?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::ConfigError(format!("no host in {}", url)))?
            .to_string();

        let mut req = Request::new(method, url);
        let payload = req.payload_hex();

        let headers_mut = req.headers_mut();
        headers_mut.extend(extra_headers);
        headers_mut.insert(HOST, HeaderValue::from_str(&host)?);
        headers_mut.insert(S3_CONTENT_KEY, HeaderValue::from_str(&payload)?);
        headers_mut.insert(S3_DATE_KEY, HeaderValue::from_str(&formatted_now)?);

        let signed_headers = req.signed_header();
        let string_to_sign =
            StringToSignType::new_authorization_header(&req, self.region.as_str(), now)
                .string_to_sign();
        let sign = self.signer().sign(now, &string_to_sign)?;
        let authorization = self.format_authorization(signed_headers, sign, now);
        req.headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);

        Ok(req)
    }

    async fn execute(&self, req: Request) -> Result<Response> {
        tracing::debug!(method = %req.method(), url = %req.url(), "s3 request");
        Ok(self.client.execute(req).await?)
    }

    #[inline]
    fn signer(&self) -> Signer<'_> {
        Signer::new(&self.secret_key, &self.region)
    }

    #[inline]
    fn format_authorization(
        &self,
        signed_headers: String,
        sign: String,
        date: DateTime<Utc>,
    ) -> String {
        let cred = self.credential(date);
        format!(
            "{algo} Credential={cred},SignedHeaders={signed_headers},Signature={sign}",
            algo = S3_ALGO_VALUE,
            cred = cred,
            signed_headers = signed_headers,
            sign = sign,
        )
    }

    #[inline]
    fn credential(&self, date: DateTime<Utc>) -> String {
        format!(
            "{access_key}/{date}/{region}/s3/aws4_request",
            access_key = &self.access_key,
            date = date.format("%Y%m%d"),
            region = &self.region,
        )
    }
}

#[async_trait]
impl Storage for S3 {
    fn access_key(&self) -> &str {
        &self.access_key
    }

    fn secret_key(&self) -> &str {
        &self.secret_key
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    fn default_acl(&self) -> &str {
        &self.default_acl
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn url(&self, name: &str) -> String {
        let key = join_key([self.location.as_str(), name]);
        format!("{}/{}", self.public_url(), encode_key(&key))
    }

    async fn get_key(&self, key: &str) -> Result<Option<ObjectInfo>> {
        let res = self.execute(self.head_object(key)?).await?;
        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(Some(object_info(&self.bucket, key, res.headers())))
            }
            status => Err(Error::ResponseError {
                status,
                key: key.into(),
            }),
        }
    }

    async fn read(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let res = self.execute(self.get_object_range(key, max_bytes)?).await?;
        let status = res.status();
        // Any range of an empty object is unsatisfiable.
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(Error::ResponseError {
                status,
                key: key.into(),
            });
        }
        let mut body = res.bytes().await?.to_vec();
        body.truncate(max_bytes);
        Ok(body)
    }

    async fn copy(
        &self,
        src_key: &str,
        dst_key: &str,
        metadata: &HashMap<String, String>,
        acl: &str,
    ) -> Result<()> {
        let req = self.copy_object(src_key, dst_key, metadata, acl)?;
        let res = self.execute(req).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::ResponseError {
                status,
                key: dst_key.into(),
            });
        }

        // A copy can fail after S3 has already sent 200 OK.
        let body = res.text().await?;
        match copy_error(&body) {
            Some(err) => {
                tracing::warn!(key = %dst_key, code = %err.code, "s3 copy failed");
                Err(Error::CopyError {
                    key: dst_key.into(),
                    code: err.code,
                    message: err.message,
                })
            }
            None => Ok(()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let res = self.execute(self.delete_object(key)?).await?;
        expect_success(res, key)
    }
}

fn expect_success(res: Response, key: &str) -> Result<()> {
    let status = res.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::ResponseError {
            status,
            key: key.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// The `<Error>` document in a copy response body, if there is one.
fn copy_error(body: &str) -> Option<ErrorBody> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    serde_xml_rs::from_str(body).ok()
}

#[inline]
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn object_info(bucket: &str, key: &str, headers: &HeaderMap) -> ObjectInfo {
    let metadata = headers
        .iter()
        .filter_map(|(name, value)| {
            let meta_key = name.as_str().strip_prefix(S3_META_PREFIX)?;
            Some((meta_key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();

    ObjectInfo {
        bucket: bucket.into(),
        key: key.into(),
        etag: header_str(headers, &ETAG).unwrap_or_default(),
        content_type: header_str(headers, &CONTENT_TYPE).unwrap_or_default(),
        content_length: header_str(headers, &CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        cache_control: header_str(headers, &CACHE_CONTROL),
        content_disposition: header_str(headers, &CONTENT_DISPOSITION),
        content_encoding: header_str(headers, &CONTENT_ENCODING),
        metadata,
    }
}

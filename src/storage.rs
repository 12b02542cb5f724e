use std::collections::HashMap;

use async_trait::async_trait;

use crate::Result;

/// Authoritative metadata of an object as stored in the bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub bucket: String,
    pub key: String,
    pub etag: String,
    pub content_type: String,
    pub content_length: u64,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    /// User metadata (`x-amz-meta-*`), keys without the prefix.
    pub metadata: HashMap<String, String>,
}

impl ObjectInfo {
    /// Metadata to carry over when the object is rewritten: user metadata
    /// plus the HTTP headers S3 stores on the object itself.
    pub fn rewrite_metadata(&self) -> HashMap<String, String> {
        let mut metadata = self.metadata.clone();
        let headers = [
            ("Cache-Control", self.cache_control.as_deref()),
            ("Content-Type", Some(self.content_type.as_str())),
            ("Content-Disposition", self.content_disposition.as_deref()),
            ("Content-Encoding", self.content_encoding.as_deref()),
        ];
        for (name, value) in headers {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                metadata.insert(name.to_string(), value.to_string());
            }
        }
        metadata
    }
}

/// The storage backend the upload and validation forms run against.
#[async_trait]
pub trait Storage: Send + Sync {
    fn access_key(&self) -> &str;

    fn secret_key(&self) -> &str;

    fn bucket_name(&self) -> &str;

    /// ACL applied to processed uploads.
    fn default_acl(&self) -> &str;

    /// Key prefix every stored name lives under, `""` for the bucket root.
    fn location(&self) -> &str;

    /// Headers applied to stored objects, e.g. `Cache-Control`.
    fn headers(&self) -> &HashMap<String, String>;

    /// Public URL of `name`, resolved under [`Storage::location`].
    fn url(&self, name: &str) -> String;

    async fn get_key(&self, key: &str) -> Result<Option<ObjectInfo>>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_key(key).await?.is_some())
    }

    /// Up to `max_bytes` from the start of the object.
    async fn read(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>>;

    /// Server-side copy with replacement metadata and ACL.
    async fn copy(
        &self,
        src_key: &str,
        dst_key: &str,
        metadata: &HashMap<String, String>,
        acl: &str,
    ) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Joins key segments with POSIX path rules: a segment starting with `/`
/// discards what came before it, and empty segments add nothing.
pub fn join_key<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for segment in segments {
        if segment.starts_with('/') {
            joined = segment.to_string();
        } else if joined.is_empty() || joined.ends_with('/') {
            joined.push_str(segment);
        } else {
            joined.push('/');
            joined.push_str(segment);
        }
    }
    joined
}

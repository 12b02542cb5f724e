use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use md5::{Digest, Md5};

use crate::{
    detect_content_type, join_key, Error, ObjectInfo, Result, Storage, DEFAULT_UPLOAD_TO,
    PROBE_BYTES,
};

pub const DEFAULT_PROCESS_TO: &str = "processed/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,
    #[error("Bucket name does not validate.")]
    BucketMismatch,
    #[error("Key does not have required prefix.")]
    KeyPrefixMismatch,
    #[error("Key does not exist.")]
    KeyNotFound,
    #[error("Etag does not validate.")]
    EtagMismatch,
    #[error("Content-Type does not validate.")]
    ContentTypeMismatch,
}

/// Field of the redirect data an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadField {
    BucketName,
    KeyName,
    Etag,
    /// Checks spanning several fields.
    All,
}

impl fmt::Display for UploadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BucketName => "bucket_name",
            Self::KeyName => "key_name",
            Self::Etag => "etag",
            Self::All => "__all__",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(UploadField, ValidationError)>);

impl ValidationErrors {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(UploadField, ValidationError)> {
        self.0.iter()
    }

    pub fn field(&self, field: UploadField) -> Vec<ValidationError> {
        self.0
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, e)| *e)
            .collect()
    }

    pub fn contains(&self, error: ValidationError) -> bool {
        self.0.iter().any(|(_, e)| *e == error)
    }

    fn push(&mut self, field: UploadField, error: ValidationError) {
        tracing::warn!(field = %field, error = %error, "upload failed validation");
        self.0.push((field, error));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = self
            .0
            .iter()
            .map(|(field, error)| format!("{}: {}", field, error))
            .collect::<Vec<String>>()
            .join("; ");
        write!(f, "{}", msg)
    }
}

impl std::error::Error for ValidationErrors {}

/// What S3 reports back about a finished upload, via the redirect query
/// string or a script's POST.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadRedirect {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub etag: Option<String>,
}

impl UploadRedirect {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        etag: impl Into<String>,
    ) -> Self {
        Self {
            bucket: Some(bucket.into()),
            key: Some(key.into()),
            etag: Some(etag.into()),
        }
    }

    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            bucket: params.get("bucket").cloned(),
            key: params.get("key").cloned(),
            etag: params.get("etag").cloned(),
        }
    }
}

/// Builds the file name of a processed upload from its original key.
pub type KeyNameGenerator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Validates the data S3 returns after an upload against the bucket.
pub struct ValidateUploadForm<'s> {
    storage: &'s dyn Storage,
    content_type_prefix: String,
    upload_to: String,
    process_to: String,
    key_name_generator: Option<KeyNameGenerator>,
}

impl<'s> ValidateUploadForm<'s> {
    pub fn new(storage: &'s dyn Storage) -> Self {
        Self {
            storage,
            content_type_prefix: String::new(),
            upload_to: DEFAULT_UPLOAD_TO.into(),
            process_to: DEFAULT_PROCESS_TO.into(),
            key_name_generator: None,
        }
    }

    pub fn with_content_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.content_type_prefix = prefix.into();
        self
    }

    pub fn with_upload_to(mut self, upload_to: impl Into<String>) -> Self {
        self.upload_to = upload_to.into();
        self
    }

    pub fn with_process_to(mut self, process_to: impl Into<String>) -> Self {
        self.process_to = process_to.into();
        self
    }

    pub fn with_key_name_generator(mut self, generator: Option<KeyNameGenerator>) -> Self {
        self.key_name_generator = generator;
        self
    }

    pub fn key_prefix(&self) -> String {
        join_key([self.storage.location(), self.upload_to.as_str()])
    }

    /// Runs every check against the bucket. Failed checks come back as
    /// `Error::Validation`; storage failures as any other `Error`.
    pub async fn validate(&self, data: &UploadRedirect) -> Result<ValidatedUpload<'s>> {
        let mut errors = ValidationErrors::default();

        let bucket = required(&data.bucket, UploadField::BucketName, &mut errors);
        let etag = required(&data.etag, UploadField::Etag, &mut errors);
        let key = required(&data.key, UploadField::KeyName, &mut errors);

        if let Some(bucket) = bucket {
            if bucket != self.storage.bucket_name() {
                errors.push(UploadField::BucketName, ValidationError::BucketMismatch);
            }
        }

        let mut object = None;
        if let Some(key) = key {
            if !key.starts_with(&self.key_prefix()) || has_dot_segment(key) {
                errors.push(UploadField::KeyName, ValidationError::KeyPrefixMismatch);
            } else {
                object = self.storage.get_key(key).await?;
                if object.is_none() {
                    errors.push(UploadField::KeyName, ValidationError::KeyNotFound);
                }
            }
        }

        let mut content_type = None;
        if let (Some(object), Some(etag)) = (&object, etag) {
            content_type = self.clean_object(object, etag, &mut errors).await?;
        }

        match (object, content_type) {
            (Some(object), Some(content_type)) if errors.is_empty() => {
                tracing::debug!(key = %object.key, content_type = %content_type, "upload validated");
                Ok(ValidatedUpload {
                    storage: self.storage,
                    object,
                    content_type,
                    process_to: self.process_to.clone(),
                    key_name_generator: self.key_name_generator.clone(),
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }

    /// Checks needing both the stored object and the reported etag. Stops
    /// at the first failure; returns the probed content type on success.
    async fn clean_object(
        &self,
        object: &ObjectInfo,
        etag: &str,
        errors: &mut ValidationErrors,
    ) -> Result<Option<String>> {
        if object.etag != etag {
            errors.push(UploadField::All, ValidationError::EtagMismatch);
            return Ok(None);
        }
        if !object.content_type.starts_with(&self.content_type_prefix) {
            errors.push(UploadField::All, ValidationError::ContentTypeMismatch);
            return Ok(None);
        }

        let head = if object.content_length == 0 {
            Vec::new()
        } else {
            self.storage.read(&object.key, PROBE_BYTES).await?
        };
        let content_type = detect_content_type(&head);
        if !content_type.starts_with(&self.content_type_prefix) {
            errors.push(UploadField::All, ValidationError::ContentTypeMismatch);
            return Ok(None);
        }
        Ok(Some(content_type))
    }
}

/// `.` and `..` segments would be resolved away in an object URL.
fn has_dot_segment(key: &str) -> bool {
    key.split('/').any(|segment| segment == "." || segment == "..")
}

fn required<'a>(
    value: &'a Option<String>,
    field: UploadField,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(field, ValidationError::Required);
            None
        }
    }
}

/// Where a processed upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedUpload {
    pub key: String,
    pub acl: String,
    pub metadata: HashMap<String, String>,
}

/// An upload that passed validation.
pub struct ValidatedUpload<'s> {
    storage: &'s dyn Storage,
    object: ObjectInfo,
    content_type: String,
    process_to: String,
    key_name_generator: Option<KeyNameGenerator>,
}

impl<'s> ValidatedUpload<'s> {
    /// Stored metadata of the uploaded object.
    #[inline]
    pub fn object(&self) -> &ObjectInfo {
        &self.object
    }

    /// Content type probed from the uploaded bytes.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn processed_key_name(&self) -> String {
        let name = match &self.key_name_generator {
            Some(generator) => generator(&self.object.key),
            None => default_key_name(&self.object.key),
        };
        join_key([
            self.storage.location(),
            self.process_to.as_str(),
            name.as_str(),
        ])
    }

    /// Copies the upload to its processed key with the storage default ACL
    /// and deletes the original.
    ///
    /// The copy and delete are separate calls; a failed delete leaves both
    /// objects in the bucket.
    pub async fn process_upload(&self, set_content_type: bool) -> Result<ProcessedUpload> {
        let mut metadata = self.object.rewrite_metadata();
        if set_content_type {
            metadata.insert("Content-Type".into(), self.content_type.clone());
        }

        let key = self.processed_key_name();
        let acl = self.storage.default_acl().to_string();

        self.storage
            .copy(&self.object.key, &key, &metadata, &acl)
            .await?;
        self.storage.delete(&self.object.key).await?;

        tracing::info!(from = %self.object.key, to = %key, acl = %acl, "processed upload");
        Ok(ProcessedUpload { key, acl, metadata })
    }
}

/// `md5(timestamp + key)` in hex, keeping the file extension.
pub fn default_key_name(key: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
    let digest = Md5::digest(format!("{}{}", timestamp, key).as_bytes());

    let file_name = key.rsplit('/').next().unwrap_or(key);
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => format!(".{}", ext),
        None => String::new(),
    };
    format!("{}{}", hex::encode(digest), extension)
}

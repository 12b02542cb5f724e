use std::env;

use chrono::Duration;

use crate::{Error, Result};

/// Upload behaviour shared by the forms and the view.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Lifetime of a signed upload policy (default: 30 minutes)
    pub expiration: Duration,

    /// Rewrite the stored Content-Type with the probed one when an
    /// upload is processed (default: true)
    pub set_content_type: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            expiration: Duration::minutes(30),
            set_content_type: true,
        }
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            expiration: env::var("S3UPLOAD_EXPIRATION_SECONDS")
                .ok()
                .and_then(|v| parse_expiration(&v))
                .unwrap_or(default.expiration),

            set_content_type: env::var("S3UPLOAD_SET_CONTENT_TYPE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.set_content_type),
        }
    }
}

/// Whole seconds, `None` when unparsable or beyond what `Duration` holds.
fn parse_expiration(value: &str) -> Option<Duration> {
    value.trim().parse().ok().and_then(Duration::try_seconds)
}

/// Connection details of the S3 bucket uploads go to.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// default: "us-east-1"
    pub region: String,
    /// default: "s3.amazonaws.com"
    pub endpoint: String,
    /// Key prefix all stored names live under (default: bucket root)
    pub location: String,
    /// ACL given to processed uploads (default: "public-read")
    pub default_acl: String,
    pub cache_control: Option<String>,
}

impl StorageSettings {
    pub fn new(
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: "us-east-1".into(),
            endpoint: "s3.amazonaws.com".into(),
            location: String::new(),
            default_acl: "public-read".into(),
            cache_control: None,
        }
    }

    /// Load storage settings from environment variables. Bucket and
    /// credentials are required.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::new(
            required("S3UPLOAD_BUCKET")?,
            required("S3UPLOAD_ACCESS_KEY")?,
            required("S3UPLOAD_SECRET_KEY")?,
        );

        if let Ok(region) = env::var("S3UPLOAD_REGION") {
            settings.region = region;
        }
        if let Ok(endpoint) = env::var("S3UPLOAD_ENDPOINT") {
            settings.endpoint = endpoint;
        }
        if let Ok(location) = env::var("S3UPLOAD_LOCATION") {
            settings.location = location;
        }
        if let Ok(acl) = env::var("S3UPLOAD_DEFAULT_ACL") {
            settings.default_acl = acl;
        }
        settings.cache_control = env::var("S3UPLOAD_CACHE_CONTROL")
            .ok()
            .filter(|v| !v.is_empty());

        Ok(settings)
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::ConfigError(format!("{} must be set", name)))
}

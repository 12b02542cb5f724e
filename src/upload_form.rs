use chrono::{DateTime, Utc};

use crate::s3_constant::*;
use crate::{join_key, Policy, PolicyOptions, PolicySigner, Result, Settings, Storage};

pub const DEFAULT_UPLOAD_TO: &str = "incoming/";

/// How the browser reports a finished upload back to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStyle {
    /// S3 answers 204 and redirects the browser to `success_action_redirect`.
    #[default]
    Standard,
    /// S3 answers 201 with an XML body; a script uploader posts the result
    /// back itself.
    Dropzone,
}

impl FormStyle {
    #[inline]
    pub fn success_action_status(&self) -> u16 {
        match self {
            FormStyle::Standard => 204,
            FormStyle::Dropzone => 201,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub value: String,
}

/// Everything a page needs to POST a file straight to the bucket.
#[derive(Debug, Clone, Serialize)]
pub struct PostUploadForm {
    pub upload_url: String,
    /// Hidden fields, in submission order.
    pub fields: Vec<FormField>,
    /// Name of the file input. S3 ignores anything submitted after it.
    pub file_field: &'static str,
}

impl PostUploadForm {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Form for uploading a file directly to an S3 bucket.
///
/// The policy expiration is fixed when the form is created, so the policy
/// and signature stay consistent for the life of the form.
pub struct UploadForm<'s> {
    storage: &'s dyn Storage,
    content_type_prefix: String,
    upload_to: String,
    success_action_redirect: Option<String>,
    style: FormStyle,
    expiration: DateTime<Utc>,
}

impl<'s> UploadForm<'s> {
    pub fn new(storage: &'s dyn Storage, settings: &Settings) -> Self {
        Self {
            storage,
            content_type_prefix: String::new(),
            upload_to: DEFAULT_UPLOAD_TO.into(),
            success_action_redirect: None,
            style: FormStyle::Standard,
            expiration: Utc::now()
                .checked_add_signed(settings.expiration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn with_style(mut self, style: FormStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_content_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.content_type_prefix = prefix.into();
        self
    }

    pub fn with_upload_to(mut self, upload_to: impl Into<String>) -> Self {
        self.upload_to = upload_to.into();
        self
    }

    pub fn with_success_action_redirect(mut self, redirect: Option<String>) -> Self {
        self.success_action_redirect = redirect.filter(|r| !r.is_empty());
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = expiration;
        self
    }

    #[inline]
    pub fn access_key(&self) -> &str {
        self.storage.access_key()
    }

    /// Uploads land private; the final ACL is applied when the upload is
    /// processed.
    #[inline]
    pub fn acl(&self) -> &'static str {
        "private"
    }

    pub fn action(&self) -> String {
        let url = self.storage.url("");
        let location = self.storage.location();
        if location.is_empty() {
            return url;
        }
        let suffix = join_key([location, ""]);
        match url.strip_suffix(suffix.as_str()) {
            Some(root) => root.to_string(),
            None => url,
        }
    }

    pub fn cache_control(&self) -> &str {
        self.storage
            .headers()
            .get("Cache-Control")
            .map(String::as_str)
            .unwrap_or("")
    }

    #[inline]
    pub fn content_type_prefix(&self) -> &str {
        &self.content_type_prefix
    }

    #[inline]
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn key_prefix(&self) -> String {
        join_key([self.storage.location(), self.upload_to.as_str()])
    }

    /// Key template; S3 substitutes the client's file name.
    pub fn key(&self) -> String {
        format!("{}{}", self.key_prefix(), FILENAME_PLACEHOLDER)
    }

    #[inline]
    pub fn success_action_redirect(&self) -> Option<&str> {
        self.success_action_redirect.as_deref()
    }

    #[inline]
    pub fn success_action_status(&self) -> u16 {
        self.style.success_action_status()
    }

    pub fn policy(&self) -> Policy {
        let key_prefix = self.key_prefix();
        let options = PolicyOptions {
            acl: self.acl(),
            bucket: self.storage.bucket_name(),
            key_prefix: &key_prefix,
            content_type_prefix: &self.content_type_prefix,
            success_action_status: self.success_action_status(),
            cache_control: Some(self.cache_control()),
            success_action_redirect: self.success_action_redirect(),
        };
        Policy::from_options(self.expiration, &options)
    }

    pub fn signature(&self) -> Result<String> {
        Ok(PolicySigner::new(self.storage.secret_key()).sign_policy(&self.policy())?)
    }

    pub fn fields(&self) -> Result<Vec<FormField>> {
        let policy = self.policy();
        let signature = PolicySigner::new(self.storage.secret_key()).sign_policy(&policy)?;

        let mut fields = vec![
            field(FIELD_ACCESS_KEY, self.access_key()),
            field(FIELD_ACL, self.acl()),
        ];
        let cache_control = self.cache_control();
        if !cache_control.is_empty() {
            fields.push(field(FIELD_CACHE_CONTROL, cache_control));
        }
        fields.push(field(FIELD_CONTENT_TYPE, DEFAULT_UPLOAD_CONTENT_TYPE));
        fields.push(field(FIELD_KEY, self.key()));
        fields.push(field(FIELD_POLICY, policy.encode()));
        if let Some(redirect) = self.success_action_redirect() {
            fields.push(field(FIELD_SUCCESS_ACTION_REDIRECT, redirect));
        }
        fields.push(field(
            FIELD_SUCCESS_ACTION_STATUS,
            self.success_action_status().to_string(),
        ));
        fields.push(field(FIELD_SIGNATURE, signature));

        Ok(fields)
    }

    pub fn build(&self) -> Result<PostUploadForm> {
        let form = PostUploadForm {
            upload_url: self.action(),
            fields: self.fields()?,
            file_field: FIELD_FILE,
        };
        tracing::debug!(
            bucket = self.storage.bucket_name(),
            key_prefix = %self.key_prefix(),
            expiration = %self.expiration,
            "built upload form"
        );
        Ok(form)
    }
}

#[inline]
fn field(name: &'static str, value: impl Into<String>) -> FormField {
    FormField {
        name,
        value: value.into(),
    }
}

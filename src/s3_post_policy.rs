use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Ordered list of POST policy conditions.
///
/// See <https://docs.aws.amazon.com/AmazonS3/latest/dev/HTTPPOSTForms.html#HTTPPOSTConstructPolicy>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conditions(Vec<Value>);

impl Conditions {
    #[inline]
    pub fn new() -> Self {
        Self(vec![])
    }

    /// Exact match written in object form: `{"acl": "private"}`.
    pub fn insert_match(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut clause = serde_json::Map::new();
        clause.insert(key.into(), Value::String(value.into()));
        self.0.push(Value::Object(clause));
    }

    /// `["eq", "$field", "value"]`
    pub fn insert_eq(&mut self, field: &str, value: impl Into<String>) {
        let field = format!("${}", field);
        self.0.push(json!(["eq", field, value.into()]));
    }

    /// `["starts-with", "$field", "prefix"]`. An empty prefix allows any value.
    pub fn insert_starts_with(&mut self, field: &str, prefix: impl Into<String>) {
        let field = format!("${}", field);
        self.0.push(json!(["starts-with", field, prefix.into()]));
    }

    pub fn insert_range_number(&mut self, key: impl Into<String>, from: u64, to: u64) {
        self.0.push(json!([key.into(), from, to]));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

/// Inputs of the policy an upload form hands to the browser.
#[derive(Debug, Clone)]
pub struct PolicyOptions<'a> {
    pub acl: &'a str,
    pub bucket: &'a str,
    pub key_prefix: &'a str,
    pub content_type_prefix: &'a str,
    pub success_action_status: u16,
    pub cache_control: Option<&'a str>,
    pub success_action_redirect: Option<&'a str>,
}

impl<'a> PolicyOptions<'a> {
    pub fn conditions(&self) -> Conditions {
        let mut conditions = Conditions::new();

        conditions.insert_match("acl", self.acl);
        conditions.insert_match("bucket", self.bucket);
        conditions.insert_starts_with("Content-Type", self.content_type_prefix);
        conditions.insert_starts_with("key", self.key_prefix);
        conditions.insert_eq(
            "success_action_status",
            self.success_action_status.to_string(),
        );
        if let Some(cache_control) = self.cache_control.filter(|v| !v.is_empty()) {
            conditions.insert_eq("Cache-Control", cache_control);
        }
        if let Some(redirect) = self.success_action_redirect.filter(|v| !v.is_empty()) {
            conditions.insert_eq("success_action_redirect", redirect);
        }

        conditions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    expiration: String,
    conditions: Conditions,
}

impl Policy {
    pub fn new(expiration: DateTime<Utc>, conditions: Conditions) -> Self {
        let expiration = expiration.to_rfc3339_opts(SecondsFormat::Secs, true);
        Self {
            expiration,
            conditions,
        }
    }

    pub fn from_options(expiration: DateTime<Utc>, options: &PolicyOptions<'_>) -> Self {
        Self::new(expiration, options.conditions())
    }

    #[inline]
    pub fn expiration(&self) -> &str {
        &self.expiration
    }

    #[inline]
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Base64 of the compact JSON document. The standard engine never wraps
    /// lines, so the result carries no newline.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_json())
    }
}

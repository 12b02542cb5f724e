pub const S3_ALGO_KEY: &str = "X-Amz-Algorithm";
pub const S3_CRED_KEY: &str = "X-Amz-Credential";
pub const S3_DATE_KEY: &str = "X-Amz-Date";
pub const S3_SIGNATURE_KEY: &str = "X-Amz-Signature";
pub const S3_CONTENT_KEY: &str = "X-Amz-Content-Sha256";
pub const S3_ALGO_VALUE: &str = "AWS4-HMAC-SHA256";

pub const S3_ACL_HEADER: &str = "x-amz-acl";
pub const S3_COPY_SOURCE_HEADER: &str = "x-amz-copy-source";
pub const S3_METADATA_DIRECTIVE_HEADER: &str = "x-amz-metadata-directive";
pub const S3_META_PREFIX: &str = "x-amz-meta-";

// Browser POST upload field names.
pub const FIELD_ACCESS_KEY: &str = "AWSAccessKeyId";
pub const FIELD_ACL: &str = "acl";
pub const FIELD_CACHE_CONTROL: &str = "Cache-Control";
pub const FIELD_CONTENT_TYPE: &str = "Content-Type";
pub const FIELD_KEY: &str = "key";
pub const FIELD_POLICY: &str = "policy";
pub const FIELD_SIGNATURE: &str = "signature";
pub const FIELD_SUCCESS_ACTION_REDIRECT: &str = "success_action_redirect";
pub const FIELD_SUCCESS_ACTION_STATUS: &str = "success_action_status";
pub const FIELD_FILE: &str = "file";

pub const FILENAME_PLACEHOLDER: &str = "${filename}";
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "binary/octet-stream";

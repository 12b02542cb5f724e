use std::collections::HashMap;
use std::sync::Arc;

use reqwest::{Method, StatusCode, Url};

use crate::{
    Error, FormStyle, KeyNameGenerator, PostUploadForm, Result, Settings, Storage, UploadForm,
    UploadRedirect, ValidateUploadForm, ValidatedUpload, DEFAULT_PROCESS_TO, DEFAULT_UPLOAD_TO,
};

pub const INVALID_UPLOAD_MESSAGE: &str = "Upload does not validate.";

/// An incoming HTTP request, reduced to what the upload view reads.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub method: Method,
    /// Absolute URI the request was made to.
    pub uri: Url,
    /// Query and form parameters, merged.
    pub params: HashMap<String, String>,
    pub is_ajax: bool,
}

impl UploadRequest {
    pub fn get(uri: Url) -> Self {
        let params = uri.query_pairs().into_owned().collect();
        Self {
            method: Method::GET,
            uri,
            params,
            is_ajax: false,
        }
    }

    pub fn post(uri: Url, form: HashMap<String, String>) -> Self {
        let mut params: HashMap<String, String> = uri.query_pairs().into_owned().collect();
        params.extend(form);
        Self {
            method: Method::POST,
            uri,
            params,
            is_ajax: false,
        }
    }

    pub fn ajax(mut self) -> Self {
        self.is_ajax = true;
        self
    }
}

#[derive(Debug, Clone)]
pub enum UploadResponse {
    /// Render the upload form.
    Form(PostUploadForm),
    /// Upload accepted, nothing to show.
    Empty,
    Redirect(String),
    BadRequest(&'static str),
    MethodNotAllowed,
}

impl UploadResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Form(_) | Self::Empty => StatusCode::OK,
            Self::Redirect(_) => StatusCode::FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// Serves the upload form and handles S3 coming back after an upload.
///
/// GET renders the form. A GET carrying `key` (S3's redirect) or a POST
/// (a script reporting S3's response) validates the upload and, when it
/// passes, processes it.
pub struct UploadView {
    storage: Arc<dyn Storage>,
    settings: Settings,
    style: FormStyle,
    content_type_prefix: String,
    upload_to: String,
    process_to: String,
    key_name_generator: Option<KeyNameGenerator>,
    success_url: Option<String>,
}

impl UploadView {
    pub fn new(storage: Arc<dyn Storage>, settings: Settings) -> Self {
        Self {
            storage,
            settings,
            style: FormStyle::Standard,
            content_type_prefix: String::new(),
            upload_to: DEFAULT_UPLOAD_TO.into(),
            process_to: DEFAULT_PROCESS_TO.into(),
            key_name_generator: None,
            success_url: None,
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

    pub fn with_process_to(mut self, process_to: impl Into<String>) -> Self {
        self.process_to = process_to.into();
        self
    }

    pub fn with_key_name_generator(mut self, generator: KeyNameGenerator) -> Self {
        self.key_name_generator = Some(generator);
        self
    }

    pub fn with_success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    pub async fn handle(&self, request: &UploadRequest) -> Result<UploadResponse> {
        if request.method == Method::GET {
            // S3 redirects back with the key in the query string.
            if request.params.contains_key("key") {
                return self.validate_upload(request).await;
            }
            return self.render_form(request);
        }
        if request.method == Method::POST {
            return self.validate_upload(request).await;
        }
        Ok(UploadResponse::MethodNotAllowed)
    }

    /// Where S3 sends the browser after a standard upload: back here.
    pub fn success_action_redirect(&self, request: &UploadRequest) -> Option<String> {
        match self.style {
            FormStyle::Standard => Some(request.uri.to_string()),
            FormStyle::Dropzone => None,
        }
    }

    pub fn form(&self, request: &UploadRequest) -> UploadForm<'_> {
        UploadForm::new(self.storage.as_ref(), &self.settings)
            .with_style(self.style)
            .with_content_type_prefix(self.content_type_prefix.as_str())
            .with_upload_to(self.upload_to.as_str())
            .with_success_action_redirect(self.success_action_redirect(request))
    }

    fn render_form(&self, request: &UploadRequest) -> Result<UploadResponse> {
        Ok(UploadResponse::Form(self.form(request).build()?))
    }

    async fn validate_upload(&self, request: &UploadRequest) -> Result<UploadResponse> {
        let data = UploadRedirect::from_params(&request.params);
        let form = ValidateUploadForm::new(self.storage.as_ref())
            .with_content_type_prefix(self.content_type_prefix.as_str())
            .with_upload_to(self.upload_to.as_str())
            .with_process_to(self.process_to.as_str())
            .with_key_name_generator(self.key_name_generator.clone());

        match form.validate(&data).await {
            Ok(upload) => self.form_valid(upload, request).await,
            Err(Error::Validation(errors)) => {
                tracing::debug!(errors = %errors, "rejecting upload");
                Ok(UploadResponse::BadRequest(INVALID_UPLOAD_MESSAGE))
            }
            Err(e) => Err(e),
        }
    }

    async fn form_valid(
        &self,
        upload: ValidatedUpload<'_>,
        request: &UploadRequest,
    ) -> Result<UploadResponse> {
        upload
            .process_upload(self.settings.set_content_type)
            .await?;
        if request.is_ajax {
            return Ok(UploadResponse::Empty);
        }
        match &self.success_url {
            Some(url) => Ok(UploadResponse::Redirect(url.clone())),
            None => Err(Error::ConfigError(
                "No URL to redirect to. Provide a success_url.".into(),
            )),
        }
    }
}

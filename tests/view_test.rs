mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{MemoryStorage, ETAG, PNG_BYTES};
use reqwest::{Method, StatusCode, Url};
use s3_post_upload::{
    Error, FormStyle, Settings, UploadRequest, UploadResponse, UploadView, INVALID_UPLOAD_MESSAGE,
};

const PAGE: &str = "https://app.example.com/upload/";

fn view(storage: &Arc<MemoryStorage>) -> UploadView {
    UploadView::new(storage.clone(), Settings::default()).with_success_url("/uploaded/")
}

fn redirect_back(key: &str, etag: &str) -> UploadRequest {
    let mut uri = Url::parse(PAGE).unwrap();
    uri.query_pairs_mut()
        .append_pair("bucket", "b")
        .append_pair("key", key)
        .append_pair("etag", etag);
    UploadRequest::get(uri)
}

#[tokio::test]
async fn test_get_renders_upload_form() {
    let storage = Arc::new(MemoryStorage::new("b"));
    let response = view(&storage)
        .handle(&UploadRequest::get(Url::parse(PAGE).unwrap()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let form = match response {
        UploadResponse::Form(form) => form,
        other => panic!("expected form, got {:?}", other),
    };
    assert_eq!(form.get("acl"), Some("private"));
    assert_eq!(form.get("key"), Some("incoming/${filename}"));
    assert_eq!(form.get("success_action_redirect"), Some(PAGE));
    assert_eq!(form.get("success_action_status"), Some("204"));
}

#[tokio::test]
async fn test_redirect_back_validates_and_processes() {
    let storage = Arc::new(MemoryStorage::new("b"));
    storage.put("incoming/x.png", PNG_BYTES, "binary/octet-stream", ETAG);

    let response = view(&storage)
        .handle(&redirect_back("incoming/x.png", ETAG))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(matches!(response, UploadResponse::Redirect(ref url) if url == "/uploaded/"));

    let keys = storage.keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("processed/") && keys[0].ends_with(".png"));
    assert!(storage.object("incoming/x.png").is_none());
}

#[tokio::test]
async fn test_invalid_upload_is_bad_request() {
    let storage = Arc::new(MemoryStorage::new("b"));
    storage.put("incoming/x.png", PNG_BYTES, "image/png", ETAG);

    let response = view(&storage)
        .handle(&redirect_back("incoming/x.png", "\"wrong\""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(matches!(response, UploadResponse::BadRequest(msg) if msg == INVALID_UPLOAD_MESSAGE));
    assert!(storage.object("incoming/x.png").is_some());
    assert!(storage.calls().is_empty());
}

#[tokio::test]
async fn test_dropzone_post_returns_empty_for_ajax() {
    let storage = Arc::new(MemoryStorage::new("b"));
    storage.put("incoming/x.png", PNG_BYTES, "image/png", ETAG);
    let view = UploadView::new(storage.clone(), Settings::default())
        .with_style(FormStyle::Dropzone)
        .with_content_type_prefix("image/");

    let form = match view
        .handle(&UploadRequest::get(Url::parse(PAGE).unwrap()))
        .await
        .unwrap()
    {
        UploadResponse::Form(form) => form,
        other => panic!("expected form, got {:?}", other),
    };
    assert_eq!(form.get("success_action_status"), Some("201"));
    assert!(form.get("success_action_redirect").is_none());

    let mut data = HashMap::new();
    data.insert("bucket".to_string(), "b".to_string());
    data.insert("key".to_string(), "incoming/x.png".to_string());
    data.insert("etag".to_string(), ETAG.to_string());
    let request = UploadRequest::post(Url::parse(PAGE).unwrap(), data).ajax();

    let response = view.handle(&request).await.unwrap();
    assert!(matches!(response, UploadResponse::Empty));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(storage.calls().len(), 2);
}

#[tokio::test]
async fn test_missing_success_url_is_config_error() {
    let storage = Arc::new(MemoryStorage::new("b"));
    storage.put("incoming/x.png", PNG_BYTES, "image/png", ETAG);
    let view = UploadView::new(storage.clone(), Settings::default());

    let result = view.handle(&redirect_back("incoming/x.png", ETAG)).await;
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let storage = Arc::new(MemoryStorage::new("b"));
    let mut request = UploadRequest::get(Url::parse(PAGE).unwrap());
    request.method = Method::PUT;

    let response = view(&storage).handle(&request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

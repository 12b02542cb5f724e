use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use s3_post_upload::{PostUploadForm, Settings, StorageSettings, UploadForm, S3};
use tracing_subscriber::EnvFilter;

// Reads S3UPLOAD_BUCKET, S3UPLOAD_ACCESS_KEY, S3UPLOAD_SECRET_KEY (and the
// optional S3UPLOAD_* settings) from the environment or a .env file.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let s3 = S3::from_settings(&StorageSettings::from_env()?);
    let settings = Settings::from_env();

    // What the browser would receive as hidden form fields.
    let PostUploadForm {
        upload_url,
        fields,
        file_field,
    } = UploadForm::new(&s3, &settings)
        .with_content_type_prefix("text/")
        .build()?;

    let mut form = Form::new();
    for field in fields {
        // The browser picks the real type; the policy only pins its prefix.
        let value = if field.name == "Content-Type" {
            "text/plain".to_string()
        } else {
            field.value
        };
        form = form.text(field.name, value);
    }
    let part = Part::text("Hello world").file_name("hello.txt");
    form = form.part(file_field, part);

    let res = reqwest::Client::new()
        .post(&upload_url)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    println!("uploaded to {}", upload_url);

    Ok(())
}

use std::env;

use s3_post_upload::{Settings, StorageSettings, UploadRedirect, ValidateUploadForm, S3};
use tracing_subscriber::EnvFilter;

// Usage: validate_upload <key> <etag>
//
// Checks an object uploaded through the POST form and moves it under
// processed/, as the view does when S3 redirects back.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let (key, etag) = match (args.next(), args.next()) {
        (Some(key), Some(etag)) => (key, etag),
        _ => return Err("usage: validate_upload <key> <etag>".into()),
    };

    let storage_settings = StorageSettings::from_env()?;
    let s3 = S3::from_settings(&storage_settings);
    let settings = Settings::from_env();

    let data = UploadRedirect::new(storage_settings.bucket.as_str(), key, etag);
    let upload = ValidateUploadForm::new(&s3).validate(&data).await?;
    println!("{} is {}", upload.object().key, upload.content_type());

    let processed = upload.process_upload(settings.set_content_type).await?;
    println!("moved to {} ({})", processed.key, processed.acl);

    Ok(())
}

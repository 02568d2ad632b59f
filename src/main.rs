use dvdirect::{Config, DirectUploadClient, UploadRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_file("config.toml")?;
    let client = DirectUploadClient::from_config(&config)?;

    let mut request = UploadRequest::new(&config.persistent_id, &config.file_path);
    if let Some(description) = &config.description {
        request = request.with_description(description);
    }

    let report = client.upload(&request).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "status": report.status,
            "data": report.data,
        }))?
    );

    if !report.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

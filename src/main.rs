use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;

use r2_uploader::config::Config;
use r2_uploader::metadata::{MetadataClient, MetadataRecorder};
use r2_uploader::s3_client::S3Client;
use r2_uploader::upload::{upload_video, UploadRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up the project .env if there is one
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Loading configuration")?;

    println!("{}", "=".repeat(70));
    println!("Cloudflare R2 + Supabase video upload test");
    println!("{}", "=".repeat(70));

    let s3_client = S3Client::new(&config.r2);

    let recorder = config.supabase.as_ref().map(MetadataClient::new);
    if recorder.is_none() {
        println!("Supabase environment not set, metadata saves will be skipped");
    }

    println!("\nChecking bucket connectivity...");
    s3_client
        .head_bucket()
        .await
        .with_context(|| format!("Failed to reach bucket '{}'", config.r2.bucket))?;
    println!("Connected to bucket '{}'", config.r2.bucket);

    match s3_client.list_objects("", 5).await {
        Ok(objects) if objects.is_empty() => println!("Bucket is empty"),
        Ok(objects) => {
            println!("\nObjects in bucket ({} shown):", objects.len());
            for obj in &objects {
                println!("  - {} ({:.2} MB)", obj.key, obj.size as f64 / 1_048_576.0);
            }
        }
        Err(e) => eprintln!("Listing failed: {e}"),
    }

    println!("\n{}", "=".repeat(70));
    let file = prompt("File path to upload (Enter to skip): ")?;
    if file.is_empty() {
        println!("Upload skipped");
        return Ok(());
    }

    let file_path = PathBuf::from(file);
    if !file_path.exists() {
        eprintln!("File not found: {}", file_path.display());
        return Ok(());
    }

    let title = prompt("Title (Enter to use the file name): ")?;
    let description = prompt("Description (Enter to skip): ")?;

    let request = UploadRequest {
        file_path,
        user_id: config.user_id.clone(),
        title: (!title.is_empty()).then_some(title),
        description: (!description.is_empty()).then_some(description),
    };

    let result = upload_video(
        &s3_client,
        recorder.as_ref().map(|r| r as &dyn MetadataRecorder),
        config.public_domain.as_deref(),
        request,
    )
    .await;

    match result {
        Ok(result) => {
            println!("\n{}", "=".repeat(70));
            println!("Done");
            println!("{}", "=".repeat(70));
            println!("Video id:    {}", result.video_id);
            println!("Upload:      ok ({:.2}s)", result.upload_seconds);
            if result.metadata_saved {
                println!("Metadata:    saved");
            } else {
                println!("Metadata:    not saved");
                if let Some(reason) = &result.metadata_error {
                    println!("  reason: {reason}");
                }
            }
            if let Some(url) = &result.public_url {
                println!("Public URL:  {url}");
            }
        }
        Err(e) => eprintln!("\nUpload failed: {e}"),
    }

    Ok(())
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

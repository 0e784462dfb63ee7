//! Runs the upload widget against an image on disk, then saves the result.
//!
//! ```sh
//! cargo run -p tester -- plan.png --token $TOKEN
//! cargo run -p tester -- plan.png --out ../save.json
//! ```
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use roomify::{Event, FileHandle, Upload, UploadDriver, View, upload::has_accepted_extension};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Floor plan image, .jpg, .jpeg or .png
    path: PathBuf,

    #[arg(long, default_value = "http://127.0.0.1:1111")]
    server: String,

    /// Bearer token issued by the identity service
    #[arg(long)]
    token: Option<String>,

    /// Project id, random when omitted
    #[arg(long)]
    id: Option<String>,

    /// Write the save body here instead of posting it
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let file = FileHandle::from_path(&args.path);
    // what the picker's accept filter would have allowed
    if !has_accepted_extension(file.name()) {
        bail!("{} is not a .jpg, .jpeg or .png file", args.path.display());
    }

    let signed_in = args.token.is_some() || args.out.is_some();
    if !signed_in {
        bail!("Please sign in to upload your floor plan (--token)");
    }

    let name = file.name().to_string();
    let encoded = run_widget(file).await?;

    let id = args.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let body = json!({
        "project": {
            "id": id,
            "sourceImage": encoded,
            "name": name,
        }
    });

    if let Some(out) = args.out {
        tokio::fs::write(&out, serde_json::to_vec_pretty(&body)?).await?;
        println!("Wrote save body for {id} to {}", out.display());
        return Ok(());
    }

    let Some(token) = args.token else {
        bail!("Missing --token");
    };

    let response = Client::new()
        .post(format!(
            "{}/api/projects/save",
            args.server.trim_end_matches('/')
        ))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let reply: Value = response.json().await?;

    if !status.is_success() {
        bail!("Save failed with {status}: {reply}");
    }

    println!("Saved project {}", reply["id"]);

    Ok(())
}

async fn run_widget(file: FileHandle) -> anyhow::Result<String> {
    let (sender, receiver) = oneshot::channel();
    let mut sender = Some(sender);

    let upload = Upload::new(true).on_complete(move |encoded| {
        if let Some(sender) = sender.take() {
            let _ = sender.send(encoded);
        }
    });

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut driver = UploadDriver::new(upload);
    driver.dispatch(Event::Pick(vec![file]));
    driver
        .run(|upload| {
            if let View::Status {
                progress,
                status_text,
                ..
            } = upload.view()
            {
                pb.set_position(progress as u64);
                pb.set_message(status_text);
            }
        })
        .await;

    // releases the callback, and with it the sender
    drop(driver);

    match receiver.await {
        Ok(encoded) => {
            pb.finish_with_message("Done");
            Ok(encoded)
        }
        Err(_) => {
            pb.abandon_with_message("Upload did not complete");
            bail!("Failed to read floor plan, see logs");
        }
    }
}

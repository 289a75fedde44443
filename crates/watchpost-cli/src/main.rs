use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod client;

use client::ServiceClient;

#[derive(Parser)]
#[command(name = "watchpost", about = "Watchpost detection and face-match client")]
struct Cli {
    /// Detection service base URL
    #[arg(long, env = "WATCHPOST_DETECT_URL", default_value = "http://localhost:8001", global = true)]
    detect_url: String,
    /// Face-match service base URL
    #[arg(long, env = "WATCHPOST_FACE_URL", default_value = "http://localhost:8000", global = true)]
    face_url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect objects and flag weapons in an image
    Detect {
        /// Image file (any common format)
        image: PathBuf,
    },
    /// Match the face in an image against registered suspects
    Match {
        image: PathBuf,
    },
    /// Register a suspect from a face image
    AddSuspect {
        /// Identifier to store the face under; an existing entry is replaced
        suspect_id: String,
        image: PathBuf,
    },
    /// Show the health of both services
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let detect = ServiceClient::new(&cli.detect_url);
    let face = ServiceClient::new(&cli.face_url);

    match cli.command {
        Commands::Detect { image } => {
            let report = detect.post_image("/detect", &image, &[]).await?;
            print_json(&report)?;
        }
        Commands::Match { image } => {
            let result = face.post_image("/match", &image, &[]).await?;
            print_json(&result)?;
        }
        Commands::AddSuspect { suspect_id, image } => {
            let result = face
                .post_image("/add-suspect", &image, &[("suspect_id", suspect_id.as_str())])
                .await?;
            print_json(&result)?;
        }
        Commands::Health => {
            for (name, client) in [("detection", &detect), ("face-match", &face)] {
                match client.get("/health").await {
                    Ok(health) => println!("{name}: {health}"),
                    Err(e) => println!("{name}: unreachable ({e})"),
                }
            }
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

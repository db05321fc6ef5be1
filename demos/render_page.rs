//! Render a page of proof text through a running verifier.
//!
//! ```text
//! cargo run --example render_page -- [config.json] < page.txt
//! ```
//!
//! Paragraphs of standard input (separated by blank lines) are sent as
//! tags of one module page. `VERIFIER_ADDR` and `VERIFIER_PORT` override
//! the configured endpoint; `RUST_LOG` controls log output.

use std::io::Read;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use verifier_client::{PageOutcome, RenderMode, TagOutput, VerifierClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut builder = VerifierClient::builder();
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        builder = builder.config_file(&path)?;
    }
    let client = builder.with_env_overrides().build()?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    let mut page = client.page_renderer(RenderMode::Module);
    for tag in input.split("\n\n").filter(|t| !t.trim().is_empty()) {
        match page.render_tag(tag).await {
            TagOutput::Passthrough(text) => println!("{text}"),
            TagOutput::Verified(response) => {
                println!("[{:#04x}] {}", response.code, response.message_str())
            }
            TagOutput::Failed(err) => println!("[error] {err}"),
            TagOutput::Skipped => println!("[skipped]"),
        }
    }

    for outcome in page.finish_page().await {
        match outcome {
            PageOutcome::Success(message) => println!("verified: {message}"),
            PageOutcome::Failure(message) => println!("not verified: {message}"),
            PageOutcome::Error(err) => println!("error: {err}"),
            PageOutcome::Aborted => println!("verification aborted"),
        }
    }
    Ok(())
}

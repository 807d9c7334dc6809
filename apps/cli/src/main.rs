//! Blog Writer CLI: turn a web page into an SEO-ready HTML blog post.
//!
//! Runs the blog pipeline end to end, or in two phases with a human
//! keyword choice in between.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

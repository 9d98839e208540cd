//! Clone command implementation.

use crate::context::Context;
use crate::output;
use anyhow::Result;
use clap::Args;
use gitsync_transport::{CloneRequest, default_clone_dir};
use std::path::PathBuf;
use tracing::info;

/// Arguments for the clone command.
#[derive(Args, Debug, Clone)]
pub struct CloneArgs {
    /// Repository URL or path
    pub url: String,

    /// Destination directory (defaults to the repository name)
    pub directory: Option<PathBuf>,

    /// Branch to check out instead of the remote HEAD
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Create a bare repository
    #[arg(long)]
    pub bare: bool,

    /// Mirror every remote reference (implies --bare)
    #[arg(long, conflicts_with = "branch")]
    pub mirror: bool,
}

/// Run the clone command.
pub fn run(args: &CloneArgs, ctx: &Context) -> Result<()> {
    info!(url = %args.url, "running clone command");

    let bare = args.bare || args.mirror;
    let directory = match &args.directory {
        Some(dir) => dir.clone(),
        None => default_clone_dir(&args.url, bare)?,
    };
    let dest = ctx.resolve_path(&directory);
    if !ctx.quiet {
        let kind = if bare { "bare repository " } else { "" };
        output::info(&format!("Cloning into {kind}'{}'...", directory.display()));
    }

    let request = CloneRequest {
        branch: args.branch.clone(),
        bare: args.bare,
        mirror: args.mirror,
    };
    let secrets = ctx.secrets();
    let sink = ctx.sink();
    let path = ctx
        .client(&secrets, &sink)
        .clone(&args.url, Some(&dest), &request);
    sink.finish();

    let path = path?;
    if !ctx.quiet {
        output::success(&format!("Cloned {} into {}", args.url, path.display()));
    }
    Ok(())
}

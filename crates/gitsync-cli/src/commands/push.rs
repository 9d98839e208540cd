//! Push command implementation.

use crate::context::Context;
use crate::output;
use anyhow::Result;
use clap::Args;
use gitsync_transport::PushRequest;
use tracing::info;

/// Arguments for the push command.
#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    /// Remote to push to (defaults to the branch's remote, then origin)
    pub remote: Option<String>,

    /// Refspec to push (defaults to the current branch)
    pub refspec: Option<String>,

    /// Overwrite the remote reference even if it is not an ancestor
    #[arg(short, long)]
    pub force: bool,

    /// Push every local reference except the mirror exclusions
    #[arg(long, conflicts_with = "refspec")]
    pub mirror: bool,

    /// Do not configure an upstream for a branch that has none
    #[arg(long)]
    pub no_set_upstream: bool,
}

impl PushArgs {
    fn request(&self) -> PushRequest<'_> {
        PushRequest {
            remote: self.remote.as_deref(),
            refspec: self.refspec.as_deref(),
            force: self.force,
            mirror: self.mirror,
            set_upstream: !self.no_set_upstream,
        }
    }
}

/// Run the push command.
pub fn run(args: &PushArgs, ctx: &Context) -> Result<()> {
    info!("running push command");

    let repo = ctx.open_repo()?;
    let secrets = ctx.secrets();
    let sink = ctx.sink();
    let outcome = ctx.client(&secrets, &sink).push(&repo, &args.request());
    sink.finish();

    let outcome = outcome?;
    if !ctx.quiet {
        for reference in &outcome.summary.pushed_refs {
            output::success(&format!("Pushed {reference}"));
        }
    }
    Ok(())
}

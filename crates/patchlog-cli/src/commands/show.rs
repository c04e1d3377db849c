//! Reconstruct a historical state

use clap::Args;
use patchlog_core::errors::PatchLogError;
use patchlog_core::rollback::reconstruct;

use super::{open_collection, parse_id, TargetArgs};

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Patch to stop at (inclusive)
    #[arg(long)]
    pub patch: String,
}

pub async fn execute(args: ShowArgs) -> anyhow::Result<()> {
    let collection = open_collection(&args.target, false)?;
    let patches = collection
        .history()
        .patches_for(&args.target.document_id())
        .all()
        .await?;

    let patch_id = parse_id(&args.patch);
    let position = patches
        .iter()
        .position(|p| p.id == patch_id)
        .ok_or_else(|| PatchLogError::PatchNotFound {
            patch_id: args.patch.clone(),
        })?;

    let state = reconstruct(&patches[..=position])?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

//! Rollback command

use anyhow::anyhow;
use clap::Args;
use serde_json::Map;

use super::{open_collection, parse_id, TargetArgs};

#[derive(Debug, Args)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Patch whose state to restore
    #[arg(long)]
    pub patch: String,

    /// Maintain updated_at on the rolled back document
    #[arg(long)]
    pub timestamps: bool,

    /// Print the restored state without saving it
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: RollbackArgs) -> anyhow::Result<()> {
    let collection = open_collection(&args.target, args.timestamps)?;
    let id = args.target.document_id();
    let mut doc = collection
        .find_by_id(&id)
        .await?
        .ok_or_else(|| anyhow!("document {} not found in {}", id, collection.name()))?;

    doc.rollback(&parse_id(&args.patch), Map::new(), !args.dry_run)
        .await?;

    println!("{}", serde_json::to_string_pretty(&doc.data())?);
    if args.dry_run {
        eprintln!("Dry run: nothing saved");
    } else {
        eprintln!("Rolled back {} to patch {}", id, args.patch);
    }
    Ok(())
}

//! Patch log command

use clap::Args;

use super::{open_collection, TargetArgs};

#[derive(Debug, Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// One JSON line per patch.
pub async fn execute(args: LogArgs) -> anyhow::Result<()> {
    let collection = open_collection(&args.target, false)?;
    let patches = collection
        .history()
        .patches_for(&args.target.document_id())
        .all()
        .await?;

    for patch in &patches {
        println!("{}", serde_json::to_string(patch)?);
    }
    if patches.is_empty() {
        eprintln!("No patches for {}", args.target.id);
    }
    Ok(())
}

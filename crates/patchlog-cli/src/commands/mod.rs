pub mod log;
pub mod rollback;
pub mod show;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use patchlog_core::{DocumentId, IncludeField, ValueKind};
use patchlog_engine::{ModelSpec, PatchHistory, TrackedCollection};
use patchlog_store::SqliteStore;

/// Which document history to work on.
#[derive(Debug, Args)]
pub struct TargetArgs {
    #[arg(long, default_value = ".patchlog/store.db")]
    pub db: String,

    /// Tracked collection
    #[arg(long)]
    pub collection: String,

    /// Base name of the patch collection (e.g. postPatches)
    #[arg(long)]
    pub name: String,

    /// Document identifier; all-digit values are read as integers
    #[arg(long)]
    pub id: String,

    /// JSON pointer kept out of patches, e.g. /secret (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Patch field as name[:kind][=source], e.g. version:number=__v (repeatable)
    #[arg(long, value_parser = parse_include)]
    pub include: Vec<(String, IncludeField)>,
}

impl TargetArgs {
    pub fn document_id(&self) -> DocumentId {
        parse_id(&self.id)
    }
}

pub fn parse_id(raw: &str) -> DocumentId {
    match raw.parse::<i64>() {
        Ok(n) => DocumentId::Int(n),
        Err(_) => DocumentId::from(raw),
    }
}

pub fn parse_include(raw: &str) -> Result<(String, IncludeField), String> {
    let (decl, source) = match raw.split_once('=') {
        Some((decl, source)) => (decl, Some(source)),
        None => (raw, None),
    };
    let (name, kind) = match decl.split_once(':') {
        Some((name, kind)) => (name, parse_kind(kind)?),
        None => (decl, ValueKind::Any),
    };
    if name.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }

    let mut field = IncludeField::new(kind);
    if let Some(source) = source.filter(|s| !s.is_empty()) {
        field = field.from(source);
    }
    Ok((name.to_string(), field))
}

fn parse_kind(raw: &str) -> Result<ValueKind, String> {
    let kind = match raw {
        "string" => ValueKind::String,
        "number" => ValueKind::Number,
        "boolean" => ValueKind::Boolean,
        "object" => ValueKind::Object,
        "array" => ValueKind::Array,
        "any" => ValueKind::Any,
        other => return Err(format!("unknown kind '{other}'")),
    };
    Ok(kind)
}

/// Open the store at `--db` and attach history to `--collection`.
pub fn open_collection(target: &TargetArgs, timestamps: bool) -> anyhow::Result<TrackedCollection> {
    if let Some(parent) = Path::new(&target.db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let store = SqliteStore::open(&target.db)
        .with_context(|| format!("opening store {}", target.db))?;

    let mut builder = PatchHistory::builder(target.collection.as_str())
        .store(Arc::new(store))
        .name(target.name.as_str());
    for path in &target.exclude {
        builder = builder.exclude(path.as_str());
    }
    for (name, field) in &target.include {
        builder = builder.include(name.as_str(), field.clone());
    }
    let history = builder.build()?;

    let mut spec = ModelSpec::new(target.collection.as_str());
    spec.timestamps = timestamps;
    Ok(TrackedCollection::new(spec, Arc::new(history))?)
}

use crate::errors::PatchLogError;
use crate::json_patch::Operation;

use super::path::{ExclusionPath, Verdict};

/// Every configured exclusion path, applied together.
///
/// An operation survives only if no path rejects it. Redactions compose:
/// each path sees the value left behind by the paths before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    paths: Vec<ExclusionPath>,
}

impl ExclusionFilter {
    pub fn new(paths: Vec<ExclusionPath>) -> Self {
        Self { paths }
    }

    /// Parse raw path strings, failing on the first malformed one.
    pub fn parse<I, S>(raw: I) -> std::result::Result<Self, PatchLogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = raw
            .into_iter()
            .map(|p| ExclusionPath::parse(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { paths })
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[ExclusionPath] {
        &self.paths
    }

    /// True when some path covers `op_path` outright.
    pub fn is_excluded<S: AsRef<str>>(&self, op_path: &[S]) -> bool {
        self.paths.iter().any(|p| p.covers(op_path))
    }

    /// Run one operation through every path.
    pub fn apply(&self, op: Operation) -> Option<Operation> {
        self.paths
            .iter()
            .try_fold(op, |op, path| match path.redact(op) {
                Verdict::Keep(op) => Some(op),
                Verdict::Reject => None,
            })
    }

    /// Filter a whole diff, keeping operation order.
    pub fn filter(&self, ops: Vec<Operation>) -> Vec<Operation> {
        if self.is_empty() {
            return ops;
        }
        ops.into_iter().filter_map(|op| self.apply(op)).collect()
    }
}

//! Upstream provenance resolution.
//!
//! Starting from one sidecar, every record reachable through declared inputs
//! is loaded exactly once into a map keyed by sidecar path. All upstream
//! sidecars are looked up relative to the root sidecar's directory.
use crate::audit::{read_sidecar, AuditRecord, SIDECAR_SUFFIX};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved records keyed by sidecar path.
pub type ResolvedRecords = BTreeMap<PathBuf, AuditRecord>;

/// The root record and every ancestor, leaf placeholders included.
pub fn resolve_all_ancestors(root_sidecar: &Path) -> Result<ResolvedRecords> {
    let base_dir = root_sidecar
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut resolver = Resolver {
        base_dir,
        records: BTreeMap::new(),
    };
    resolver.visit(root_sidecar.to_path_buf())?;
    tracing::debug!(
        root = %root_sidecar.display(),
        count = resolver.records.len(),
        "resolved upstream records"
    );
    Ok(resolver.records)
}

/// Like [`resolve_all_ancestors`], minus leaf placeholders.
pub fn resolve_executed_ancestors(root_sidecar: &Path) -> Result<ResolvedRecords> {
    let mut records = resolve_all_ancestors(root_sidecar)?;
    records.retain(|_, record| !record.is_leaf());
    Ok(records)
}

struct Resolver {
    base_dir: PathBuf,
    records: ResolvedRecords,
}

impl Resolver {
    fn visit(&mut self, sidecar: PathBuf) -> Result<()> {
        if self.records.contains_key(&sidecar) {
            return Ok(());
        }
        let record = read_sidecar(&sidecar)?;
        let upstream: Vec<PathBuf> = record
            .inputs
            .iter()
            .map(|input| self.base_dir.join(format!("{input}{SIDECAR_SUFFIX}")))
            .collect();
        // Inserted before recursing so a record naming itself terminates.
        self.records.insert(sidecar, record);
        for candidate in upstream {
            self.visit(candidate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;

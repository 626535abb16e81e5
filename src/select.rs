//! Choosing manifest entries for interactive rollback.

use dialoguer::MultiSelect;
use dialoguer::theme::ColorfulTheme;
use std::io;

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::manifest::{EntryKey, ManifestEntry};

/// Picks a subset of manifest entries.
pub trait Selector {
    fn select(&mut self, entries: &[&ManifestEntry]) -> ScaffoldResult<Vec<EntryKey>>;
}

/// Terminal multi-select. Cancelling (Esc/q) selects nothing.
#[derive(Debug, Default)]
pub struct TerminalSelector;

impl Selector for TerminalSelector {
    fn select(&mut self, entries: &[&ManifestEntry]) -> ScaffoldResult<Vec<EntryKey>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let items: Vec<String> = entries.iter().map(|entry| describe(entry)).collect();
        let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Select collections to roll back (space to toggle, enter to confirm)")
            .items(&items)
            .interact_opt()
            .map_err(|e| ScaffoldError::io("<terminal>", io::Error::other(e.to_string())))?
            .unwrap_or_default();
        Ok(chosen.into_iter().map(|index| entries[index].key()).collect())
    }
}

/// Selects a fixed set of keys; entries not present in the manifest are ignored.
#[derive(Debug, Clone, Default)]
pub struct FixedSelector {
    pub keys: Vec<EntryKey>,
}

impl Selector for FixedSelector {
    fn select(&mut self, entries: &[&ManifestEntry]) -> ScaffoldResult<Vec<EntryKey>> {
        Ok(entries
            .iter()
            .map(|entry| entry.key())
            .filter(|key| self.keys.contains(key))
            .collect())
    }
}

fn describe(entry: &ManifestEntry) -> String {
    format!(
        "{}/{}  ({} files, generated {})",
        entry.layer,
        entry.collection,
        entry.artifacts.len(),
        entry.generated_at.format("%Y-%m-%d %H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(layer: &str, collection: &str) -> ManifestEntry {
        ManifestEntry {
            layer: layer.into(),
            collection: collection.into(),
            generated_at: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 0).unwrap(),
            artifacts: Vec::new(),
        }
    }

    #[test]
    fn fixed_selector_keeps_manifest_order() {
        let a = entry("blog", "posts");
        let b = entry("shop", "products");
        let mut selector = FixedSelector {
            keys: vec![b.key(), a.key(), ("x".into(), "y".into())],
        };
        assert_eq!(selector.select(&[&a, &b]).unwrap(), vec![a.key(), b.key()]);
    }

    #[test]
    fn entries_are_described_with_their_age() {
        assert_eq!(
            describe(&entry("shop", "products")),
            "shop/products  (0 files, generated 2026-03-04 05:06)"
        );
    }
}

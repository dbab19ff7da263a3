//! Format-priority deduplication
//!
//! Remote libraries often hold the same title in several containers
//! (`movie.mkv` next to `movie.mp4`). Only one stub per base name is useful,
//! so siblings that differ only in their final extension collapse to the
//! item with the most preferred container.

use std::collections::HashMap;

use strmsync_core::domain::RemoteItem;
use tracing::debug;

/// Preferred containers, best first. Anything else ranks below all of these.
pub const FORMAT_PRIORITY: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "m4v", "mpg", "mpeg", "3gp", "webm",
];

/// Rank of an extension in [`FORMAT_PRIORITY`]; lower is better
///
/// Comparison is case-insensitive and ignores a leading dot. Unknown and
/// missing extensions share the lowest rank.
pub fn priority(extension: Option<&str>) -> usize {
    let Some(ext) = extension else {
        return usize::MAX;
    };
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    FORMAT_PRIORITY
        .iter()
        .position(|known| *known == ext)
        .unwrap_or(usize::MAX)
}

/// Remote path with the final segment's extension removed
pub fn base_key(item: &RemoteItem) -> &str {
    match item.extension() {
        Some(ext) => &item.path[..item.path.len() - ext.len() - 1],
        None => &item.path,
    }
}

/// Collapses items sharing a base name to their best representative
///
/// A candidate replaces the current pick only when it ranks strictly
/// better, so among equally ranked siblings the first one listed wins.
/// Survivors keep the order in which their base name first appeared.
pub fn deduplicate(items: Vec<RemoteItem>) -> Vec<RemoteItem> {
    let mut slots: Vec<RemoteItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(items.len());

    for item in items {
        let key = base_key(&item).to_string();
        match index.get(&key) {
            None => {
                index.insert(key, slots.len());
                slots.push(item);
            }
            Some(&slot) => {
                let current = &slots[slot];
                if priority(item.extension()) < priority(current.extension()) {
                    debug!(kept = %item.path, dropped = %current.path, "Duplicate media, preferring better format");
                    slots[slot] = item;
                } else {
                    debug!(kept = %current.path, dropped = %item.path, "Duplicate media, keeping earlier pick");
                }
            }
        }
    }

    slots
}

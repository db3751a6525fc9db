use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Paths waiting to become stable, keyed by the instant they were first seen.
///
/// Later sightings of a pending path do not reset its timestamp.
#[derive(Debug, Default)]
pub struct PendingSet {
    entries: HashMap<PathBuf, Instant>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sighting. Returns true if the path was not already pending.
    pub fn observe(&mut self, path: PathBuf, now: Instant) -> bool {
        match self.entries.entry(path) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Removes and returns every path pending for at least `threshold`, oldest first.
    pub fn take_stable(&mut self, now: Instant, threshold: Duration) -> Vec<PathBuf> {
        let mut stable: Vec<(PathBuf, Instant)> = self
            .entries
            .iter()
            .filter(|(_, first_seen)| now.saturating_duration_since(**first_seen) >= threshold)
            .map(|(path, first_seen)| (path.clone(), *first_seen))
            .collect();
        stable.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        for (path, _) in &stable {
            self.entries.remove(path);
        }
        stable.into_iter().map(|(path, _)| path).collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

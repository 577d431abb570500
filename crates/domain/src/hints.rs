//! Hint vocabulary and candidate selection for hint purchases.

use std::collections::{BTreeSet, HashSet};

use crate::ids::{LocationId, SlotId};

/// A server-confirmed hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub location: LocationId,
    pub finding_player: SlotId,
    pub receiving_player: SlotId,
    pub item: i64,
    pub found: bool,
}

/// Locations already hinted for the local slot.
///
/// Rebuilt wholesale from every hint feed push; never merged incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownHints {
    locations: HashSet<LocationId>,
}

impl KnownHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the hints whose location belongs to `local_slot`.
    pub fn from_feed(hints: &[Hint], local_slot: SlotId) -> Self {
        Self {
            locations: hints
                .iter()
                .filter(|hint| hint.finding_player == local_slot)
                .map(|hint| hint.location)
                .collect(),
        }
    }

    pub fn contains(&self, location: LocationId) -> bool {
        self.locations.contains(&location)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Missing locations that do not already have a hint, in ascending id order.
pub fn hint_candidates(missing: &BTreeSet<LocationId>, known: &KnownHints) -> Vec<LocationId> {
    missing
        .iter()
        .copied()
        .filter(|location| !known.contains(*location))
        .collect()
}

/// Pick one candidate. `pick_index` receives the candidate count (always > 0) and
/// must return an index below it; out-of-range indices are clamped.
pub fn choose_candidate(
    candidates: &[LocationId],
    pick_index: impl FnOnce(usize) -> usize,
) -> Option<LocationId> {
    if candidates.is_empty() {
        return None;
    }
    let index = pick_index(candidates.len()).min(candidates.len() - 1);
    candidates.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: SlotId = SlotId::new(3);
    const OTHER: SlotId = SlotId::new(7);

    fn hint(location: i64, finder: SlotId) -> Hint {
        Hint {
            location: LocationId::new(location),
            finding_player: finder,
            receiving_player: OTHER,
            item: 77,
            found: false,
        }
    }

    #[test]
    fn keeps_only_local_hints() {
        let known = KnownHints::from_feed(&[hint(42, LOCAL), hint(43, OTHER)], LOCAL);

        assert!(known.contains(LocationId::new(42)));
        assert!(!known.contains(LocationId::new(43)));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn feed_without_local_finds_is_empty() {
        assert!(KnownHints::from_feed(&[hint(43, OTHER)], LOCAL).is_empty());
        assert!(KnownHints::new().is_empty());
    }

    #[test]
    fn candidates_exclude_known_hints() {
        let missing: BTreeSet<_> = [41, 42, 44].into_iter().map(LocationId::new).collect();
        let known = KnownHints::from_feed(&[hint(42, LOCAL)], LOCAL);

        assert_eq!(
            hint_candidates(&missing, &known),
            vec![LocationId::new(41), LocationId::new(44)]
        );
    }

    #[test]
    fn choose_uses_picker_and_clamps() {
        let candidates = [LocationId::new(1), LocationId::new(2)];

        assert_eq!(choose_candidate(&candidates, |_| 1), Some(LocationId::new(2)));
        assert_eq!(choose_candidate(&candidates, |_| 99), Some(LocationId::new(2)));
        assert_eq!(choose_candidate(&[], |_| 0), None);
    }
}

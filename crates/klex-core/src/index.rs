//! Trigger index: five membership sets (one per trigger class plus
//! autocorrect) over *encoded* hotstring identities, rebuilt wholesale from
//! the enabled bundles and published as an immutable snapshot.
//!
//! Classification is O(1) hash lookups; the match buffer consults a
//! snapshot on every character, so a rebuild in progress is never observed
//! half-applied.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::codec;
use crate::error::Result;
use crate::models::{StoredHotstring, TriggerClass};

/// Read-only view of hotstring definitions, consulted at rebuild time.
///
/// Bundle order is significant: on identity collision the **last** bundle
/// in the returned order wins.
pub trait HotstringStore {
    /// Ordered list of currently enabled bundle names.
    fn enabled_bundles(&self) -> Vec<String>;

    /// Hotstrings belonging to one bundle. An `Err` marks the bundle
    /// unavailable; the rebuild skips it and keeps going.
    fn hotstrings_in(&self, bundle: &str) -> Result<Vec<StoredHotstring>>;
}

/// One registered hotstring as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedHotstring {
    /// Decoded display text (what the user types).
    pub name: String,
    pub replacement: String,
    pub bundle: String,
}

/// Immutable, versioned membership snapshot.
#[derive(Debug, Default)]
pub struct TriggerIndex {
    enter: HashSet<String>,
    tab: HashSet<String>,
    space: HashSet<String>,
    instant: HashSet<String>,
    autocorrect: HashSet<String>,
    entries: HashMap<String, IndexedHotstring>,
    longest: usize,
    version: u64,
}

impl TriggerIndex {
    /// Build a fresh index from the store's enabled bundles.
    ///
    /// Unreadable bundles and undecodable identities are skipped with a
    /// warning; a partial failure never disables the engine.
    pub fn build(store: &dyn HotstringStore, version: u64) -> TriggerIndex {
        let mut index = TriggerIndex {
            version,
            ..TriggerIndex::default()
        };

        for bundle in store.enabled_bundles() {
            let hotstrings = match store.hotstrings_in(&bundle) {
                Ok(list) => list,
                Err(err) => {
                    warn!(bundle = %bundle, error = %err, "skipping unavailable bundle");
                    continue;
                }
            };
            for hs in hotstrings {
                index.insert(&bundle, &hs);
            }
        }

        debug!(
            version,
            hotstrings = index.entries.len(),
            longest = index.longest,
            "trigger index rebuilt"
        );
        index
    }

    /// Register one hotstring, replacing any earlier bundle's definition of
    /// the same identity (last bundle wins, trigger sets replaced wholesale).
    fn insert(&mut self, bundle: &str, hs: &StoredHotstring) {
        let name = match codec::decode(&hs.id) {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => {
                warn!(bundle = %bundle, "skipping hotstring with empty identity");
                return;
            }
            Err(err) => {
                warn!(bundle = %bundle, id = %hs.id, error = %err, "skipping corrupt identity");
                return;
            }
        };

        // Clear previous membership so a later bundle fully overrides an
        // earlier one rather than merging trigger sets.
        self.enter.remove(&hs.id);
        self.tab.remove(&hs.id);
        self.space.remove(&hs.id);
        self.instant.remove(&hs.id);
        self.autocorrect.remove(&hs.id);

        // Autocorrect is mutually exclusive with the standard classes; it
        // is classified before them, so it wins when both are stored.
        if hs.triggers.contains(&TriggerClass::Autocorrect) {
            self.autocorrect.insert(hs.id.clone());
        } else {
            for trigger in &hs.triggers {
                match trigger {
                    TriggerClass::Enter => self.enter.insert(hs.id.clone()),
                    TriggerClass::Tab => self.tab.insert(hs.id.clone()),
                    TriggerClass::Space => self.space.insert(hs.id.clone()),
                    TriggerClass::Instant => self.instant.insert(hs.id.clone()),
                    TriggerClass::Autocorrect => unreachable!(),
                };
            }
        }

        self.longest = self.longest.max(name.chars().count());
        self.entries.insert(
            hs.id.clone(),
            IndexedHotstring {
                name,
                replacement: hs.replacement.clone(),
                bundle: bundle.to_string(),
            },
        );
    }

    /// Membership check for one trigger class against an encoded candidate.
    pub fn contains(&self, class: TriggerClass, encoded: &str) -> bool {
        match class {
            TriggerClass::Enter => self.enter.contains(encoded),
            TriggerClass::Tab => self.tab.contains(encoded),
            TriggerClass::Space => self.space.contains(encoded),
            TriggerClass::Instant => self.instant.contains(encoded),
            TriggerClass::Autocorrect => self.autocorrect.contains(encoded),
        }
    }

    /// All trigger classes that recognise this exact candidate.
    pub fn classify(&self, candidate: &str) -> Vec<TriggerClass> {
        let encoded = codec::encode(candidate);
        [
            TriggerClass::Autocorrect,
            TriggerClass::Instant,
            TriggerClass::Enter,
            TriggerClass::Tab,
            TriggerClass::Space,
        ]
        .into_iter()
        .filter(|class| self.contains(*class, &encoded))
        .collect()
    }

    /// Payload record for an encoded identity.
    pub fn entry(&self, encoded: &str) -> Option<&IndexedHotstring> {
        self.entries.get(encoded)
    }

    /// Character length of the longest registered hotstring.
    pub fn longest(&self) -> usize {
        self.longest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Shared handle publishing index snapshots to the engine thread.
///
/// Readers clone the inner `Arc` and classify against a consistent
/// snapshot; `rebuild` constructs the replacement off to the side and
/// swaps it in one pointer store.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: Mutex<Arc<TriggerIndex>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        IndexHandle::default()
    }

    /// Current snapshot. Cheap: one mutex lock and an `Arc` clone.
    pub fn snapshot(&self) -> Arc<TriggerIndex> {
        self.current.lock().expect("index lock poisoned").clone()
    }

    /// Rebuild from the store and publish atomically. Returns the number
    /// of hotstrings in the new snapshot.
    pub fn rebuild(&self, store: &dyn HotstringStore) -> usize {
        let next_version = self.snapshot().version() + 1;
        let next = Arc::new(TriggerIndex::build(store, next_version));
        let count = next.len();
        *self.current.lock().expect("index lock poisoned") = next;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KlexError;

    struct MapStore {
        order: Vec<String>,
        bundles: HashMap<String, Vec<StoredHotstring>>,
        broken: HashSet<String>,
    }

    impl MapStore {
        fn new() -> Self {
            MapStore {
                order: Vec::new(),
                bundles: HashMap::new(),
                broken: HashSet::new(),
            }
        }

        fn bundle(mut self, name: &str, hotstrings: Vec<StoredHotstring>) -> Self {
            self.order.push(name.to_string());
            self.bundles.insert(name.to_string(), hotstrings);
            self
        }

        fn broken_bundle(mut self, name: &str) -> Self {
            self.order.push(name.to_string());
            self.broken.insert(name.to_string());
            self
        }
    }

    impl HotstringStore for MapStore {
        fn enabled_bundles(&self) -> Vec<String> {
            self.order.clone()
        }

        fn hotstrings_in(&self, bundle: &str) -> Result<Vec<StoredHotstring>> {
            if self.broken.contains(bundle) {
                return Err(KlexError::BundleUnavailable(
                    bundle.to_string(),
                    "source unreadable".to_string(),
                ));
            }
            Ok(self.bundles.get(bundle).cloned().unwrap_or_default())
        }
    }

    fn hs(name: &str, triggers: &[TriggerClass]) -> StoredHotstring {
        StoredHotstring::new(name, format!("<{}>", name), triggers)
    }

    #[test]
    fn classify_uses_membership_sets() {
        let store = MapStore::new().bundle(
            "Default",
            vec![
                hs("btw", &[TriggerClass::Space, TriggerClass::Enter]),
                hs("omw", &[TriggerClass::Instant]),
            ],
        );
        let index = TriggerIndex::build(&store, 1);

        assert_eq!(
            index.classify("btw"),
            vec![TriggerClass::Enter, TriggerClass::Space]
        );
        assert_eq!(index.classify("omw"), vec![TriggerClass::Instant]);
        assert!(index.classify("nope").is_empty());
        assert_eq!(index.longest(), 3);
    }

    #[test]
    fn last_bundle_wins_on_identity_collision() {
        // Bundle A enrolls "x" for Space; bundle B redefines it for Tab
        // only. The rebuild order [A, B] must leave B's definition.
        let store = MapStore::new()
            .bundle("A", vec![hs("x", &[TriggerClass::Space])])
            .bundle("B", vec![hs("x", &[TriggerClass::Tab])]);
        let index = TriggerIndex::build(&store, 1);

        assert_eq!(index.classify("x"), vec![TriggerClass::Tab]);
        let entry = index.entry(&codec::encode("x")).unwrap();
        assert_eq!(entry.bundle, "B");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn autocorrect_is_exclusive_with_standard_classes() {
        let store = MapStore::new().bundle(
            "Default",
            vec![hs(
                "teh",
                &[TriggerClass::Autocorrect, TriggerClass::Space],
            )],
        );
        let index = TriggerIndex::build(&store, 1);

        assert_eq!(index.classify("teh"), vec![TriggerClass::Autocorrect]);
        assert!(!index.contains(TriggerClass::Space, &codec::encode("teh")));
    }

    #[test]
    fn unreadable_bundle_is_skipped_not_fatal() {
        let store = MapStore::new()
            .bundle("Good", vec![hs("btw", &[TriggerClass::Space])])
            .broken_bundle("Broken");
        let index = TriggerIndex::build(&store, 1);

        assert_eq!(index.len(), 1);
        assert_eq!(index.classify("btw"), vec![TriggerClass::Space]);
    }

    #[test]
    fn corrupt_identity_is_skipped() {
        let mut bad = hs("ok", &[TriggerClass::Space]);
        bad.id = "ZZZ".to_string(); // not hex, not multiple of 4
        let store = MapStore::new().bundle("Default", vec![bad, hs("btw", &[TriggerClass::Space])]);
        let index = TriggerIndex::build(&store, 1);

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn handle_publishes_new_snapshot() {
        let handle = IndexHandle::new();
        assert_eq!(handle.snapshot().len(), 0);

        let store = MapStore::new().bundle("Default", vec![hs("btw", &[TriggerClass::Space])]);
        let old = handle.snapshot();
        assert_eq!(handle.rebuild(&store), 1);

        // The old snapshot is untouched; the new one is visible.
        assert_eq!(old.len(), 0);
        assert_eq!(handle.snapshot().len(), 1);
        assert!(handle.snapshot().version() > old.version());
    }
}

use std::collections::HashSet;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded memory of already-routed event ids.
///
/// Redelivered platform notifications must not advance a dialog twice, so the
/// router checks every event id here before dispatching. The memory is
/// process-local and starts empty on every restart. When it grows past its
/// capacity the whole set is cleared rather than evicting entries one by one;
/// an id seen long before the clear can then be accepted again. Redelivery
/// windows are short relative to the clear cadence, so that trade is accepted
/// deliberately and must not be replaced with an LRU or TTL policy.
#[derive(Debug)]
pub struct DuplicateEventFilter {
    seen: HashSet<String>,
    capacity: usize,
}

impl Default for DuplicateEventFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DuplicateEventFilter {
    pub fn new(capacity: usize) -> Self {
        Self { seen: HashSet::new(), capacity }
    }

    /// Returns `true` the first time a given id is observed and `false` for
    /// every repeat. Events without an id cannot be deduplicated and are
    /// always accepted; that gap is known and not papered over here.
    pub fn observe(&mut self, event_id: Option<&str>) -> bool {
        let Some(id) = event_id.filter(|id| !id.is_empty()) else {
            return true;
        };

        if self.seen.contains(id) {
            return false;
        }

        self.seen.insert(id.to_owned());
        if self.seen.len() > self.capacity {
            self.seen.clear();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

//! Attachment Store
//!
//! The single ordered collection every other component reads and mutates.
//! Order in the vector is the display and serialization order.

use parking_lot::Mutex;

use crate::model::{AttachmentId, AttachmentRecord};

/// Ordered collection of records, unique by id
///
/// Mutations return the new ordered collection. Reads hand out copies.
#[derive(Debug, Default)]
pub struct AttachmentStore {
    records: Vec<AttachmentRecord>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<AttachmentRecord>) -> Self {
        let mut store = Self::new();
        store.replace_all(records);
        store
    }

    /// Add a record at the end
    ///
    /// # Panics
    ///
    /// If a record with the same id is already present.
    pub fn append(&mut self, record: AttachmentRecord) -> Vec<AttachmentRecord> {
        assert!(
            !self.contains(&record.id),
            "duplicate attachment id {}",
            record.id
        );
        self.records.push(record);
        self.snapshot()
    }

    /// Replace the whole collection
    ///
    /// # Panics
    ///
    /// If `records` contains the same id twice.
    pub fn replace_all(&mut self, records: Vec<AttachmentRecord>) -> Vec<AttachmentRecord> {
        for (i, record) in records.iter().enumerate() {
            assert!(
                !records[..i].iter().any(|r| r.id == record.id),
                "duplicate attachment id {}",
                record.id
            );
        }
        self.records = records;
        self.snapshot()
    }

    /// Drop the record with `id`; unknown ids leave the collection as is
    pub fn remove(&mut self, id: &AttachmentId) -> Vec<AttachmentRecord> {
        self.records.retain(|r| &r.id != id);
        self.snapshot()
    }

    /// Move the record at `from` to `to`, shifting the ones in between
    ///
    /// Out-of-range indices leave the collection as is.
    pub fn reorder(&mut self, from: usize, to: usize) -> Vec<AttachmentRecord> {
        let len = self.records.len();
        if from < len && to < len && from != to {
            let record = self.records.remove(from);
            self.records.insert(to, record);
        }
        self.snapshot()
    }

    /// Remove every record, returning them in order
    pub fn clear(&mut self) -> Vec<AttachmentRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn snapshot(&self) -> Vec<AttachmentRecord> {
        self.records.clone()
    }

    pub fn get(&self, id: &AttachmentId) -> Option<AttachmentRecord> {
        self.records.iter().find(|r| &r.id == id).cloned()
    }

    pub fn position(&self, id: &AttachmentId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    pub fn contains(&self, id: &AttachmentId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Proof that an operation started while the store was in a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

#[derive(Debug)]
struct LiveState {
    store: AttachmentStore,
    generation: u64,
    alive: bool,
}

/// Store shared between an engine and its in-flight operations
///
/// Reset and teardown advance the generation. Work that started under an
/// older generation can no longer mutate the collection.
#[derive(Debug)]
pub struct LiveStore {
    state: Mutex<LiveState>,
}

impl Default for LiveStore {
    fn default() -> Self {
        Self::new(AttachmentStore::new())
    }
}

impl LiveStore {
    pub fn new(store: AttachmentStore) -> Self {
        Self {
            state: Mutex::new(LiveState {
                store,
                generation: 0,
                alive: true,
            }),
        }
    }

    /// Ticket for the current generation, `None` once torn down
    pub fn ticket(&self) -> Option<Ticket> {
        let state = self.state.lock();
        state.alive.then_some(Ticket {
            generation: state.generation,
        })
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        let state = self.state.lock();
        state.alive && state.generation == ticket.generation
    }

    /// Run `f` against the store if `ticket` is still current
    pub fn with_current<R>(
        &self,
        ticket: Ticket,
        f: impl FnOnce(&mut AttachmentStore) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        if state.alive && state.generation == ticket.generation {
            Some(f(&mut state.store))
        } else {
            None
        }
    }

    /// Run `f` against the store regardless of generation, unless torn down
    pub fn with_store<R>(&self, f: impl FnOnce(&mut AttachmentStore) -> R) -> Option<R> {
        let mut state = self.state.lock();
        if state.alive {
            Some(f(&mut state.store))
        } else {
            None
        }
    }

    /// Start a new generation holding `records`, returning the old records
    pub fn replace_generation(
        &self,
        records: Vec<AttachmentRecord>,
    ) -> Option<Vec<AttachmentRecord>> {
        let mut state = self.state.lock();
        if !state.alive {
            return None;
        }
        state.generation += 1;
        let displaced = state.store.clear();
        state.store.replace_all(records);
        Some(displaced)
    }

    /// Start a new generation with an empty collection, returning the old records
    pub fn reset(&self) -> Option<Vec<AttachmentRecord>> {
        let mut state = self.state.lock();
        if !state.alive {
            return None;
        }
        state.generation += 1;
        Some(state.store.clear())
    }

    /// Retire the store for good, returning whatever it still held
    pub fn shut_down(&self) -> Vec<AttachmentRecord> {
        let mut state = self.state.lock();
        if !state.alive {
            return Vec::new();
        }
        state.alive = false;
        state.generation += 1;
        state.store.clear()
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    pub fn snapshot(&self) -> Vec<AttachmentRecord> {
        self.state.lock().store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> AttachmentRecord {
        AttachmentRecord::new(AttachmentId::server(id), id, format!("/img/{}.png", id))
    }

    fn ids(records: &[AttachmentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_append_keeps_order() {
        let mut store = AttachmentStore::new();
        store.append(record("a"));
        store.append(record("b"));
        let after = store.append(record("c"));
        assert_eq!(ids(&after), vec!["a", "b", "c"]);
    }

    #[test]
    #[should_panic(expected = "duplicate attachment id")]
    fn test_append_duplicate_panics() {
        let mut store = AttachmentStore::new();
        store.append(record("a"));
        store.append(record("a"));
    }

    #[test]
    #[should_panic(expected = "duplicate attachment id")]
    fn test_replace_all_duplicate_panics() {
        let mut store = AttachmentStore::new();
        store.replace_all(vec![record("a"), record("b"), record("a")]);
    }

    #[test]
    fn test_remove_preserves_neighbours() {
        let mut store = AttachmentStore::with_records(vec![record("a"), record("b"), record("c")]);
        let after = store.remove(&AttachmentId::server("b"));
        assert_eq!(ids(&after), vec!["a", "c"]);

        let unchanged = store.remove(&AttachmentId::server("zzz"));
        assert_eq!(ids(&unchanged), vec!["a", "c"]);
    }

    #[test]
    fn test_reorder_moves_not_swaps() {
        let mut store = AttachmentStore::with_records(vec![
            record("a"),
            record("b"),
            record("c"),
            record("d"),
        ]);
        assert_eq!(ids(&store.reorder(0, 2)), vec!["b", "c", "a", "d"]);
        assert_eq!(ids(&store.reorder(3, 0)), vec!["d", "b", "c", "a"]);
        assert_eq!(ids(&store.reorder(1, 9)), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = AttachmentStore::with_records(vec![record("a")]);
        let mut copy = store.snapshot();
        copy[0].url = "tampered".to_string();
        copy.push(record("b"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&AttachmentId::server("a")).unwrap().url, "/img/a.png");
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_live_store_reset_invalidates_tickets() {
        let live = LiveStore::new(AttachmentStore::with_records(vec![record("a")]));
        let ticket = live.ticket().unwrap();

        let cleared = live.reset().unwrap();
        assert_eq!(ids(&cleared), vec!["a"]);
        assert!(!live.is_current(ticket));
        assert!(live.with_current(ticket, |s| s.append(record("b"))).is_none());
        assert!(live.is_empty());

        let fresh = live.ticket().unwrap();
        assert!(live.with_current(fresh, |s| s.append(record("b"))).is_some());
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_live_store_replace_generation() {
        let live = LiveStore::new(AttachmentStore::with_records(vec![record("a")]));
        let ticket = live.ticket().unwrap();

        let displaced = live.replace_generation(vec![record("x"), record("y")]).unwrap();
        assert_eq!(ids(&displaced), vec!["a"]);
        assert!(!live.is_current(ticket));
        assert!(live.with_current(ticket, |s| s.append(record("b"))).is_none());
        assert_eq!(ids(&live.snapshot()), vec!["x", "y"]);

        live.shut_down();
        assert!(live.replace_generation(vec![record("z")]).is_none());
    }

    #[test]
    fn test_live_store_shut_down() {
        let live = LiveStore::new(AttachmentStore::with_records(vec![record("a")]));
        let ticket = live.ticket().unwrap();

        assert_eq!(live.shut_down().len(), 1);
        assert!(!live.is_alive());
        assert!(live.ticket().is_none());
        assert!(live.reset().is_none());
        assert!(live.with_store(|s| s.len()).is_none());
        assert!(live.with_current(ticket, |s| s.len()).is_none());
        assert!(live.shut_down().is_empty());
    }
}

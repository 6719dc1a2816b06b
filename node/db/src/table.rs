// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::RangeBounds;

/// Primary object id. Allocated monotonically per table and never reused
/// within an open undo history.
pub type Id = u64;

/// A persistent object kind. `Key` is a per-kind enum covering every
/// declared secondary ordering; unique orderings omit the id from the key,
/// non-unique orderings embed the id as the final component so entries stay
/// distinct and iteration order is total.
pub trait StateObject: Clone + 'static {
    type Key: Ord + Clone + Debug;

    /// Kind name used in diagnostics.
    const NAME: &'static str;

    /// All secondary keys of this object in its current state. The primary
    /// id is passed in so non-unique orderings can embed it.
    fn keys(&self, id: Id) -> Vec<Self::Key>;
}

/// One open undo layer: the prior value of every object touched since the
/// layer was opened (`None` = did not exist), recorded on first touch only.
struct UndoLayer<T: StateObject> {
    prior: BTreeMap<Id, Option<T>>,
    old_next_id: Id,
}

/// Storage for one object kind: primary id map, ordered secondary index and
/// the undo stack.
pub struct Table<T: StateObject> {
    objects: BTreeMap<Id, T>,
    index: BTreeMap<T::Key, Id>,
    next_id: Id,
    undo: Vec<UndoLayer<T>>,
}

impl<T: StateObject> Default for Table<T> {
    fn default() -> Self {
        Table {
            objects: BTreeMap::new(),
            index: BTreeMap::new(),
            next_id: 0,
            undo: Vec::new(),
        }
    }
}

impl<T: StateObject> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, id: Id) {
        if let Some(layer) = self.undo.last_mut() {
            layer
                .prior
                .entry(id)
                .or_insert_with(|| self.objects.get(&id).cloned());
        }
    }

    fn index_insert(&mut self, id: Id, obj: &T) {
        for key in obj.keys(id) {
            let prev = self.index.insert(key.clone(), id);
            assert!(
                prev.is_none() || prev == Some(id),
                "{}: duplicate secondary key {:?}",
                T::NAME,
                key
            );
        }
    }

    fn index_remove(&mut self, id: Id, obj: &T) {
        for key in obj.keys(id) {
            self.index.remove(&key);
        }
    }

    /// Allocates a fresh id and inserts the object produced by `init`.
    pub fn create(&mut self, init: impl FnOnce(&mut T)) -> &T
    where
        T: Default,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.record(id);
        let mut obj = T::default();
        init(&mut obj);
        self.index_insert(id, &obj);
        self.objects.insert(id, obj);
        self.objects.get(&id).unwrap()
    }

    pub fn find(&self, id: Id) -> Option<&T> {
        self.objects.get(&id)
    }

    pub fn get(&self, id: Id) -> Result<&T, Error> {
        self.find(id).ok_or_else(|| Error::not_found(T::NAME, format!("id {id}")))
    }

    /// Unique-key lookup.
    pub fn find_by_key(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).and_then(|id| self.objects.get(id))
    }

    pub fn get_by_key(&self, key: &T::Key) -> Result<&T, Error> {
        self.find_by_key(key)
            .ok_or_else(|| Error::not_found(T::NAME, format!("{key:?}")))
    }

    pub fn id_by_key(&self, key: &T::Key) -> Option<Id> {
        self.index.get(key).copied()
    }

    /// Mutates the object through a closure, keeping the secondary index
    /// consistent with the new state.
    pub fn modify(&mut self, id: Id, f: impl FnOnce(&mut T)) -> Result<(), Error> {
        if !self.objects.contains_key(&id) {
            return Err(Error::not_found(T::NAME, format!("id {id}")));
        }
        self.record(id);
        let mut obj = self.objects.remove(&id).unwrap();
        self.index_remove(id, &obj);
        f(&mut obj);
        self.index_insert(id, &obj);
        self.objects.insert(id, obj);
        Ok(())
    }

    pub fn remove(&mut self, id: Id) -> Result<(), Error> {
        if !self.objects.contains_key(&id) {
            return Err(Error::not_found(T::NAME, format!("id {id}")));
        }
        self.record(id);
        let obj = self.objects.remove(&id).unwrap();
        self.index_remove(id, &obj);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates in primary-id order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &T)> {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }

    /// Iterates objects in secondary-key order over the given range.
    pub fn range<R: RangeBounds<T::Key>>(&self, range: R) -> impl Iterator<Item = (&T::Key, &T)> {
        self.index
            .range(range)
            .map(move |(key, id)| (key, self.objects.get(id).expect("index points at live object")))
    }

    /// Ids of objects in secondary-key order over the given range. Useful
    /// when the caller will mutate while sweeping.
    pub fn ids_in_range<R: RangeBounds<T::Key>>(&self, range: R) -> Vec<Id> {
        self.index.range(range).map(|(_, id)| *id).collect()
    }

    /// The first object at or after the range start, by secondary key.
    pub fn first_in_range<R: RangeBounds<T::Key>>(&self, range: R) -> Option<(Id, &T)> {
        self.index
            .range(range)
            .next()
            .map(|(_, id)| (*id, self.objects.get(id).expect("index points at live object")))
    }

    // --- undo sessions ------------------------------------------------

    /// Opens a new undo layer.
    pub fn begin_undo(&mut self) {
        self.undo.push(UndoLayer { prior: BTreeMap::new(), old_next_id: self.next_id });
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Reverts every change recorded in the top layer.
    pub fn undo(&mut self) {
        let layer = self.undo.pop().expect("undo without open layer");
        for (id, prior) in layer.prior {
            if let Some(current) = self.objects.remove(&id) {
                self.index_remove(id, &current);
            }
            if let Some(prev) = prior {
                self.index_insert(id, &prev);
                self.objects.insert(id, prev);
            }
        }
        self.next_id = layer.old_next_id;
    }

    /// Merges the top layer into its parent; the combined layer undoes both.
    pub fn squash(&mut self) {
        let top = self.undo.pop().expect("squash without open layer");
        let parent = self.undo.last_mut().expect("squash without parent layer");
        for (id, prior) in top.prior {
            parent.prior.entry(id).or_insert(prior);
        }
    }

    /// Irrevocably discards the oldest `layers` undo layers.
    pub fn commit(&mut self, layers: usize) {
        let n = layers.min(self.undo.len());
        self.undo.drain(..n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Row {
        name: String,
        due: u32,
    }

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
    enum RowKey {
        ByName(String),
        ByDue(u32, Id),
    }

    impl StateObject for Row {
        type Key = RowKey;
        const NAME: &'static str = "row";

        fn keys(&self, id: Id) -> Vec<RowKey> {
            vec![RowKey::ByName(self.name.clone()), RowKey::ByDue(self.due, id)]
        }
    }

    fn sample() -> Table<Row> {
        let mut t = Table::new();
        t.create(|r: &mut Row| {
            r.name = "alice".into();
            r.due = 30;
        });
        t.create(|r: &mut Row| {
            r.name = "bob".into();
            r.due = 10;
        });
        t
    }

    #[test]
    fn create_allocates_monotonic_ids() {
        let t = sample();
        let ids: Vec<Id> = t.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn lookup_by_unique_key() {
        let t = sample();
        assert_eq!(t.get_by_key(&RowKey::ByName("bob".into())).unwrap().due, 10);
        assert!(t.find_by_key(&RowKey::ByName("carol".into())).is_none());
        assert!(matches!(
            t.get_by_key(&RowKey::ByName("carol".into())),
            Err(Error::NotFound { kind: "row", .. })
        ));
    }

    #[test]
    fn secondary_order_iteration() {
        let t = sample();
        let names: Vec<&str> = t
            .range(RowKey::ByDue(0, 0)..RowKey::ByDue(u32::MAX, Id::MAX))
            .map(|(_, r)| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["bob", "alice"]);
    }

    #[test]
    fn modify_keeps_index_consistent() {
        let mut t = sample();
        let id = t.id_by_key(&RowKey::ByName("bob".into())).unwrap();
        t.modify(id, |r| r.due = 99).unwrap();
        let first = t
            .first_in_range(RowKey::ByDue(0, 0)..RowKey::ByDue(u32::MAX, Id::MAX))
            .unwrap();
        assert_eq!(first.1.name, "alice");
    }

    #[test]
    fn undo_reverts_create_modify_remove() {
        let mut t = sample();
        let alice = t.id_by_key(&RowKey::ByName("alice".into())).unwrap();
        let bob = t.id_by_key(&RowKey::ByName("bob".into())).unwrap();

        t.begin_undo();
        t.modify(alice, |r| r.due = 1).unwrap();
        t.remove(bob).unwrap();
        t.create(|r| {
            r.name = "carol".into();
            r.due = 5;
        });
        t.undo();

        assert_eq!(t.len(), 2);
        assert_eq!(t.get(alice).unwrap().due, 30);
        assert_eq!(t.get(bob).unwrap().name, "bob");
        assert!(t.find_by_key(&RowKey::ByName("carol".into())).is_none());
        // Ids released by undo are reused so replayed blocks allocate
        // identical ids.
        t.create(|r| {
            r.name = "dave".into();
            r.due = 7;
        });
        assert_eq!(t.id_by_key(&RowKey::ByName("dave".into())), Some(2));
    }

    #[test]
    fn squash_merges_layers() {
        let mut t = sample();
        let alice = t.id_by_key(&RowKey::ByName("alice".into())).unwrap();

        t.begin_undo();
        t.modify(alice, |r| r.due = 50).unwrap();
        t.begin_undo();
        t.modify(alice, |r| r.due = 70).unwrap();
        t.squash();
        assert_eq!(t.undo_depth(), 1);
        assert_eq!(t.get(alice).unwrap().due, 70);
        t.undo();
        assert_eq!(t.get(alice).unwrap().due, 30);
    }

    #[test]
    fn commit_discards_oldest_layers() {
        let mut t = sample();
        let alice = t.id_by_key(&RowKey::ByName("alice".into())).unwrap();

        t.begin_undo();
        t.modify(alice, |r| r.due = 40).unwrap();
        t.begin_undo();
        t.modify(alice, |r| r.due = 50).unwrap();
        t.commit(1);
        assert_eq!(t.undo_depth(), 1);
        t.undo();
        // Only the newest layer was revertible; the committed change stays.
        assert_eq!(t.get(alice).unwrap().due, 40);
    }

    #[test]
    fn nested_undo_restores_interleaved_changes() {
        let mut t = Table::<Row>::new();
        t.begin_undo();
        t.create(|r| {
            r.name = "alice".into();
            r.due = 1;
        });
        t.begin_undo();
        let alice = t.id_by_key(&RowKey::ByName("alice".into())).unwrap();
        t.modify(alice, |r| r.due = 2).unwrap();
        t.undo();
        assert_eq!(t.get(alice).unwrap().due, 1);
        t.undo();
        assert!(t.is_empty());
        assert_eq!(t.undo_depth(), 0);
    }
}

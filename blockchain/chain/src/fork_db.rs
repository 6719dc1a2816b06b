// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! In-memory tree of recent blocks. Tracks every branch near the head,
//! answers longest-chain queries and computes the two branches back to a
//! common ancestor for fork switching.

use crate::errors::{Error, Result};
use freezone_blocks::{BlockId, SignedBlock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One block in the tree.
#[derive(Debug, Clone)]
pub struct ForkItem {
    pub block: Arc<SignedBlock>,
    pub id: BlockId,
    pub num: u32,
}

impl ForkItem {
    fn new(block: SignedBlock) -> Self {
        let id = block.id();
        let num = block.block_num();
        ForkItem { block: Arc::new(block), id, num }
    }

    pub fn previous_id(&self) -> BlockId {
        self.block.header.previous
    }
}

#[derive(Default)]
pub struct ForkDatabase {
    index: HashMap<BlockId, Arc<ForkItem>>,
    by_num: BTreeMap<u32, Vec<BlockId>>,
    head: Option<Arc<ForkItem>>,
    max_size: u32,
}

impl ForkDatabase {
    pub fn new() -> Self {
        ForkDatabase { max_size: 1024, ..Default::default() }
    }

    pub fn head(&self) -> Option<&Arc<ForkItem>> {
        self.head.as_ref()
    }

    pub fn reset(&mut self) {
        self.index.clear();
        self.by_num.clear();
        self.head = None;
    }

    /// Seeds the tree with the current chain head, linking nothing.
    pub fn start_block(&mut self, block: SignedBlock) -> Arc<ForkItem> {
        let item = Arc::new(ForkItem::new(block));
        self.insert(item.clone());
        self.head = Some(item.clone());
        item
    }

    fn insert(&mut self, item: Arc<ForkItem>) {
        self.by_num.entry(item.num).or_default().push(item.id);
        self.index.insert(item.id, item);
    }

    /// Adds a block and returns the head of the longest chain. The parent
    /// must already be in the tree (or the block extends the pruned root).
    pub fn push_block(&mut self, block: SignedBlock) -> Result<Arc<ForkItem>> {
        let item = Arc::new(ForkItem::new(block));
        if let Some(head) = &self.head {
            let low_water = head.num.saturating_sub(self.max_size);
            let linked = self.index.contains_key(&item.previous_id()) || item.num <= low_water + 1;
            if !linked {
                return Err(Error::UnlinkableBlock(item.id));
            }
        }
        self.insert(item.clone());
        // Longest chain by height; ties keep the first-seen head.
        match &self.head {
            Some(head) if head.num >= item.num => {}
            _ => self.head = Some(item.clone()),
        }
        Ok(self.head.clone().expect("head exists after push"))
    }

    pub fn fetch_block(&self, id: &BlockId) -> Option<Arc<ForkItem>> {
        self.index.get(id).cloned()
    }

    /// All known blocks at a height; more than one means a fork.
    pub fn fetch_blocks_by_number(&self, num: u32) -> Vec<Arc<ForkItem>> {
        self.by_num
            .get(&num)
            .map(|ids| ids.iter().filter_map(|id| self.index.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Walks back from the head to the requested height along the main
    /// branch.
    pub fn fetch_block_on_main_branch_by_number(&self, num: u32) -> Option<Arc<ForkItem>> {
        let mut current = self.head.clone()?;
        if num > current.num {
            return None;
        }
        while current.num > num {
            current = self.index.get(&current.previous_id()).cloned()?;
        }
        Some(current)
    }

    /// The two branches from `a` and `b` back to their nearest common
    /// ancestor, each ordered newest-first and ending just above the
    /// ancestor.
    pub fn fetch_branch_from(
        &self,
        a: &BlockId,
        b: &BlockId,
    ) -> Result<(Vec<Arc<ForkItem>>, Vec<Arc<ForkItem>>)> {
        let mut branch_a = Vec::new();
        let mut branch_b = Vec::new();
        let mut cur_a = self
            .fetch_block(a)
            .ok_or(Error::UnlinkableBlock(*a))?;
        let mut cur_b = self
            .fetch_block(b)
            .ok_or(Error::UnlinkableBlock(*b))?;

        while cur_a.num > cur_b.num {
            let prev = cur_a.previous_id();
            branch_a.push(cur_a.clone());
            cur_a = self.fetch_block(&prev).ok_or(Error::UnlinkableBlock(prev))?;
        }
        while cur_b.num > cur_a.num {
            let prev = cur_b.previous_id();
            branch_b.push(cur_b.clone());
            cur_b = self.fetch_block(&prev).ok_or(Error::UnlinkableBlock(prev))?;
        }
        while cur_a.id != cur_b.id {
            let prev_a = cur_a.previous_id();
            let prev_b = cur_b.previous_id();
            branch_a.push(cur_a.clone());
            branch_b.push(cur_b.clone());
            cur_a = self.fetch_block(&prev_a).ok_or(Error::UnlinkableBlock(prev_a))?;
            cur_b = self.fetch_block(&prev_b).ok_or(Error::UnlinkableBlock(prev_b))?;
        }
        Ok((branch_a, branch_b))
    }

    pub fn set_head(&mut self, item: Arc<ForkItem>) {
        self.head = Some(item);
    }

    /// Moves the head back to its parent. The popped block stays in the
    /// tree so the branch can be reapplied.
    pub fn pop_block(&mut self) -> Result<Arc<ForkItem>> {
        let head = self.head.clone().ok_or_else(|| Error::fatal("no block to pop"))?;
        let prev = self
            .fetch_block(&head.previous_id())
            .ok_or_else(|| Error::fatal("popping would leave an empty fork database"))?;
        self.head = Some(prev);
        Ok(head)
    }

    pub fn remove(&mut self, id: &BlockId) {
        if let Some(item) = self.index.remove(id) {
            if let Some(ids) = self.by_num.get_mut(&item.num) {
                ids.retain(|i| i != id);
                if ids.is_empty() {
                    self.by_num.remove(&item.num);
                }
            }
            if self.head.as_ref().map(|h| h.id) == Some(*id) {
                self.head = self.fetch_block(&item.previous_id());
            }
        }
    }

    /// Evicts blocks older than `head - size`.
    pub fn set_max_size(&mut self, size: u32) {
        self.max_size = size;
        let head_num = match &self.head {
            Some(h) => h.num,
            None => return,
        };
        let cutoff = head_num.saturating_sub(size);
        let stale: Vec<u32> = self.by_num.range(..=cutoff).map(|(n, _)| *n).collect();
        for num in stale {
            if let Some(ids) = self.by_num.remove(&num) {
                for id in ids {
                    self.index.remove(&id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezone_blocks::BlockHeader;
    use freezone_types::{AccountName, TimePointSec};

    fn block(previous: BlockId, slot: u32, witness: &str) -> SignedBlock {
        SignedBlock::new(
            BlockHeader {
                previous,
                timestamp: TimePointSec(slot * 3),
                witness: AccountName::unchecked(witness),
                transaction_merkle_root: [0u8; 32],
                extensions: vec![],
            },
            vec![],
        )
    }

    fn genesis_db() -> (ForkDatabase, BlockId) {
        let mut db = ForkDatabase::new();
        let genesis = block(BlockId::default(), 1, "w0");
        let id = genesis.id();
        db.start_block(genesis);
        (db, id)
    }

    #[test]
    fn push_extends_longest_chain() {
        let (mut db, genesis_id) = genesis_db();
        let b2 = block(genesis_id, 2, "w1");
        let head = db.push_block(b2.clone()).unwrap();
        assert_eq!(head.id, b2.id());
        assert_eq!(head.num, 2);
    }

    #[test]
    fn unlinkable_block_rejected() {
        let (mut db, _) = genesis_db();
        let orphan = block(BlockId::new([9u8; 32], 10), 11, "w1");
        assert!(matches!(db.push_block(orphan), Err(Error::UnlinkableBlock(_))));
    }

    #[test]
    fn ties_keep_first_seen_head() {
        let (mut db, genesis_id) = genesis_db();
        let b2a = block(genesis_id, 2, "w1");
        let b2b = block(genesis_id, 2, "w2");
        db.push_block(b2a.clone()).unwrap();
        let head = db.push_block(b2b).unwrap();
        assert_eq!(head.id, b2a.id());
    }

    #[test]
    fn branch_computation_to_common_ancestor() {
        let (mut db, genesis_id) = genesis_db();
        // Branch A: 2a; branch B: 2b <- 3b.
        let b2a = block(genesis_id, 2, "w1");
        let b2b = block(genesis_id, 2, "w2");
        let b3b = block(b2b.id(), 3, "w3");
        db.push_block(b2a.clone()).unwrap();
        db.push_block(b2b.clone()).unwrap();
        let head = db.push_block(b3b.clone()).unwrap();
        assert_eq!(head.id, b3b.id());

        let (from_new, from_old) = db.fetch_branch_from(&b3b.id(), &b2a.id()).unwrap();
        assert_eq!(from_new.iter().map(|i| i.id).collect::<Vec<_>>(), vec![b3b.id(), b2b.id()]);
        assert_eq!(from_old.iter().map(|i| i.id).collect::<Vec<_>>(), vec![b2a.id()]);
        // Both branches end just above the common ancestor.
        assert_eq!(from_new.last().unwrap().previous_id(), genesis_id);
        assert_eq!(from_old.last().unwrap().previous_id(), genesis_id);
    }

    #[test]
    fn main_branch_lookup_by_number() {
        let (mut db, genesis_id) = genesis_db();
        let b2 = block(genesis_id, 2, "w1");
        let b3 = block(b2.id(), 3, "w2");
        db.push_block(b2.clone()).unwrap();
        db.push_block(b3).unwrap();
        assert_eq!(db.fetch_block_on_main_branch_by_number(2).unwrap().id, b2.id());
        assert!(db.fetch_block_on_main_branch_by_number(9).is_none());
    }

    #[test]
    fn pruning_drops_old_blocks() {
        let (mut db, genesis_id) = genesis_db();
        let mut prev = genesis_id;
        let mut ids = vec![genesis_id];
        for slot in 2..=10 {
            let b = block(prev, slot, "w");
            prev = b.id();
            ids.push(prev);
            db.push_block(b).unwrap();
        }
        db.set_max_size(3);
        assert!(db.fetch_block(&ids[0]).is_none());
        assert!(db.fetch_block(&ids[9]).is_some());
    }

    #[test]
    fn pop_block_moves_head_back() {
        let (mut db, genesis_id) = genesis_db();
        let b2 = block(genesis_id, 2, "w1");
        db.push_block(b2.clone()).unwrap();
        let popped = db.pop_block().unwrap();
        assert_eq!(popped.id, b2.id());
        assert_eq!(db.head().unwrap().id, genesis_id);
        // The popped block remains available for reapplication.
        assert!(db.fetch_block(&b2.id()).is_some());
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The chain engine: block and transaction application, fork switching with
//! full rollback, irreversibility and the migration of irreversible state
//! into the block log.

use crate::block_log::BlockLog;
use crate::config::{checkpoint_skip_flags, OpenArgs, SkipFlag, SkipFlags};
use crate::errors::{Error, Result};
use crate::fork_db::ForkDatabase;
use crate::signals::{
    BlockNotification, NotifiedOperation, OperationNotification, Signals, TransactionNotification,
};
use crate::state::{
    AccountAuthorityKey, State, TransactionKey, TransactionObject, WitnessKey,
};
use freezone_blocks::{BlockHeaderExtension, BlockId, SignedBlock};
use freezone_message::ops::RequiredAuthorities;
use freezone_message::{
    verify_authority, AuthorityResolver, OptionalAction, Operation, RequiredAction,
    SignedTransaction, TransactionId, VirtualOperation,
};
use freezone_types::config::{
    IRREVERSIBLE_THRESHOLD, MAX_TIME_UNTIL_EXPIRATION, MAX_UNDO_HISTORY, MIN_BLOCK_SIZE,
    PERCENT_100,
};
use freezone_types::{AccountName, Authority, ChainId, TimePointSec};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Wall-clock budget for applying one loose transaction. Block application
/// is never timed.
const PENDING_TRANSACTION_EXECUTION_LIMIT: Duration = Duration::from_millis(200);

pub struct Database {
    pub(crate) state: State,
    pub(crate) fork_db: ForkDatabase,
    pub(crate) block_log: BlockLog,
    pub signals: Signals,

    pub(crate) config: freezone_types::config::ChainConfig,
    chain_id: ChainId,
    checkpoints: BTreeMap<u32, BlockId>,
    base_skip: SkipFlags,
    pub(crate) skip: SkipFlags,

    pending_tx: Vec<SignedTransaction>,
    popped_tx: Vec<SignedTransaction>,
    pending_session_open: bool,
    pub(crate) is_pending: bool,

    pub(crate) current_trx_id: TransactionId,
    pub(crate) current_block_num: u32,
    pub(crate) current_trx_in_block: i32,
    pub(crate) current_op_in_trx: u32,
    pub(crate) current_virtual_op: u32,

    pub(crate) do_validate_invariants: bool,
    pub(crate) owner_auth_history_start_block: u32,
    pub(crate) sps_remove_threshold: u16,
    pub(crate) init_witness_key: freezone_types::PublicKey,
    stop_at_block: u32,
}

/// Authority lookups against the live state, handed to the signature
/// checker.
pub(crate) struct StateResolver<'a>(pub &'a State);

impl AuthorityResolver for StateResolver<'_> {
    fn active(&self, name: &AccountName) -> Option<Authority> {
        self.0
            .account_authorities
            .find_by_key(&AccountAuthorityKey::ByAccount(name.clone()))
            .map(|a| a.active.clone())
    }

    fn owner(&self, name: &AccountName) -> Option<Authority> {
        self.0
            .account_authorities
            .find_by_key(&AccountAuthorityKey::ByAccount(name.clone()))
            .map(|a| a.owner.clone())
    }

    fn posting(&self, name: &AccountName) -> Option<Authority> {
        self.0
            .account_authorities
            .find_by_key(&AccountAuthorityKey::ByAccount(name.clone()))
            .map(|a| a.posting.clone())
    }
}

impl Database {
    /// Opens the engine: loads or creates the block log, initializes genesis
    /// state when the store is empty and replays any logged blocks ahead of
    /// the store revision.
    pub fn open(args: OpenArgs) -> Result<Self> {
        let block_log = BlockLog::open(&args.data_dir)?;
        let mut db = Database {
            state: State::new(),
            fork_db: ForkDatabase::new(),
            block_log,
            signals: Signals::new(),
            config: args.config.clone(),
            chain_id: args.chain_id,
            checkpoints: BTreeMap::new(),
            base_skip: args.skip_flags,
            skip: args.skip_flags,
            pending_tx: Vec::new(),
            popped_tx: Vec::new(),
            pending_session_open: false,
            is_pending: false,
            current_trx_id: TransactionId::default(),
            current_block_num: 0,
            current_trx_in_block: 0,
            current_op_in_trx: 0,
            current_virtual_op: 0,
            do_validate_invariants: args.do_validate_invariants,
            owner_auth_history_start_block: args.owner_auth_history_start_block,
            sps_remove_threshold: args.sps_remove_threshold,
            init_witness_key: args
                .init_witness_key
                .unwrap_or_else(crate::genesis::default_init_witness_key),
            stop_at_block: args.stop_at_block,
        };
        crate::genesis::init_genesis(&mut db, args.initial_supply, args.fzd_initial_supply)?;
        if db.block_log.head_block_num() > 0 {
            db.reindex()?;
        }
        if db.do_validate_invariants {
            db.validate_invariants()?;
        }
        Ok(db)
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn config(&self) -> &freezone_types::config::ChainConfig {
        &self.config
    }

    pub fn head_block_num(&self) -> u32 {
        self.state.gpo().head_block_number
    }

    pub fn head_block_id(&self) -> BlockId {
        self.state.gpo().head_block_id
    }

    pub fn head_block_time(&self) -> TimePointSec {
        self.state.gpo().time
    }

    pub fn is_known_block(&mut self, id: &BlockId) -> bool {
        if self.fork_db.fetch_block(id).is_some() {
            return true;
        }
        matches!(self.block_log.read_block_by_num(id.block_num()), Ok(Some(ref b)) if b.id() == *id)
    }

    pub fn is_known_transaction(&self, id: &TransactionId) -> bool {
        self.state.transactions.find_by_key(&TransactionKey::ByTrxId(*id)).is_some()
    }

    /// Reads a block from the fork database or the block log.
    pub fn fetch_block_by_number(&mut self, num: u32) -> Result<Option<SignedBlock>> {
        if let Some(item) = self.fork_db.fetch_block_on_main_branch_by_number(num) {
            return Ok(Some((*item.block).clone()));
        }
        self.block_log.read_block_by_num(num)
    }

    pub fn add_checkpoints(&mut self, checkpoints: BTreeMap<u32, BlockId>) {
        self.checkpoints.extend(checkpoints);
    }

    pub fn before_last_checkpoint(&self) -> bool {
        self.checkpoints
            .keys()
            .next_back()
            .map(|height| self.head_block_num() < *height)
            .unwrap_or(false)
    }

    // --- slot arithmetic ----------------------------------------------

    /// Wall-clock time of a production slot relative to the head block.
    pub fn get_slot_time(&self, slot: u32) -> TimePointSec {
        if slot == 0 {
            return TimePointSec::MIN;
        }
        let interval = self.config.block_interval_secs;
        if self.head_block_num() == 0 {
            return TimePointSec(self.config.genesis_time.secs() + slot * interval);
        }
        let head_slot = self.head_block_time().secs() / interval;
        TimePointSec((head_slot + slot) * interval)
    }

    /// Which slot a timestamp falls into; zero when it precedes slot one.
    pub fn get_slot_at_time(&self, when: TimePointSec) -> u32 {
        let first = self.get_slot_time(1);
        if when < first {
            return 0;
        }
        (when.secs() - first.secs()) / self.config.block_interval_secs + 1
    }

    /// The witness scheduled to produce at a slot.
    pub fn get_scheduled_witness(&self, slot: u32) -> AccountName {
        let wso = self.state.wso();
        let gpo = self.state.gpo();
        let index = (gpo.current_aslot + slot as u64) % wso.current_shuffled_witnesses.len().max(1) as u64;
        wso.current_shuffled_witnesses[index as usize].clone()
    }

    pub fn witness_participation_rate(&self) -> u32 {
        self.state.gpo().participation_count as u32 * PERCENT_100 as u32 / 128
    }

    // --- block push ----------------------------------------------------

    /// Adds a signed block to the chain, switching forks when it extends a
    /// longer competing branch. Returns true when a fork switch occurred.
    pub fn push_block(&mut self, block: SignedBlock, skip: SkipFlags) -> Result<bool> {
        let mut effective = self.base_skip | skip;
        let block_num = block.block_num();
        if let Some((last_height, _)) = self.checkpoints.iter().next_back() {
            if let Some(expected) = self.checkpoints.get(&block_num) {
                if block.id() != *expected {
                    return Err(Error::CheckpointMismatch { height: block_num, id: block.id() });
                }
            }
            if *last_height >= block_num {
                effective |= checkpoint_skip_flags();
            }
        }
        self.skip = effective;

        // Pending state is rebuilt from scratch after the block lands.
        let pending = std::mem::take(&mut self.pending_tx);
        self.clear_pending_session();

        let result = self.push_block_inner(&block);
        self.skip = self.base_skip;

        // Re-apply popped and still-pending transactions; any that now fail
        // are dropped.
        let requeue: Vec<SignedTransaction> =
            std::mem::take(&mut self.popped_tx).into_iter().chain(pending).collect();
        for trx in requeue {
            if self.is_known_transaction(&trx.id()) {
                continue;
            }
            if let Err(e) = self.push_transaction(trx, SkipFlags::empty()) {
                log::debug!("dropping pending transaction after block: {e}");
            }
        }
        result
    }

    fn push_block_inner(&mut self, block: &SignedBlock) -> Result<bool> {
        if self.skip.contains(SkipFlag::ForkDb) {
            self.state.start_undo_session();
            match self.apply_block(block) {
                Ok(()) => return Ok(false),
                Err(e) => {
                    self.state.undo();
                    return Err(e);
                }
            }
        }

        let new_head = self.fork_db.push_block(block.clone())?;
        self.maybe_warn_multiple_production(new_head.num);

        if new_head.block.header.previous != self.head_block_id() {
            if new_head.num > self.head_block_num() {
                log::warn!("switching to fork {}", new_head.id);
                return self.switch_forks(new_head.id);
            }
            // A shorter or equal competing branch; hold the block and keep
            // the current head.
            return Ok(false);
        }

        self.state.start_undo_session();
        match self.apply_block(block) {
            Ok(()) => Ok(false),
            Err(e) => {
                log::error!("failed to push block {}: {e}", block.block_num());
                self.fork_db.remove(&block.id());
                self.state.undo();
                Err(e)
            }
        }
    }

    fn switch_forks(&mut self, new_head: BlockId) -> Result<bool> {
        let (new_branch, old_branch) = self.fork_db.fetch_branch_from(&new_head, &self.head_block_id())?;
        let common_ancestor = old_branch
            .last()
            .map(|item| item.previous_id())
            .unwrap_or_else(|| self.head_block_id());

        // Pop the current branch back to the common ancestor.
        while self.head_block_id() != common_ancestor {
            self.pop_block()?;
        }

        // Apply the new branch oldest-first.
        for item in new_branch.iter().rev() {
            self.fork_db.set_head(item.clone());
            self.state.start_undo_session();
            let applied = self.apply_block(&item.block);
            if let Err(e) = applied {
                log::warn!("exception thrown while switching forks: {e}");
                self.state.undo();

                // Drop the rest of the bad branch from the fork database.
                let mut discard = false;
                for bad in new_branch.iter().rev() {
                    if bad.id == item.id {
                        discard = true;
                    }
                    if discard {
                        self.fork_db.remove(&bad.id);
                    }
                }

                // Pop anything the partial switch applied, then restore the
                // original branch.
                while self.head_block_id() != common_ancestor {
                    self.pop_block()?;
                }
                for original in old_branch.iter().rev() {
                    self.fork_db.set_head(original.clone());
                    self.state.start_undo_session();
                    match self.apply_block(&original.block) {
                        Ok(()) => {}
                        Err(restore_err) => {
                            return Err(Error::fatal(format!(
                                "failed restoring original branch after bad fork: {restore_err}"
                            )))
                        }
                    }
                }
                return Err(e);
            }
        }
        Ok(true)
    }

    fn maybe_warn_multiple_production(&self, height: u32) {
        let blocks = self.fork_db.fetch_blocks_by_number(height);
        if blocks.len() > 1 {
            let witnesses: Vec<String> = blocks
                .iter()
                .map(|b| format!("{} at {}", b.block.header.witness, b.block.header.timestamp))
                .collect();
            log::warn!("block num collision at {height} due to a fork, witnesses are {witnesses:?}");
        }
    }

    /// Removes the head block, undoing its state changes. Its transactions
    /// are queued for rebroadcast against the new head.
    pub fn pop_block(&mut self) -> Result<()> {
        self.clear_pending_session();
        let head_id = self.head_block_id();
        let head = self
            .fork_db
            .fetch_block(&head_id)
            .ok_or_else(|| Error::fatal("there are no blocks to pop"))?;
        self.fork_db.pop_block()?;
        self.state.undo();
        let mut popped: Vec<SignedTransaction> = head.block.transactions.clone();
        popped.extend(std::mem::take(&mut self.popped_tx));
        self.popped_tx = popped;
        Ok(())
    }

    fn clear_pending_session(&mut self) {
        if self.pending_session_open {
            self.state.undo();
            self.pending_session_open = false;
        }
        self.pending_tx.clear();
    }

    // --- transaction push ----------------------------------------------

    /// Queues a loose transaction against the pending session.
    pub fn push_transaction(&mut self, trx: SignedTransaction, skip: SkipFlags) -> Result<()> {
        self.skip = self.base_skip | skip;
        self.is_pending = true;
        let result = self.push_transaction_inner(trx);
        self.is_pending = false;
        self.skip = self.base_skip;
        result
    }

    fn push_transaction_inner(&mut self, trx: SignedTransaction) -> Result<()> {
        if !self.skip.contains(SkipFlag::BlockSizeCheck) {
            let size = serde_cbor::to_vec(&trx)?.len();
            let max = self.state.gpo().maximum_block_size as usize;
            if size + 256 > max {
                return Err(Error::precondition("transaction is larger than the block size limit"));
            }
        }
        let started = Instant::now();
        if !self.pending_session_open {
            self.state.start_undo_session();
            self.pending_session_open = true;
        }
        self.state.start_undo_session();
        match self.apply_transaction_inner(&trx) {
            Ok(()) => {
                self.state.squash();
                self.pending_tx.push(trx);
                if started.elapsed() > PENDING_TRANSACTION_EXECUTION_LIMIT {
                    log::warn!("pending transaction exceeded its execution budget");
                }
                Ok(())
            }
            Err(e) => {
                self.state.undo();
                Err(e)
            }
        }
    }

    // --- block application ---------------------------------------------

    pub(crate) fn apply_block(&mut self, block: &SignedBlock) -> Result<()> {
        let note = BlockNotification::new(block);
        self.signals.notify_pre_apply_block(&note)?;

        let block_num = block.block_num();
        self.current_block_num = block_num;
        self.current_trx_in_block = 0;
        self.current_op_in_trx = 0;
        self.current_virtual_op = 0;

        if block_num == 1 {
            crate::hardfork::apply_genesis_hardforks(self, block.header.timestamp)?;
        }

        if !self.skip.contains(SkipFlag::MerkleCheck) {
            let merkle = block.calculate_merkle_root();
            if merkle != block.header.transaction_merkle_root
                && !crate::hardfork::is_known_bad_merkle(&self.chain_id, block_num, &merkle)
            {
                return Err(Error::MerkleMismatch(block.id()));
            }
        }

        let signing_witness = self.validate_block_header(block)?;

        if !self.skip.contains(SkipFlag::BlockSizeCheck) {
            let size = block.pack_size();
            if size > self.state.gpo().maximum_block_size as usize {
                return Err(Error::InvalidBlockHeader(format!(
                    "block size {size} exceeds maximum"
                )));
            }
            if size < MIN_BLOCK_SIZE {
                log::error!("block size {size} is smaller than the protocol minimum");
            }
        }

        self.state.modify_gpo(|gpo| gpo.current_witness = block.header.witness.clone());

        let (req_actions, opt_actions) = self.process_header_extensions(block)?;

        // A witness must run the active hardfork to produce.
        {
            let witness = self.state.get_witness(&block.header.witness)?;
            let hf_state = self.state.hardforks();
            if witness.running_version.hardfork_version() < hf_state.current_hardfork_version {
                return Err(Error::InvalidBlockHeader(format!(
                    "block produced by witness {} that is not running the current hardfork",
                    witness.owner
                )));
            }
        }

        for trx in &block.transactions {
            // Transactions in a block share the block's session: either the
            // whole block applies or none of it does.
            self.apply_transaction_inner(trx)?;
            self.current_trx_in_block += 1;
        }

        self.current_trx_in_block = -1;
        self.current_op_in_trx = 0;
        self.current_virtual_op = 0;

        self.update_global_dynamic_data(block)?;
        self.update_signing_witness(&signing_witness, block)?;

        self.create_block_summary(block)?;
        self.clear_expired_transactions()?;
        self.clear_expired_orders()?;
        self.clear_expired_delegations()?;

        self.update_witness_schedule()?;

        self.update_median_feed()?;
        self.update_virtual_supply()?;

        self.clear_null_account_balance()?;
        self.process_funds()?;
        self.process_conversions()?;
        self.process_comment_cashout()?;
        self.process_vesting_withdrawals()?;
        self.process_savings_withdraws()?;
        self.process_subsidized_accounts()?;
        self.pay_liquidity_reward()?;
        self.update_virtual_supply()?;

        self.account_recovery_processing()?;
        self.expire_escrow_ratification()?;
        self.process_decline_voting_rights()?;
        self.process_proposals(&note)?;

        self.generate_required_actions()?;
        self.generate_optional_actions(&note)?;

        self.process_required_actions(&req_actions)?;
        self.process_optional_actions(&opt_actions)?;

        self.process_hardforks()?;

        // Irreversibility only advances once the whole maintenance pass ran.
        self.update_last_irreversible_block()?;

        self.signals.notify_post_apply_block(&note)?;

        if !self.skip.contains(SkipFlag::ValidateInvariants) && self.do_validate_invariants {
            self.validate_invariants()?;
        }

        // The only irreversible part of applying a block, kept last.
        self.migrate_irreversible_state()?;
        Ok(())
    }

    fn validate_block_header(&self, block: &SignedBlock) -> Result<AccountName> {
        let head_id = self.head_block_id();
        if block.header.previous != head_id {
            return Err(Error::InvalidBlockHeader(format!(
                "previous id {} does not match head {head_id}",
                block.header.previous
            )));
        }
        if block.header.timestamp <= self.head_block_time() && self.head_block_num() > 0 {
            return Err(Error::InvalidBlockHeader(
                "block timestamp must advance past the head".into(),
            ));
        }
        let witness = self.state.get_witness(&block.header.witness)?;

        if !self.skip.contains(SkipFlag::WitnessSignature) {
            let signee = block.signee()?;
            if signee != witness.signing_key {
                return Err(Error::InvalidBlockHeader(format!(
                    "block not signed by witness {}'s signing key",
                    witness.owner
                )));
            }
        }

        if !self.skip.contains(SkipFlag::WitnessScheduleCheck) {
            let slot = self.get_slot_at_time(block.header.timestamp);
            if slot == 0 {
                return Err(Error::InvalidBlockHeader("block timestamp is too early".into()));
            }
            let scheduled = self.get_scheduled_witness(slot);
            if scheduled != witness.owner {
                return Err(Error::InvalidBlockHeader(format!(
                    "witness {} produced at slot {slot} scheduled for {scheduled}",
                    witness.owner
                )));
            }
        }
        Ok(witness.owner.clone())
    }

    fn process_header_extensions(
        &mut self,
        block: &SignedBlock,
    ) -> Result<(Vec<RequiredAction>, Vec<OptionalAction>)> {
        let mut req = Vec::new();
        let mut opt = Vec::new();
        for extension in &block.header.extensions {
            match extension {
                BlockHeaderExtension::Version(version) => {
                    let witness = block.header.witness.clone();
                    let id = self
                        .state
                        .witnesses
                        .id_by_key(&WitnessKey::ByName(witness))
                        .ok_or_else(|| Error::precondition("unknown witness in header"))?;
                    let version = *version;
                    self.state.witnesses.modify(id, |w| w.running_version = version)?;
                }
                BlockHeaderExtension::HardforkVersionVote { version, time } => {
                    let witness = block.header.witness.clone();
                    let id = self
                        .state
                        .witnesses
                        .id_by_key(&WitnessKey::ByName(witness))
                        .ok_or_else(|| Error::precondition("unknown witness in header"))?;
                    let (version, time) = (*version, *time);
                    self.state.witnesses.modify(id, |w| {
                        w.hardfork_version_vote = version;
                        w.hardfork_time_vote = time;
                    })?;
                }
                BlockHeaderExtension::RequiredActions(actions) => {
                    if !crate::hardfork::has_sst_hardfork(self) {
                        return Err(Error::precondition(
                            "automated actions are not enabled until the token hardfork",
                        ));
                    }
                    req.extend(actions.iter().cloned());
                }
                BlockHeaderExtension::OptionalActions(actions) => {
                    if !crate::hardfork::has_sst_hardfork(self) {
                        return Err(Error::precondition(
                            "automated actions are not enabled until the token hardfork",
                        ));
                    }
                    opt.extend(actions.iter().cloned());
                }
            }
        }
        Ok((req, opt))
    }

    // --- transaction application ----------------------------------------

    pub(crate) fn apply_transaction_inner(&mut self, trx: &SignedTransaction) -> Result<()> {
        let trx_id = trx.id();
        self.current_trx_id = trx_id;
        self.current_virtual_op = 0;

        if !self.skip.contains(SkipFlag::Validate) {
            trx.validate()?;
        }

        if !self.skip.contains(SkipFlag::TransactionDupeCheck) && self.is_known_transaction(&trx_id)
        {
            return Err(Error::DuplicateTransaction(trx_id));
        }

        if !self.skip.contains(SkipFlag::TransactionSignatures)
            && !self.skip.contains(SkipFlag::AuthorityCheck)
        {
            let mut required = RequiredAuthorities::default();
            for op in &trx.operations {
                op.required_authorities(&mut required);
            }
            let keys = trx.signees(&self.chain_id)?;
            verify_authority(&required, &keys, &StateResolver(&self.state))?;
        }

        if self.head_block_num() > 0 {
            if !self.skip.contains(SkipFlag::TaposCheck) {
                let ring_slot = trx.ref_block_num as u64;
                let summary = self.state.block_summaries.get(ring_slot)?;
                if summary.block_id.tapos_prefix() != trx.ref_block_prefix {
                    return Err(Error::TaposMismatch);
                }
            }
            let now = self.head_block_time();
            if trx.expiration > now.saturating_add(MAX_TIME_UNTIL_EXPIRATION) {
                return Err(Error::Expiration(format!(
                    "expiration {} too far in the future",
                    trx.expiration
                )));
            }
            if now >= trx.expiration {
                return Err(Error::Expiration(format!("expired at {}", trx.expiration)));
            }
        }

        if !self.skip.contains(SkipFlag::TransactionDupeCheck) {
            let expiration = trx.expiration;
            self.state.transactions.create(|t: &mut TransactionObject| {
                t.trx_id = trx_id;
                t.expiration = expiration;
            });
        }

        let note =
            TransactionNotification { transaction_id: trx_id, transaction: trx.clone() };
        self.signals.notify_pre_apply_transaction(&note)?;

        self.current_op_in_trx = 0;
        for op in &trx.operations {
            self.apply_operation(op)?;
            self.current_op_in_trx += 1;
        }
        self.current_trx_id = TransactionId::default();

        self.signals.notify_post_apply_transaction(&note)?;
        Ok(())
    }

    fn apply_operation(&mut self, op: &Operation) -> Result<()> {
        let note = OperationNotification {
            trx_id: self.current_trx_id,
            block: self.current_block_num,
            trx_in_block: self.current_trx_in_block,
            op_in_trx: self.current_op_in_trx,
            virtual_op: 0,
            op: NotifiedOperation::User(op.clone()),
        };
        self.signals.notify_pre_apply_operation(&note)?;
        crate::evaluator::apply(self, op)?;
        self.signals.notify_post_apply_operation(&note)?;
        Ok(())
    }

    /// Emits a notification-only operation describing an engine event.
    pub(crate) fn push_virtual_operation(&mut self, vop: VirtualOperation) -> Result<()> {
        self.current_virtual_op += 1;
        let note = OperationNotification {
            trx_id: self.current_trx_id,
            block: self.current_block_num,
            trx_in_block: self.current_trx_in_block,
            op_in_trx: self.current_op_in_trx,
            virtual_op: self.current_virtual_op,
            op: NotifiedOperation::Virtual(vop),
        };
        self.signals.notify_pre_apply_operation(&note)?;
        self.signals.notify_post_apply_operation(&note)?;
        Ok(())
    }

    // --- per-block bookkeeping ------------------------------------------

    fn update_global_dynamic_data(&mut self, block: &SignedBlock) -> Result<()> {
        let mut missed_blocks = 0u32;
        if self.head_block_num() > 0 {
            missed_blocks = self.get_slot_at_time(block.header.timestamp).saturating_sub(1);
            let blocks_per_day = self.config.blocks_per_day();
            for i in 0..missed_blocks {
                let missed_witness = self.get_scheduled_witness(i + 1);
                if missed_witness == block.header.witness {
                    continue;
                }
                let id = self
                    .state
                    .witnesses
                    .id_by_key(&WitnessKey::ByName(missed_witness.clone()))
                    .ok_or_else(|| Error::precondition("missed witness not found"))?;
                let head = self.head_block_num();
                let mut shutdown = false;
                self.state.witnesses.modify(id, |w| {
                    w.total_missed += 1;
                    if head.saturating_sub(w.last_confirmed_block_num) > blocks_per_day {
                        w.signing_key = freezone_types::PublicKey::nil();
                        shutdown = true;
                    }
                })?;
                if shutdown {
                    self.push_virtual_operation(VirtualOperation::ShutdownWitness {
                        witness: missed_witness,
                    })?;
                }
            }
        }

        let block_id = block.id();
        let block_num = block.block_num();
        let timestamp = block.header.timestamp;
        self.state.modify_gpo(|gpo| {
            for i in 0..missed_blocks + 1 {
                gpo.participation_count -= if gpo.recent_slots_filled & (1u128 << 127) != 0 { 1 } else { 0 };
                gpo.recent_slots_filled = (gpo.recent_slots_filled << 1) + u128::from(i == 0);
                gpo.participation_count += u8::from(i == 0);
            }
            gpo.head_block_number = block_num;
            gpo.head_block_id = block_id;
            gpo.time = timestamp;
            gpo.current_aslot += missed_blocks as u64 + 1;
        });

        if !self.skip.contains(SkipFlag::UndoHistoryCheck) {
            let gpo = self.state.gpo();
            if gpo.head_block_number - gpo.last_irreversible_block_num >= MAX_UNDO_HISTORY {
                return Err(Error::fatal(
                    "the database does not have enough undo history to support so many missed blocks",
                ));
            }
        }
        Ok(())
    }

    fn update_signing_witness(&mut self, witness: &AccountName, block: &SignedBlock) -> Result<()> {
        let new_block_aslot =
            self.state.gpo().current_aslot; // already advanced to this block's slot
        let id = self
            .state
            .witnesses
            .id_by_key(&WitnessKey::ByName(witness.clone()))
            .ok_or_else(|| Error::precondition("signing witness not found"))?;
        let block_num = block.block_num();
        self.state.witnesses.modify(id, |w| {
            w.last_aslot = new_block_aslot;
            w.last_confirmed_block_num = block_num;
        })?;
        Ok(())
    }

    fn create_block_summary(&mut self, block: &SignedBlock) -> Result<()> {
        let slot = block.block_num() as u64 % freezone_types::config::BLOCK_SUMMARY_RING_SIZE as u64;
        let id = block.id();
        self.state.block_summaries.modify(slot, |s| s.block_id = id)?;
        Ok(())
    }

    fn update_last_irreversible_block(&mut self) -> Result<()> {
        let old_lib = self.state.gpo().last_irreversible_block_num;

        if self.head_block_num() < self.config.miner_voting_start_block {
            // Conservative pre-voting rule: a fixed lag behind the head.
            let head = self.head_block_num();
            let max_witnesses = freezone_types::config::MAX_WITNESSES as u32;
            if head > max_witnesses {
                self.state.modify_gpo(|gpo| {
                    gpo.last_irreversible_block_num =
                        gpo.last_irreversible_block_num.max(head - max_witnesses)
                });
            }
        } else {
            let wso = self.state.wso();
            let mut confirmations: Vec<u32> = wso
                .current_shuffled_witnesses
                .iter()
                .filter_map(|name| self.state.find_witness(name))
                .map(|w| w.last_confirmed_block_num)
                .collect();
            if !confirmations.is_empty() {
                let offset = (PERCENT_100 - IRREVERSIBLE_THRESHOLD) as usize * confirmations.len()
                    / PERCENT_100 as usize;
                confirmations.sort_unstable();
                let new_lib = confirmations[offset];
                if new_lib > old_lib {
                    self.state.modify_gpo(|gpo| gpo.last_irreversible_block_num = new_lib);
                }
            }
        }

        let new_lib = self.state.gpo().last_irreversible_block_num;
        for num in old_lib + 1..=new_lib {
            self.signals.notify_irreversible_block(&num)?;
        }
        Ok(())
    }

    /// Appends newly irreversible blocks to the block log, commits their
    /// undo history and trims the fork database.
    fn migrate_irreversible_state(&mut self) -> Result<()> {
        let gpo_head = self.state.gpo().head_block_number;
        let lib = self.state.gpo().last_irreversible_block_num;

        if let Some(fork_head) = self.fork_db.head() {
            if fork_head.num != gpo_head {
                return Err(Error::fatal(format!(
                    "fork head {} does not match chain head {gpo_head}",
                    fork_head.num
                )));
            }
        }

        if !self.skip.contains(SkipFlag::BlockLog) {
            let log_head = self.block_log.head_block_num();
            if log_head < lib {
                let mut to_write = Vec::new();
                for num in log_head + 1..=lib {
                    let item = self
                        .fork_db
                        .fetch_block_on_main_branch_by_number(num)
                        .ok_or_else(|| {
                            Error::fatal("fork database does not contain the irreversible block")
                        })?;
                    to_write.push(item);
                }
                for item in to_write {
                    self.block_log.append(&item.block)?;
                }
                self.block_log.flush()?;
            }
        }

        self.fork_db.set_max_size(gpo_head - lib + 1);
        self.state.commit(lib as u64);
        Ok(())
    }

    // --- automated action queues ----------------------------------------

    pub(crate) fn push_required_action(&mut self, action: RequiredAction, execution_time: TimePointSec) {
        self.state.pending_required_actions.create(|p| {
            p.action = action;
            p.execution_time = execution_time;
        });
    }

    pub(crate) fn push_optional_action(&mut self, action: OptionalAction, execution_time: TimePointSec) {
        let hash = action.hash();
        if self
            .state
            .pending_optional_actions
            .find_by_key(&crate::state::PendingOptionalActionKey::ByHash(hash))
            .is_some()
        {
            return;
        }
        self.state.pending_optional_actions.create(|p| {
            p.action = action;
            p.execution_time = execution_time;
            p.action_hash = hash;
        });
    }

    /// Required actions a block produced at `at` must include, in order.
    pub fn due_required_actions(&self, at: TimePointSec) -> Vec<RequiredAction> {
        use crate::state::PendingRequiredActionKey as K;
        self.state
            .pending_required_actions
            .range(K::ByExecution(TimePointSec::MIN, 0)..=K::ByExecution(at, u64::MAX))
            .map(|(_, p)| p.action.clone())
            .collect()
    }

    /// Optional actions a block produced at `at` may include.
    pub fn due_optional_actions(&self, at: TimePointSec) -> Vec<OptionalAction> {
        use crate::state::PendingOptionalActionKey as K;
        self.state
            .pending_optional_actions
            .range(K::ByExecution(TimePointSec::MIN, 0)..=K::ByExecution(at, u64::MAX))
            .map(|(_, p)| p.action.clone())
            .collect()
    }

    // --- reindex ---------------------------------------------------------

    /// Replays the block log from genesis into a fresh state.
    pub fn reindex(&mut self) -> Result<u32> {
        let head = self.block_log.head_block_num();
        log::info!("reindexing blockchain from block log with {head} blocks");
        self.signals.notify_pre_reindex(&head)?;

        let stop = if self.stop_at_block > 0 { self.stop_at_block.min(head) } else { head };
        let replay_skip = SkipFlag::WitnessSignature
            | SkipFlag::TransactionSignatures
            | SkipFlag::TransactionDupeCheck
            | SkipFlag::TaposCheck
            | SkipFlag::MerkleCheck
            | SkipFlag::WitnessScheduleCheck
            | SkipFlag::AuthorityCheck
            | SkipFlag::Validate
            | SkipFlag::ValidateInvariants
            | SkipFlag::BlockLog;

        self.skip = self.base_skip | replay_skip;
        for num in 1..=stop {
            let block = self
                .block_log
                .read_block_by_num(num)?
                .ok_or_else(|| Error::fatal(format!("block {num} missing from the log")))?;
            if num % 100_000 == 0 {
                log::info!("reindex progress: block {num}");
            }
            if num == 1 {
                self.fork_db.start_block(block.clone());
            } else {
                self.fork_db.push_block(block.clone())?;
            }
            self.state.start_undo_session();
            self.apply_block(&block)?;
        }
        self.skip = self.base_skip;

        self.signals.notify_post_reindex(&stop)?;
        if self.do_validate_invariants {
            self.validate_invariants()?;
        }
        Ok(stop)
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Shared fixture: an in-memory single-witness chain producing real signed
//! blocks with the shortened test timing profile.

// Each test binary uses its own slice of the fixture.
#![allow(dead_code)]

use freezone_blocks::{merkle_root, BlockHeader, BlockHeaderExtension, SignedBlock};
use freezone_chain::{Database, OpenArgs, SkipFlags};
use freezone_message::ops::*;
use freezone_message::{Operation, SignedTransaction, Transaction};
use freezone_types::config::{ChainConfig, INIT_WITNESS_NAME};
use freezone_types::{
    AccountName, Asset, Authority, PrivateKey, Price, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL,
};
use tempfile::TempDir;

pub const TEST_CHAIN_ID: [u8; 32] = [42u8; 32];

pub struct TestChain {
    pub db: Database,
    pub init_key: PrivateKey,
    _data_dir: TempDir,
}

impl TestChain {
    pub fn new() -> Self {
        // The dollar float stays around one percent of market cap so the
        // print rate holds at full and the debt-cap clamp stays idle.
        Self::with_supplies(1_000_000_000, 10_000_000)
    }

    pub fn with_supplies(initial_supply: i64, fzd_initial_supply: i64) -> Self {
        let data_dir = tempfile::tempdir().expect("tempdir");
        let init_key = PrivateKey::from_seed(INIT_WITNESS_NAME);
        let mut args = OpenArgs::new(data_dir.path().to_path_buf(), TEST_CHAIN_ID);
        args.config = ChainConfig::testing();
        args.initial_supply = initial_supply;
        args.fzd_initial_supply = fzd_initial_supply;
        args.do_validate_invariants = true;
        args.init_witness_key = Some(init_key.public_key());
        let db = Database::open(args).expect("open database");
        TestChain { db, init_key, _data_dir: data_dir }
    }

    pub fn init_witness(&self) -> AccountName {
        AccountName::unchecked(INIT_WITNESS_NAME)
    }

    /// Produces and applies the next block, carrying the given transactions
    /// plus whatever automated actions are due.
    pub fn produce_block_with(
        &mut self,
        transactions: Vec<SignedTransaction>,
    ) -> freezone_chain::Result<SignedBlock> {
        let when = self.db.get_slot_time(1);
        let witness = self.db.get_scheduled_witness(1);

        let mut extensions = Vec::new();
        let required = self.db.due_required_actions(when);
        if !required.is_empty() {
            extensions.push(BlockHeaderExtension::RequiredActions(required));
        }
        let optional = self.db.due_optional_actions(when);
        if !optional.is_empty() {
            extensions.push(BlockHeaderExtension::OptionalActions(optional));
        }

        let header = BlockHeader {
            previous: self.db.head_block_id(),
            timestamp: when,
            witness,
            transaction_merkle_root: merkle_root(&transactions),
            extensions,
        };
        let mut block = SignedBlock::new(header, transactions);
        block.sign(&self.init_key);
        self.db.push_block(block.clone(), SkipFlags::empty())?;
        Ok(block)
    }

    pub fn produce_block(&mut self) -> SignedBlock {
        self.produce_block_with(Vec::new()).expect("produce block")
    }

    pub fn produce_blocks(&mut self, count: u32) {
        for _ in 0..count {
            self.produce_block();
        }
    }

    /// Produces blocks until the head time passes `when`.
    pub fn produce_until(&mut self, when: TimePointSec) {
        while self.db.head_block_time() < when {
            self.produce_block();
        }
    }

    pub fn head_time(&self) -> TimePointSec {
        self.db.head_block_time()
    }

    /// Builds a signed transaction referencing the current head.
    pub fn build_tx(&self, operations: Vec<Operation>, keys: &[&PrivateKey]) -> SignedTransaction {
        let head_id = self.db.head_block_id();
        let transaction = Transaction {
            ref_block_num: (self.db.head_block_num() & 0xffff) as u16,
            ref_block_prefix: head_id.tapos_prefix(),
            expiration: self.db.head_block_time().saturating_add(600),
            operations,
        };
        let mut tx = SignedTransaction { transaction, signatures: Vec::new() };
        for key in keys {
            tx.sign(key, &TEST_CHAIN_ID);
        }
        tx
    }

    /// Applies operations through a produced block, signed by `keys`.
    pub fn apply_ops(
        &mut self,
        operations: Vec<Operation>,
        keys: &[&PrivateKey],
    ) -> freezone_chain::Result<SignedBlock> {
        let tx = self.build_tx(operations, keys);
        self.produce_block_with(vec![tx])
    }

    /// Creates an account funded by the genesis witness; all three
    /// authorities derive from one seed key.
    pub fn create_account(&mut self, name: &str) -> PrivateKey {
        let key = PrivateKey::from_seed(name);
        let fee = self.db.state().wso().median_props.account_creation_fee;
        let op = AccountCreateOperation {
            fee,
            creator: self.init_witness(),
            new_account_name: AccountName::new(name).expect("valid test account name"),
            owner: Authority::single_key(key.public_key()),
            active: Authority::single_key(key.public_key()),
            posting: Authority::single_key(key.public_key()),
            memo_key: key.public_key(),
            json_metadata: String::new(),
        };
        let init_key = self.init_key.clone();
        self.apply_ops(vec![op.into()], &[&init_key]).expect("create account");
        key
    }

    /// Transfers from the genesis witness.
    pub fn fund(&mut self, to: &str, amount: Asset) {
        let op = TransferOperation {
            from: self.init_witness(),
            to: AccountName::new(to).expect("valid name"),
            amount,
            memo: String::new(),
        };
        let init_key = self.init_key.clone();
        self.apply_ops(vec![op.into()], &[&init_key]).expect("fund account");
    }

    /// Publishes a feed from the genesis witness and produces until the
    /// next feed interval folds it into the median.
    pub fn set_feed(&mut self, fzd_per_freezone: Price) {
        let op = FeedPublishOperation {
            publisher: self.init_witness(),
            exchange_rate: fzd_per_freezone,
        };
        let init_key = self.init_key.clone();
        self.apply_ops(vec![op.into()], &[&init_key]).expect("publish feed");
        let interval = self.db.config().feed_interval_blocks;
        let to_boundary = interval - self.db.head_block_num() % interval;
        self.produce_blocks(to_boundary);
        assert!(
            !self.db.state().feed().current_median_history.is_null(),
            "median feed should be live"
        );
    }

    pub fn balance(&self, name: &str, symbol: freezone_types::AssetSymbol) -> Asset {
        self.db
            .get_balance(&AccountName::new(name).expect("valid name"), symbol)
            .expect("balance lookup")
    }
}

/// The canonical one-dollar-per-token feed.
pub fn one_to_one_feed() -> Price {
    Price::new(Asset::new(1_000, FZD_SYMBOL), Asset::new(1_000, FREEZONE_SYMBOL))
}

pub fn name(s: &str) -> AccountName {
    AccountName::new(s).expect("valid name")
}

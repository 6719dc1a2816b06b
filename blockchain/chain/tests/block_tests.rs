// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod common;

use common::{name, TestChain};
use freezone_blocks::{merkle_root, BlockHeader, SignedBlock};
use freezone_chain::SkipFlags;
use freezone_message::ops::TransferOperation;
use freezone_types::{Asset, FREEZONE_SYMBOL};

#[test]
fn empty_blocks_advance_the_chain() {
    let mut chain = TestChain::new();
    chain.produce_blocks(5);
    assert_eq!(chain.db.head_block_num(), 5);
    assert_eq!(chain.db.head_block_id().block_num(), 5);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn store_revision_tracks_head_block() {
    let mut chain = TestChain::new();
    chain.produce_blocks(7);
    assert_eq!(chain.db.state().revision(), 7);
}

#[test]
fn irreversibility_lags_and_fills_the_block_log() {
    let mut chain = TestChain::new();
    chain.produce_blocks(30);
    let gpo = chain.db.state().gpo();
    // The pre-voting rule keeps a fixed window of reversible blocks.
    assert_eq!(gpo.last_irreversible_block_num, 30 - 21);
    let lib = gpo.last_irreversible_block_num;
    let logged = chain.db.fetch_block_by_number(lib).unwrap().unwrap();
    assert_eq!(logged.block_num(), lib);
}

#[test]
fn inflation_mints_into_supply_every_block() {
    let mut chain = TestChain::new();
    let before = chain.db.state().gpo().current_supply;
    chain.produce_blocks(10);
    let after = chain.db.state().gpo().current_supply;
    assert!(after.amount > before.amount);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn reindex_replays_the_block_log() {
    let data_dir = tempfile::tempdir().unwrap();
    let init_key = freezone_types::PrivateKey::from_seed("initwitness");
    let mut args = freezone_chain::OpenArgs::new(data_dir.path().to_path_buf(), common::TEST_CHAIN_ID);
    args.config = freezone_types::config::ChainConfig::testing();
    args.initial_supply = 1_000_000_000;
    args.fzd_initial_supply = 10_000_000;
    args.do_validate_invariants = true;
    args.init_witness_key = Some(init_key.public_key());

    let (lib, lib_id) = {
        let mut chain = common::TestChain::with_supplies(1_000_000_000, 10_000_000);
        // Feed the fixture's blocks into a second database writing our own
        // block log; identical genesis makes the chains byte-compatible.
        let mut db = freezone_chain::Database::open(args.clone()).unwrap();
        for _ in 0..30 {
            let block = chain.produce_block();
            db.push_block(block, freezone_chain::SkipFlags::empty()).unwrap();
        }
        let lib = db.state().gpo().last_irreversible_block_num;
        let id = db.fetch_block_by_number(lib).unwrap().unwrap().id();
        (lib, id)
    };
    assert!(lib > 0);

    // A fresh open on the same directory replays every irreversible block
    // and lands on the logged head with clean invariants.
    let mut reopened = freezone_chain::Database::open(args).unwrap();
    assert_eq!(reopened.head_block_num(), lib);
    assert_eq!(reopened.head_block_id(), lib_id);
    reopened.validate_invariants().unwrap();
    let logged = reopened.fetch_block_by_number(lib).unwrap().unwrap();
    assert_eq!(logged.id(), lib_id);
}

#[test]
fn apply_then_pop_restores_state() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.produce_blocks(2);

    let gpo_before = chain.db.state().gpo().clone();
    let balance_before = chain.balance("alice", FREEZONE_SYMBOL);

    chain.fund("alice", Asset::new(50_000, FREEZONE_SYMBOL));
    assert_eq!(
        chain.balance("alice", FREEZONE_SYMBOL),
        balance_before + Asset::new(50_000, FREEZONE_SYMBOL)
    );

    chain.db.pop_block().unwrap();
    assert_eq!(chain.db.state().gpo(), &gpo_before);
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL), balance_before);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn tampered_merkle_root_is_rejected() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));

    let tx = chain.build_tx(
        vec![TransferOperation {
            from: name("alice"),
            to: chain.init_witness(),
            amount: Asset::new(1_000, FREEZONE_SYMBOL),
            memo: String::new(),
        }
        .into()],
        &[&freezone_types::PrivateKey::from_seed("alice")],
    );

    let header = BlockHeader {
        previous: chain.db.head_block_id(),
        timestamp: chain.db.get_slot_time(1),
        witness: chain.init_witness(),
        // Deliberately wrong root.
        transaction_merkle_root: [9u8; 32],
        extensions: vec![],
    };
    let mut block = SignedBlock::new(header, vec![tx]);
    block.sign(&chain.init_key);
    let result = chain.db.push_block(block, SkipFlags::empty());
    assert!(matches!(result, Err(freezone_chain::Error::MerkleMismatch(_))));
}

#[test]
fn wrongly_signed_block_is_rejected() {
    let mut chain = TestChain::new();
    chain.produce_blocks(1);
    let header = BlockHeader {
        previous: chain.db.head_block_id(),
        timestamp: chain.db.get_slot_time(1),
        witness: chain.init_witness(),
        transaction_merkle_root: merkle_root(&[]),
        extensions: vec![],
    };
    let mut block = SignedBlock::new(header, vec![]);
    block.sign(&freezone_types::PrivateKey::from_seed("mallory"));
    let result = chain.db.push_block(block, SkipFlags::empty());
    assert!(result.is_err());
    assert_eq!(chain.db.head_block_num(), 1);
}

#[test]
fn longer_fork_triggers_a_switch() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.produce_blocks(2);
    let common_head = chain.db.head_block_id();
    let fork_point_num = chain.db.head_block_num();
    let base_time = chain.db.head_block_time();

    // Branch A: one block carrying a transfer.
    chain.fund("alice", Asset::new(77_000, FREEZONE_SYMBOL));
    let balance_on_a = chain.balance("alice", FREEZONE_SYMBOL);

    // Branch B: two empty blocks at the following slots, built offline on
    // top of the common ancestor.
    let interval = chain.db.config().block_interval_secs;
    let header_b1 = BlockHeader {
        previous: common_head,
        timestamp: base_time.saturating_add(2 * interval),
        witness: chain.init_witness(),
        transaction_merkle_root: merkle_root(&[]),
        extensions: vec![],
    };
    let mut block_b1 = SignedBlock::new(header_b1, vec![]);
    block_b1.sign(&chain.init_key);

    let header_b2 = BlockHeader {
        previous: block_b1.id(),
        timestamp: base_time.saturating_add(3 * interval),
        witness: chain.init_witness(),
        transaction_merkle_root: merkle_root(&[]),
        extensions: vec![],
    };
    let mut block_b2 = SignedBlock::new(header_b2, vec![]);
    block_b2.sign(&chain.init_key);

    // Same height as head: stored, no switch.
    chain.db.push_block(block_b1.clone(), SkipFlags::empty()).unwrap();
    assert_ne!(chain.db.head_block_id(), block_b1.id());

    // Higher head on the competing branch: the engine pops branch A and
    // applies branch B.
    chain.db.push_block(block_b2.clone(), SkipFlags::empty()).unwrap();
    assert_eq!(chain.db.head_block_id(), block_b2.id());
    assert_eq!(chain.db.head_block_num(), fork_point_num + 2);

    // Branch A's transfer was rolled back; it survives only as a pending
    // transaction replayed on the new branch.
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL), balance_on_a);
    chain.db.validate_invariants().unwrap();
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod common;

use common::{name, one_to_one_feed, TestChain};
use freezone_chain::{Error, SkipFlags};
use freezone_message::ops::*;
use freezone_message::{Operation, SignedTransaction, Transaction};
use freezone_types::{
    Asset, PrivateKey, Price, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL,
};

fn transfer_op(chain: &TestChain, from: &str, to: &str, amount: Asset) -> Operation {
    TransferOperation {
        from: name(from),
        to: name(to),
        amount,
        memo: String::new(),
    }
    .into()
}

#[test]
fn transfer_moves_funds_and_rejects_overdraft() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));

    let alice_key = PrivateKey::from_seed("alice");
    chain
        .apply_ops(
            vec![transfer_op(&chain, "alice", "bob", Asset::new(4_000, FREEZONE_SYMBOL))],
            &[&alice_key],
        )
        .unwrap();
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL).amount, 6_000);
    assert_eq!(chain.balance("bob", FREEZONE_SYMBOL).amount, 4_000);

    let overdraft = chain.build_tx(
        vec![transfer_op(&chain, "alice", "bob", Asset::new(60_000, FREEZONE_SYMBOL))],
        &[&alice_key],
    );
    let result = chain.db.push_transaction(overdraft, SkipFlags::empty());
    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
}

#[test]
fn unsigned_transfer_is_rejected() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));

    let mallory = PrivateKey::from_seed("mallory");
    let tx = chain.build_tx(
        vec![transfer_op(&chain, "alice", "bob", Asset::new(1_000, FREEZONE_SYMBOL))],
        &[&mallory],
    );
    let result = chain.db.push_transaction(tx, SkipFlags::empty());
    assert!(matches!(result, Err(Error::Message(_))));
}

#[test]
fn expiration_boundary_is_exclusive() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    let now = chain.db.head_block_time();
    let mut tx = chain.build_tx(
        vec![transfer_op(&chain, "alice", chain.init_witness().as_str(), Asset::new(1, FREEZONE_SYMBOL))],
        &[],
    );
    tx.transaction.expiration = now;
    tx.sign(&alice_key, &common::TEST_CHAIN_ID);
    assert!(matches!(
        chain.db.push_transaction(tx, SkipFlags::empty()),
        Err(Error::Expiration(_))
    ));

    let mut tx = chain.build_tx(
        vec![transfer_op(&chain, "alice", chain.init_witness().as_str(), Asset::new(1, FREEZONE_SYMBOL))],
        &[],
    );
    tx.transaction.expiration = TimePointSec(now.secs() + 1);
    tx.sign(&alice_key, &common::TEST_CHAIN_ID);
    chain.db.push_transaction(tx, SkipFlags::empty()).unwrap();
}

#[test]
fn tapos_must_reference_the_chain() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    let mut tx = SignedTransaction {
        transaction: Transaction {
            ref_block_num: (chain.db.head_block_num() & 0xffff) as u16,
            ref_block_prefix: 0xdead_beef,
            expiration: chain.db.head_block_time().saturating_add(60),
            operations: vec![transfer_op(
                &chain,
                "alice",
                chain.init_witness().as_str(),
                Asset::new(1, FREEZONE_SYMBOL),
            )],
        },
        signatures: vec![],
    };
    tx.sign(&alice_key, &common::TEST_CHAIN_ID);
    assert!(matches!(
        chain.db.push_transaction(tx, SkipFlags::empty()),
        Err(Error::TaposMismatch)
    ));
}

#[test]
fn duplicate_transactions_are_rejected() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    let tx = chain.build_tx(
        vec![transfer_op(&chain, "alice", chain.init_witness().as_str(), Asset::new(5, FREEZONE_SYMBOL))],
        &[&alice_key],
    );
    chain.produce_block_with(vec![tx.clone()]).unwrap();
    let result = chain.db.push_transaction(tx, SkipFlags::empty());
    assert!(matches!(result, Err(Error::DuplicateTransaction(_))));
}

#[test]
fn limit_orders_cross_at_the_maker_price() {
    let mut chain = TestChain::new();
    chain.set_feed(one_to_one_feed());
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");
    let bob_key = PrivateKey::from_seed("bob");

    // Bob needs dollars; buy them from the genesis stake.
    let init_key = chain.init_key.clone();
    chain
        .apply_ops(
            vec![TransferOperation {
                from: chain.init_witness(),
                to: name("bob"),
                amount: Asset::new(10_000, FZD_SYMBOL),
                memo: String::new(),
            }
            .into()],
            &[&init_key],
        )
        .unwrap();

    let supply_before = chain.db.state().gpo().current_supply;
    let fzd_supply_before = chain.db.state().gpo().current_fzd_supply;

    // Alice makes: 1.500 native at 0.5 dollars per native.
    chain
        .apply_ops(
            vec![LimitOrderCreateOperation {
                owner: name("alice"),
                order_id: 1,
                amount_to_sell: Asset::new(1_500, FREEZONE_SYMBOL),
                exchange_rate: Price::new(
                    Asset::new(2_000, FREEZONE_SYMBOL),
                    Asset::new(1_000, FZD_SYMBOL),
                ),
                fill_or_kill: false,
                expiration: chain.head_time().saturating_add(3_000),
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL).amount, 8_500);

    // Bob takes with exactly the crossing amount of dollars.
    chain
        .apply_ops(
            vec![LimitOrderCreateOperation {
                owner: name("bob"),
                order_id: 7,
                amount_to_sell: Asset::new(750, FZD_SYMBOL),
                exchange_rate: Price::new(
                    Asset::new(500, FZD_SYMBOL),
                    Asset::new(1_000, FREEZONE_SYMBOL),
                ),
                fill_or_kill: false,
                expiration: chain.head_time().saturating_add(3_000),
            }
            .into()],
            &[&bob_key],
        )
        .unwrap();

    assert_eq!(chain.balance("alice", FZD_SYMBOL).amount, 750);
    assert_eq!(chain.balance("bob", FREEZONE_SYMBOL).amount, 1_500);
    assert_eq!(chain.balance("bob", FZD_SYMBOL).amount, 10_000 - 750);
    assert!(chain.db.state().limit_orders.is_empty());

    // Matching moves balances but never supply; only block inflation did.
    let gpo = chain.db.state().gpo();
    assert_eq!(gpo.current_fzd_supply, fzd_supply_before);
    assert!(gpo.current_supply.amount >= supply_before.amount);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn expired_orders_are_cancelled_with_a_refund() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    let expiration = chain.head_time().saturating_add(30);
    chain
        .apply_ops(
            vec![LimitOrderCreateOperation {
                owner: name("alice"),
                order_id: 1,
                amount_to_sell: Asset::new(2_000, FREEZONE_SYMBOL),
                exchange_rate: Price::new(
                    Asset::new(1_000, FREEZONE_SYMBOL),
                    Asset::new(100, FZD_SYMBOL),
                ),
                fill_or_kill: false,
                expiration,
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL).amount, 8_000);

    chain.produce_until(expiration.saturating_add(chain.db.config().block_interval_secs));
    assert!(chain.db.state().limit_orders.is_empty());
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL).amount, 10_000);
}

#[test]
fn non_tick_prices_are_rejected_offline() {
    let op = LimitOrderCreateOperation {
        owner: name("alice"),
        order_id: 1,
        amount_to_sell: Asset::new(1_500, FREEZONE_SYMBOL),
        exchange_rate: Price::new(
            Asset::new(1_000, FREEZONE_SYMBOL),
            Asset::new(777, FZD_SYMBOL),
        ),
        fill_or_kill: false,
        expiration: TimePointSec::MAX,
    };
    assert!(Operation::from(op).validate().is_err());
}

#[test]
fn witness_vote_weight_follows_vesting() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(500_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    chain
        .apply_ops(
            vec![TransferToVestingOperation {
                from: name("alice"),
                to: name("alice"),
                amount: Asset::new(100_000, FREEZONE_SYMBOL),
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    let shares = chain.balance("alice", VESTS_SYMBOL);
    assert!(shares.amount > 0);

    let votes_before = chain
        .db
        .state()
        .get_witness(&chain.init_witness())
        .unwrap()
        .votes;
    chain
        .apply_ops(
            vec![AccountWitnessVoteOperation {
                account: name("alice"),
                witness: chain.init_witness(),
                approve: true,
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    let witness = chain.db.state().get_witness(&chain.init_witness()).unwrap();
    assert_eq!(witness.votes, votes_before + shares.amount);
    chain.db.validate_invariants().unwrap();
}

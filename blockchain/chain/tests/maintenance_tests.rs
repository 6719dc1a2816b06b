// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod common;

use common::{name, one_to_one_feed, TestChain};
use freezone_chain::signals::{NotifiedOperation, ObserverError};
use freezone_message::ops::*;
use freezone_message::VirtualOperation;
use freezone_types::config::VESTING_WITHDRAW_INTERVALS;
use freezone_types::{Asset, PrivateKey, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};
use std::sync::{Arc, Mutex};

/// Collects the names of virtual operations as blocks apply.
fn record_virtual_ops(chain: &mut TestChain) -> Arc<Mutex<Vec<VirtualOperation>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    chain.db.signals.on_pre_apply_operation(move |note| {
        if let NotifiedOperation::Virtual(vop) = &note.op {
            sink.lock().map_err(|e| ObserverError::Other(e.to_string()))?.push(vop.clone());
        }
        Ok(())
    });
    log
}

#[test]
fn vesting_withdrawal_runs_the_full_cycle() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.fund("alice", Asset::new(1_000_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    chain
        .apply_ops(
            vec![TransferToVestingOperation {
                from: name("alice"),
                to: name("alice"),
                amount: Asset::new(500_000, FREEZONE_SYMBOL),
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    let shares = chain.balance("alice", VESTS_SYMBOL);
    assert!(shares.amount >= VESTING_WITHDRAW_INTERVALS as i64);
    let liquid_before = chain.balance("alice", FREEZONE_SYMBOL);
    let total_shares_before = chain.db.state().gpo().total_vesting_shares;

    chain
        .apply_ops(
            vec![WithdrawVestingOperation { account: name("alice"), vesting_shares: shares }
                .into()],
            &[&alice_key],
        )
        .unwrap();

    // Walk through every withdrawal interval plus slack for the final fill.
    let interval = chain.db.config().vesting_withdraw_interval_secs;
    let deadline = chain
        .head_time()
        .saturating_add(interval * (VESTING_WITHDRAW_INTERVALS + 2));
    chain.produce_until(deadline);

    let alice = chain.db.state().get_account(&name("alice")).unwrap();
    assert_eq!(alice.vesting_shares.amount, 0);
    assert_eq!(alice.next_vesting_withdrawal, TimePointSec::MAX);
    assert_eq!(alice.vesting_withdraw_rate.amount, 0);
    // The liquid balance grew by roughly the stake's value at the start:
    // the vesting price only rises while inflation feeds the fund, and each
    // interval loses at most one satoshi to rounding.
    assert!(
        chain.balance("alice", FREEZONE_SYMBOL).amount
            >= liquid_before.amount + 500_000 - VESTING_WITHDRAW_INTERVALS as i64
    );
    // The global total dropped by the withdrawn stake, net of the producer
    // rewards that vested while the cycle ran.
    assert!(
        chain.db.state().gpo().total_vesting_shares.amount
            <= total_shares_before.amount - shares.amount / 10 * 9
    );
    chain.db.validate_invariants().unwrap();
}

#[test]
fn withdraw_routes_split_the_fills() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    chain
        .apply_ops(
            vec![
                TransferToVestingOperation {
                    from: name("alice"),
                    to: name("alice"),
                    amount: Asset::new(500_000, FREEZONE_SYMBOL),
                }
                .into(),
                SetWithdrawVestingRouteOperation {
                    from_account: name("alice"),
                    to_account: name("bob"),
                    percent: 5_000,
                    auto_vest: true,
                }
                .into(),
            ],
            &[&alice_key],
        )
        .unwrap();
    let shares = chain.balance("alice", VESTS_SYMBOL);
    chain
        .apply_ops(
            vec![WithdrawVestingOperation { account: name("alice"), vesting_shares: shares }
                .into()],
            &[&alice_key],
        )
        .unwrap();

    let interval = chain.db.config().vesting_withdraw_interval_secs;
    chain.produce_until(chain.head_time().saturating_add(interval + 10));

    // Half of the first fill re-vested to bob.
    let bob = chain.db.state().get_account(&name("bob")).unwrap();
    assert!(bob.vesting_shares.amount > 0);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn comment_cashout_pays_author_curator_and_beneficiary() {
    let mut chain = TestChain::new();
    chain.set_feed(one_to_one_feed());
    chain.create_account("alice");
    chain.create_account("bob");
    chain.create_account("carol");
    chain.fund("bob", Asset::new(2_000_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");
    let bob_key = PrivateKey::from_seed("bob");

    // Voting power comes from vesting.
    chain
        .apply_ops(
            vec![TransferToVestingOperation {
                from: name("bob"),
                to: name("bob"),
                amount: Asset::new(1_000_000, FREEZONE_SYMBOL),
            }
            .into()],
            &[&bob_key],
        )
        .unwrap();

    chain
        .apply_ops(
            vec![
                CommentOperation {
                    parent_author: freezone_types::AccountName::default(),
                    parent_permlink: "test".into(),
                    author: name("alice"),
                    permlink: "hello-world".into(),
                    title: "hello".into(),
                    body: "first post".into(),
                    json_metadata: String::new(),
                }
                .into(),
                CommentOptionsOperation {
                    author: name("alice"),
                    permlink: "hello-world".into(),
                    max_accepted_payout: Asset::new(1_000_000_000, FZD_SYMBOL),
                    percent_freezone_dollars: freezone_types::config::PERCENT_100,
                    allow_votes: true,
                    allow_curation_rewards: true,
                    beneficiaries: vec![BeneficiaryRoute { account: name("carol"), weight: 2_500 }],
                }
                .into(),
            ],
            &[&alice_key],
        )
        .unwrap();

    chain
        .apply_ops(
            vec![VoteOperation {
                voter: name("bob"),
                author: name("alice"),
                permlink: "hello-world".into(),
                weight: freezone_types::config::PERCENT_100 as i16,
            }
            .into()],
            &[&bob_key],
        )
        .unwrap();

    let comment = chain.db.state().get_comment(&name("alice"), "hello-world").unwrap();
    assert!(comment.net_rshares > 0);
    let cashout_time = comment.cashout_time;
    let fund_before = chain
        .db
        .state()
        .reward_funds
        .get_by_key(&freezone_chain::state::RewardFundKey::ByName("post".into()))
        .unwrap()
        .reward_balance;
    assert!(fund_before.amount > 0);

    let vops = record_virtual_ops(&mut chain);
    chain.produce_until(cashout_time.saturating_add(10));

    let vops = vops.lock().unwrap();
    let author_rewards: Vec<_> = vops
        .iter()
        .filter(|v| matches!(v, VirtualOperation::AuthorReward { .. }))
        .collect();
    let curation_rewards: Vec<_> = vops
        .iter()
        .filter(|v| {
            matches!(v, VirtualOperation::CurationReward { curator, .. } if curator == &name("bob"))
        })
        .collect();
    let benefactor_rewards: Vec<_> = vops
        .iter()
        .filter(|v| {
            matches!(
                v,
                VirtualOperation::CommentBenefactorReward { benefactor, .. }
                    if benefactor == &name("carol")
            )
        })
        .collect();
    assert_eq!(author_rewards.len(), 1);
    assert_eq!(curation_rewards.len(), 1);
    assert_eq!(benefactor_rewards.len(), 1);

    let comment = chain.db.state().get_comment(&name("alice"), "hello-world").unwrap();
    assert_eq!(comment.net_rshares, 0);
    assert_eq!(comment.cashout_time, TimePointSec::MAX);
    assert!(comment.total_payout_value.amount > 0);

    // Rewards land as pending balances until claimed.
    let alice = chain.db.state().get_account(&name("alice")).unwrap();
    assert!(
        alice.reward_fzd_balance.amount > 0
            || alice.reward_freezone_balance.amount > 0
            || alice.reward_vesting_balance.amount > 0
    );
    let bob = chain.db.state().get_account(&name("bob")).unwrap();
    assert!(bob.reward_vesting_balance.amount > 0);
    let carol = chain.db.state().get_account(&name("carol")).unwrap();
    assert!(carol.reward_vesting_balance.amount > 0 || carol.reward_fzd_balance.amount > 0);

    chain.db.validate_invariants().unwrap();
}

#[test]
fn claimed_rewards_move_to_regular_balances() {
    let mut chain = TestChain::new();
    chain.set_feed(one_to_one_feed());
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(2_000_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");
    let bob_key = PrivateKey::from_seed("bob");

    chain
        .apply_ops(
            vec![TransferToVestingOperation {
                from: name("bob"),
                to: name("bob"),
                amount: Asset::new(1_000_000, FREEZONE_SYMBOL),
            }
            .into()],
            &[&bob_key],
        )
        .unwrap();
    chain
        .apply_ops(
            vec![CommentOperation {
                parent_author: freezone_types::AccountName::default(),
                parent_permlink: "test".into(),
                author: name("alice"),
                permlink: "payday".into(),
                title: "t".into(),
                body: "b".into(),
                json_metadata: String::new(),
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    chain
        .apply_ops(
            vec![VoteOperation {
                voter: name("bob"),
                author: name("alice"),
                permlink: "payday".into(),
                weight: freezone_types::config::PERCENT_100 as i16,
            }
            .into()],
            &[&bob_key],
        )
        .unwrap();
    let cashout =
        chain.db.state().get_comment(&name("alice"), "payday").unwrap().cashout_time;
    chain.produce_until(cashout.saturating_add(10));

    let alice = chain.db.state().get_account(&name("alice")).unwrap().clone();
    let claim = ClaimRewardBalanceOperation {
        account: name("alice"),
        reward_freezone: alice.reward_freezone_balance,
        reward_fzd: alice.reward_fzd_balance,
        reward_vests: alice.reward_vesting_balance,
    };
    let liquid_before = chain.balance("alice", FREEZONE_SYMBOL);
    let vests_before = chain.balance("alice", VESTS_SYMBOL);
    chain.apply_ops(vec![claim.into()], &[&alice_key]).unwrap();

    let after = chain.db.state().get_account(&name("alice")).unwrap();
    assert_eq!(after.reward_fzd_balance.amount, 0);
    assert_eq!(after.reward_vesting_balance.amount, 0);
    assert!(
        chain.balance("alice", FREEZONE_SYMBOL).amount
            + chain.balance("alice", FZD_SYMBOL).amount
            + chain.balance("alice", VESTS_SYMBOL).amount
            > liquid_before.amount + vests_before.amount
    );
    chain.db.validate_invariants().unwrap();
}

#[test]
fn conversions_settle_at_the_median_after_the_delay() {
    let mut chain = TestChain::new();
    chain.set_feed(one_to_one_feed());
    chain.create_account("alice");
    let init_key = chain.init_key.clone();
    chain
        .apply_ops(
            vec![TransferOperation {
                from: chain.init_witness(),
                to: name("alice"),
                amount: Asset::new(5_000, FZD_SYMBOL),
                memo: String::new(),
            }
            .into()],
            &[&init_key],
        )
        .unwrap();
    let alice_key = PrivateKey::from_seed("alice");

    chain
        .apply_ops(
            vec![ConvertOperation {
                owner: name("alice"),
                request_id: 1,
                amount: Asset::new(2_000, FZD_SYMBOL),
            }
            .into()],
            &[&alice_key],
        )
        .unwrap();
    assert_eq!(chain.balance("alice", FZD_SYMBOL).amount, 3_000);

    let delay = chain.db.config().conversion_delay_secs;
    chain.produce_until(chain.head_time().saturating_add(delay + 10));

    // One-to-one feed converts satoshi for satoshi.
    assert_eq!(chain.balance("alice", FREEZONE_SYMBOL).amount, 2_000);
    assert!(chain.db.state().convert_requests.is_empty());
    chain.db.validate_invariants().unwrap();
}

#[test]
fn savings_withdrawals_complete_after_the_delay() {
    let mut chain = TestChain::new();
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(10_000, FREEZONE_SYMBOL));
    let alice_key = PrivateKey::from_seed("alice");

    chain
        .apply_ops(
            vec![
                TransferToSavingsOperation {
                    from: name("alice"),
                    to: name("alice"),
                    amount: Asset::new(5_000, FREEZONE_SYMBOL),
                    memo: String::new(),
                }
                .into(),
                TransferFromSavingsOperation {
                    from: name("alice"),
                    request_id: 1,
                    to: name("bob"),
                    amount: Asset::new(3_000, FREEZONE_SYMBOL),
                    memo: String::new(),
                }
                .into(),
            ],
            &[&alice_key],
        )
        .unwrap();
    assert_eq!(chain.balance("bob", FREEZONE_SYMBOL).amount, 0);

    let delay = chain.db.config().savings_withdraw_secs;
    chain.produce_until(chain.head_time().saturating_add(delay + 10));
    assert_eq!(chain.balance("bob", FREEZONE_SYMBOL).amount, 3_000);
    let alice = chain.db.state().get_account(&name("alice")).unwrap();
    assert_eq!(alice.savings_withdraw_requests, 0);
    assert_eq!(alice.savings_balance.amount, 2_000);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn producer_reward_vests_to_the_witness() {
    let mut chain = TestChain::new();
    let vops = record_virtual_ops(&mut chain);
    chain.produce_blocks(3);
    let producer_rewards = vops
        .lock()
        .unwrap()
        .iter()
        .filter(|v| matches!(v, VirtualOperation::ProducerReward { .. }))
        .count();
    assert_eq!(producer_rewards, 3);
    let witness_account = chain.db.state().get_account(&chain.init_witness()).unwrap();
    assert!(witness_account.vesting_shares.amount > 0);
}

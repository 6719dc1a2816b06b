// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod common;

use common::{name, one_to_one_feed, TestChain};
use freezone_chain::state::SstPhase;
use freezone_message::ops::*;
use freezone_message::UnitTarget;
use freezone_types::{Asset, AssetSymbol, PrivateKey, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};
use std::collections::BTreeMap;

struct IcoSetup {
    chain: TestChain,
    symbol: AssetSymbol,
    contribution_end: TimePointSec,
    launch: TimePointSec,
}

/// Creates a token through setup: one tier capping at 10,000 satoshis with
/// a one-to-one generation unit routing natives to the market maker and
/// tokens to the contributor.
fn setup_ico(freezone_satoshi_min: i64) -> IcoSetup {
    let mut chain = TestChain::new();
    chain.set_feed(one_to_one_feed());
    chain.create_account("creator");
    chain.fund("creator", Asset::new(1_000_000, FREEZONE_SYMBOL));
    let init_key = chain.init_key.clone();
    chain
        .apply_ops(
            vec![TransferOperation {
                from: chain.init_witness(),
                to: name("creator"),
                amount: Asset::new(10_000, FZD_SYMBOL),
                memo: String::new(),
            }
            .into()],
            &[&init_key],
        )
        .unwrap();
    let creator_key = PrivateKey::from_seed("creator");

    let symbol = chain.db.state().nai_pool().nais[0];
    let fee = chain.db.state().gpo().sst_creation_fee;
    chain
        .apply_ops(
            vec![SstCreateOperation {
                control_account: name("creator"),
                symbol,
                sst_creation_fee: fee,
                precision: symbol.decimals(),
            }
            .into()],
            &[&creator_key],
        )
        .unwrap();
    assert_eq!(
        chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::Setup
    );

    let mut generation_unit = GenerationUnit::default();
    generation_unit.freezone_unit.insert(UnitTarget::market_maker(), 1);
    generation_unit.token_unit.insert(UnitTarget::from_contributor(), 1);
    chain
        .apply_ops(
            vec![SstSetupIcoTierOperation {
                control_account: name("creator"),
                symbol,
                freezone_satoshi_cap: 10_000,
                generation_unit,
                remove: false,
            }
            .into()],
            &[&creator_key],
        )
        .unwrap();

    let now = chain.head_time();
    let begin = now.saturating_add(60);
    let contribution_end = begin.saturating_add(60);
    let launch = contribution_end.saturating_add(60);
    chain
        .apply_ops(
            vec![SstSetupOperation {
                control_account: name("creator"),
                symbol,
                max_supply: 1_000_000,
                contribution_begin_time: begin,
                contribution_end_time: contribution_end,
                launch_time: launch,
                freezone_satoshi_min,
                min_unit_ratio: 1,
                max_unit_ratio: 1,
            }
            .into()],
            &[&creator_key],
        )
        .unwrap();
    assert_eq!(
        chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::SetupCompleted
    );

    // The launch action fires once the contribution window opens.
    chain.produce_until(begin.saturating_add(5));
    assert_eq!(chain.db.state().get_sst_token(symbol).unwrap().phase, SstPhase::Ico);

    IcoSetup { chain, symbol, contribution_end, launch }
}

fn contribute(chain: &mut TestChain, symbol: AssetSymbol, who: &str, id: u32, amount: i64) {
    let key = PrivateKey::from_seed(who);
    chain
        .apply_ops(
            vec![SstContributeOperation {
                contributor: name(who),
                symbol,
                contribution_id: id,
                contribution: Asset::new(amount, FREEZONE_SYMBOL),
            }
            .into()],
            &[&key],
        )
        .unwrap();
}

#[test]
fn ico_success_path_reaches_launch_and_pays_contributors() {
    let mut setup = setup_ico(1_000);
    let symbol = setup.symbol;
    setup.chain.create_account("anna");
    setup.chain.create_account("bill");
    setup.chain.fund("anna", Asset::new(10_000, FREEZONE_SYMBOL));
    setup.chain.fund("bill", Asset::new(10_000, FREEZONE_SYMBOL));

    contribute(&mut setup.chain, symbol, "anna", 0, 600);
    contribute(&mut setup.chain, symbol, "bill", 0, 500);
    assert_eq!(
        setup.chain.db.state().get_sst_ico(symbol).unwrap().contributed.amount,
        1_100
    );
    assert_eq!(setup.chain.balance("anna", FREEZONE_SYMBOL).amount, 9_400);

    // Evaluation passes the minimum, launch follows, and the payout chain
    // runs one required action per block.
    setup.chain.produce_until(setup.contribution_end.saturating_add(5));
    assert_eq!(
        setup.chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::IcoCompleted
    );
    setup.chain.produce_until(setup.launch.saturating_add(40));

    let token = setup.chain.db.state().get_sst_token(symbol).unwrap().clone();
    assert_eq!(token.phase, SstPhase::LaunchSuccess);

    // One-to-one generation: each contributed satoshi mints one token to
    // its contributor and routes one native satoshi to the market maker.
    assert_eq!(setup.chain.balance("anna", symbol).amount, 600);
    assert_eq!(setup.chain.balance("bill", symbol).amount, 500);
    assert_eq!(token.market_maker.freezone_balance.amount, 1_100);
    assert_eq!(token.current_supply, 1_100);

    // Launch installed the vesting ballast.
    assert_eq!(token.total_vesting_fund_ballast, 110);
    assert!(token.total_vesting_shares_ballast > 0);

    // Settled ICO bookkeeping is gone.
    assert!(setup.chain.db.state().sst_icos.is_empty());
    assert!(setup.chain.db.state().sst_contributions.is_empty());
    setup.chain.db.validate_invariants().unwrap();
}

#[test]
fn ico_below_minimum_refunds_every_contribution() {
    let mut setup = setup_ico(1_000);
    let symbol = setup.symbol;
    setup.chain.create_account("anna");
    setup.chain.fund("anna", Asset::new(10_000, FREEZONE_SYMBOL));

    contribute(&mut setup.chain, symbol, "anna", 0, 400);
    contribute(&mut setup.chain, symbol, "anna", 1, 500);
    assert_eq!(setup.chain.balance("anna", FREEZONE_SYMBOL).amount, 9_100);

    setup.chain.produce_until(setup.contribution_end.saturating_add(40));

    let token = setup.chain.db.state().get_sst_token(symbol).unwrap();
    assert_eq!(token.phase, SstPhase::LaunchFailed);
    assert_eq!(token.current_supply, 0);
    assert_eq!(setup.chain.balance("anna", FREEZONE_SYMBOL).amount, 10_000);
    assert_eq!(setup.chain.balance("anna", symbol).amount, 0);
    assert!(setup.chain.db.state().sst_contributions.is_empty());
    assert!(setup.chain.db.state().sst_icos.is_empty());
    setup.chain.db.validate_invariants().unwrap();
}

#[test]
fn contribution_exactly_at_minimum_succeeds() {
    let mut setup = setup_ico(1_000);
    let symbol = setup.symbol;
    setup.chain.create_account("anna");
    setup.chain.fund("anna", Asset::new(10_000, FREEZONE_SYMBOL));
    contribute(&mut setup.chain, symbol, "anna", 0, 1_000);
    setup.chain.produce_until(setup.contribution_end.saturating_add(5));
    assert_eq!(
        setup.chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::IcoCompleted
    );
}

#[test]
fn contribution_one_satoshi_short_fails() {
    let mut setup = setup_ico(1_000);
    let symbol = setup.symbol;
    setup.chain.create_account("anna");
    setup.chain.fund("anna", Asset::new(10_000, FREEZONE_SYMBOL));
    contribute(&mut setup.chain, symbol, "anna", 0, 999);
    setup.chain.produce_until(setup.contribution_end.saturating_add(5));
    assert_eq!(
        setup.chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::LaunchFailed
    );
}

#[test]
fn contributions_cannot_pass_the_hard_cap() {
    let mut setup = setup_ico(1_000);
    let symbol = setup.symbol;
    setup.chain.create_account("anna");
    setup.chain.fund("anna", Asset::new(50_000, FREEZONE_SYMBOL));

    contribute(&mut setup.chain, symbol, "anna", 0, 10_000);
    let key = PrivateKey::from_seed("anna");
    let over_cap = setup.chain.build_tx(
        vec![SstContributeOperation {
            contributor: name("anna"),
            symbol,
            contribution_id: 1,
            contribution: Asset::new(1, FREEZONE_SYMBOL),
        }
        .into()],
        &[&key],
    );
    let result = setup.chain.db.push_transaction(over_cap, freezone_chain::SkipFlags::empty());
    assert!(result.is_err());
}

#[test]
fn emissions_mint_on_schedule_after_launch() {
    let mut chain = TestChain::new();
    chain.set_feed(one_to_one_feed());
    chain.create_account("creator");
    chain.fund("creator", Asset::new(1_000_000, FREEZONE_SYMBOL));
    let init_key = chain.init_key.clone();
    chain
        .apply_ops(
            vec![TransferOperation {
                from: chain.init_witness(),
                to: name("creator"),
                amount: Asset::new(10_000, FZD_SYMBOL),
                memo: String::new(),
            }
            .into()],
            &[&init_key],
        )
        .unwrap();
    let creator_key = PrivateKey::from_seed("creator");

    let symbol = chain.db.state().nai_pool().nais[0];
    let fee = chain.db.state().gpo().sst_creation_fee;
    chain
        .apply_ops(
            vec![SstCreateOperation {
                control_account: name("creator"),
                symbol,
                sst_creation_fee: fee,
                precision: symbol.decimals(),
            }
            .into()],
            &[&creator_key],
        )
        .unwrap();

    let mut generation_unit = GenerationUnit::default();
    generation_unit.freezone_unit.insert(UnitTarget::market_maker(), 1);
    generation_unit.token_unit.insert(UnitTarget::from_contributor(), 1);

    let now = chain.head_time();
    let begin = now.saturating_add(60);
    let end = begin.saturating_add(60);
    let launch = end.saturating_add(60);
    let emission_start = launch.saturating_add(120);

    let mut token_unit = BTreeMap::new();
    token_unit.insert(UnitTarget::rewards(), 1);
    token_unit.insert(UnitTarget::account(&name("creator")), 1);

    chain
        .apply_ops(
            vec![
                SstSetupIcoTierOperation {
                    control_account: name("creator"),
                    symbol,
                    freezone_satoshi_cap: 10_000,
                    generation_unit,
                    remove: false,
                }
                .into(),
                SstSetupEmissionsOperation {
                    control_account: name("creator"),
                    symbol,
                    schedule_time: emission_start,
                    emissions_unit: EmissionsUnit { token_unit },
                    interval_seconds: 60,
                    emission_count: 2,
                    lep_time: emission_start,
                    rep_time: emission_start,
                    lep_abs_amount: 100,
                    rep_abs_amount: 0,
                    lep_rel_amount_numerator: 0,
                    rep_rel_amount_numerator: 0,
                    rel_amount_denom_bits: 0,
                    floor_emissions: false,
                    remove: false,
                }
                .into(),
                SstSetupOperation {
                    control_account: name("creator"),
                    symbol,
                    max_supply: 1_000_000,
                    contribution_begin_time: begin,
                    contribution_end_time: end,
                    launch_time: launch,
                    freezone_satoshi_min: 100,
                    min_unit_ratio: 1,
                    max_unit_ratio: 1,
                }
                .into(),
            ],
            &[&creator_key],
        )
        .unwrap();

    chain.produce_until(begin.saturating_add(5));
    contribute(&mut chain, symbol, "creator", 0, 500);
    chain.produce_until(launch.saturating_add(40));
    assert_eq!(
        chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::LaunchSuccess
    );
    let supply_at_launch = chain.db.state().get_sst_token(symbol).unwrap().current_supply;
    let creator_tokens_at_launch = chain.balance("creator", symbol).amount;

    // Two emissions of one hundred tokens, half to the reward pool and
    // half to the named account.
    chain.produce_until(emission_start.saturating_add(70));
    let token = chain.db.state().get_sst_token(symbol).unwrap().clone();
    assert_eq!(token.current_supply, supply_at_launch + 200);
    assert_eq!(token.reward_balance.amount, 100);
    assert_eq!(chain.balance("creator", symbol).amount, creator_tokens_at_launch + 100);
    assert_eq!(token.last_virtual_emission_time, emission_start.saturating_add(60));

    // The schedule is exhausted; no further emission is generated.
    chain.produce_until(emission_start.saturating_add(300));
    let token = chain.db.state().get_sst_token(symbol).unwrap();
    assert_eq!(token.current_supply, supply_at_launch + 200);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn due_required_actions_must_be_carried_by_the_block() {
    let mut setup = setup_ico(1_000);
    let symbol = setup.symbol;
    setup.chain.create_account("anna");
    setup.chain.fund("anna", Asset::new(10_000, FREEZONE_SYMBOL));
    contribute(&mut setup.chain, symbol, "anna", 0, 1_500);

    // Walk to just before the evaluation is due, then hand-build a block
    // that omits the required action.
    while setup.chain.db.get_slot_time(1) < setup.contribution_end {
        setup.chain.produce_block();
    }
    let header = freezone_blocks::BlockHeader {
        previous: setup.chain.db.head_block_id(),
        timestamp: setup.chain.db.get_slot_time(1),
        witness: setup.chain.init_witness(),
        transaction_merkle_root: freezone_blocks::merkle_root(&[]),
        extensions: vec![],
    };
    let mut block = freezone_blocks::SignedBlock::new(header, vec![]);
    block.sign(&setup.chain.init_key);
    let result = setup.chain.db.push_block(block, freezone_chain::SkipFlags::empty());
    assert!(matches!(result, Err(freezone_chain::Error::MissingRequiredAction(_))));

    // A block that does carry it applies cleanly.
    setup.chain.produce_block();
    assert_eq!(
        setup.chain.db.state().get_sst_token(symbol).unwrap().phase,
        SstPhase::IcoCompleted
    );
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::sst::ico;
use crate::state::{SstContributionKey, SstIcoKey, SstPhase, SstTokenKey};
use freezone_message::RequiredAction;
use freezone_types::config::{PERCENT_100, SST_BALLAST_SUPPLY_PERCENT, SST_INITIAL_VESTING_PER_UNIT};
use freezone_types::{Asset, AssetSymbol, FREEZONE_SYMBOL};

pub(super) fn apply(db: &mut Database, action: &RequiredAction) -> Result<()> {
    match action {
        RequiredAction::SstIcoLaunch { symbol, .. } => ico_launch(db, *symbol),
        RequiredAction::SstIcoEvaluation { symbol, .. } => ico_evaluation(db, *symbol),
        RequiredAction::SstTokenLaunch { symbol, .. } => token_launch(db, *symbol),
        RequiredAction::SstRefund { symbol, contributor, contribution_id, refund } => {
            refund_contribution(db, *symbol, contributor, *contribution_id, *refund)
        }
        RequiredAction::SstContributorPayout {
            symbol,
            contributor,
            contribution_id,
            contribution,
            payouts,
        } => contributor_payout(db, *symbol, contributor, *contribution_id, *contribution, payouts),
        RequiredAction::SstFounderPayout {
            symbol,
            account_payouts,
            market_maker_freezone,
            market_maker_tokens,
            reward_balance,
        } => founder_payout(
            db,
            *symbol,
            account_payouts,
            *market_maker_freezone,
            *market_maker_tokens,
            *reward_balance,
        ),
    }
}

fn token_id(db: &Database, symbol: AssetSymbol) -> Result<freezone_db::Id> {
    db.state()
        .sst_tokens
        .id_by_key(&SstTokenKey::BySymbol(symbol.liquid_symbol()))
        .ok_or_else(|| Error::precondition(format!("token {} not found", symbol.to_nai())))
}

fn advance_phase(db: &mut Database, symbol: AssetSymbol, from: SstPhase, to: SstPhase) -> Result<()> {
    let id = token_id(db, symbol)?;
    let current = db.state().sst_tokens.get(id)?.phase;
    if current != from {
        return Err(Error::precondition(format!(
            "token phase cannot advance: expected {from:?}, found {current:?}"
        )));
    }
    db.state.sst_tokens.modify(id, |token| token.phase = to)?;
    Ok(())
}

fn ico_launch(db: &mut Database, symbol: AssetSymbol) -> Result<()> {
    advance_phase(db, symbol, SstPhase::SetupCompleted, SstPhase::Ico)?;
    let ico = db.state().get_sst_ico(symbol)?;
    let control_account = db.state().get_sst_token(symbol)?.control_account.clone();
    let due = ico.contribution_end_time.max(ico::next_settlement_time(db));
    db.push_required_action(
        RequiredAction::SstIcoEvaluation { control_account, symbol },
        due,
    );
    Ok(())
}

fn ico_evaluation(db: &mut Database, symbol: AssetSymbol) -> Result<()> {
    let ico = db.state().get_sst_ico(symbol)?.clone();
    if ico.contributed.amount >= ico.freezone_satoshi_min {
        advance_phase(db, symbol, SstPhase::Ico, SstPhase::IcoCompleted)?;
        let control_account = db.state().get_sst_token(symbol)?.control_account.clone();
        let due = ico.launch_time.max(ico::next_settlement_time(db));
        db.push_required_action(
            RequiredAction::SstTokenLaunch { control_account, symbol },
            due,
        );
    } else {
        advance_phase(db, symbol, SstPhase::Ico, SstPhase::LaunchFailed)?;
        if !ico::schedule_next_refund(db, symbol)? {
            ico::remove_ico_objects(db, symbol)?;
        }
    }
    Ok(())
}

fn token_launch(db: &mut Database, symbol: AssetSymbol) -> Result<()> {
    advance_phase(db, symbol, SstPhase::IcoCompleted, SstPhase::LaunchSuccess)?;
    let now = db.head_block_time();
    let id = token_id(db, symbol)?;
    db.state.sst_tokens.modify(id, |token| token.last_virtual_emission_time = now)?;
    if !ico::schedule_next_contributor_payout(db, symbol)? {
        ico::remove_ico_objects(db, symbol)?;
    }
    Ok(())
}

fn refund_contribution(
    db: &mut Database,
    symbol: AssetSymbol,
    contributor: &freezone_types::AccountName,
    contribution_id: u32,
    refund: Asset,
) -> Result<()> {
    db.adjust_balance(contributor, refund)?;

    let ico_id = db
        .state()
        .sst_icos
        .id_by_key(&SstIcoKey::BySymbol(symbol))
        .ok_or_else(|| Error::precondition("ico not found"))?;
    db.state.sst_icos.modify(ico_id, |ico| ico.processed_contributions += refund.amount)?;

    let key = SstContributionKey::BySymbolContributor(symbol, contributor.clone(), contribution_id);
    let contribution = db
        .state()
        .sst_contributions
        .id_by_key(&key)
        .ok_or_else(|| Error::precondition("contribution not found"))?;
    db.state.sst_contributions.remove(contribution)?;

    if !ico::schedule_next_refund(db, symbol)? {
        ico::remove_ico_objects(db, symbol)?;
    }
    Ok(())
}

fn contributor_payout(
    db: &mut Database,
    symbol: AssetSymbol,
    contributor: &freezone_types::AccountName,
    contribution_id: u32,
    contribution: Asset,
    payouts: &[freezone_message::PayoutEntry],
) -> Result<()> {
    let additional_supply = ico::payout(db, symbol, payouts)?;
    if additional_supply > 0 {
        db.adjust_supply(Asset::new(additional_supply, symbol), false)?;
    }

    let ico_id = db
        .state()
        .sst_icos
        .id_by_key(&SstIcoKey::BySymbol(symbol))
        .ok_or_else(|| Error::precondition("ico not found"))?;
    db.state
        .sst_icos
        .modify(ico_id, |ico| ico.processed_contributions += contribution.amount)?;

    let key = SstContributionKey::BySymbolContributor(symbol, contributor.clone(), contribution_id);
    let row = db
        .state()
        .sst_contributions
        .id_by_key(&key)
        .ok_or_else(|| Error::precondition("contribution not found"))?;
    db.state.sst_contributions.remove(row)?;

    if !ico::schedule_next_contributor_payout(db, symbol)?
        && !ico::schedule_founder_payout(db, symbol)?
    {
        ico::remove_ico_objects(db, symbol)?;
    }
    Ok(())
}

fn founder_payout(
    db: &mut Database,
    symbol: AssetSymbol,
    account_payouts: &[(freezone_types::AccountName, Vec<freezone_message::PayoutEntry>)],
    market_maker_freezone: i64,
    market_maker_tokens: i64,
    reward_balance: i64,
) -> Result<()> {
    let mut additional_supply: i64 = 0;
    for (_, payouts) in account_payouts {
        additional_supply += ico::payout(db, symbol, payouts)?;
    }

    let id = token_id(db, symbol)?;
    db.state.sst_tokens.modify(id, |token| {
        token.market_maker.token_balance = Asset::new(market_maker_tokens, symbol);
        token.market_maker.freezone_balance = Asset::new(market_maker_freezone, FREEZONE_SYMBOL);
        token.reward_balance = Asset::new(reward_balance, symbol);
    })?;
    additional_supply += market_maker_tokens;
    additional_supply += reward_balance;
    if additional_supply > 0 {
        db.adjust_supply(Asset::new(additional_supply, symbol), false)?;
    }

    // The ballast gives the vesting pool a defined price before any organic
    // vesting exists.
    db.state.sst_tokens.modify(id, |token| {
        token.total_vesting_fund_ballast =
            (token.current_supply as i128 * SST_BALLAST_SUPPLY_PERCENT as i128
                / PERCENT_100 as i128) as i64;
        token.total_vesting_shares_ballast =
            token.total_vesting_fund_ballast.saturating_mul(SST_INITIAL_VESTING_PER_UNIT);
    })?;

    ico::remove_ico_objects(db, symbol)?;
    Ok(())
}

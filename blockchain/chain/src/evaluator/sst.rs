// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::hardfork;
use crate::sst::ico;
use crate::state::{
    SstContributionKey, SstContributionObject, SstIcoKey, SstIcoObject, SstIcoTierKey,
    SstIcoTierObject, SstPhase, SstTokenEmissionsKey, SstTokenEmissionsObject, SstTokenKey,
    SstTokenObject,
};
use freezone_message::ops::*;
use freezone_message::RequiredAction;
use freezone_types::config::{NULL_ACCOUNT, SST_MAX_EMISSIONS, SST_MAX_ICO_TIERS};
use freezone_types::{AccountName, Asset, AssetSymbol, FZD_SYMBOL};

fn require_sst_hardfork(db: &Database) -> Result<()> {
    if !hardfork::has_sst_hardfork(db) {
        return Err(Error::precondition("user tokens are not enabled until the token hardfork"));
    }
    Ok(())
}

/// The token must exist, belong to the control account and still be in
/// setup.
fn get_controlled_setup_token(
    db: &Database,
    control_account: &AccountName,
    symbol: AssetSymbol,
) -> Result<freezone_db::Id> {
    let token = db
        .state()
        .find_sst_token(symbol)
        .ok_or_else(|| Error::precondition(format!("token {} not found", symbol.to_nai())))?;
    if token.control_account != *control_account {
        return Err(Error::precondition(format!(
            "account {control_account} does not control this token"
        )));
    }
    if token.phase >= SstPhase::SetupCompleted {
        return Err(Error::precondition("setup operations are closed for this token"));
    }
    db.state()
        .sst_tokens
        .id_by_key(&SstTokenKey::BySymbol(symbol.liquid_symbol()))
        .ok_or_else(|| Error::precondition("token not found"))
}

pub(super) fn sst_create(db: &mut Database, op: &SstCreateOperation) -> Result<()> {
    require_sst_hardfork(db)?;
    let existing = db.state().find_sst_token(op.symbol).map(|t| t.phase);

    if op.sst_creation_fee.amount > 0 {
        if existing.is_some() {
            return Err(Error::precondition("token has already been created"));
        }
        if !db.state().nai_pool().contains(op.symbol) {
            return Err(Error::precondition(
                "token symbol was not drawn from the identifier pool",
            ));
        }
        let required = db.state().gpo().sst_creation_fee;
        let paid = if op.sst_creation_fee.symbol == required.symbol {
            op.sst_creation_fee
        } else {
            // Fees in the other currency convert through the median feed.
            let median = db.state().feed().current_median_history;
            if median.is_null() {
                return Err(Error::precondition(
                    "cannot pay the fee in another currency without a price feed",
                ));
            }
            if required.symbol == FZD_SYMBOL {
                db.to_fzd(op.sst_creation_fee)
            } else {
                db.to_freezone(op.sst_creation_fee)
            }
        };
        if paid != required {
            return Err(Error::precondition(format!(
                "fee of {} does not match the creation fee of {required}",
                op.sst_creation_fee
            )));
        }
        db.adjust_balance(&op.control_account, -op.sst_creation_fee)?;
        db.adjust_balance(&AccountName::unchecked(NULL_ACCOUNT), op.sst_creation_fee)?;
    } else {
        // A zero fee resets a token that never left setup.
        match existing {
            None => {
                return Err(Error::precondition(
                    "cannot reset a token that does not exist; did you forget the fee?",
                ))
            }
            Some(phase) if phase != SstPhase::Setup => {
                return Err(Error::precondition("cannot reset a token after setup completed"))
            }
            Some(_) => {}
        }
        let token = db.state().get_sst_token(op.symbol)?;
        if token.control_account != op.control_account {
            return Err(Error::precondition("only the control account may reset a token"));
        }
        if crate::sst::next_emission_time(db, op.symbol, freezone_types::TimePointSec::MIN)
            .is_some()
        {
            return Err(Error::precondition("cannot reset a token with emission schedules"));
        }
        if ico::tier_count(db, op.symbol) != 0 {
            return Err(Error::precondition("cannot reset a token with funding tiers"));
        }
        let id = db
            .state()
            .sst_tokens
            .id_by_key(&SstTokenKey::BySymbol(op.symbol))
            .expect("token exists");
        db.state.sst_tokens.remove(id)?;
    }

    let (symbol, control_account) = (op.symbol, op.control_account.clone());
    db.state.sst_tokens.create(|token: &mut SstTokenObject| {
        token.liquid_symbol = symbol;
        token.control_account = control_account;
        token.market_maker.token_balance = Asset::new(0, symbol);
        token.reward_balance = Asset::new(0, symbol);
    });

    let nai = op.symbol.to_nai();
    db.state.modify_nai_pool(|pool| pool.nais.retain(|s| s.to_nai() != nai));
    if !db.is_pending {
        hardfork::replenish_nai_pool(db)?;
    }
    Ok(())
}

pub(super) fn sst_setup(db: &mut Database, op: &SstSetupOperation) -> Result<()> {
    require_sst_hardfork(db)?;
    let token_id = get_controlled_setup_token(db, &op.control_account, op.symbol)?;

    if op.contribution_begin_time <= db.head_block_time() {
        return Err(Error::precondition("the contribution window must open in the future"));
    }

    let hard_cap = ico::hard_cap(db, op.symbol);
    if op.freezone_satoshi_min > 0 {
        let cap = hard_cap.ok_or_else(|| {
            Error::precondition("a funding minimum cannot be met without a funding tier")
        })?;
        if op.freezone_satoshi_min > cap {
            return Err(Error::precondition(format!(
                "the funding minimum of {} exceeds the hard cap of {cap}",
                op.freezone_satoshi_min
            )));
        }
    }

    // The cheapest possible launch must stay within the supply bound.
    if let Some(cap) = hard_cap {
        let mut total_tokens: i128 = 0;
        let mut prev_cap: i64 = 0;
        for (_, tier) in db.state().sst_ico_tiers.range(
            SstIcoTierKey::BySymbolCap(op.symbol, 0)
                ..=SstIcoTierKey::BySymbolCap(op.symbol, i64::MAX),
        ) {
            let band = tier.freezone_satoshi_cap.min(cap) - prev_cap;
            prev_cap = tier.freezone_satoshi_cap;
            let unit_sum = tier.generation_unit.freezone_unit_sum() as i128;
            let token_sum = tier.generation_unit.token_unit_sum() as i128;
            if unit_sum == 0 {
                continue;
            }
            total_tokens += band as i128 * op.min_unit_ratio as i128 * token_sum / unit_sum;
        }
        if total_tokens > op.max_supply as i128 {
            return Err(Error::precondition(
                "the funding tiers would generate more tokens than the maximum supply",
            ));
        }
    }

    let max_supply = op.max_supply;
    db.state.sst_tokens.modify(token_id, |token| {
        token.max_supply = max_supply;
        token.phase = SstPhase::SetupCompleted;
    })?;

    let op = op.clone();
    db.state.sst_icos.create(|ico: &mut SstIcoObject| {
        ico.symbol = op.symbol;
        ico.contribution_begin_time = op.contribution_begin_time;
        ico.contribution_end_time = op.contribution_end_time;
        ico.launch_time = op.launch_time;
        ico.freezone_satoshi_min = op.freezone_satoshi_min;
        ico.min_unit_ratio = op.min_unit_ratio;
        ico.max_unit_ratio = op.max_unit_ratio;
    });

    let control_account = op.control_account.clone();
    db.push_required_action(
        RequiredAction::SstIcoLaunch { control_account, symbol: op.symbol },
        op.contribution_begin_time,
    );
    Ok(())
}

pub(super) fn sst_setup_ico_tier(db: &mut Database, op: &SstSetupIcoTierOperation) -> Result<()> {
    require_sst_hardfork(db)?;
    get_controlled_setup_token(db, &op.control_account, op.symbol)?;

    for target in op.generation_unit.freezone_unit.keys().chain(op.generation_unit.token_unit.keys())
    {
        if let Some(name) = target.account_name() {
            if db.state().find_account(&name).is_none() {
                return Err(Error::precondition(format!(
                    "unit target account {name} does not exist"
                )));
            }
        }
    }

    let key = SstIcoTierKey::BySymbolCap(op.symbol, op.freezone_satoshi_cap);
    let existing = db.state().sst_ico_tiers.id_by_key(&key);
    if op.remove {
        let id = existing.ok_or_else(|| Error::precondition("no tier at this cap"))?;
        db.state.sst_ico_tiers.remove(id)?;
        return Ok(());
    }
    if existing.is_some() {
        return Err(Error::precondition("a tier already exists at this cap"));
    }
    if ico::tier_count(db, op.symbol) >= SST_MAX_ICO_TIERS {
        return Err(Error::precondition("too many funding tiers"));
    }
    let op = op.clone();
    db.state.sst_ico_tiers.create(|tier: &mut SstIcoTierObject| {
        tier.symbol = op.symbol;
        tier.freezone_satoshi_cap = op.freezone_satoshi_cap;
        tier.generation_unit = op.generation_unit;
    });
    Ok(())
}

pub(super) fn sst_setup_emissions(db: &mut Database, op: &SstSetupEmissionsOperation) -> Result<()> {
    require_sst_hardfork(db)?;
    get_controlled_setup_token(db, &op.control_account, op.symbol)?;

    if op.schedule_time <= db.head_block_time() {
        return Err(Error::precondition("emissions must begin in the future"));
    }
    for target in op.emissions_unit.token_unit.keys() {
        if let Some(name) = target.account_name() {
            if db.state().find_account(&name).is_none() {
                return Err(Error::precondition(format!(
                    "unit target account {name} does not exist"
                )));
            }
        }
    }

    let key = SstTokenEmissionsKey::BySymbolTime(op.symbol, op.schedule_time);
    let existing = db.state().sst_token_emissions.id_by_key(&key);
    if op.remove {
        let id = existing.ok_or_else(|| Error::precondition("no emission at this time"))?;
        db.state.sst_token_emissions.remove(id)?;
        return Ok(());
    }
    if existing.is_some() {
        return Err(Error::precondition("an emission schedule already starts at this time"));
    }
    let count = db
        .state()
        .sst_token_emissions
        .range(
            SstTokenEmissionsKey::BySymbolTime(op.symbol, freezone_types::TimePointSec::MIN)
                ..=SstTokenEmissionsKey::BySymbolTime(op.symbol, freezone_types::TimePointSec::MAX),
        )
        .count();
    if count >= SST_MAX_EMISSIONS {
        return Err(Error::precondition("too many emission schedules"));
    }

    let op = op.clone();
    db.state.sst_token_emissions.create(|e: &mut SstTokenEmissionsObject| {
        e.symbol = op.symbol;
        e.schedule_time = op.schedule_time;
        e.emissions_unit = op.emissions_unit;
        e.interval_seconds = op.interval_seconds;
        e.emission_count = op.emission_count;
        e.lep_time = op.lep_time;
        e.rep_time = op.rep_time;
        e.lep_abs_amount = op.lep_abs_amount;
        e.rep_abs_amount = op.rep_abs_amount;
        e.lep_rel_amount_numerator = op.lep_rel_amount_numerator;
        e.rep_rel_amount_numerator = op.rep_rel_amount_numerator;
        e.rel_amount_denom_bits = op.rel_amount_denom_bits;
        e.floor_emissions = op.floor_emissions;
    });
    Ok(())
}

pub(super) fn sst_set_setup_parameters(
    db: &mut Database,
    op: &SstSetSetupParametersOperation,
) -> Result<()> {
    require_sst_hardfork(db)?;
    let token_id = get_controlled_setup_token(db, &op.control_account, op.symbol)?;
    let allow_voting = op.allow_voting;
    db.state.sst_tokens.modify(token_id, |token| {
        if let Some(allow_voting) = allow_voting {
            token.allow_voting = allow_voting;
        }
    })?;
    Ok(())
}

pub(super) fn sst_set_runtime_parameters(
    db: &mut Database,
    op: &SstSetRuntimeParametersOperation,
) -> Result<()> {
    require_sst_hardfork(db)?;
    let token_id = get_controlled_setup_token(db, &op.control_account, op.symbol)?;
    let op = op.clone();
    db.state.sst_tokens.modify(token_id, |token| {
        if let Some(window) = op.cashout_window_seconds {
            token.cashout_window_seconds = window;
        }
        if let Some(regen) = op.vote_regeneration_period_seconds {
            token.vote_regeneration_period_seconds = regen;
        }
        if let Some(votes) = op.votes_per_regeneration_period {
            token.votes_per_regeneration_period = votes;
        }
        if let Some(percent) = op.percent_curation_rewards {
            token.percent_curation_rewards = percent;
        }
        if let Some(allow) = op.allow_downvotes {
            token.allow_downvotes = allow;
        }
    })?;
    Ok(())
}

pub(super) fn sst_contribute(db: &mut Database, op: &SstContributeOperation) -> Result<()> {
    require_sst_hardfork(db)?;
    let token = db
        .state()
        .find_sst_token(op.symbol)
        .ok_or_else(|| Error::precondition(format!("token {} not found", op.symbol.to_nai())))?;
    if token.phase != SstPhase::Ico {
        return Err(Error::precondition("the token is not accepting contributions"));
    }
    let ico = db.state().get_sst_ico(op.symbol)?.clone();
    if db.head_block_time() >= ico.contribution_end_time {
        return Err(Error::precondition("the contribution window has closed"));
    }
    let hard_cap = ico::hard_cap(db, op.symbol)
        .ok_or_else(|| Error::precondition("the token has no funding tiers"))?;
    if ico.contributed.amount + op.contribution.amount > hard_cap {
        return Err(Error::precondition("contribution would exceed the hard cap"));
    }
    let key = SstContributionKey::BySymbolContributor(
        op.symbol,
        op.contributor.clone(),
        op.contribution_id,
    );
    if db.state().sst_contributions.id_by_key(&key).is_some() {
        return Err(Error::precondition("contribution id already in use"));
    }

    db.adjust_balance(&op.contributor, -op.contribution)?;

    let op = op.clone();
    db.state.sst_contributions.create(|c: &mut SstContributionObject| {
        c.symbol = op.symbol;
        c.contributor = op.contributor;
        c.contribution_id = op.contribution_id;
        c.contribution = op.contribution;
    });
    let ico_id = db
        .state()
        .sst_icos
        .id_by_key(&SstIcoKey::BySymbol(op.symbol))
        .expect("ico exists");
    let amount = op.contribution;
    db.state.sst_icos.modify(ico_id, |ico| ico.contributed += amount)?;
    Ok(())
}

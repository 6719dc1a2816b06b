// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{SstPhase, SstTokenKey};
use freezone_message::{OptionalAction, UnitTarget};
use freezone_types::{Asset, AssetSymbol, TimePointSec};

pub(super) fn apply(db: &mut Database, action: &OptionalAction) -> Result<()> {
    match action {
        OptionalAction::SstTokenEmission { symbol, emission_time, emissions } => {
            token_emission(db, *symbol, *emission_time, emissions)
        }
    }
}

/// Applies one scheduled emission. The included event must be exactly the
/// token's next emission, and the included amounts must match the engine's
/// own generation; a witness cannot inflate by inventing numbers.
fn token_emission(
    db: &mut Database,
    symbol: AssetSymbol,
    emission_time: TimePointSec,
    emissions: &[(UnitTarget, i64)],
) -> Result<()> {
    let token = db.state().get_sst_token(symbol)?.clone();
    if token.phase != SstPhase::LaunchSuccess {
        return Err(Error::precondition("token has not launched"));
    }

    let next = crate::sst::next_emission_time(db, symbol, token.last_virtual_emission_time)
        .ok_or_else(|| Error::precondition("token has no upcoming emission events"))?;
    if next != emission_time {
        return Err(Error::precondition(format!(
            "emission is out of order: next event is at {next}, block carried {emission_time}"
        )));
    }
    if emission_time > db.head_block_time() {
        return Err(Error::precondition("emission executed before its scheduled time"));
    }

    let emission_id = crate::sst::get_emission_object(db, symbol, next)
        .ok_or_else(|| Error::precondition("no emission schedule covers the event"))?;
    let emission = db.state().sst_token_emissions.get(emission_id)?.clone();
    let expected = crate::sst::generate_emissions(&token, &emission, next);
    if expected.len() != emissions.len() {
        return Err(Error::precondition("emission generation size mismatch"));
    }
    for pair in emissions {
        if !expected.contains(pair) {
            return Err(Error::precondition(format!(
                "emission mismatch on unit target '{}'",
                pair.0
            )));
        }
    }

    let mut market_maker_tokens: i64 = 0;
    let mut reward_tokens: i64 = 0;
    let mut vesting_tokens: i64 = 0;
    let mut total_new_supply: i64 = 0;

    for (target, amount) in emissions {
        if target.is_market_maker() {
            market_maker_tokens += amount;
        } else if target.is_rewards() {
            reward_tokens += amount;
        } else if target.is_vesting() {
            vesting_tokens += amount;
        } else if target.is_account_vesting() {
            let name = target
                .account_name()
                .ok_or_else(|| Error::precondition("invalid emission destination"))?;
            db.create_vesting(&name, Asset::new(*amount, symbol.liquid_symbol()), false)?;
        } else {
            let name = target
                .account_name()
                .ok_or_else(|| Error::precondition("invalid emission destination"))?;
            db.adjust_balance(&name, Asset::new(*amount, symbol.liquid_symbol()))?;
        }
        total_new_supply += amount;
    }

    let id = db
        .state()
        .sst_tokens
        .id_by_key(&SstTokenKey::BySymbol(symbol.liquid_symbol()))
        .expect("token exists");
    db.state.sst_tokens.modify(id, |token| {
        token.market_maker.token_balance.amount += market_maker_tokens;
        token.reward_balance.amount += reward_tokens;
        token.total_vesting_fund_sst += vesting_tokens;
        token.current_supply += total_new_supply;
        token.last_virtual_emission_time = emission_time;
    })?;
    Ok(())
}

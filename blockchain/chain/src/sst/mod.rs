// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! User-token helpers: emission schedule arithmetic and the ICO settlement
//! chain (refunds, contributor payouts, founder payout).

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{
    SstContributionKey, SstIcoKey, SstIcoTierKey, SstTokenEmissionsKey, SstTokenEmissionsObject,
    SstTokenObject,
};
use freezone_db::Id;
use freezone_message::{PayoutEntry, RequiredAction, UnitTarget};
use freezone_types::{AccountName, Asset, AssetSymbol, TimePointSec, FREEZONE_SYMBOL};

/// The earliest emission event strictly after `after`, across every
/// schedule declared for the token.
pub fn next_emission_time(
    db: &Database,
    symbol: AssetSymbol,
    after: TimePointSec,
) -> Option<TimePointSec> {
    let mut next: Option<TimePointSec> = None;
    for (_, emission) in db.state().sst_token_emissions.range(
        SstTokenEmissionsKey::BySymbolTime(symbol, TimePointSec::MIN)
            ..=SstTokenEmissionsKey::BySymbolTime(symbol, TimePointSec::MAX),
    ) {
        let candidate = if emission.schedule_time > after {
            Some(emission.schedule_time)
        } else {
            let elapsed = after.secs() - emission.schedule_time.secs();
            let k = elapsed / emission.interval_seconds + 1;
            let t = emission
                .schedule_time
                .saturating_add(k.saturating_mul(emission.interval_seconds));
            if t <= emission.schedule_end_time() {
                Some(t)
            } else {
                None
            }
        };
        if let Some(t) = candidate {
            next = Some(next.map_or(t, |n: TimePointSec| n.min(t)));
        }
    }
    next
}

/// The schedule that covers an emission event at `t`, if any.
pub fn get_emission_object(db: &Database, symbol: AssetSymbol, t: TimePointSec) -> Option<Id> {
    for (key, emission) in db.state().sst_token_emissions.range(
        SstTokenEmissionsKey::BySymbolTime(symbol, TimePointSec::MIN)
            ..=SstTokenEmissionsKey::BySymbolTime(symbol, t),
    ) {
        let SstTokenEmissionsKey::BySymbolTime(_, schedule_time) = key;
        if t < emission.schedule_time || t > emission.schedule_end_time() {
            continue;
        }
        if (t.secs() - emission.schedule_time.secs()) % emission.interval_seconds == 0 {
            return db
                .state()
                .sst_token_emissions
                .id_by_key(&SstTokenEmissionsKey::BySymbolTime(symbol, *schedule_time));
        }
    }
    None
}

fn interpolate(left: i64, right: i64, num: u32, den: u32) -> i64 {
    left + ((right as i128 - left as i128) * num as i128 / den.max(1) as i128) as i64
}

/// The per-target emission amounts at event time `t`: absolute plus
/// relative-to-supply contributions, linearly interpolated between the
/// schedule's endpoints, routed by the emissions unit.
pub fn generate_emissions(
    token: &SstTokenObject,
    emission: &SstTokenEmissionsObject,
    t: TimePointSec,
) -> Vec<(UnitTarget, i64)> {
    let (abs_amount, rel_numerator) = if emission.lep_time == emission.rep_time {
        (
            emission.lep_abs_amount + emission.rep_abs_amount,
            emission.lep_rel_amount_numerator as u64 + emission.rep_rel_amount_numerator as u64,
        )
    } else {
        let clamped = t.max(emission.lep_time).min(emission.rep_time);
        let num = clamped.secs() - emission.lep_time.secs();
        let den = emission.rep_time.secs() - emission.lep_time.secs();
        (
            interpolate(emission.lep_abs_amount, emission.rep_abs_amount, num, den),
            interpolate(
                emission.lep_rel_amount_numerator as i64,
                emission.rep_rel_amount_numerator as i64,
                num,
                den,
            ) as u64,
        )
    };

    let rel_amount =
        ((token.current_supply as i128 * rel_numerator as i128) >> emission.rel_amount_denom_bits) as i64;
    // Integer arithmetic truncates each contribution independently, which
    // is exactly the `floor_emissions` contract; the flag exists for wire
    // compatibility with schedules that demanded it explicitly.
    let total = abs_amount + rel_amount;

    let unit_sum = emission.emissions_unit.token_unit_sum() as i128;
    if unit_sum == 0 || total <= 0 {
        return Vec::new();
    }
    emission
        .emissions_unit
        .token_unit
        .iter()
        .map(|(target, weight)| {
            (target.clone(), (total as i128 * *weight as i128 / unit_sum) as i64)
        })
        .collect()
}

pub mod ico {
    use super::*;

    /// The hard cap is the highest tier's cumulative cap.
    pub fn hard_cap(db: &Database, symbol: AssetSymbol) -> Option<i64> {
        db.state()
            .sst_ico_tiers
            .range(
                SstIcoTierKey::BySymbolCap(symbol, 0)
                    ..=SstIcoTierKey::BySymbolCap(symbol, i64::MAX),
            )
            .last()
            .map(|(_, tier)| tier.freezone_satoshi_cap)
    }

    pub fn tier_count(db: &Database, symbol: AssetSymbol) -> usize {
        db.state()
            .sst_ico_tiers
            .range(
                SstIcoTierKey::BySymbolCap(symbol, 0)
                    ..=SstIcoTierKey::BySymbolCap(symbol, i64::MAX),
            )
            .count()
    }

    /// Removes the ICO and its tiers once every contribution is settled.
    pub fn remove_ico_objects(db: &mut Database, symbol: AssetSymbol) -> Result<()> {
        if let Some(id) = db.state().sst_icos.id_by_key(&SstIcoKey::BySymbol(symbol)) {
            db.state.sst_icos.remove(id)?;
        }
        let tiers: Vec<Id> = db.state().sst_ico_tiers.ids_in_range(
            SstIcoTierKey::BySymbolCap(symbol, 0)..=SstIcoTierKey::BySymbolCap(symbol, i64::MAX),
        );
        for id in tiers {
            db.state.sst_ico_tiers.remove(id)?;
        }
        Ok(())
    }

    /// Settlement actions queue for the next production slot: an action
    /// scheduled while a block applies cannot have been included in that
    /// same block.
    pub(crate) fn next_settlement_time(db: &Database) -> TimePointSec {
        db.head_block_time().saturating_add(db.config().block_interval_secs)
    }

    fn first_remaining_contribution(db: &Database, symbol: AssetSymbol) -> Option<Id> {
        db.state()
            .sst_contributions
            .first_in_range(
                SstContributionKey::BySymbolId(symbol, 0)
                    ..=SstContributionKey::BySymbolId(symbol, Id::MAX),
            )
            .map(|(id, _)| id)
    }

    /// Schedules the refund of the next unsettled contribution. Returns
    /// false when nothing is left to refund.
    pub fn schedule_next_refund(db: &mut Database, symbol: AssetSymbol) -> Result<bool> {
        let id = match first_remaining_contribution(db, symbol) {
            Some(id) => id,
            None => return Ok(false),
        };
        let contribution = db.state().sst_contributions.get(id)?.clone();
        let due = next_settlement_time(db);
        db.push_required_action(
            RequiredAction::SstRefund {
                symbol,
                contributor: contribution.contributor,
                contribution_id: contribution.contribution_id,
                refund: contribution.contribution,
            },
            due,
        );
        Ok(true)
    }

    /// Schedules the payout of the next unsettled contribution. Returns
    /// false when every contribution has been paid.
    pub fn schedule_next_contributor_payout(
        db: &mut Database,
        symbol: AssetSymbol,
    ) -> Result<bool> {
        let id = match first_remaining_contribution(db, symbol) {
            Some(id) => id,
            None => return Ok(false),
        };
        let contribution = db.state().sst_contributions.get(id)?.clone();
        let payouts = compute_contributor_payouts(db, symbol, &contribution.contributor, contribution.contribution.amount)?;
        let due = next_settlement_time(db);
        db.push_required_action(
            RequiredAction::SstContributorPayout {
                symbol,
                contributor: contribution.contributor,
                contribution_id: contribution.contribution_id,
                contribution: contribution.contribution,
                payouts,
            },
            due,
        );
        Ok(true)
    }

    /// Schedules the aggregate founder payout once contributions are
    /// settled. Returns false when the ICO routed nothing to founders.
    pub fn schedule_founder_payout(db: &mut Database, symbol: AssetSymbol) -> Result<bool> {
        let ico = db.state().get_sst_ico(symbol)?.clone();
        let contributed = ico.contributed.amount;
        if contributed == 0 {
            return Ok(false);
        }

        let mut account_payouts: std::collections::BTreeMap<AccountName, Vec<PayoutEntry>> =
            std::collections::BTreeMap::new();
        let mut market_maker_freezone: i64 = 0;
        let mut market_maker_tokens: i64 = 0;
        let mut reward_balance: i64 = 0;

        for_each_tier_overlap(db, symbol, 0, contributed, |tier, overlap| {
            let unit_sum = tier.generation_unit.freezone_unit_sum() as i128;
            if unit_sum == 0 {
                return;
            }
            for (target, weight) in &tier.generation_unit.freezone_unit {
                let amount = (overlap as i128 * *weight as i128 / unit_sum) as i64;
                if amount == 0 || target.is_from() || target.is_from_vesting() {
                    continue;
                }
                if target.is_market_maker() {
                    market_maker_freezone += amount;
                } else if let Some(name) = target.account_name() {
                    account_payouts.entry(name.clone()).or_default().push(PayoutEntry {
                        to: name,
                        amount: Asset::new(amount, FREEZONE_SYMBOL),
                        vesting: target.is_account_vesting(),
                    });
                }
            }
            let units = overlap as i128 * ico.min_unit_ratio as i128 / unit_sum;
            for (target, weight) in &tier.generation_unit.token_unit {
                let tokens = (units * *weight as i128) as i64;
                if tokens == 0 || target.is_from() || target.is_from_vesting() {
                    continue;
                }
                if target.is_market_maker() {
                    market_maker_tokens += tokens;
                } else if target.is_rewards() {
                    reward_balance += tokens;
                } else if let Some(name) = target.account_name() {
                    account_payouts.entry(name.clone()).or_default().push(PayoutEntry {
                        to: name,
                        amount: Asset::new(tokens, symbol),
                        vesting: target.is_account_vesting(),
                    });
                }
            }
        })?;

        let due = next_settlement_time(db);
        db.push_required_action(
            RequiredAction::SstFounderPayout {
                symbol,
                account_payouts: account_payouts.into_iter().collect(),
                market_maker_freezone,
                market_maker_tokens,
                reward_balance,
            },
            due,
        );
        Ok(true)
    }

    /// Per-contribution payouts: the contribution's satoshi span is cut by
    /// the tier prefix partition, each cut generating token units at the
    /// tier's unit ratio, routed by the tier's token unit.
    pub fn compute_contributor_payouts(
        db: &Database,
        symbol: AssetSymbol,
        contributor: &AccountName,
        amount: i64,
    ) -> Result<Vec<PayoutEntry>> {
        let ico = db.state().get_sst_ico(symbol)?;
        let span_start = ico.processed_contributions;
        let span_end = span_start + amount;
        let min_unit_ratio = ico.min_unit_ratio;
        let mut payouts: Vec<PayoutEntry> = Vec::new();

        for_each_tier_overlap(db, symbol, span_start, span_end, |tier, overlap| {
            let unit_sum = tier.generation_unit.freezone_unit_sum() as i128;
            if unit_sum == 0 {
                return;
            }
            // Token units visible to the contributor; the native side only
            // settles in the aggregate founder payout.
            let units = overlap as i128 * min_unit_ratio as i128 / unit_sum;
            for (target, weight) in &tier.generation_unit.token_unit {
                let tokens = (units * *weight as i128) as i64;
                if tokens == 0 {
                    continue;
                }
                if target.is_from() || target.is_from_vesting() {
                    payouts.push(PayoutEntry {
                        to: contributor.clone(),
                        amount: Asset::new(tokens, symbol),
                        vesting: target.is_from_vesting(),
                    });
                }
            }
        })?;
        Ok(payouts)
    }

    /// Applies payout entries to an account; returns the user tokens newly
    /// brought into existence.
    pub fn payout(
        db: &mut Database,
        symbol: AssetSymbol,
        payouts: &[PayoutEntry],
    ) -> Result<i64> {
        let mut additional_supply: i64 = 0;
        for entry in payouts {
            if entry.amount.symbol == FREEZONE_SYMBOL {
                if entry.vesting {
                    db.create_vesting(&entry.to, entry.amount, false)?;
                } else {
                    db.adjust_balance(&entry.to, entry.amount)?;
                }
            } else if entry.amount.symbol.liquid_symbol() == symbol {
                if entry.vesting {
                    db.create_vesting(&entry.to, entry.amount, false)?;
                } else {
                    db.adjust_balance(&entry.to, entry.amount)?;
                }
                additional_supply += entry.amount.amount;
            } else {
                return Err(Error::precondition("payout entry in a foreign asset"));
            }
        }
        Ok(additional_supply)
    }

    /// Walks the tier prefix partition, yielding each tier's overlap with
    /// the satoshi span `[start, end)`.
    fn for_each_tier_overlap(
        db: &Database,
        symbol: AssetSymbol,
        start: i64,
        end: i64,
        mut f: impl FnMut(&crate::state::SstIcoTierObject, i64),
    ) -> Result<()> {
        let mut prev_cap: i64 = 0;
        for (_, tier) in db.state().sst_ico_tiers.range(
            SstIcoTierKey::BySymbolCap(symbol, 0)..=SstIcoTierKey::BySymbolCap(symbol, i64::MAX),
        ) {
            let band_start = prev_cap;
            let band_end = tier.freezone_satoshi_cap;
            prev_cap = band_end;
            let overlap = end.min(band_end) - start.max(band_start);
            if overlap > 0 {
                f(tier, overlap);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezone_message::ops::EmissionsUnit;
    use freezone_types::config::SST_EMIT_INDEFINITELY;

    fn emission_schedule() -> SstTokenEmissionsObject {
        let mut unit = EmissionsUnit::default();
        unit.token_unit.insert(UnitTarget::rewards(), 1);
        unit.token_unit.insert(UnitTarget::market_maker(), 1);
        SstTokenEmissionsObject {
            schedule_time: TimePointSec(1_000),
            interval_seconds: 100,
            emission_count: 5,
            emissions_unit: unit,
            lep_time: TimePointSec(1_000),
            rep_time: TimePointSec(1_000),
            lep_abs_amount: 50,
            rep_abs_amount: 0,
            ..Default::default()
        }
    }

    #[test]
    fn schedule_end_time_bounds_events() {
        let emission = emission_schedule();
        assert_eq!(emission.schedule_end_time(), TimePointSec(1_400));
        let mut indefinite = emission_schedule();
        indefinite.emission_count = SST_EMIT_INDEFINITELY;
        assert_eq!(indefinite.schedule_end_time(), TimePointSec::MAX);
    }

    #[test]
    fn flat_emission_splits_by_weight() {
        let token = SstTokenObject { current_supply: 1_000, ..Default::default() };
        let emission = emission_schedule();
        let out = generate_emissions(&token, &emission, TimePointSec(1_100));
        assert_eq!(out.len(), 2);
        // 50 split over weights summing to 2.
        assert!(out.iter().all(|(_, amount)| *amount == 25));
    }

    #[test]
    fn interpolated_emission_moves_between_endpoints() {
        let token = SstTokenObject::default();
        let mut emission = emission_schedule();
        emission.lep_time = TimePointSec(1_000);
        emission.rep_time = TimePointSec(1_400);
        emission.lep_abs_amount = 100;
        emission.rep_abs_amount = 500;
        let at_start: i64 = generate_emissions(&token, &emission, TimePointSec(1_000))
            .iter()
            .map(|(_, a)| a)
            .sum();
        let midway: i64 = generate_emissions(&token, &emission, TimePointSec(1_200))
            .iter()
            .map(|(_, a)| a)
            .sum();
        let at_end: i64 = generate_emissions(&token, &emission, TimePointSec(1_400))
            .iter()
            .map(|(_, a)| a)
            .sum();
        assert_eq!(at_start, 100);
        assert_eq!(midway, 300);
        assert_eq!(at_end, 500);
    }

    #[test]
    fn relative_emission_scales_with_supply() {
        let mut token = SstTokenObject::default();
        token.current_supply = 1 << 20;
        let mut emission = emission_schedule();
        emission.lep_abs_amount = 0;
        emission.rep_abs_amount = 0;
        emission.lep_rel_amount_numerator = 1;
        emission.rep_rel_amount_numerator = 1;
        emission.rel_amount_denom_bits = 10;
        let total: i64 = generate_emissions(&token, &emission, TimePointSec(1_000))
            .iter()
            .map(|(_, a)| a)
            .sum();
        // supply × 2 >> 10 = 2048.
        assert_eq!(total, 2_048);
    }
}

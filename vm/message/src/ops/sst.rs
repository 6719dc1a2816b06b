// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::{Error, UnitTarget};
use freezone_types::config::{PERCENT_100, SST_EMIT_INDEFINITELY};
use freezone_types::{AccountName, Asset, AssetSymbol, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Paired routing maps of one ICO tier: how each contributed native satoshi
/// is split (`freezone_unit`) and how many tokens each generated unit pays
/// out (`token_unit`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GenerationUnit {
    pub freezone_unit: BTreeMap<UnitTarget, u16>,
    pub token_unit: BTreeMap<UnitTarget, u16>,
}

impl GenerationUnit {
    pub fn freezone_unit_sum(&self) -> u32 {
        self.freezone_unit.values().map(|w| *w as u32).sum()
    }

    pub fn token_unit_sum(&self) -> u32 {
        self.token_unit.values().map(|w| *w as u32).sum()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.freezone_unit.is_empty() {
            return Err(Error::validation("generation unit routes no native tokens"));
        }
        for (target, weight) in self.freezone_unit.iter().chain(&self.token_unit) {
            target.validate()?;
            if *weight == 0 {
                return Err(Error::validation("zero-weight unit target"));
            }
            if target.is_vesting() {
                return Err(Error::validation("the vesting fund is seeded by ballast, not units"));
            }
        }
        for target in self.freezone_unit.keys() {
            if target.is_rewards() {
                return Err(Error::validation("$rewards only routes tokens"));
            }
            // Native routing settles in one aggregate payout after the
            // contributions; per-contributor native returns are refunds.
            if target.is_from() || target.is_from_vesting() {
                return Err(Error::validation("$from targets only route tokens"));
            }
        }
        Ok(())
    }
}

/// Token-side routing map of one emission event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EmissionsUnit {
    pub token_unit: BTreeMap<UnitTarget, u16>,
}

impl EmissionsUnit {
    pub fn token_unit_sum(&self) -> u32 {
        self.token_unit.values().map(|w| *w as u32).sum()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.token_unit.is_empty() {
            return Err(Error::validation("emissions unit routes no tokens"));
        }
        for (target, weight) in &self.token_unit {
            target.validate()?;
            if *weight == 0 {
                return Err(Error::validation("zero-weight unit target"));
            }
            if target.is_from() || target.is_from_vesting() {
                return Err(Error::validation("$from targets are only ICO targets"));
            }
        }
        Ok(())
    }
}

/// Reserves a numerical asset identifier from the NAI pool against the
/// creation fee. With a zero fee, resets a token still in setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstCreateOperation {
    pub control_account: AccountName,
    pub symbol: AssetSymbol,
    pub sst_creation_fee: Asset,
    pub precision: u8,
}

impl OperationBehavior for SstCreateOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.control_account)?;
        if !self.symbol.is_sst() || self.symbol.is_vesting() {
            return Err(Error::validation("symbol must be a liquid user-token symbol"));
        }
        if self.sst_creation_fee.amount < 0
            || (self.sst_creation_fee.symbol != FREEZONE_SYMBOL
                && self.sst_creation_fee.symbol != FZD_SYMBOL)
        {
            return Err(Error::validation("creation fee must be native or dollar tokens"));
        }
        if self.precision != self.symbol.decimals() {
            return Err(Error::validation("precision does not match symbol"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.control_account.clone());
    }
}

/// Closes the setup phase and schedules the ICO window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstSetupOperation {
    pub control_account: AccountName,
    pub symbol: AssetSymbol,
    pub max_supply: i64,
    pub contribution_begin_time: TimePointSec,
    pub contribution_end_time: TimePointSec,
    pub launch_time: TimePointSec,
    pub freezone_satoshi_min: i64,
    pub min_unit_ratio: u32,
    pub max_unit_ratio: u32,
}

impl OperationBehavior for SstSetupOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.control_account)?;
        if self.max_supply <= 0 {
            return Err(Error::validation("max supply must be positive"));
        }
        if self.contribution_begin_time >= self.contribution_end_time {
            return Err(Error::validation("contribution window is empty"));
        }
        if self.launch_time < self.contribution_end_time {
            return Err(Error::validation("launch precedes the contribution window"));
        }
        if self.freezone_satoshi_min < 0 {
            return Err(Error::validation("satoshi minimum cannot be negative"));
        }
        if self.min_unit_ratio == 0 || self.max_unit_ratio < self.min_unit_ratio {
            return Err(Error::validation("invalid unit ratio bounds"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.control_account.clone());
    }
}

/// Adds or removes an ICO tier capped at a cumulative satoshi amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstSetupIcoTierOperation {
    pub control_account: AccountName,
    pub symbol: AssetSymbol,
    pub freezone_satoshi_cap: i64,
    pub generation_unit: GenerationUnit,
    pub remove: bool,
}

impl OperationBehavior for SstSetupIcoTierOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.control_account)?;
        if self.freezone_satoshi_cap <= 0 {
            return Err(Error::validation("tier cap must be positive"));
        }
        self.generation_unit.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.control_account.clone());
    }
}

/// Declares (or removes) an emission schedule: `emission_count` events every
/// `interval_seconds` from `schedule_time`, with amounts interpolated
/// between the left and right endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstSetupEmissionsOperation {
    pub control_account: AccountName,
    pub symbol: AssetSymbol,
    pub schedule_time: TimePointSec,
    pub emissions_unit: EmissionsUnit,
    pub interval_seconds: u32,
    pub emission_count: u32,
    pub lep_time: TimePointSec,
    pub rep_time: TimePointSec,
    pub lep_abs_amount: i64,
    pub rep_abs_amount: i64,
    pub lep_rel_amount_numerator: u32,
    pub rep_rel_amount_numerator: u32,
    pub rel_amount_denom_bits: u8,
    pub floor_emissions: bool,
    pub remove: bool,
}

impl OperationBehavior for SstSetupEmissionsOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.control_account)?;
        self.emissions_unit.validate()?;
        if self.emission_count == 0 {
            return Err(Error::validation("emission count must be positive"));
        }
        if self.interval_seconds == 0 {
            return Err(Error::validation("interval must be positive"));
        }
        if self.emission_count != SST_EMIT_INDEFINITELY {
            // The final event time must stay representable.
            let span = self.interval_seconds as u64 * (self.emission_count as u64 - 1);
            if self.schedule_time.secs() as u64 + span > u32::MAX as u64 {
                return Err(Error::validation("emission schedule overflows time"));
            }
        }
        if self.lep_time > self.rep_time {
            return Err(Error::validation("left endpoint follows right endpoint"));
        }
        if self.lep_abs_amount < 0 || self.rep_abs_amount < 0 {
            return Err(Error::validation("negative emission amount"));
        }
        if self.rel_amount_denom_bits > 63 {
            return Err(Error::validation("relative denominator too large"));
        }
        if self.lep_abs_amount == 0
            && self.rep_abs_amount == 0
            && self.lep_rel_amount_numerator == 0
            && self.rep_rel_amount_numerator == 0
        {
            return Err(Error::validation("emission emits nothing"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.control_account.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstSetSetupParametersOperation {
    pub control_account: AccountName,
    pub symbol: AssetSymbol,
    pub allow_voting: Option<bool>,
}

impl OperationBehavior for SstSetSetupParametersOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.control_account)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.control_account.clone());
    }
}

/// Reward-system tuning; allowed any time before launch closes setup, and
/// kept compatible afterwards by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstSetRuntimeParametersOperation {
    pub control_account: AccountName,
    pub symbol: AssetSymbol,
    pub cashout_window_seconds: Option<u32>,
    pub vote_regeneration_period_seconds: Option<u32>,
    pub votes_per_regeneration_period: Option<u32>,
    pub percent_curation_rewards: Option<u16>,
    pub allow_downvotes: Option<bool>,
}

impl OperationBehavior for SstSetRuntimeParametersOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.control_account)?;
        if let Some(p) = self.percent_curation_rewards {
            if p > PERCENT_100 {
                return Err(Error::validation("curation percent exceeds 100%"));
            }
        }
        if self.vote_regeneration_period_seconds == Some(0)
            || self.votes_per_regeneration_period == Some(0)
            || self.cashout_window_seconds == Some(0)
        {
            return Err(Error::validation("runtime parameters must be positive"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.control_account.clone());
    }
}

/// Contributes native tokens to an open ICO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SstContributeOperation {
    pub contributor: AccountName,
    pub symbol: AssetSymbol,
    pub contribution_id: u32,
    pub contribution: Asset,
}

impl OperationBehavior for SstContributeOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.contributor)?;
        if !self.symbol.is_sst() || self.symbol.is_vesting() {
            return Err(Error::validation("symbol must be a liquid user-token symbol"));
        }
        if self.contribution.symbol != FREEZONE_SYMBOL || self.contribution.amount <= 0 {
            return Err(Error::validation("contribution must be positive native tokens"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.contributor.clone());
    }
}

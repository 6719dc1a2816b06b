// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::state::{Curve, Manabar};
use freezone_db::{Id, StateObject};
use freezone_message::ops::{EmissionsUnit, GenerationUnit};
use freezone_message::{OptionalAction, RequiredAction};
use freezone_types::config::{
    CONTENT_CONSTANT, SST_DEFAULT_PERCENT_CURATION_REWARDS, SST_DEFAULT_VOTES_PER_REGEN_PERIOD,
    SST_INITIAL_VESTING_PER_UNIT,
};
use freezone_types::{AccountName, Asset, AssetSymbol, Price, TimePointSec, FREEZONE_SYMBOL};

/// Lifecycle stage of a user token. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SstPhase {
    #[default]
    Setup,
    SetupCompleted,
    Ico,
    IcoCompleted,
    LaunchFailed,
    LaunchSuccess,
}

/// Automated market-maker reserves seeded by the ICO.
#[derive(Debug, Clone, PartialEq)]
pub struct SstMarketMakerState {
    pub freezone_balance: Asset,
    pub token_balance: Asset,
    pub reserve_ratio: u32,
}

/// One user token; the row covers both the liquid and the paired vesting
/// symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SstTokenObject {
    pub liquid_symbol: AssetSymbol,
    pub control_account: AccountName,
    pub phase: SstPhase,

    pub current_supply: i64,
    pub max_supply: i64,

    pub total_vesting_fund_sst: i64,
    pub total_vesting_shares: i64,
    /// Ballast installed at launch so the vesting price is defined before
    /// any organic vesting exists.
    pub total_vesting_fund_ballast: i64,
    pub total_vesting_shares_ballast: i64,
    pub pending_rewarded_vesting_shares: i64,
    pub pending_rewarded_vesting_sst: i64,

    pub reward_balance: Asset,
    pub recent_claims: u128,
    pub last_reward_update: TimePointSec,
    pub last_virtual_emission_time: TimePointSec,

    pub market_maker: SstMarketMakerState,

    pub allow_voting: bool,
    pub allow_downvotes: bool,
    pub cashout_window_seconds: u32,
    pub vote_regeneration_period_seconds: u32,
    pub votes_per_regeneration_period: u32,
    pub content_constant: u128,
    pub percent_curation_rewards: u16,
    pub author_reward_curve: Curve,
    pub curation_reward_curve: Curve,
}

impl Default for SstTokenObject {
    fn default() -> Self {
        SstTokenObject {
            liquid_symbol: AssetSymbol::default(),
            control_account: AccountName::default(),
            phase: SstPhase::Setup,
            current_supply: 0,
            max_supply: 0,
            total_vesting_fund_sst: 0,
            total_vesting_shares: 0,
            total_vesting_fund_ballast: 0,
            total_vesting_shares_ballast: 0,
            pending_rewarded_vesting_shares: 0,
            pending_rewarded_vesting_sst: 0,
            reward_balance: Asset::new(0, AssetSymbol::default()),
            recent_claims: 0,
            last_reward_update: TimePointSec::MIN,
            last_virtual_emission_time: TimePointSec::MIN,
            market_maker: SstMarketMakerState {
                freezone_balance: Asset::new(0, FREEZONE_SYMBOL),
                token_balance: Asset::new(0, AssetSymbol::default()),
                reserve_ratio: 0,
            },
            allow_voting: true,
            allow_downvotes: true,
            cashout_window_seconds: 0,
            vote_regeneration_period_seconds: 0,
            votes_per_regeneration_period: SST_DEFAULT_VOTES_PER_REGEN_PERIOD,
            content_constant: CONTENT_CONSTANT,
            percent_curation_rewards: SST_DEFAULT_PERCENT_CURATION_REWARDS,
            author_reward_curve: Curve::Linear,
            curation_reward_curve: Curve::SquareRoot,
        }
    }
}

impl SstTokenObject {
    pub fn vesting_symbol(&self) -> AssetSymbol {
        self.liquid_symbol.paired_symbol()
    }

    /// Vesting price before any ballast exists.
    pub fn initial_vesting_share_price(&self) -> Price {
        let one = 10i64.pow(self.liquid_symbol.decimals() as u32);
        Price::new(
            Asset::new(one * SST_INITIAL_VESTING_PER_UNIT, self.vesting_symbol()),
            Asset::new(one, self.liquid_symbol),
        )
    }

    /// Current vesting share price, ballast included on both sides.
    pub fn vesting_share_price(&self) -> Price {
        if self.total_vesting_fund_ballast == 0 || self.total_vesting_shares_ballast == 0 {
            return self.initial_vesting_share_price();
        }
        Price::new(
            Asset::new(
                self.total_vesting_shares_ballast + self.total_vesting_shares,
                self.vesting_symbol(),
            ),
            Asset::new(self.total_vesting_fund_ballast + self.total_vesting_fund_sst, self.liquid_symbol),
        )
    }

    pub fn reward_vesting_share_price(&self) -> Price {
        if self.total_vesting_fund_ballast == 0 || self.total_vesting_shares_ballast == 0 {
            return self.initial_vesting_share_price();
        }
        Price::new(
            Asset::new(
                self.total_vesting_shares_ballast
                    + self.total_vesting_shares
                    + self.pending_rewarded_vesting_shares,
                self.vesting_symbol(),
            ),
            Asset::new(
                self.total_vesting_fund_ballast
                    + self.total_vesting_fund_sst
                    + self.pending_rewarded_vesting_sst,
                self.liquid_symbol,
            ),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SstTokenKey {
    BySymbol(AssetSymbol),
    ByControlAccount(AccountName, AssetSymbol),
}

impl StateObject for SstTokenObject {
    type Key = SstTokenKey;
    const NAME: &'static str = "sst_token";

    fn keys(&self, _id: Id) -> Vec<SstTokenKey> {
        vec![
            SstTokenKey::BySymbol(self.liquid_symbol),
            SstTokenKey::ByControlAccount(self.control_account.clone(), self.liquid_symbol),
        ]
    }
}

/// ICO window and accounting for a token in its funding phase.
#[derive(Debug, Clone, PartialEq)]
pub struct SstIcoObject {
    pub symbol: AssetSymbol,
    pub contribution_begin_time: TimePointSec,
    pub contribution_end_time: TimePointSec,
    pub launch_time: TimePointSec,
    pub freezone_satoshi_min: i64,
    pub min_unit_ratio: u32,
    pub max_unit_ratio: u32,
    pub contributed: Asset,
    /// Satoshis already settled by refund or payout actions.
    pub processed_contributions: i64,
}

impl Default for SstIcoObject {
    fn default() -> Self {
        SstIcoObject {
            symbol: AssetSymbol::default(),
            contribution_begin_time: TimePointSec::MIN,
            contribution_end_time: TimePointSec::MIN,
            launch_time: TimePointSec::MIN,
            freezone_satoshi_min: 0,
            min_unit_ratio: 0,
            max_unit_ratio: 0,
            contributed: Asset::new(0, FREEZONE_SYMBOL),
            processed_contributions: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SstIcoKey {
    BySymbol(AssetSymbol),
}

impl StateObject for SstIcoObject {
    type Key = SstIcoKey;
    const NAME: &'static str = "sst_ico";

    fn keys(&self, _id: Id) -> Vec<SstIcoKey> {
        vec![SstIcoKey::BySymbol(self.symbol)]
    }
}

/// One band of the funding range `[0, hard_cap)`; tiers partition the range
/// by their cumulative caps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SstIcoTierObject {
    pub symbol: AssetSymbol,
    pub freezone_satoshi_cap: i64,
    pub generation_unit: GenerationUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SstIcoTierKey {
    BySymbolCap(AssetSymbol, i64),
}

impl StateObject for SstIcoTierObject {
    type Key = SstIcoTierKey;
    const NAME: &'static str = "sst_ico_tier";

    fn keys(&self, _id: Id) -> Vec<SstIcoTierKey> {
        vec![SstIcoTierKey::BySymbolCap(self.symbol, self.freezone_satoshi_cap)]
    }
}

/// A declared emission schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct SstTokenEmissionsObject {
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
}

impl Default for SstTokenEmissionsObject {
    fn default() -> Self {
        SstTokenEmissionsObject {
            symbol: AssetSymbol::default(),
            schedule_time: TimePointSec::MIN,
            emissions_unit: EmissionsUnit::default(),
            interval_seconds: 0,
            emission_count: 0,
            lep_time: TimePointSec::MIN,
            rep_time: TimePointSec::MIN,
            lep_abs_amount: 0,
            rep_abs_amount: 0,
            lep_rel_amount_numerator: 0,
            rep_rel_amount_numerator: 0,
            rel_amount_denom_bits: 0,
            floor_emissions: false,
        }
    }
}

impl SstTokenEmissionsObject {
    /// Time of the final event, or the far future for indefinite schedules.
    pub fn schedule_end_time(&self) -> TimePointSec {
        if self.emission_count == freezone_types::config::SST_EMIT_INDEFINITELY {
            TimePointSec::MAX
        } else {
            self.schedule_time
                .saturating_add(self.interval_seconds.saturating_mul(self.emission_count - 1))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SstTokenEmissionsKey {
    BySymbolTime(AssetSymbol, TimePointSec),
}

impl StateObject for SstTokenEmissionsObject {
    type Key = SstTokenEmissionsKey;
    const NAME: &'static str = "sst_token_emissions";

    fn keys(&self, _id: Id) -> Vec<SstTokenEmissionsKey> {
        vec![SstTokenEmissionsKey::BySymbolTime(self.symbol, self.schedule_time)]
    }
}

/// One ICO contribution, settled exactly once by a refund or payout action.
#[derive(Debug, Clone, PartialEq)]
pub struct SstContributionObject {
    pub symbol: AssetSymbol,
    pub contributor: AccountName,
    pub contribution_id: u32,
    pub contribution: Asset,
}

impl Default for SstContributionObject {
    fn default() -> Self {
        SstContributionObject {
            symbol: AssetSymbol::default(),
            contributor: AccountName::default(),
            contribution_id: 0,
            contribution: Asset::new(0, FREEZONE_SYMBOL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SstContributionKey {
    BySymbolContributor(AssetSymbol, AccountName, u32),
    BySymbolId(AssetSymbol, Id),
}

impl StateObject for SstContributionObject {
    type Key = SstContributionKey;
    const NAME: &'static str = "sst_contribution";

    fn keys(&self, id: Id) -> Vec<SstContributionKey> {
        vec![
            SstContributionKey::BySymbolContributor(
                self.symbol,
                self.contributor.clone(),
                self.contribution_id,
            ),
            SstContributionKey::BySymbolId(self.symbol, id),
        ]
    }
}

/// Per-(account, token) liquid and vesting balances, with the token's
/// continuous-withdrawal state.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRegularBalanceObject {
    pub name: AccountName,
    pub liquid: Asset,
    pub vesting_shares: Asset,
    pub delegated_vesting_shares: Asset,
    pub received_vesting_shares: Asset,
    pub vesting_withdraw_rate: Asset,
    pub next_vesting_withdrawal: TimePointSec,
    pub withdrawn: i64,
    pub to_withdraw: i64,
    pub voting_manabar: Manabar,
    pub downvote_manabar: Manabar,
}

impl Default for AccountRegularBalanceObject {
    fn default() -> Self {
        AccountRegularBalanceObject {
            name: AccountName::default(),
            liquid: Asset::new(0, AssetSymbol::default()),
            vesting_shares: Asset::new(0, AssetSymbol::default()),
            delegated_vesting_shares: Asset::new(0, AssetSymbol::default()),
            received_vesting_shares: Asset::new(0, AssetSymbol::default()),
            vesting_withdraw_rate: Asset::new(0, AssetSymbol::default()),
            next_vesting_withdrawal: TimePointSec::MAX,
            withdrawn: 0,
            to_withdraw: 0,
            voting_manabar: Manabar::default(),
            downvote_manabar: Manabar::default(),
        }
    }
}

impl AccountRegularBalanceObject {
    pub fn liquid_symbol(&self) -> AssetSymbol {
        self.liquid.symbol
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountRegularBalanceKey {
    ByNameLiquidSymbol(AccountName, AssetSymbol),
    ByNextVestingWithdrawal(TimePointSec, Id),
}

impl StateObject for AccountRegularBalanceObject {
    type Key = AccountRegularBalanceKey;
    const NAME: &'static str = "account_regular_balance";

    fn keys(&self, id: Id) -> Vec<AccountRegularBalanceKey> {
        vec![
            AccountRegularBalanceKey::ByNameLiquidSymbol(self.name.clone(), self.liquid.symbol),
            AccountRegularBalanceKey::ByNextVestingWithdrawal(self.next_vesting_withdrawal, id),
        ]
    }
}

/// Pending (unclaimed) rewards per (account, token).
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRewardsBalanceObject {
    pub name: AccountName,
    pub pending_liquid: Asset,
    pub pending_vesting_shares: Asset,
    /// Liquid value backing the pending vesting shares at grant time.
    pub pending_vesting_value: Asset,
}

impl Default for AccountRewardsBalanceObject {
    fn default() -> Self {
        AccountRewardsBalanceObject {
            name: AccountName::default(),
            pending_liquid: Asset::new(0, AssetSymbol::default()),
            pending_vesting_shares: Asset::new(0, AssetSymbol::default()),
            pending_vesting_value: Asset::new(0, AssetSymbol::default()),
        }
    }
}

impl AccountRewardsBalanceObject {
    pub fn liquid_symbol(&self) -> AssetSymbol {
        self.pending_liquid.symbol
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountRewardsBalanceKey {
    ByNameLiquidSymbol(AccountName, AssetSymbol),
}

impl StateObject for AccountRewardsBalanceObject {
    type Key = AccountRewardsBalanceKey;
    const NAME: &'static str = "account_rewards_balance";

    fn keys(&self, _id: Id) -> Vec<AccountRewardsBalanceKey> {
        vec![AccountRewardsBalanceKey::ByNameLiquidSymbol(
            self.name.clone(),
            self.pending_liquid.symbol,
        )]
    }
}

/// A scheduled action a block must carry once due.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequiredActionObject {
    pub action: RequiredAction,
    pub execution_time: TimePointSec,
}

impl Default for PendingRequiredActionObject {
    fn default() -> Self {
        PendingRequiredActionObject {
            action: RequiredAction::SstIcoLaunch {
                control_account: AccountName::default(),
                symbol: AssetSymbol::default(),
            },
            execution_time: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PendingRequiredActionKey {
    ByExecution(TimePointSec, Id),
}

impl StateObject for PendingRequiredActionObject {
    type Key = PendingRequiredActionKey;
    const NAME: &'static str = "pending_required_action";

    fn keys(&self, id: Id) -> Vec<PendingRequiredActionKey> {
        vec![PendingRequiredActionKey::ByExecution(self.execution_time, id)]
    }
}

/// A scheduled action witnesses may include, keyed by content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOptionalActionObject {
    pub action: OptionalAction,
    pub execution_time: TimePointSec,
    pub action_hash: [u8; 32],
}

impl Default for PendingOptionalActionObject {
    fn default() -> Self {
        PendingOptionalActionObject {
            action: OptionalAction::SstTokenEmission {
                symbol: AssetSymbol::default(),
                emission_time: TimePointSec::MIN,
                emissions: Vec::new(),
            },
            execution_time: TimePointSec::MAX,
            action_hash: [0u8; 32],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PendingOptionalActionKey {
    ByExecution(TimePointSec, Id),
    ByHash([u8; 32]),
}

impl StateObject for PendingOptionalActionObject {
    type Key = PendingOptionalActionKey;
    const NAME: &'static str = "pending_optional_action";

    fn keys(&self, id: Id) -> Vec<PendingOptionalActionKey> {
        vec![
            PendingOptionalActionKey::ByExecution(self.execution_time, id),
            PendingOptionalActionKey::ByHash(self.action_hash),
        ]
    }
}

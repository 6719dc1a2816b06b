// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Consensus constants. Values that scale with wall-clock time live on
//! [`ChainConfig`] so the test profile can shorten them; everything else is
//! a plain constant.

use crate::{Asset, TimePointSec, FREEZONE_SYMBOL};

pub const PERCENT_100: u16 = 10_000;
pub const PERCENT_1: u16 = 100;

/// Witnesses per round: 20 elected by stake-weighted vote plus one timeshare
/// slot filled by virtual-time scheduling.
pub const MAX_WITNESSES: usize = 21;
pub const MAX_VOTED_WITNESSES: usize = 20;
pub const MAX_TIMESHARE_WITNESSES: usize = 1;
/// Witnesses that must run a version before its hardfork can activate.
pub const HARDFORK_REQUIRED_WITNESSES: usize = 17;
pub const MAX_WITNESSES_VOTED_FOR: u16 = 30;

/// A block is irreversible once witnesses at this vote share confirm it.
pub const IRREVERSIBLE_THRESHOLD: u16 = 75 * PERCENT_1;

pub const MAX_PROXY_RECURSION_DEPTH: usize = 4;
pub const MAX_WITHDRAW_ROUTES: usize = 10;
pub const VESTING_WITHDRAW_INTERVALS: u32 = 13;

pub const MAX_SIG_CHECK_DEPTH: u32 = 2;
pub const MAX_SIG_CHECK_ACCOUNTS: usize = 125;
pub const MAX_AUTHORITY_MEMBERSHIP: usize = 40;
pub const MAX_TIME_UNTIL_EXPIRATION: u32 = 3600;

pub const MIN_BLOCK_SIZE: usize = 115;
pub const MIN_BLOCK_SIZE_LIMIT: u32 = 65_536;
pub const MAX_BLOCK_SIZE_DEFAULT: u32 = 65_536;
pub const MAX_UNDO_HISTORY: u32 = 10_000;
pub const BLOCK_SUMMARY_RING_SIZE: u32 = 0x1_0000;

pub const SECONDS_PER_DAY: u32 = 86_400;
pub const SECONDS_PER_WEEK: u32 = 7 * SECONDS_PER_DAY;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY as u64;

/// Inflation narrows from 9.78% by 0.01% every narrowing period until the
/// 0.95% floor.
pub const INFLATION_RATE_START_PERCENT: i64 = 978;
pub const INFLATION_RATE_STOP_PERCENT: i64 = 95;
pub const INFLATION_NARROWING_PERIOD: u64 = 250_000;

pub const CONTENT_REWARD_PERCENT: u16 = 65 * PERCENT_1;
pub const VESTING_FUND_PERCENT: u16 = 15 * PERCENT_1;
pub const SPS_FUND_PERCENT: u16 = 10 * PERCENT_1;

/// Dollar print-rate interpolation band: full printing below 9% of market
/// cap, none above 10%.
pub const FZD_START_PERCENT: u16 = 9 * PERCENT_1;
pub const FZD_STOP_PERCENT: u16 = 10 * PERCENT_1;

pub const MIN_PAYOUT_FZD_SATOSHI: i64 = 20;
pub const CONTENT_CONSTANT: u128 = 2_000_000_000_000;
pub const PERCENT_CURATION_REWARDS: u16 = 25 * PERCENT_1;

pub const VIRTUAL_SCHEDULE_LAP_LENGTH: u128 = u128::MAX;

pub const MIN_FEEDS: usize = MAX_WITNESSES / 3;

pub const LIQUIDITY_APR_PERCENT: u32 = 750;
pub const MIN_LIQUIDITY_REWARD_PERIOD_SEC: u32 = 60;
pub const LIQUIDITY_TIMEOUT_SEC: u32 = SECONDS_PER_WEEK;
pub const MIN_LIQUIDITY_REWARD_SATOSHI: i64 = 1_000;

pub const SAVINGS_WITHDRAW_REQUEST_LIMIT: u32 = 100;

/// Account-subsidy resource dynamics: pools gain the per-block budget and
/// decay by `pool * decay >> RD_DECAY_DENOM_SHIFT` each block.
pub const ACCOUNT_SUBSIDY_BUDGET_PER_BLOCK: i64 = 797;
pub const ACCOUNT_SUBSIDY_DECAY: u64 = 347_321;
pub const RD_DECAY_DENOM_SHIFT: u32 = 36;
pub const WITNESS_SUBSIDY_BUDGET_PERCENT: u16 = 125 * PERCENT_1 / 100;
pub const WITNESS_SUBSIDY_DECAY_PERCENT: u16 = 2 * PERCENT_100 / 21;

pub const REQUIRED_ACTIONS_PARTITION_PERCENT: u16 = 25 * PERCENT_1;

/// At a successful launch the token gains a vesting ballast of this share of
/// its supply, at this many shares per ballast unit.
pub const SST_BALLAST_SUPPLY_PERCENT: u16 = 10 * PERCENT_1;
pub const SST_INITIAL_VESTING_PER_UNIT: i64 = 1_000_000;
pub const SST_EMIT_INDEFINITELY: u32 = u32::MAX;
pub const SST_MAX_NAI_POOL_COUNT: usize = 10;
pub const SST_MAX_ICO_TIERS: usize = 10;
pub const SST_MAX_EMISSIONS: usize = 10;
pub const SST_DEFAULT_VOTES_PER_REGEN_PERIOD: u32 = 50;
pub const SST_DEFAULT_PERCENT_CURATION_REWARDS: u16 = 25 * PERCENT_1;

pub const NULL_ACCOUNT: &str = "null";
pub const TEMP_ACCOUNT: &str = "temp";
pub const INIT_WITNESS_NAME: &str = "initwitness";
pub const TREASURY_ACCOUNT: &str = "treasury";
/// Empty proxy means the account votes for itself.
pub const PROXY_TO_SELF: &str = "";

pub fn min_account_creation_fee() -> Asset {
    Asset::new(100, FREEZONE_SYMBOL)
}

/// Time-scaled consensus parameters. `mainnet` mirrors production; the
/// `testing` profile shortens every window so scenario tests can cross them
/// in a handful of blocks.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub genesis_time: TimePointSec,
    pub block_interval_secs: u32,
    pub cashout_window_secs: u32,
    pub reverse_auction_window_secs: u32,
    pub vesting_withdraw_interval_secs: u32,
    pub sst_vesting_withdraw_interval_secs: u32,
    pub savings_withdraw_secs: u32,
    pub conversion_delay_secs: u32,
    pub feed_interval_blocks: u32,
    pub max_feed_age_secs: u32,
    pub min_feeds: usize,
    pub feed_history_window: usize,
    pub liquidity_reward_blocks: u32,
    pub proposal_maintenance_period_secs: u32,
    pub owner_auth_recovery_secs: u32,
    pub account_recovery_request_expiration_secs: u32,
    pub owner_update_limit_secs: u32,
    pub recent_rshares_decay_secs: u32,
    pub voting_mana_regeneration_secs: u32,
    pub min_root_comment_interval_secs: u32,
    pub delegation_return_period_secs: u32,
    /// Height at which irreversibility switches from the fixed-lag rule to
    /// witness confirmations.
    pub miner_voting_start_block: u32,
}

impl ChainConfig {
    pub fn mainnet() -> Self {
        ChainConfig {
            genesis_time: TimePointSec(1_458_835_200),
            block_interval_secs: 3,
            cashout_window_secs: 7 * SECONDS_PER_DAY,
            reverse_auction_window_secs: 300,
            vesting_withdraw_interval_secs: SECONDS_PER_WEEK,
            sst_vesting_withdraw_interval_secs: SECONDS_PER_WEEK,
            savings_withdraw_secs: 3 * SECONDS_PER_DAY,
            conversion_delay_secs: 3 * SECONDS_PER_DAY + SECONDS_PER_DAY / 2,
            feed_interval_blocks: 1200,
            max_feed_age_secs: SECONDS_PER_WEEK,
            min_feeds: MIN_FEEDS,
            feed_history_window: 84,
            liquidity_reward_blocks: 1200,
            proposal_maintenance_period_secs: 3600,
            owner_auth_recovery_secs: 30 * SECONDS_PER_DAY,
            account_recovery_request_expiration_secs: SECONDS_PER_DAY,
            owner_update_limit_secs: 3600,
            recent_rshares_decay_secs: 15 * SECONDS_PER_DAY,
            voting_mana_regeneration_secs: 5 * SECONDS_PER_DAY,
            min_root_comment_interval_secs: 300,
            delegation_return_period_secs: 5 * SECONDS_PER_DAY,
            miner_voting_start_block: 864_000,
        }
    }

    pub fn testing() -> Self {
        ChainConfig {
            genesis_time: TimePointSec(1_458_835_200),
            block_interval_secs: 3,
            cashout_window_secs: 3600,
            reverse_auction_window_secs: 0,
            vesting_withdraw_interval_secs: 60,
            sst_vesting_withdraw_interval_secs: 60,
            savings_withdraw_secs: 30,
            conversion_delay_secs: 60,
            feed_interval_blocks: 20,
            max_feed_age_secs: SECONDS_PER_DAY,
            min_feeds: 1,
            feed_history_window: 12,
            liquidity_reward_blocks: 30,
            proposal_maintenance_period_secs: 60,
            owner_auth_recovery_secs: 60,
            account_recovery_request_expiration_secs: 12,
            owner_update_limit_secs: 0,
            recent_rshares_decay_secs: SECONDS_PER_DAY,
            voting_mana_regeneration_secs: 3600,
            min_root_comment_interval_secs: 0,
            delegation_return_period_secs: 60,
            miner_voting_start_block: u32::MAX,
        }
    }

    pub fn blocks_per_day(&self) -> u32 {
        SECONDS_PER_DAY / self.block_interval_secs
    }

    pub fn blocks_per_year(&self) -> u64 {
        SECONDS_PER_YEAR / self.block_interval_secs as u64
    }

    /// Number of withdraw intervals and their length determine the total
    /// vesting drain time (13 weeks on mainnet).
    pub fn vesting_withdraw_total_secs(&self) -> u32 {
        self.vesting_withdraw_interval_secs * VESTING_WITHDRAW_INTERVALS
    }
}

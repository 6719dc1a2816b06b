// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_blocks::BlockId;
use freezone_db::{Id, StateObject};
use freezone_message::TransactionId;
use freezone_types::config::{
    CONTENT_REWARD_PERCENT, FZD_START_PERCENT, FZD_STOP_PERCENT, MAX_BLOCK_SIZE_DEFAULT,
    PERCENT_100, REQUIRED_ACTIONS_PARTITION_PERCENT, SPS_FUND_PERCENT, VESTING_FUND_PERCENT,
};
use freezone_types::{
    AccountName, Asset, AssetSymbol, Price, ProtocolVersion, TimePointSec, FREEZONE_SYMBOL,
    FZD_SYMBOL, VESTS_SYMBOL,
};

/// Singleton of chain-wide dynamic data, updated once per block and by every
/// supply-touching subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalProperties {
    pub head_block_number: u32,
    pub head_block_id: BlockId,
    pub time: TimePointSec,
    pub current_witness: AccountName,

    pub current_supply: Asset,
    pub current_fzd_supply: Asset,
    /// Genesis dollars; excluded from interest but part of the dollar
    /// supply invariant.
    pub init_fzd_supply: Asset,
    /// `current_supply + fzd_supply × median_price`.
    pub virtual_supply: Asset,

    pub total_vesting_fund_freezone: Asset,
    pub total_vesting_shares: Asset,
    pub pending_rewarded_vesting_shares: Asset,
    pub pending_rewarded_vesting_freezone: Asset,

    pub fzd_interest_rate: u16,
    pub fzd_print_rate: u16,
    pub fzd_start_percent: u16,
    pub fzd_stop_percent: u16,

    pub maximum_block_size: u32,
    pub required_actions_partition_percent: u16,

    pub current_aslot: u64,
    pub recent_slots_filled: u128,
    pub participation_count: u8,

    pub last_irreversible_block_num: u32,

    pub content_reward_percent: u16,
    pub vesting_reward_percent: u16,
    pub sps_fund_percent: u16,

    pub sst_creation_fee: Asset,
    pub available_account_subsidies: i64,

    pub next_sps_maintenance_time: TimePointSec,
}

impl Default for GlobalProperties {
    fn default() -> Self {
        GlobalProperties {
            head_block_number: 0,
            head_block_id: BlockId::default(),
            time: TimePointSec::MIN,
            current_witness: AccountName::default(),
            current_supply: Asset::new(0, FREEZONE_SYMBOL),
            current_fzd_supply: Asset::new(0, FZD_SYMBOL),
            init_fzd_supply: Asset::new(0, FZD_SYMBOL),
            virtual_supply: Asset::new(0, FREEZONE_SYMBOL),
            total_vesting_fund_freezone: Asset::new(0, FREEZONE_SYMBOL),
            total_vesting_shares: Asset::new(0, VESTS_SYMBOL),
            pending_rewarded_vesting_shares: Asset::new(0, VESTS_SYMBOL),
            pending_rewarded_vesting_freezone: Asset::new(0, FREEZONE_SYMBOL),
            fzd_interest_rate: 0,
            fzd_print_rate: PERCENT_100,
            fzd_start_percent: FZD_START_PERCENT,
            fzd_stop_percent: FZD_STOP_PERCENT,
            maximum_block_size: MAX_BLOCK_SIZE_DEFAULT,
            required_actions_partition_percent: REQUIRED_ACTIONS_PARTITION_PERCENT,
            current_aslot: 0,
            recent_slots_filled: u128::MAX,
            participation_count: 128,
            last_irreversible_block_num: 0,
            content_reward_percent: CONTENT_REWARD_PERCENT,
            vesting_reward_percent: VESTING_FUND_PERCENT,
            sps_fund_percent: SPS_FUND_PERCENT,
            sst_creation_fee: Asset::new(1_000, FZD_SYMBOL),
            available_account_subsidies: 0,
            next_sps_maintenance_time: TimePointSec::MIN,
        }
    }
}

impl GlobalProperties {
    /// Vesting share price: shares per native token.
    pub fn vesting_share_price(&self) -> Price {
        if self.total_vesting_fund_freezone.amount == 0 || self.total_vesting_shares.amount == 0 {
            // Pre-funding price of one million shares per token.
            Price::new(Asset::new(1_000_000, VESTS_SYMBOL), Asset::new(1_000, FREEZONE_SYMBOL))
        } else {
            Price::new(self.total_vesting_shares, self.total_vesting_fund_freezone)
        }
    }

    /// Price used when converting pending reward vesting back to liquid.
    pub fn reward_vesting_share_price(&self) -> Price {
        let shares = self.total_vesting_shares + self.pending_rewarded_vesting_shares;
        let fund = self.total_vesting_fund_freezone + self.pending_rewarded_vesting_freezone;
        if fund.amount == 0 || shares.amount == 0 {
            self.vesting_share_price()
        } else {
            Price::new(shares, fund)
        }
    }
}

impl StateObject for GlobalProperties {
    type Key = ();
    const NAME: &'static str = "global_properties";
    fn keys(&self, _id: Id) -> Vec<()> {
        Vec::new()
    }
}

/// Ring entry for transaction fork-replay references; the table holds
/// exactly 2^16 rows created at genesis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockSummaryObject {
    pub block_id: BlockId,
}

impl StateObject for BlockSummaryObject {
    type Key = ();
    const NAME: &'static str = "block_summary";
    fn keys(&self, _id: Id) -> Vec<()> {
        Vec::new()
    }
}

/// Recently applied transaction, kept until expiration for deduplication.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionObject {
    pub trx_id: TransactionId,
    pub expiration: TimePointSec,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransactionKey {
    ByTrxId(TransactionId),
    ByExpiration(TimePointSec, Id),
}

impl StateObject for TransactionObject {
    type Key = TransactionKey;
    const NAME: &'static str = "transaction";
    fn keys(&self, id: Id) -> Vec<TransactionKey> {
        vec![
            TransactionKey::ByTrxId(self.trx_id),
            TransactionKey::ByExpiration(self.expiration, id),
        ]
    }
}

/// Singleton tracking applied hardforks and the scheduled next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HardforkProperty {
    pub processed_hardforks: Vec<TimePointSec>,
    pub last_hardfork: u32,
    pub current_hardfork_version: ProtocolVersion,
    pub next_hardfork: ProtocolVersion,
    pub next_hardfork_time: TimePointSec,
}

impl StateObject for HardforkProperty {
    type Key = ();
    const NAME: &'static str = "hardfork_property";
    fn keys(&self, _id: Id) -> Vec<()> {
        Vec::new()
    }
}

/// Singleton of recent median feed prices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedHistory {
    pub current_median_history: Price,
    pub price_history: Vec<Price>,
}

impl StateObject for FeedHistory {
    type Key = ();
    const NAME: &'static str = "feed_history";
    fn keys(&self, _id: Id) -> Vec<()> {
        Vec::new()
    }
}

/// Singleton pool of pre-generated numerical asset identifiers for future
/// user tokens.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NaiPool {
    pub nais: Vec<AssetSymbol>,
}

impl NaiPool {
    pub fn contains(&self, symbol: AssetSymbol) -> bool {
        self.nais.iter().any(|s| s.to_nai() == symbol.to_nai())
    }
}

impl StateObject for NaiPool {
    type Key = ();
    const NAME: &'static str = "nai_pool";
    fn keys(&self, _id: Id) -> Vec<()> {
        Vec::new()
    }
}

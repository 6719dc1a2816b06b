// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_message::ops::ChainProperties;
use freezone_types::config::{
    ACCOUNT_SUBSIDY_BUDGET_PER_BLOCK, ACCOUNT_SUBSIDY_DECAY, HARDFORK_REQUIRED_WITNESSES,
    MAX_VOTED_WITNESSES, MAX_WITNESSES,
};
use freezone_types::{AccountName, Price, ProtocolVersion, PublicKey, TimePointSec};

/// How a witness earned its slot in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WitnessSchedulePlacement {
    /// Top of the stake-weighted vote.
    Elected,
    /// Won the virtual-time lap among non-top witnesses.
    Timeshare,
    /// Legacy proof-of-work slot; retained for replay of early history.
    Miner,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WitnessObject {
    pub owner: AccountName,
    pub created: TimePointSec,
    pub url: String,
    pub signing_key: PublicKey,
    pub props: ChainProperties,
    pub fzd_exchange_rate: Price,
    pub last_fzd_exchange_update: TimePointSec,

    pub votes: i64,
    pub schedule: WitnessSchedulePlacement,
    /// 128-bit virtual-time scheduling state for the timeshare slot.
    pub virtual_last_update: u128,
    pub virtual_position: u128,
    pub virtual_scheduled_time: u128,

    pub total_missed: u32,
    pub last_aslot: u64,
    pub last_confirmed_block_num: u32,

    pub running_version: ProtocolVersion,
    pub hardfork_version_vote: ProtocolVersion,
    pub hardfork_time_vote: TimePointSec,

    pub available_witness_account_subsidies: i64,
}

impl Default for WitnessObject {
    fn default() -> Self {
        WitnessObject {
            owner: AccountName::default(),
            created: TimePointSec::MIN,
            url: String::new(),
            signing_key: PublicKey::nil(),
            props: ChainProperties::default(),
            fzd_exchange_rate: Price::default(),
            last_fzd_exchange_update: TimePointSec::MIN,
            votes: 0,
            schedule: WitnessSchedulePlacement::None,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: u128::MAX,
            total_missed: 0,
            last_aslot: 0,
            last_confirmed_block_num: 0,
            running_version: ProtocolVersion::default(),
            hardfork_version_vote: ProtocolVersion::default(),
            hardfork_time_vote: TimePointSec::MIN,
            available_witness_account_subsidies: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum WitnessKey {
    ByName(AccountName),
    /// Vote-descending order: stores the negated vote total.
    ByVote(i64, AccountName),
    BySchedule(u128, Id),
}

impl StateObject for WitnessObject {
    type Key = WitnessKey;
    const NAME: &'static str = "witness";

    fn keys(&self, id: Id) -> Vec<WitnessKey> {
        vec![
            WitnessKey::ByName(self.owner.clone()),
            WitnessKey::ByVote(-self.votes, self.owner.clone()),
            WitnessKey::BySchedule(self.virtual_scheduled_time, id),
        ]
    }
}

/// An account's approval of a witness.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WitnessVoteObject {
    pub witness: AccountName,
    pub account: AccountName,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum WitnessVoteKey {
    ByAccountWitness(AccountName, AccountName),
    ByWitnessAccount(AccountName, AccountName),
}

impl StateObject for WitnessVoteObject {
    type Key = WitnessVoteKey;
    const NAME: &'static str = "witness_vote";

    fn keys(&self, _id: Id) -> Vec<WitnessVoteKey> {
        vec![
            WitnessVoteKey::ByAccountWitness(self.account.clone(), self.witness.clone()),
            WitnessVoteKey::ByWitnessAccount(self.witness.clone(), self.account.clone()),
        ]
    }
}

/// Singleton holding the current round's shuffled witnesses and the medians
/// of witness-proposed parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WitnessSchedule {
    pub current_virtual_time: u128,
    /// First block number of the next round.
    pub next_shuffle_block_num: u32,
    pub current_shuffled_witnesses: Vec<AccountName>,
    pub num_scheduled_witnesses: u8,

    pub elected_weight: u8,
    pub timeshare_weight: u8,
    pub miner_weight: u8,
    pub witness_pay_normalization_factor: u32,

    pub median_props: ChainProperties,
    pub majority_version: ProtocolVersion,

    pub max_voted_witnesses: u8,
    pub max_miner_witnesses: u8,
    pub max_runner_witnesses: u8,
    pub hardfork_required_witnesses: u8,

    pub account_subsidy_budget: i64,
    pub account_subsidy_decay: u64,
    pub account_subsidy_witness_budget: i64,
    pub account_subsidy_witness_decay: u64,
}

impl Default for WitnessSchedule {
    fn default() -> Self {
        WitnessSchedule {
            current_virtual_time: 0,
            next_shuffle_block_num: 1,
            current_shuffled_witnesses: Vec::new(),
            num_scheduled_witnesses: 1,
            elected_weight: 1,
            timeshare_weight: 5,
            miner_weight: 1,
            // 20 elected × 1 + 1 timeshare × 5.
            witness_pay_normalization_factor: 25,
            median_props: ChainProperties::default(),
            majority_version: ProtocolVersion::default(),
            max_voted_witnesses: MAX_VOTED_WITNESSES as u8,
            max_miner_witnesses: 0,
            max_runner_witnesses: (MAX_WITNESSES - MAX_VOTED_WITNESSES) as u8,
            hardfork_required_witnesses: HARDFORK_REQUIRED_WITNESSES as u8,
            account_subsidy_budget: ACCOUNT_SUBSIDY_BUDGET_PER_BLOCK,
            account_subsidy_decay: ACCOUNT_SUBSIDY_DECAY,
            account_subsidy_witness_budget: ACCOUNT_SUBSIDY_BUDGET_PER_BLOCK / 4,
            account_subsidy_witness_decay: ACCOUNT_SUBSIDY_DECAY * 2,
        }
    }
}

impl StateObject for WitnessSchedule {
    type Key = ();
    const NAME: &'static str = "witness_schedule";
    fn keys(&self, _id: Id) -> Vec<()> {
        Vec::new()
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Persistent chain state: one [`Table`] per object kind plus the session
//! plumbing that makes every mutation undoable. The store owns all objects;
//! everything else refers to them by id or secondary key.

pub mod account;
pub mod comment;
pub mod global;
pub mod market;
pub mod proposal;
pub mod recovery;
pub mod sst;
pub mod transfer;
pub mod vesting;
pub mod witness;

pub use account::*;
pub use comment::*;
pub use global::*;
pub use market::*;
pub use proposal::*;
pub use recovery::*;
pub use sst::*;
pub use transfer::*;
pub use vesting::*;
pub use witness::*;

use crate::errors::{Error, Result};
use freezone_db::Table;
use freezone_types::{AccountName, AssetSymbol};

macro_rules! state_tables {
    ( $( $field:ident : $ty:ty ),+ $(,)? ) => {
        /// The complete chain state.
        pub struct State {
            $( pub $field: Table<$ty>, )+
            revision: u64,
            open_layers: usize,
        }

        impl Default for State {
            fn default() -> Self {
                State {
                    $( $field: Table::new(), )+
                    revision: 0,
                    open_layers: 0,
                }
            }
        }

        impl State {
            pub fn new() -> Self {
                Self::default()
            }

            /// Opens a nested undo layer across every table.
            pub fn start_undo_session(&mut self) {
                $( self.$field.begin_undo(); )+
                self.revision += 1;
                self.open_layers += 1;
            }

            /// Discards the newest layer, reverting its changes.
            pub fn undo(&mut self) {
                assert!(self.open_layers > 0, "undo without open session");
                $( self.$field.undo(); )+
                self.revision -= 1;
                self.open_layers -= 1;
            }

            /// Merges the newest layer into its parent.
            pub fn squash(&mut self) {
                assert!(self.open_layers > 1, "squash without parent session");
                $( self.$field.squash(); )+
                self.revision -= 1;
                self.open_layers -= 1;
            }

            /// Reverts every open layer.
            pub fn undo_all(&mut self) {
                while self.open_layers > 0 {
                    self.undo();
                }
            }

            /// Irrevocably commits undo history up to `revision`.
            pub fn commit(&mut self, revision: u64) {
                let oldest = self.revision - self.open_layers as u64;
                if revision > oldest {
                    let n = ((revision - oldest) as usize).min(self.open_layers);
                    $( self.$field.commit(n); )+
                    self.open_layers -= n;
                }
            }

            pub fn revision(&self) -> u64 {
                self.revision
            }

            pub fn open_layers(&self) -> usize {
                self.open_layers
            }

            /// Base revision for a fresh store; only valid before any
            /// session is opened.
            pub fn set_revision(&mut self, revision: u64) {
                assert_eq!(self.open_layers, 0, "cannot reset revision with open sessions");
                self.revision = revision;
            }
        }
    };
}

state_tables! {
    globals: GlobalProperties,
    witness_schedules: WitnessSchedule,
    hardfork_properties: HardforkProperty,
    feed_histories: FeedHistory,
    nai_pools: NaiPool,
    accounts: AccountObject,
    account_authorities: AccountAuthorityObject,
    witnesses: WitnessObject,
    witness_votes: WitnessVoteObject,
    comments: CommentObject,
    comment_votes: CommentVoteObject,
    reward_funds: RewardFundObject,
    limit_orders: LimitOrderObject,
    convert_requests: ConvertRequestObject,
    liquidity_rewards: LiquidityRewardBalanceObject,
    escrows: EscrowObject,
    savings_withdraws: SavingsWithdrawObject,
    vesting_delegations: VestingDelegationObject,
    vesting_delegation_expirations: VestingDelegationExpirationObject,
    withdraw_routes: WithdrawVestingRouteObject,
    recovery_requests: AccountRecoveryRequestObject,
    change_recovery_requests: ChangeRecoveryAccountRequestObject,
    owner_authority_histories: OwnerAuthorityHistoryObject,
    decline_voting_requests: DeclineVotingRightsRequestObject,
    block_summaries: BlockSummaryObject,
    transactions: TransactionObject,
    pending_required_actions: PendingRequiredActionObject,
    pending_optional_actions: PendingOptionalActionObject,
    proposals: ProposalObject,
    proposal_votes: ProposalVoteObject,
    sst_tokens: SstTokenObject,
    sst_icos: SstIcoObject,
    sst_ico_tiers: SstIcoTierObject,
    sst_token_emissions: SstTokenEmissionsObject,
    sst_contributions: SstContributionObject,
    account_regular_balances: AccountRegularBalanceObject,
    account_rewards_balances: AccountRewardsBalanceObject,
}

impl State {
    // Singletons are rows with id zero, created once at genesis.

    pub fn gpo(&self) -> &GlobalProperties {
        self.globals.find(0).expect("global properties initialized at genesis")
    }

    pub fn modify_gpo(&mut self, f: impl FnOnce(&mut GlobalProperties)) {
        self.globals.modify(0, f).expect("global properties initialized at genesis")
    }

    pub fn wso(&self) -> &WitnessSchedule {
        self.witness_schedules.find(0).expect("witness schedule initialized at genesis")
    }

    pub fn modify_wso(&mut self, f: impl FnOnce(&mut WitnessSchedule)) {
        self.witness_schedules.modify(0, f).expect("witness schedule initialized at genesis")
    }

    pub fn hardforks(&self) -> &HardforkProperty {
        self.hardfork_properties.find(0).expect("hardfork property initialized at genesis")
    }

    pub fn modify_hardforks(&mut self, f: impl FnOnce(&mut HardforkProperty)) {
        self.hardfork_properties.modify(0, f).expect("hardfork property initialized at genesis")
    }

    pub fn feed(&self) -> &FeedHistory {
        self.feed_histories.find(0).expect("feed history initialized at genesis")
    }

    pub fn modify_feed(&mut self, f: impl FnOnce(&mut FeedHistory)) {
        self.feed_histories.modify(0, f).expect("feed history initialized at genesis")
    }

    pub fn nai_pool(&self) -> &NaiPool {
        self.nai_pools.find(0).expect("nai pool initialized at genesis")
    }

    pub fn modify_nai_pool(&mut self, f: impl FnOnce(&mut NaiPool)) {
        self.nai_pools.modify(0, f).expect("nai pool initialized at genesis")
    }

    // Common typed lookups.

    pub fn find_account(&self, name: &AccountName) -> Option<&AccountObject> {
        self.accounts.find_by_key(&AccountKey::ByName(name.clone()))
    }

    pub fn get_account(&self, name: &AccountName) -> Result<&AccountObject> {
        self.accounts
            .get_by_key(&AccountKey::ByName(name.clone()))
            .map_err(Error::from)
    }

    pub fn account_id(&self, name: &AccountName) -> Result<freezone_db::Id> {
        self.accounts
            .id_by_key(&AccountKey::ByName(name.clone()))
            .ok_or_else(|| Error::precondition(format!("unknown account {name}")))
    }

    pub fn get_account_authority(&self, name: &AccountName) -> Result<&AccountAuthorityObject> {
        self.account_authorities
            .get_by_key(&AccountAuthorityKey::ByAccount(name.clone()))
            .map_err(Error::from)
    }

    pub fn find_witness(&self, name: &AccountName) -> Option<&WitnessObject> {
        self.witnesses.find_by_key(&WitnessKey::ByName(name.clone()))
    }

    pub fn get_witness(&self, name: &AccountName) -> Result<&WitnessObject> {
        self.witnesses
            .get_by_key(&WitnessKey::ByName(name.clone()))
            .map_err(Error::from)
    }

    pub fn find_comment(&self, author: &AccountName, permlink: &str) -> Option<&CommentObject> {
        self.comments
            .find_by_key(&CommentKey::ByPermlink(author.clone(), permlink.to_string()))
    }

    pub fn get_comment(&self, author: &AccountName, permlink: &str) -> Result<&CommentObject> {
        self.comments
            .get_by_key(&CommentKey::ByPermlink(author.clone(), permlink.to_string()))
            .map_err(Error::from)
    }

    pub fn find_sst_token(&self, symbol: AssetSymbol) -> Option<&SstTokenObject> {
        self.sst_tokens
            .find_by_key(&SstTokenKey::BySymbol(symbol.liquid_symbol()))
    }

    pub fn get_sst_token(&self, symbol: AssetSymbol) -> Result<&SstTokenObject> {
        self.sst_tokens
            .get_by_key(&SstTokenKey::BySymbol(symbol.liquid_symbol()))
            .map_err(Error::from)
    }

    pub fn get_sst_ico(&self, symbol: AssetSymbol) -> Result<&SstIcoObject> {
        self.sst_icos
            .get_by_key(&SstIcoKey::BySymbol(symbol.liquid_symbol()))
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_nest_and_commit() {
        let mut state = State::new();
        state.globals.create(|_| {});
        assert_eq!(state.revision(), 0);

        state.start_undo_session();
        state.modify_gpo(|g| g.head_block_number = 1);
        state.start_undo_session();
        state.modify_gpo(|g| g.head_block_number = 2);
        assert_eq!(state.revision(), 2);

        state.undo();
        assert_eq!(state.gpo().head_block_number, 1);
        state.start_undo_session();
        state.modify_gpo(|g| g.head_block_number = 5);
        state.squash();
        assert_eq!(state.revision(), 1);
        assert_eq!(state.gpo().head_block_number, 5);

        state.commit(1);
        assert_eq!(state.open_layers(), 0);
        assert_eq!(state.revision(), 1);
    }
}

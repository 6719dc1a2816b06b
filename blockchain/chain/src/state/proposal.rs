// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_types::{AccountName, Asset, TimePointSec, FZD_SYMBOL};

/// A treasury funding proposal. The table id doubles as the proposal id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalObject {
    pub creator: AccountName,
    pub receiver: AccountName,
    pub start_date: TimePointSec,
    pub end_date: TimePointSec,
    pub daily_pay: Asset,
    pub subject: String,
    pub permlink: String,
    /// Stake-weighted approval, recomputed each maintenance pass.
    pub total_votes: u128,
    /// Swept out at the next maintenance once flagged.
    pub removed: bool,
}

impl Default for ProposalObject {
    fn default() -> Self {
        ProposalObject {
            creator: AccountName::default(),
            receiver: AccountName::default(),
            start_date: TimePointSec::MIN,
            end_date: TimePointSec::MIN,
            daily_pay: Asset::new(0, FZD_SYMBOL),
            subject: String::new(),
            permlink: String::new(),
            total_votes: 0,
            removed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProposalKey {
    ByEndDate(TimePointSec, Id),
    /// Vote-descending order for the payout pass.
    ByTotalVotes(u128, Id),
}

impl StateObject for ProposalObject {
    type Key = ProposalKey;
    const NAME: &'static str = "proposal";

    fn keys(&self, id: Id) -> Vec<ProposalKey> {
        vec![
            ProposalKey::ByEndDate(self.end_date, id),
            ProposalKey::ByTotalVotes(u128::MAX - self.total_votes, id),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProposalVoteObject {
    pub voter: AccountName,
    pub proposal_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProposalVoteKey {
    ByVoterProposal(AccountName, Id),
    ByProposalVoter(Id, AccountName),
}

impl StateObject for ProposalVoteObject {
    type Key = ProposalVoteKey;
    const NAME: &'static str = "proposal_vote";

    fn keys(&self, _id: Id) -> Vec<ProposalVoteKey> {
        vec![
            ProposalVoteKey::ByVoterProposal(self.voter.clone(), self.proposal_id),
            ProposalVoteKey::ByProposalVoter(self.proposal_id, self.voter.clone()),
        ]
    }
}

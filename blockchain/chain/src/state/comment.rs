// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_message::ops::BeneficiaryRoute;
use freezone_types::config::{CONTENT_CONSTANT, PERCENT_100, PERCENT_CURATION_REWARDS};
use freezone_types::{AccountName, Asset, AssetSymbol, TimePointSec, FZD_SYMBOL};

/// Reward curve applied to rshares when claiming from a fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Curve {
    Quadratic,
    #[default]
    Linear,
    SquareRoot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentObject {
    pub author: AccountName,
    pub permlink: String,
    pub parent_author: AccountName,
    pub parent_permlink: String,
    /// Id of the root post of this reply tree; self for root posts.
    pub root_comment: Id,
    pub depth: u16,
    pub children: u32,

    pub created: TimePointSec,
    pub last_update: TimePointSec,
    pub last_payout: TimePointSec,
    pub cashout_time: TimePointSec,
    pub max_cashout_time: TimePointSec,

    pub net_rshares: i64,
    pub abs_rshares: i64,
    pub vote_rshares: i64,
    pub children_abs_rshares: i64,
    pub total_vote_weight: u64,
    pub net_votes: i32,

    pub reward_weight: u16,
    pub total_payout_value: Asset,
    pub curator_payout_value: Asset,
    pub beneficiary_payout_value: Asset,
    pub author_rewards: i64,

    pub max_accepted_payout: Asset,
    pub percent_freezone_dollars: u16,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub beneficiaries: Vec<BeneficiaryRoute>,
}

impl Default for CommentObject {
    fn default() -> Self {
        CommentObject {
            author: AccountName::default(),
            permlink: String::new(),
            parent_author: AccountName::default(),
            parent_permlink: String::new(),
            root_comment: 0,
            depth: 0,
            children: 0,
            created: TimePointSec::MIN,
            last_update: TimePointSec::MIN,
            last_payout: TimePointSec::MIN,
            cashout_time: TimePointSec::MAX,
            max_cashout_time: TimePointSec::MAX,
            net_rshares: 0,
            abs_rshares: 0,
            vote_rshares: 0,
            children_abs_rshares: 0,
            total_vote_weight: 0,
            net_votes: 0,
            reward_weight: PERCENT_100,
            total_payout_value: Asset::new(0, FZD_SYMBOL),
            curator_payout_value: Asset::new(0, FZD_SYMBOL),
            beneficiary_payout_value: Asset::new(0, FZD_SYMBOL),
            author_rewards: 0,
            max_accepted_payout: Asset::new(1_000_000_000, FZD_SYMBOL),
            percent_freezone_dollars: PERCENT_100,
            allow_votes: true,
            allow_curation_rewards: true,
            beneficiaries: Vec::new(),
        }
    }
}

impl CommentObject {
    pub fn is_root(&self) -> bool {
        self.parent_author.is_empty()
    }

    /// True once the comment has been paid and can earn no further rewards.
    pub fn is_paid_out(&self) -> bool {
        self.cashout_time == TimePointSec::MAX && self.last_payout > TimePointSec::MIN
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentKey {
    ByPermlink(AccountName, String),
    ByCashoutTime(TimePointSec, Id),
}

impl StateObject for CommentObject {
    type Key = CommentKey;
    const NAME: &'static str = "comment";

    fn keys(&self, id: Id) -> Vec<CommentKey> {
        vec![
            CommentKey::ByPermlink(self.author.clone(), self.permlink.clone()),
            CommentKey::ByCashoutTime(self.cashout_time, id),
        ]
    }
}

/// One vote on one comment in one reward currency.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentVoteObject {
    pub comment: Id,
    pub voter: AccountName,
    pub symbol: AssetSymbol,
    pub rshares: i64,
    pub vote_percent: i16,
    /// Time-weighted curation claim recorded when the vote landed.
    pub weight: u64,
    pub last_update: TimePointSec,
    /// Edit counter; `-1` poisons the vote after payout.
    pub num_changes: i8,
}

impl Default for CommentVoteObject {
    fn default() -> Self {
        CommentVoteObject {
            comment: 0,
            voter: AccountName::default(),
            symbol: freezone_types::FREEZONE_SYMBOL,
            rshares: 0,
            vote_percent: 0,
            weight: 0,
            last_update: TimePointSec::MIN,
            num_changes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentVoteKey {
    ByCommentSymbolVoter(Id, AssetSymbol, AccountName),
    ByVoterComment(AccountName, Id, AssetSymbol),
}

impl StateObject for CommentVoteObject {
    type Key = CommentVoteKey;
    const NAME: &'static str = "comment_vote";

    fn keys(&self, _id: Id) -> Vec<CommentVoteKey> {
        vec![
            CommentVoteKey::ByCommentSymbolVoter(self.comment, self.symbol, self.voter.clone()),
            CommentVoteKey::ByVoterComment(self.voter.clone(), self.comment, self.symbol),
        ]
    }
}

/// A named pool of native tokens paying out post rewards, with its decaying
/// claim total.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardFundObject {
    pub name: String,
    pub reward_balance: Asset,
    pub recent_claims: u128,
    pub last_update: TimePointSec,
    pub content_constant: u128,
    pub percent_curation_rewards: u16,
    /// Share of per-block content inflation routed to this fund.
    pub percent_content_rewards: u16,
    pub author_reward_curve: Curve,
    pub curation_reward_curve: Curve,
}

impl Default for RewardFundObject {
    fn default() -> Self {
        RewardFundObject {
            name: String::new(),
            reward_balance: Asset::new(0, freezone_types::FREEZONE_SYMBOL),
            recent_claims: 0,
            last_update: TimePointSec::MIN,
            content_constant: CONTENT_CONSTANT,
            percent_curation_rewards: PERCENT_CURATION_REWARDS,
            percent_content_rewards: PERCENT_100,
            author_reward_curve: Curve::Linear,
            curation_reward_curve: Curve::SquareRoot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RewardFundKey {
    ByName(String),
}

impl StateObject for RewardFundObject {
    type Key = RewardFundKey;
    const NAME: &'static str = "reward_fund";

    fn keys(&self, _id: Id) -> Vec<RewardFundKey> {
        vec![RewardFundKey::ByName(self.name.clone())]
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::config::PERCENT_100;
use freezone_types::{AccountName, Asset, FZD_SYMBOL};
use serde::{Deserialize, Serialize};

pub const MAX_PERMLINK_LENGTH: usize = 256;

pub(crate) fn check_permlink(permlink: &str) -> Result<(), Error> {
    if permlink.len() > MAX_PERMLINK_LENGTH {
        return Err(Error::validation("permlink is too long"));
    }
    if !permlink.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(Error::validation("permlink contains invalid characters"));
    }
    Ok(())
}

/// Creates or edits a post (empty `parent_author`) or a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentOperation {
    pub parent_author: AccountName,
    pub parent_permlink: String,
    pub author: AccountName,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

impl CommentOperation {
    pub fn is_root(&self) -> bool {
        self.parent_author.is_empty()
    }
}

impl OperationBehavior for CommentOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.author)?;
        if !self.parent_author.is_empty() {
            check_account(&self.parent_author)?;
        }
        check_permlink(&self.permlink)?;
        check_permlink(&self.parent_permlink)?;
        if self.title.len() > 256 {
            return Err(Error::validation("title is too long"));
        }
        if self.body.is_empty() {
            return Err(Error::validation("body is empty"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.posting.push(self.author.clone());
    }
}

/// Fixed payout split to a beneficiary of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRoute {
    pub account: AccountName,
    pub weight: u16,
}

/// Adjusts payout parameters of a not-yet-paid comment. Parameters may only
/// tighten once votes exist, enforced by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentOptionsOperation {
    pub author: AccountName,
    pub permlink: String,
    pub max_accepted_payout: Asset,
    pub percent_freezone_dollars: u16,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub beneficiaries: Vec<BeneficiaryRoute>,
}

impl OperationBehavior for CommentOptionsOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.author)?;
        check_permlink(&self.permlink)?;
        if self.max_accepted_payout.symbol != FZD_SYMBOL || self.max_accepted_payout.amount < 0 {
            return Err(Error::validation("max accepted payout must be non-negative dollars"));
        }
        if self.percent_freezone_dollars > PERCENT_100 {
            return Err(Error::validation("dollar percent exceeds 100%"));
        }
        let mut total: u32 = 0;
        let mut prev: Option<&AccountName> = None;
        for route in &self.beneficiaries {
            check_account(&route.account)?;
            if route.weight > PERCENT_100 {
                return Err(Error::validation("beneficiary weight exceeds 100%"));
            }
            if let Some(p) = prev {
                if *p >= route.account {
                    return Err(Error::validation("beneficiaries must be unique and sorted"));
                }
            }
            prev = Some(&route.account);
            total += route.weight as u32;
        }
        if total > PERCENT_100 as u32 {
            return Err(Error::validation("beneficiary weights exceed 100%"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.posting.push(self.author.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCommentOperation {
    pub author: AccountName,
    pub permlink: String,
}

impl OperationBehavior for DeleteCommentOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.author)?;
        check_permlink(&self.permlink)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.posting.push(self.author.clone());
    }
}

/// Casts or changes a vote. Weight is in basis points; negative weights
/// downvote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub weight: i16,
}

impl OperationBehavior for VoteOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.voter)?;
        check_account(&self.author)?;
        check_permlink(&self.permlink)?;
        if self.weight.unsigned_abs() > PERCENT_100 {
            return Err(Error::validation("vote weight exceeds 100%"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.posting.push(self.voter.clone());
    }
}

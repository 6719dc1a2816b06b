// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, comment::check_permlink, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::{AccountName, Asset, TimePointSec, FZD_SYMBOL};
use serde::{Deserialize, Serialize};

pub const MAX_PROPOSAL_IDS_PER_OP: usize = 5;

/// Requests daily funding from the treasury between two dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProposalOperation {
    pub creator: AccountName,
    pub receiver: AccountName,
    pub start_date: TimePointSec,
    pub end_date: TimePointSec,
    pub daily_pay: Asset,
    pub subject: String,
    pub permlink: String,
}

impl OperationBehavior for CreateProposalOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.creator)?;
        check_account(&self.receiver)?;
        if self.start_date >= self.end_date {
            return Err(Error::validation("proposal end date must follow start date"));
        }
        if self.daily_pay.symbol != FZD_SYMBOL || self.daily_pay.amount <= 0 {
            return Err(Error::validation("daily pay must be a positive dollar amount"));
        }
        if self.subject.is_empty() || self.subject.len() > 80 {
            return Err(Error::validation("invalid proposal subject"));
        }
        check_permlink(&self.permlink)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.creator.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProposalVotesOperation {
    pub voter: AccountName,
    pub proposal_ids: Vec<u64>,
    pub approve: bool,
}

impl OperationBehavior for UpdateProposalVotesOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.voter)?;
        if self.proposal_ids.is_empty() || self.proposal_ids.len() > MAX_PROPOSAL_IDS_PER_OP {
            return Err(Error::validation("invalid proposal id list"));
        }
        if !self.proposal_ids.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::validation("proposal ids must be unique and sorted"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.voter.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveProposalOperation {
    pub proposal_owner: AccountName,
    pub proposal_ids: Vec<u64>,
}

impl OperationBehavior for RemoveProposalOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.proposal_owner)?;
        if self.proposal_ids.is_empty() || self.proposal_ids.len() > MAX_PROPOSAL_IDS_PER_OP {
            return Err(Error::validation("invalid proposal id list"));
        }
        if !self.proposal_ids.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::validation("proposal ids must be unique and sorted"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.proposal_owner.clone());
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::{AccountName, Asset, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};
use serde::{Deserialize, Serialize};

fn check_escrow_amounts(freezone_amount: &Asset, fzd_amount: &Asset) -> Result<(), Error> {
    if freezone_amount.symbol != FREEZONE_SYMBOL || freezone_amount.amount < 0 {
        return Err(Error::validation("escrow native amount invalid"));
    }
    if fzd_amount.symbol != FZD_SYMBOL || fzd_amount.amount < 0 {
        return Err(Error::validation("escrow dollar amount invalid"));
    }
    if freezone_amount.amount + fzd_amount.amount <= 0 {
        return Err(Error::validation("escrow must hold a positive amount"));
    }
    Ok(())
}

/// Locks funds with a third-party agent until released or until the
/// ratification deadline passes unapproved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub escrow_id: u32,
    pub fzd_amount: Asset,
    pub freezone_amount: Asset,
    pub fee: Asset,
    pub ratification_deadline: TimePointSec,
    pub escrow_expiration: TimePointSec,
    pub json_meta: String,
}

impl OperationBehavior for EscrowTransferOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from)?;
        check_account(&self.to)?;
        check_account(&self.agent)?;
        check_escrow_amounts(&self.freezone_amount, &self.fzd_amount)?;
        if self.fee.amount < 0
            || (self.fee.symbol != FREEZONE_SYMBOL && self.fee.symbol != FZD_SYMBOL)
        {
            return Err(Error::validation("invalid escrow fee"));
        }
        if self.from == self.to || self.from == self.agent || self.to == self.agent {
            return Err(Error::validation("escrow parties must be distinct"));
        }
        if self.ratification_deadline >= self.escrow_expiration {
            return Err(Error::validation("ratification deadline must precede expiration"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowApproveOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub escrow_id: u32,
    pub approve: bool,
}

impl OperationBehavior for EscrowApproveOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.who)?;
        if self.who != self.to && self.who != self.agent {
            return Err(Error::validation("only to or agent may approve"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.who.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowDisputeOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub escrow_id: u32,
}

impl OperationBehavior for EscrowDisputeOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.who)?;
        if self.who != self.from && self.who != self.to {
            return Err(Error::validation("only from or to may dispute"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.who.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowReleaseOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub receiver: AccountName,
    pub escrow_id: u32,
    pub fzd_amount: Asset,
    pub freezone_amount: Asset,
}

impl OperationBehavior for EscrowReleaseOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.who)?;
        check_account(&self.receiver)?;
        if self.fzd_amount.symbol != FZD_SYMBOL || self.fzd_amount.amount < 0 {
            return Err(Error::validation("invalid dollar release amount"));
        }
        if self.freezone_amount.symbol != FREEZONE_SYMBOL || self.freezone_amount.amount < 0 {
            return Err(Error::validation("invalid native release amount"));
        }
        if self.fzd_amount.amount + self.freezone_amount.amount <= 0 {
            return Err(Error::validation("must release a positive amount"));
        }
        if self.receiver != self.from && self.receiver != self.to {
            return Err(Error::validation("funds may only be released to from or to"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.who.clone());
    }
}

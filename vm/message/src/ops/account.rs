// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::{AccountName, Asset, Authority, PublicKey, FREEZONE_SYMBOL};
use serde::{Deserialize, Serialize};

fn check_new_authorities(auths: &[&Authority]) -> Result<(), Error> {
    for auth in auths {
        auth.validate()?;
        if auth.is_impossible() {
            return Err(Error::validation("authority can never be satisfied"));
        }
    }
    Ok(())
}

/// Creates an account, paying the creation fee which is converted into the
/// new account's initial vesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Asset,
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

impl OperationBehavior for AccountCreateOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.creator)?;
        check_account(&self.new_account_name)?;
        if self.fee.symbol != FREEZONE_SYMBOL || self.fee.amount < 0 {
            return Err(Error::validation("fee must be a non-negative native amount"));
        }
        check_new_authorities(&[&self.owner, &self.active, &self.posting])
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.creator.clone());
    }
}

/// Updates authorities or metadata of an existing account. Changing the
/// owner authority demands the owner key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: AccountName,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
    pub posting: Option<Authority>,
    pub memo_key: Option<PublicKey>,
    pub json_metadata: String,
}

impl OperationBehavior for AccountUpdateOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account)?;
        let mut provided: Vec<&Authority> = Vec::new();
        provided.extend(self.owner.iter());
        provided.extend(self.active.iter());
        provided.extend(self.posting.iter());
        check_new_authorities(&provided)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        if self.owner.is_some() {
            auths.owner.push(self.account.clone());
        } else {
            auths.active.push(self.account.clone());
        }
    }
}

/// Spends a creation fee, or a unit of the witness account subsidy when the
/// fee is zero, to bank a pending claimed account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimAccountOperation {
    pub creator: AccountName,
    pub fee: Asset,
}

impl OperationBehavior for ClaimAccountOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.creator)?;
        if self.fee.symbol != FREEZONE_SYMBOL || self.fee.amount < 0 {
            return Err(Error::validation("fee must be a non-negative native amount"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.creator.clone());
    }
}

/// Materializes one banked pending claimed account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClaimedAccountOperation {
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

impl OperationBehavior for CreateClaimedAccountOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.creator)?;
        check_account(&self.new_account_name)?;
        check_new_authorities(&[&self.owner, &self.active, &self.posting])
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.creator.clone());
    }
}

/// Filed by the recovery partner to open a window during which the account
/// can be recovered to the new owner authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAccountRecoveryOperation {
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
}

impl OperationBehavior for RequestAccountRecoveryOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.recovery_account)?;
        check_account(&self.account_to_recover)?;
        self.new_owner_authority.validate()?;
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.recovery_account.clone());
    }
}

/// Completes a recovery: must be signed by both the new authority and a
/// recent historical owner authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverAccountOperation {
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub recent_owner_authority: Authority,
}

impl OperationBehavior for RecoverAccountOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account_to_recover)?;
        if self.new_owner_authority == self.recent_owner_authority {
            return Err(Error::validation("cannot recover to the compromised authority"));
        }
        self.new_owner_authority.validate()?;
        self.recent_owner_authority.validate()?;
        if self.new_owner_authority.is_impossible() {
            return Err(Error::validation("new owner authority can never be satisfied"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.other.push(self.new_owner_authority.clone());
        auths.other.push(self.recent_owner_authority.clone());
    }
}

/// Changes the recovery partner; takes effect after the recovery window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountOperation {
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

impl OperationBehavior for ChangeRecoveryAccountOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account_to_recover)?;
        check_account(&self.new_recovery_account)?;
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.owner.push(self.account_to_recover.clone());
    }
}

/// Irreversibly declines governance participation after a maturation delay.
/// `decline = false` cancels a pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineVotingRightsOperation {
    pub account: AccountName,
    pub decline: bool,
}

impl OperationBehavior for DeclineVotingRightsOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.owner.push(self.account.clone());
    }
}

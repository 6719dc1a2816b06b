// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, check_memo, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::config::{PERCENT_100, VESTING_WITHDRAW_INTERVALS};
use freezone_types::{AccountName, Asset, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};
use serde::{Deserialize, Serialize};

/// Moves liquid tokens between accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl OperationBehavior for TransferOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from)?;
        check_account(&self.to)?;
        if self.amount.symbol.is_vesting() {
            return Err(Error::validation("transfer of vesting shares is not allowed"));
        }
        if self.amount.amount <= 0 {
            return Err(Error::validation("transfer amount must be positive"));
        }
        check_memo(&self.memo)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from.clone());
    }
}

/// Converts liquid native tokens (or liquid user tokens) into vesting shares
/// for `to`, or for `from` when `to` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferToVestingOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl TransferToVestingOperation {
    pub fn target(&self) -> &AccountName {
        if self.to.is_empty() {
            &self.from
        } else {
            &self.to
        }
    }
}

impl OperationBehavior for TransferToVestingOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from)?;
        if !self.to.is_empty() {
            check_account(&self.to)?;
        }
        if self.amount.symbol.is_vesting() || self.amount.symbol == FZD_SYMBOL {
            return Err(Error::validation("amount must be a liquid, vestable asset"));
        }
        if self.amount.amount <= 0 {
            return Err(Error::validation("amount must be positive"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from.clone());
    }
}

/// Starts (or resets) the continuous withdrawal of vesting shares over the
/// configured number of intervals. A zero amount cancels the withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawVestingOperation {
    pub account: AccountName,
    pub vesting_shares: Asset,
}

impl WithdrawVestingOperation {
    /// Per-interval quantum.
    pub fn rate(&self) -> i64 {
        self.vesting_shares.amount / VESTING_WITHDRAW_INTERVALS as i64
    }
}

impl OperationBehavior for WithdrawVestingOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account)?;
        if !self.vesting_shares.symbol.is_vesting() {
            return Err(Error::validation("amount must be vesting shares"));
        }
        if self.vesting_shares.amount < 0 {
            return Err(Error::validation("cannot withdraw a negative amount"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.account.clone());
    }
}

/// Routes a percentage of each withdrawal fill to another account, as liquid
/// or re-vested tokens. Zero percent removes the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWithdrawVestingRouteOperation {
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    pub auto_vest: bool,
}

impl OperationBehavior for SetWithdrawVestingRouteOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from_account)?;
        check_account(&self.to_account)?;
        if self.percent > PERCENT_100 {
            return Err(Error::validation("route percent exceeds 100%"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from_account.clone());
    }
}

/// Delegates vesting shares to another account. Zero shares revokes the
/// delegation; revoked shares return after the delegation return period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateVestingSharesOperation {
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
}

impl OperationBehavior for DelegateVestingSharesOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.delegator)?;
        check_account(&self.delegatee)?;
        if self.delegator == self.delegatee {
            return Err(Error::validation("cannot delegate to self"));
        }
        if !self.vesting_shares.symbol.is_vesting() {
            return Err(Error::validation("amount must be vesting shares"));
        }
        if self.vesting_shares.amount < 0 {
            return Err(Error::validation("cannot delegate a negative amount"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.delegator.clone());
    }
}

/// Moves liquid tokens into the three-day-delayed savings balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferToSavingsOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl OperationBehavior for TransferToSavingsOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from)?;
        check_account(&self.to)?;
        if self.amount.amount <= 0 {
            return Err(Error::validation("amount must be positive"));
        }
        if self.amount.symbol != FREEZONE_SYMBOL && self.amount.symbol != FZD_SYMBOL {
            return Err(Error::validation("savings hold only native or dollar tokens"));
        }
        check_memo(&self.memo)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from.clone());
    }
}

/// Schedules a withdrawal out of savings; it completes after the savings
/// delay unless cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFromSavingsOperation {
    pub from: AccountName,
    pub request_id: u32,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl OperationBehavior for TransferFromSavingsOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from)?;
        check_account(&self.to)?;
        if self.amount.amount <= 0 {
            return Err(Error::validation("amount must be positive"));
        }
        if self.amount.symbol != FREEZONE_SYMBOL && self.amount.symbol != FZD_SYMBOL {
            return Err(Error::validation("savings hold only native or dollar tokens"));
        }
        check_memo(&self.memo)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelTransferFromSavingsOperation {
    pub from: AccountName,
    pub request_id: u32,
}

impl OperationBehavior for CancelTransferFromSavingsOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.from)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.from.clone());
    }
}

/// Requests conversion of dollar tokens into native tokens at the median
/// feed price after the conversion delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertOperation {
    pub owner: AccountName,
    pub request_id: u32,
    pub amount: Asset,
}

impl OperationBehavior for ConvertOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.owner)?;
        if self.amount.symbol != FZD_SYMBOL {
            return Err(Error::validation("only the dollar token can be converted"));
        }
        if self.amount.amount <= 0 {
            return Err(Error::validation("amount must be positive"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.owner.clone());
    }
}

/// Moves pending reward balances into the regular balances. Zero amounts are
/// allowed so a subset can be claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRewardBalanceOperation {
    pub account: AccountName,
    pub reward_freezone: Asset,
    pub reward_fzd: Asset,
    pub reward_vests: Asset,
}

impl OperationBehavior for ClaimRewardBalanceOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account)?;
        if self.reward_freezone.symbol != FREEZONE_SYMBOL
            || self.reward_fzd.symbol != FZD_SYMBOL
            || self.reward_vests.symbol != VESTS_SYMBOL
        {
            return Err(Error::validation("reward claim symbols are fixed"));
        }
        if self.reward_freezone.amount < 0
            || self.reward_fzd.amount < 0
            || self.reward_vests.amount < 0
        {
            return Err(Error::validation("cannot claim a negative amount"));
        }
        if self.reward_freezone.amount == 0
            && self.reward_fzd.amount == 0
            && self.reward_vests.amount == 0
        {
            return Err(Error::validation("must claim something"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.posting.push(self.account.clone());
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_types::{AccountName, Asset, TimePointSec, VESTS_SYMBOL};

/// An outstanding delegation of vesting shares.
#[derive(Debug, Clone, PartialEq)]
pub struct VestingDelegationObject {
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
    pub min_delegation_time: TimePointSec,
}

impl Default for VestingDelegationObject {
    fn default() -> Self {
        VestingDelegationObject {
            delegator: AccountName::default(),
            delegatee: AccountName::default(),
            vesting_shares: Asset::new(0, VESTS_SYMBOL),
            min_delegation_time: TimePointSec::MIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VestingDelegationKey {
    ByDelegation(AccountName, AccountName),
}

impl StateObject for VestingDelegationObject {
    type Key = VestingDelegationKey;
    const NAME: &'static str = "vesting_delegation";

    fn keys(&self, _id: Id) -> Vec<VestingDelegationKey> {
        vec![VestingDelegationKey::ByDelegation(self.delegator.clone(), self.delegatee.clone())]
    }
}

/// Revoked delegated shares cooling down before returning to the delegator.
#[derive(Debug, Clone, PartialEq)]
pub struct VestingDelegationExpirationObject {
    pub delegator: AccountName,
    pub vesting_shares: Asset,
    pub expiration: TimePointSec,
}

impl Default for VestingDelegationExpirationObject {
    fn default() -> Self {
        VestingDelegationExpirationObject {
            delegator: AccountName::default(),
            vesting_shares: Asset::new(0, VESTS_SYMBOL),
            expiration: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VestingDelegationExpirationKey {
    ByExpiration(TimePointSec, Id),
    ByAccountExpiration(AccountName, TimePointSec, Id),
}

impl StateObject for VestingDelegationExpirationObject {
    type Key = VestingDelegationExpirationKey;
    const NAME: &'static str = "vesting_delegation_expiration";

    fn keys(&self, id: Id) -> Vec<VestingDelegationExpirationKey> {
        vec![
            VestingDelegationExpirationKey::ByExpiration(self.expiration, id),
            VestingDelegationExpirationKey::ByAccountExpiration(
                self.delegator.clone(),
                self.expiration,
                id,
            ),
        ]
    }
}

/// Routes a share of every withdrawal fill to another account.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithdrawVestingRouteObject {
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    pub auto_vest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum WithdrawVestingRouteKey {
    ByWithdrawRoute(AccountName, AccountName),
}

impl StateObject for WithdrawVestingRouteObject {
    type Key = WithdrawVestingRouteKey;
    const NAME: &'static str = "withdraw_vesting_route";

    fn keys(&self, _id: Id) -> Vec<WithdrawVestingRouteKey> {
        vec![WithdrawVestingRouteKey::ByWithdrawRoute(
            self.from_account.clone(),
            self.to_account.clone(),
        )]
    }
}

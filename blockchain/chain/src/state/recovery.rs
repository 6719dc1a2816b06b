// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_types::{AccountName, Authority, TimePointSec};

/// An open recovery window for a compromised account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecoveryRequestObject {
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expires: TimePointSec,
}

impl Default for AccountRecoveryRequestObject {
    fn default() -> Self {
        AccountRecoveryRequestObject {
            account_to_recover: AccountName::default(),
            new_owner_authority: Authority::default(),
            expires: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountRecoveryRequestKey {
    ByAccount(AccountName),
    ByExpiration(TimePointSec, Id),
}

impl StateObject for AccountRecoveryRequestObject {
    type Key = AccountRecoveryRequestKey;
    const NAME: &'static str = "account_recovery_request";

    fn keys(&self, id: Id) -> Vec<AccountRecoveryRequestKey> {
        vec![
            AccountRecoveryRequestKey::ByAccount(self.account_to_recover.clone()),
            AccountRecoveryRequestKey::ByExpiration(self.expires, id),
        ]
    }
}

/// A pending change of recovery partner, effective after the recovery
/// window so a thief cannot rotate it out instantly.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecoveryAccountRequestObject {
    pub account_to_recover: AccountName,
    pub recovery_account: AccountName,
    pub effective_on: TimePointSec,
}

impl Default for ChangeRecoveryAccountRequestObject {
    fn default() -> Self {
        ChangeRecoveryAccountRequestObject {
            account_to_recover: AccountName::default(),
            recovery_account: AccountName::default(),
            effective_on: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeRecoveryAccountRequestKey {
    ByAccount(AccountName),
    ByEffectiveDate(TimePointSec, Id),
}

impl StateObject for ChangeRecoveryAccountRequestObject {
    type Key = ChangeRecoveryAccountRequestKey;
    const NAME: &'static str = "change_recovery_account_request";

    fn keys(&self, id: Id) -> Vec<ChangeRecoveryAccountRequestKey> {
        vec![
            ChangeRecoveryAccountRequestKey::ByAccount(self.account_to_recover.clone()),
            ChangeRecoveryAccountRequestKey::ByEffectiveDate(self.effective_on, id),
        ]
    }
}

/// Superseded owner authorities kept for the recovery window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OwnerAuthorityHistoryObject {
    pub account: AccountName,
    pub previous_owner_authority: Authority,
    pub last_valid_time: TimePointSec,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum OwnerAuthorityHistoryKey {
    ByAccount(AccountName, Id),
}

impl StateObject for OwnerAuthorityHistoryObject {
    type Key = OwnerAuthorityHistoryKey;
    const NAME: &'static str = "owner_authority_history";

    fn keys(&self, id: Id) -> Vec<OwnerAuthorityHistoryKey> {
        vec![OwnerAuthorityHistoryKey::ByAccount(self.account.clone(), id)]
    }
}

/// A maturing request to irreversibly give up governance participation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclineVotingRightsRequestObject {
    pub account: AccountName,
    pub effective_date: TimePointSec,
}

impl Default for DeclineVotingRightsRequestObject {
    fn default() -> Self {
        DeclineVotingRightsRequestObject {
            account: AccountName::default(),
            effective_date: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeclineVotingRightsRequestKey {
    ByAccount(AccountName),
    ByEffectiveDate(TimePointSec, Id),
}

impl StateObject for DeclineVotingRightsRequestObject {
    type Key = DeclineVotingRightsRequestKey;
    const NAME: &'static str = "decline_voting_rights_request";

    fn keys(&self, id: Id) -> Vec<DeclineVotingRightsRequestKey> {
        vec![
            DeclineVotingRightsRequestKey::ByAccount(self.account.clone()),
            DeclineVotingRightsRequestKey::ByEffectiveDate(self.effective_date, id),
        ]
    }
}

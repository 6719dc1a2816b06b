// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use freezone_types::AccountName;
use serde::{Deserialize, Serialize};
use std::fmt;

const MARKET_MAKER: &str = "$market_maker";
const REWARDS: &str = "$rewards";
const VESTING: &str = "$vesting";
const FROM: &str = "$from";
const FROM_VESTING: &str = "$from.vesting";
const ACCOUNT_VESTING_PREFIX: &str = "$!";
const VESTING_SUFFIX: &str = ".vesting";

/// Routing key for generation-unit and emission shares: an account name or
/// one of a small set of sentinels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTarget(String);

impl UnitTarget {
    pub fn market_maker() -> Self {
        UnitTarget(MARKET_MAKER.into())
    }

    pub fn rewards() -> Self {
        UnitTarget(REWARDS.into())
    }

    pub fn vesting() -> Self {
        UnitTarget(VESTING.into())
    }

    pub fn from_contributor() -> Self {
        UnitTarget(FROM.into())
    }

    pub fn from_contributor_vesting() -> Self {
        UnitTarget(FROM_VESTING.into())
    }

    pub fn account(name: &AccountName) -> Self {
        UnitTarget(name.to_string())
    }

    /// `$!name.vesting`: vesting credit to a fixed account.
    pub fn account_vesting(name: &AccountName) -> Self {
        UnitTarget(format!("{ACCOUNT_VESTING_PREFIX}{name}{VESTING_SUFFIX}"))
    }

    pub fn is_market_maker(&self) -> bool {
        self.0 == MARKET_MAKER
    }

    pub fn is_rewards(&self) -> bool {
        self.0 == REWARDS
    }

    pub fn is_vesting(&self) -> bool {
        self.0 == VESTING
    }

    pub fn is_from(&self) -> bool {
        self.0 == FROM
    }

    pub fn is_from_vesting(&self) -> bool {
        self.0 == FROM_VESTING
    }

    pub fn is_account_vesting(&self) -> bool {
        self.0.starts_with(ACCOUNT_VESTING_PREFIX) && self.0.ends_with(VESTING_SUFFIX)
    }

    pub fn is_account(&self) -> bool {
        !self.0.starts_with('$')
    }

    /// The account behind a plain or `$!name.vesting` target.
    pub fn account_name(&self) -> Option<AccountName> {
        if self.is_account() {
            AccountName::new(&self.0).ok()
        } else if self.is_account_vesting() {
            let inner = &self.0[ACCOUNT_VESTING_PREFIX.len()..self.0.len() - VESTING_SUFFIX.len()];
            AccountName::new(inner).ok()
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let known_sentinel = self.is_market_maker()
            || self.is_rewards()
            || self.is_vesting()
            || self.is_from()
            || self.is_from_vesting();
        if known_sentinel || self.account_name().is_some() {
            Ok(())
        } else {
            Err(Error::validation(format!("invalid unit target '{}'", self.0)))
        }
    }
}

impl fmt::Display for UnitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_validate() {
        for t in [
            UnitTarget::market_maker(),
            UnitTarget::rewards(),
            UnitTarget::vesting(),
            UnitTarget::from_contributor(),
            UnitTarget::from_contributor_vesting(),
        ] {
            t.validate().unwrap();
            assert!(!t.is_account());
        }
    }

    #[test]
    fn account_targets() {
        let name = AccountName::new("alice").unwrap();
        let plain = UnitTarget::account(&name);
        plain.validate().unwrap();
        assert_eq!(plain.account_name(), Some(name.clone()));
        assert!(!plain.is_account_vesting());

        let vesting = UnitTarget::account_vesting(&name);
        vesting.validate().unwrap();
        assert!(vesting.is_account_vesting());
        assert_eq!(vesting.account_name(), Some(name));
    }

    #[test]
    fn bogus_targets_rejected() {
        assert!(UnitTarget("$bogus".into()).validate().is_err());
        assert!(UnitTarget("UPPER".into()).validate().is_err());
        assert!(UnitTarget("$!x.vesting".into()).validate().is_err());
    }
}

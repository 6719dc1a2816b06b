// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{AccountName, Error, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A weighted set of keys and delegated accounts with a signing threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<PublicKey, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn single_key(key: PublicKey) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key, 1);
        Authority { weight_threshold: 1, account_auths: BTreeMap::new(), key_auths }
    }

    /// An authority nothing can satisfy; used to lock the temp account.
    pub fn impossible() -> Self {
        Authority { weight_threshold: 1, ..Default::default() }
    }

    pub fn num_auths(&self) -> usize {
        self.account_auths.len() + self.key_auths.len()
    }

    /// True when no combination of members can reach the threshold.
    pub fn is_impossible(&self) -> bool {
        let total: u64 = self
            .account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| *w as u64)
            .sum();
        total < self.weight_threshold as u64
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.weight_threshold == 0 {
            return Err(Error::InvalidAuthority("zero weight threshold".into()));
        }
        for name in self.account_auths.keys() {
            AccountName::new(name.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrivateKey;

    #[test]
    fn single_key_is_satisfiable() {
        let auth = Authority::single_key(PrivateKey::from_seed("k").public_key());
        assert!(!auth.is_impossible());
        auth.validate().unwrap();
    }

    #[test]
    fn impossible_authority() {
        assert!(Authority::impossible().is_impossible());
    }

    #[test]
    fn threshold_above_total_weight_is_impossible() {
        let mut auth = Authority::single_key(PrivateKey::from_seed("k").public_key());
        auth.weight_threshold = 2;
        assert!(auth.is_impossible());
    }

    #[test]
    fn zero_threshold_rejected() {
        let mut auth = Authority::single_key(PrivateKey::from_seed("k").public_key());
        auth.weight_threshold = 0;
        assert!(auth.validate().is_err());
    }
}

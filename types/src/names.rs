// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;
pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;

/// An account name: dot-separated lowercase segments, each starting with a
/// letter, containing letters, digits and dashes, and ending alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountName(String);

impl AccountName {
    /// Parses and validates a name.
    pub fn new(s: &str) -> Result<Self, Error> {
        if s.len() < MIN_ACCOUNT_NAME_LENGTH || s.len() > MAX_ACCOUNT_NAME_LENGTH {
            return Err(Error::InvalidName(s.to_string()));
        }
        for segment in s.split('.') {
            let bytes = segment.as_bytes();
            if bytes.len() < 3 {
                return Err(Error::InvalidName(s.to_string()));
            }
            if !bytes[0].is_ascii_lowercase() {
                return Err(Error::InvalidName(s.to_string()));
            }
            if !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
                return Err(Error::InvalidName(s.to_string()));
            }
            if !bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
            {
                return Err(Error::InvalidName(s.to_string()));
            }
        }
        Ok(AccountName(s.to_string()))
    }

    /// Constructs a name without validation. Reserved for compiled-in system
    /// account names and test fixtures.
    pub fn unchecked(s: &str) -> Self {
        AccountName(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AccountName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AccountName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Wire data may carry system names and the empty proxy sentinel.
        Ok(AccountName(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["alice", "bob-1", "abc.def", "a1b2c3", "xyz.alice.bob"] {
            assert!(AccountName::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        for name in ["", "ab", "Alice", "1abc", "abc.", ".abc", "ab_cd", "-abc", "ab-",
            "this-name-is-way-too-long"]
        {
            assert!(AccountName::new(name).is_err(), "{name}");
        }
    }
}

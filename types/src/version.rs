// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic protocol version. Hardfork versions carry a zero revision; the
/// revision only distinguishes software releases within one fork window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
    pub rev: u16,
}

impl ProtocolVersion {
    pub const fn new(major: u16, minor: u16, rev: u16) -> Self {
        ProtocolVersion { major, minor, rev }
    }

    /// The hardfork version this release belongs to.
    pub fn hardfork_version(self) -> ProtocolVersion {
        ProtocolVersion { rev: 0, ..self }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.rev)
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| Error::InvalidVersion(s.to_string()))
        };
        let v = ProtocolVersion::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(Error::InvalidVersion(s.to_string()));
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ProtocolVersion::new(0, 23, 0) > ProtocolVersion::new(0, 22, 5));
        assert!(ProtocolVersion::new(1, 0, 0) > ProtocolVersion::new(0, 99, 99));
    }

    #[test]
    fn parse_round_trip() {
        let v: ProtocolVersion = "0.23.1".parse().unwrap();
        assert_eq!(v, ProtocolVersion::new(0, 23, 1));
        assert_eq!(v.to_string(), "0.23.1");
        assert_eq!(v.hardfork_version(), ProtocolVersion::new(0, 23, 0));
        assert!("1.2".parse::<ProtocolVersion>().is_err());
        assert!("1.2.3.4".parse::<ProtocolVersion>().is_err());
    }
}

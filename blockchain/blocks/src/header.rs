// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_message::{OptionalAction, RequiredAction};
use freezone_types::crypto::sha256;
use freezone_types::{AccountName, ProtocolVersion, TimePointSec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Merkle root over a block's transactions.
pub type MerkleRoot = [u8; 32];

/// Block identifier. The first four bytes carry the big-endian block number
/// so the height can be read straight off the id; the remainder comes from
/// the header digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct BlockId(pub [u8; 20]);

impl BlockId {
    pub fn new(digest: [u8; 32], block_num: u32) -> Self {
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        id[..4].copy_from_slice(&block_num.to_be_bytes());
        BlockId(id)
    }

    /// Height encoded in the id prefix.
    pub fn block_num(&self) -> u32 {
        u32::from_be_bytes(self.0[..4].try_into().unwrap())
    }

    /// The 32 bits following the height, referenced by transactions for
    /// fork-replay protection.
    pub fn tapos_prefix(&self) -> u32 {
        u32::from_le_bytes(self.0[4..8].try_into().unwrap())
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", hex::encode(self.0))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Versioned extras a witness may attach to a block header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockHeaderExtension {
    /// The software release the witness runs.
    Version(ProtocolVersion),
    /// The hardfork the witness votes to apply, and when.
    HardforkVersionVote { version: ProtocolVersion, time: TimePointSec },
    RequiredActions(Vec<RequiredAction>),
    OptionalActions(Vec<OptionalAction>),
}

/// Unsigned block header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    pub previous: BlockId,
    pub timestamp: TimePointSec,
    pub witness: AccountName,
    pub transaction_merkle_root: MerkleRoot,
    pub extensions: Vec<BlockHeaderExtension>,
}

impl BlockHeader {
    /// Height of this block: one past the height carried in `previous`.
    pub fn block_num(&self) -> u32 {
        self.previous.block_num() + 1
    }

    /// Digest the witness signs.
    pub fn digest(&self) -> [u8; 32] {
        let bytes = serde_cbor::to_vec(self).expect("header serialization cannot fail");
        sha256(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_carries_height_prefix() {
        let digest = sha256(b"header");
        let id = BlockId::new(digest, 0x0102_0304);
        assert_eq!(id.block_num(), 0x0102_0304);
        // Remaining bytes come from the digest.
        assert_eq!(&id.0[4..], &digest[4..20]);
    }

    #[test]
    fn tapos_prefix_reads_second_word() {
        let mut digest = [0u8; 32];
        digest[4..8].copy_from_slice(&0xaabbccddu32.to_le_bytes());
        let id = BlockId::new(digest, 7);
        assert_eq!(id.tapos_prefix(), 0xaabbccdd);
    }

    #[test]
    fn header_digest_changes_with_contents() {
        let header = BlockHeader {
            timestamp: TimePointSec(30),
            witness: AccountName::unchecked("initwitness"),
            ..Default::default()
        };
        let mut other = header.clone();
        other.timestamp = TimePointSec(33);
        assert_ne!(header.digest(), other.digest());
    }
}

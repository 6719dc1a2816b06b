// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{BlockHeader, BlockId, Error, MerkleRoot};
use freezone_message::SignedTransaction;
use freezone_types::crypto::sha256;
use freezone_types::{PrivateKey, PublicKey, Signature};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// A witness-signed block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedBlock {
    pub header: BlockHeader,
    pub witness_signature: Option<Signature>,
    pub transactions: Vec<SignedTransaction>,
    /// Stores the id after the first call to `id()`.
    #[serde(skip)]
    cached_id: OnceCell<BlockId>,
}

/// Blocks are their ids; the engine compares them constantly while walking
/// fork branches.
impl PartialEq for SignedBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl SignedBlock {
    pub fn new(header: BlockHeader, transactions: Vec<SignedTransaction>) -> Self {
        SignedBlock {
            header,
            witness_signature: None,
            transactions,
            cached_id: OnceCell::new(),
        }
    }

    pub fn block_num(&self) -> u32 {
        self.header.block_num()
    }

    /// Identifier over the signed header, with the height folded into the
    /// prefix. Computed once and cached.
    pub fn id(&self) -> BlockId {
        *self.cached_id.get_or_init(|| {
            let bytes = serde_cbor::to_vec(&(&self.header, &self.witness_signature))
                .expect("header serialization cannot fail");
            BlockId::new(sha256(&bytes), self.block_num())
        })
    }

    pub fn sign(&mut self, key: &PrivateKey) {
        self.witness_signature = Some(key.sign(&self.header.digest()));
        // The signature is part of the id.
        self.cached_id = OnceCell::new();
    }

    /// Recovers the key that signed this block.
    pub fn signee(&self) -> Result<PublicKey, Error> {
        let sig = self.witness_signature.as_ref().ok_or(Error::UnsignedBlock)?;
        Ok(sig.recover(&self.header.digest())?)
    }

    /// Recomputed merkle root of the carried transactions.
    pub fn calculate_merkle_root(&self) -> MerkleRoot {
        merkle_root(&self.transactions)
    }

    /// Serialized size used for the block size bound.
    pub fn pack_size(&self) -> usize {
        serde_cbor::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

/// Pairwise sha256 merkle root over transaction digests. An odd node is
/// promoted unchanged; an empty block has an all-zero root.
pub fn merkle_root(transactions: &[SignedTransaction]) -> MerkleRoot {
    if transactions.is_empty() {
        return [0u8; 32];
    }
    let mut layer: Vec<[u8; 32]> = transactions
        .iter()
        .map(|tx| {
            let bytes = serde_cbor::to_vec(&tx.transaction).expect("tx serialization cannot fail");
            sha256(&bytes)
        })
        .collect();
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len() / 2 + 1);
        for pair in layer.chunks(2) {
            if pair.len() == 2 {
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(&pair[0]);
                buf[32..].copy_from_slice(&pair[1]);
                next.push(sha256(&buf));
            } else {
                next.push(pair[0]);
            }
        }
        layer = next;
    }
    layer[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezone_message::ops::TransferOperation;
    use freezone_message::{Operation, Transaction};
    use freezone_types::{AccountName, Asset, TimePointSec, FREEZONE_SYMBOL};

    fn tx(n: i64) -> SignedTransaction {
        SignedTransaction {
            transaction: Transaction {
                ref_block_num: 0,
                ref_block_prefix: 0,
                expiration: TimePointSec(60),
                operations: vec![Operation::Transfer(TransferOperation {
                    from: AccountName::new("alice").unwrap(),
                    to: AccountName::new("bob").unwrap(),
                    amount: Asset::new(n, FREEZONE_SYMBOL),
                    memo: String::new(),
                })],
            },
            signatures: vec![],
        }
    }

    fn block_at(num: u32) -> SignedBlock {
        let previous = BlockId::new([7u8; 32], num - 1);
        SignedBlock::new(
            BlockHeader {
                previous,
                timestamp: TimePointSec(num * 3),
                witness: AccountName::unchecked("initwitness"),
                transaction_merkle_root: [0u8; 32],
                extensions: vec![],
            },
            vec![],
        )
    }

    #[test]
    fn empty_merkle_root_is_zero() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);
    }

    #[test]
    fn merkle_root_is_order_sensitive() {
        let a = merkle_root(&[tx(1), tx(2)]);
        let b = merkle_root(&[tx(2), tx(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn merkle_handles_odd_counts() {
        let two = merkle_root(&[tx(1), tx(2)]);
        let three = merkle_root(&[tx(1), tx(2), tx(3)]);
        assert_ne!(two, three);
    }

    #[test]
    fn id_encodes_height_and_covers_signature() {
        let mut block = block_at(5);
        assert_eq!(block.id().block_num(), 5);
        let unsigned_id = block.id();
        block.sign(&PrivateKey::from_seed("witness"));
        assert_ne!(block.id(), unsigned_id);
    }

    #[test]
    fn signee_round_trip() {
        let key = PrivateKey::from_seed("witness");
        let mut block = block_at(2);
        assert_eq!(block.signee(), Err(Error::UnsignedBlock));
        block.sign(&key);
        assert_eq!(block.signee().unwrap(), key.public_key());
    }

    #[test]
    fn block_serialization_round_trip() {
        let mut block = block_at(3);
        block.transactions.push(tx(10));
        block.header.transaction_merkle_root = block.calculate_merkle_root();
        block.sign(&PrivateKey::from_seed("witness"));
        let bytes = serde_cbor::to_vec(&block).unwrap();
        let back: SignedBlock = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(block, back);
        assert_eq!(block.id(), back.id());
    }
}

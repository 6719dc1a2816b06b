// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Error, Operation};
use freezone_types::crypto::sha256;
use freezone_types::{ChainId, PrivateKey, PublicKey, Signature, TimePointSec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Transaction identifier: the truncated digest of the unsigned body.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct TransactionId(pub [u8; 20]);

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", hex::encode(self.0))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Unsigned transaction body. `ref_block_num` and `ref_block_prefix`
/// reference a recent block so the transaction cannot replay on another
/// fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: TimePointSec,
    pub operations: Vec<Operation>,
}

impl Transaction {
    fn body_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("transaction serialization cannot fail")
    }

    pub fn id(&self) -> TransactionId {
        let digest = sha256(&self.body_bytes());
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        TransactionId(id)
    }

    /// Digest signed by every signature: binds the body to one chain.
    pub fn sig_digest(&self, chain_id: &ChainId) -> [u8; 32] {
        let mut buf = Vec::with_capacity(32 + 256);
        buf.extend_from_slice(chain_id);
        buf.extend_from_slice(&self.body_bytes());
        sha256(&buf)
    }

    /// Structural validation of the body and every operation.
    pub fn validate(&self) -> Result<(), Error> {
        if self.operations.is_empty() {
            return Err(Error::validation("transaction contains no operations"));
        }
        for op in &self.operations {
            op.validate()?;
        }
        Ok(())
    }
}

/// A transaction plus its signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    pub fn id(&self) -> TransactionId {
        self.transaction.id()
    }

    pub fn sign(&mut self, key: &PrivateKey, chain_id: &ChainId) {
        let digest = self.transaction.sig_digest(chain_id);
        self.signatures.push(key.sign(&digest));
    }

    /// Recovers the set of signing keys, rejecting non-canonical and
    /// duplicate signatures.
    pub fn signees(&self, chain_id: &ChainId) -> Result<BTreeSet<PublicKey>, Error> {
        let digest = self.transaction.sig_digest(chain_id);
        let mut keys = BTreeSet::new();
        for sig in &self.signatures {
            if !sig.is_canonical() {
                return Err(Error::NonCanonicalSignature);
            }
            let key = sig.recover(&digest)?;
            if !keys.insert(key) {
                return Err(Error::validation("duplicate signature"));
            }
        }
        Ok(keys)
    }
}

impl std::ops::Deref for SignedTransaction {
    type Target = Transaction;
    fn deref(&self) -> &Transaction {
        &self.transaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::TransferOperation;
    use freezone_types::{AccountName, Asset, FREEZONE_SYMBOL};

    fn sample_tx() -> Transaction {
        Transaction {
            ref_block_num: 42,
            ref_block_prefix: 0xdead_beef,
            expiration: TimePointSec(1_000),
            operations: vec![Operation::Transfer(TransferOperation {
                from: AccountName::new("alice").unwrap(),
                to: AccountName::new("bob").unwrap(),
                amount: Asset::new(1_000, FREEZONE_SYMBOL),
                memo: String::new(),
            })],
        }
    }

    #[test]
    fn id_is_stable_and_body_sensitive() {
        let tx = sample_tx();
        assert_eq!(tx.id(), tx.id());
        let mut other = tx.clone();
        other.ref_block_num = 43;
        assert_ne!(tx.id(), other.id());
    }

    #[test]
    fn serialization_round_trip() {
        let tx = sample_tx();
        let bytes = serde_cbor::to_vec(&tx).unwrap();
        let back: Transaction = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn signees_bind_to_chain_id() {
        let key = PrivateKey::from_seed("active");
        let mut tx = SignedTransaction { transaction: sample_tx(), signatures: vec![] };
        let chain_a = [1u8; 32];
        let chain_b = [2u8; 32];
        tx.sign(&key, &chain_a);
        let keys = tx.signees(&chain_a).unwrap();
        assert!(keys.contains(&key.public_key()));
        let other = tx.signees(&chain_b).unwrap();
        assert!(!other.contains(&key.public_key()));
    }

    #[test]
    fn empty_transaction_rejected() {
        let tx = Transaction::default();
        assert!(tx.validate().is_err());
    }
}

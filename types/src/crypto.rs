// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a compressed secp256k1 public key.
pub const PUB_KEY_LEN: usize = 33;
/// Length of a recoverable signature: one recovery byte plus 64 signature bytes.
pub const SIG_LEN: usize = 65;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey(pub [u8; PUB_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let arr: [u8; PUB_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKey(format!("expected {PUB_KEY_LEN} bytes")))?;
        libsecp256k1::PublicKey::parse_compressed(&arr)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(PublicKey(arr))
    }

    /// The all-zero key used to disable signing for a shut-down witness.
    pub fn nil() -> Self {
        PublicKey([0u8; PUB_KEY_LEN])
    }

    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for PublicKey {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = serde_bytes_de(deserializer)?;
        let arr: [u8; PUB_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("bad public key length"))?;
        Ok(PublicKey(arr))
    }
}

/// Recoverable ECDSA signature: `[recovery_id, r, s]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIG_LEN]);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let arr: [u8; SIG_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidSignature(format!("expected {SIG_LEN} bytes")))?;
        Ok(Signature(arr))
    }

    fn parts(&self) -> Result<(libsecp256k1::Signature, libsecp256k1::RecoveryId), Error> {
        let rec = libsecp256k1::RecoveryId::parse(self.0[0])
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        let mut body = [0u8; 64];
        body.copy_from_slice(&self.0[1..]);
        let sig = libsecp256k1::Signature::parse_standard(&body)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        Ok((sig, rec))
    }

    /// Low-S rule: exactly one of the two valid `s` values is accepted so a
    /// third party cannot malleate a signed payload into a distinct id.
    pub fn is_canonical(&self) -> bool {
        match self.parts() {
            Ok((sig, _)) => !sig.s.is_high(),
            Err(_) => false,
        }
    }

    /// Recovers the signing public key from a digest.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey, Error> {
        let (sig, rec) = self.parts()?;
        let msg = libsecp256k1::Message::parse(digest);
        let key = libsecp256k1::recover(&msg, &sig, &rec)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        Ok(PublicKey(key.serialize_compressed()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = serde_bytes_de(deserializer)?;
        let arr: [u8; SIG_LEN] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("bad signature length"))?;
        Ok(Signature(arr))
    }
}

/// Signing key. Lives only in block producers, tests and genesis tooling;
/// the engine itself only verifies.
#[derive(Clone)]
pub struct PrivateKey(libsecp256k1::SecretKey);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
        let sk = libsecp256k1::SecretKey::parse(bytes)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(PrivateKey(sk))
    }

    /// Derives a deterministic key from a seed string.
    pub fn from_seed(seed: &str) -> Self {
        let digest = sha256(seed.as_bytes());
        PrivateKey(libsecp256k1::SecretKey::parse(&digest).expect("sha256 digest is a valid scalar"))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(libsecp256k1::PublicKey::from_secret_key(&self.0).serialize_compressed())
    }

    pub fn sign(&self, digest: &[u8; 32]) -> Signature {
        let msg = libsecp256k1::Message::parse(digest);
        let (sig, rec) = libsecp256k1::sign(&msg, &self.0);
        let mut out = [0u8; SIG_LEN];
        out[0] = rec.serialize();
        out[1..].copy_from_slice(&sig.serialize());
        Signature(out)
    }
}

fn serde_bytes_de<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    struct BytesVisitor;
    impl<'de> serde::de::Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;
        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("byte buffer")
        }
        fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }
        fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }
        fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut out = Vec::new();
            while let Some(b) = seq.next_element()? {
                out.push(b);
            }
            Ok(out)
        }
    }
    deserializer.deserialize_bytes(BytesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_recover() {
        let key = PrivateKey::from_seed("alice-active");
        let digest = sha256(b"payload");
        let sig = key.sign(&digest);
        assert!(sig.is_canonical());
        assert_eq!(sig.recover(&digest).unwrap(), key.public_key());
    }

    #[test]
    fn recover_with_wrong_digest_yields_other_key() {
        let key = PrivateKey::from_seed("alice-active");
        let sig = key.sign(&sha256(b"payload"));
        let other = sig.recover(&sha256(b"other")).unwrap();
        assert_ne!(other, key.public_key());
    }

    #[test]
    fn nil_key_detection() {
        assert!(PublicKey::nil().is_nil());
        assert!(!PrivateKey::from_seed("x").public_key().is_nil());
    }

    #[test]
    fn public_key_bytes_round_trip() {
        let pk = PrivateKey::from_seed("seed").public_key();
        assert_eq!(PublicKey::from_bytes(&pk.0).unwrap(), pk);
        assert!(PublicKey::from_bytes(&[1, 2, 3]).is_err());
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("block has no witness signature")]
    UnsignedBlock,
    #[error("invalid block signature: {0}")]
    InvalidSignature(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl From<freezone_types::Error> for Error {
    fn from(e: freezone_types::Error) -> Self {
        Error::InvalidSignature(e.to_string())
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

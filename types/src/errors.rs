// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Errors produced while constructing or combining value types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid asset symbol: {0}")]
    InvalidSymbol(String),
    #[error("asset amount overflow")]
    Overflow,
    #[error("mismatched asset symbols in arithmetic")]
    SymbolMismatch,
    #[error("invalid account name: {0}")]
    InvalidName(String),
    #[error("invalid authority: {0}")]
    InvalidAuthority(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid price: division by zero or null operand")]
    InvalidPrice,
    #[error("invalid version string: {0}")]
    InvalidVersion(String),
}

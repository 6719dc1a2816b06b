// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_types::AccountName;
use thiserror::Error;

/// Failures raised while validating payloads or resolving authorities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Structural validation rejected the payload before any state access.
    #[error("invalid operation: {0}")]
    Validation(String),
    #[error("missing active authority for {0}")]
    MissingActiveAuthority(AccountName),
    #[error("missing owner authority for {0}")]
    MissingOwnerAuthority(AccountName),
    #[error("missing posting authority for {0}")]
    MissingPostingAuthority(AccountName),
    #[error("missing declared authority")]
    MissingOtherAuthority,
    #[error("posting operations may not be combined with other authority classes")]
    MixedAuthorityClasses,
    #[error("authority resolution expanded too many accounts")]
    TooManyAccounts,
    #[error("non-canonical signature in transaction")]
    NonCanonicalSignature,
    #[error(transparent)]
    Types(#[from] freezone_types::Error),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl Error {
    pub fn validation(msg: impl ToString) -> Self {
        Error::Validation(msg.to_string())
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_blocks::BlockId;
use freezone_message::TransactionId;
use thiserror::Error;

/// Chain engine errors. Transaction-scoped failures roll back the enclosing
/// transaction session; block-scoped failures roll back the block; the
/// `Fatal` variants stop the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Offline operation validation rejected the payload.
    #[error(transparent)]
    Message(#[from] freezone_message::Error),
    #[error(transparent)]
    Block(#[from] freezone_blocks::Error),
    #[error(transparent)]
    Store(#[from] freezone_db::Error),
    #[error(transparent)]
    Types(#[from] freezone_types::Error),

    /// Insufficient funds, wrong phase, cap exceeded and friends.
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("{account} has insufficient funds: required {required}")]
    InsufficientFunds { account: String, required: String },

    #[error("duplicate transaction {0}")]
    DuplicateTransaction(TransactionId),
    #[error("transaction tapos reference does not match block summary")]
    TaposMismatch,
    #[error("transaction expiration out of window: {0}")]
    Expiration(String),

    #[error("unlinkable block {0}: parent not in fork database")]
    UnlinkableBlock(BlockId),
    #[error("block {id} does not match checkpoint at height {height}")]
    CheckpointMismatch { height: u32, id: BlockId },
    #[error("merkle root mismatch in block {0}")]
    MerkleMismatch(BlockId),
    #[error("invalid block header: {0}")]
    InvalidBlockHeader(String),
    #[error("a required action due in this block was not included: {0}")]
    MissingRequiredAction(String),
    #[error("block carried an unexpected required action: {0}")]
    UnexpectedRequiredAction(String),

    #[error("unknown hardfork index {0}")]
    UnknownHardfork(u32),
    /// Block log or invariant corruption; reindex recommended.
    #[error("fatal: {0} (a reindex is recommended)")]
    Fatal(String),
    /// A registered observer failed with a plugin error, aborting the block.
    #[error("plugin observer failed: {0}")]
    Plugin(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl Error {
    pub fn precondition(msg: impl ToString) -> Self {
        Error::Precondition(msg.to_string())
    }

    pub fn fatal(msg: impl ToString) -> Self {
        Error::Fatal(msg.to_string())
    }

    /// True for errors that must stop the engine rather than roll back a
    /// session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

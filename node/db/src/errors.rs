// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Store access errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Lookup on an id or unique key that is not present.
    #[error("{kind} not found: {what}")]
    NotFound { kind: &'static str, what: String },
}

impl Error {
    pub fn not_found(kind: &'static str, what: impl ToString) -> Self {
        Error::NotFound { kind, what: what.to_string() }
    }
}

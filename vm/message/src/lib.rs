// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Signed payload types: the operation sum type with structural validation,
//! the automated-action sum types carried in block headers, transactions
//! with TaPoS references, and cost-bounded authority resolution.

mod action;
mod authority_check;
mod errors;
pub mod ops;
mod transaction;
mod unit_target;
mod virtual_op;

pub use action::{OptionalAction, PayoutEntry, RequiredAction};
pub use authority_check::{verify_authority, AuthorityResolver};
pub use errors::Error;
pub use ops::Operation;
pub use transaction::{SignedTransaction, Transaction, TransactionId};
pub use unit_target::UnitTarget;
pub use virtual_op::VirtualOperation;

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The freezone core chain engine.
//!
//! Ingests signed blocks and loose transactions, maintains the fork tree,
//! applies the deterministic per-block economics and advances
//! irreversibility. All state mutation is single threaded; external
//! collaborators deliver work through [`SharedDatabase`].

pub mod balance;
mod block_log;
pub mod config;
mod database;
mod errors;
mod evaluator;
pub mod fork_db;
mod genesis;
pub mod hardfork;
mod maintenance;
pub mod rewards;
pub mod signals;
pub mod sst;
pub mod state;
mod validation;
mod witness_schedule;

pub use block_log::BlockLog;
pub use config::{OpenArgs, SkipFlag, SkipFlags};
pub use database::Database;
pub use errors::{Error, Result};
pub use fork_db::ForkDatabase;
pub use genesis::default_init_witness_key;

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle other threads use to reach the engine. Writers exclude
/// everything; readers exclude writers only.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<RwLock<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        SharedDatabase { inner: Arc::new(RwLock::new(db)) }
    }

    pub fn with_read_lock<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn with_write_lock<R>(&self, f: impl FnOnce(&mut Database) -> R) -> R {
        f(&mut self.inner.write())
    }
}

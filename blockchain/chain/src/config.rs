// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use enumflags2::{bitflags, BitFlags};
use freezone_types::config::ChainConfig;
use freezone_types::{ChainId, PublicKey};
use std::path::PathBuf;

/// Verification classes the engine may omit, used during trusted replay and
/// checkpoint-bounded sync.
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipFlag {
    WitnessSignature,
    TransactionSignatures,
    TransactionDupeCheck,
    TaposCheck,
    MerkleCheck,
    WitnessScheduleCheck,
    AuthorityCheck,
    Validate,
    ValidateInvariants,
    BlockLog,
    ForkDb,
    BlockSizeCheck,
    UndoHistoryCheck,
}

pub type SkipFlags = BitFlags<SkipFlag>;

/// Everything below the highest checkpoint has already been vetted by the
/// operator, so per-block verification can be elided wholesale.
pub fn checkpoint_skip_flags() -> SkipFlags {
    SkipFlag::WitnessSignature
        | SkipFlag::TransactionSignatures
        | SkipFlag::TransactionDupeCheck
        | SkipFlag::BlockSizeCheck
        | SkipFlag::TaposCheck
        | SkipFlag::AuthorityCheck
        | SkipFlag::UndoHistoryCheck
        | SkipFlag::WitnessScheduleCheck
        | SkipFlag::Validate
        | SkipFlag::ValidateInvariants
}

/// Options accepted at engine construction.
#[derive(Debug, Clone)]
pub struct OpenArgs {
    /// Directory holding the block log and its index.
    pub data_dir: PathBuf,
    pub chain_id: ChainId,
    pub config: ChainConfig,
    /// One-shot genesis supplies.
    pub initial_supply: i64,
    pub fzd_initial_supply: i64,
    /// Run the invariant validator after open and on request.
    pub do_validate_invariants: bool,
    /// Reindex upper bound; zero means no bound.
    pub stop_at_block: u32,
    /// Proposals removed per maintenance sweep.
    pub sps_remove_threshold: u16,
    /// Height at which owner-authority history tracking begins.
    pub owner_auth_history_start_block: u32,
    pub skip_flags: SkipFlags,
    /// Signing key of the genesis witness; derived from a fixed seed when
    /// absent.
    pub init_witness_key: Option<PublicKey>,
}

impl OpenArgs {
    pub fn new(data_dir: PathBuf, chain_id: ChainId) -> Self {
        OpenArgs {
            data_dir,
            chain_id,
            config: ChainConfig::mainnet(),
            initial_supply: 0,
            fzd_initial_supply: 0,
            do_validate_invariants: false,
            stop_at_block: 0,
            sps_remove_threshold: 200,
            owner_auth_history_start_block: 0,
            skip_flags: SkipFlags::empty(),
            init_witness_key: None,
        }
    }
}

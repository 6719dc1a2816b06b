// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Value types shared by every layer of the freezone chain engine: assets and
//! their symbols, prices, account names, authorities, keys and signatures,
//! protocol versions and the consensus constants.

pub mod asset;
pub mod authority;
pub mod config;
pub mod crypto;
mod errors;
mod names;
pub mod price;
pub mod time;
pub mod version;

pub use asset::{Asset, AssetSymbol, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};
pub use authority::Authority;
pub use crypto::{PrivateKey, PublicKey, Signature};
pub use errors::Error;
pub use names::AccountName;
pub use price::Price;
pub use time::TimePointSec;
pub use version::ProtocolVersion;

/// 64-bit chain identity. Every signature binds to it.
pub type ChainId = [u8; 32];

/// Basis-point percentage carried on the wire (0..=10_000).
pub type Percent = u16;

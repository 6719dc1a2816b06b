// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The deterministic post-block maintenance passes, in the exact order the
//! engine runs them after every block's transactions.

mod accounts;
mod actions;
mod cashout;
mod feed;
mod funds;
mod orders;
mod proposals;
mod withdrawals;

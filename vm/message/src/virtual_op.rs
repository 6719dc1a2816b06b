// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_types::{AccountName, Asset, ProtocolVersion};
use serde::{Deserialize, Serialize};

/// Notification-only operations. Never part of a signed transaction and
/// never stored; they describe events to observers and are numbered by a
/// per-block monotonic counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualOperation {
    /// The block producer's vesting pay.
    ProducerReward { producer: AccountName, vesting_shares: Asset },
    AuthorReward {
        author: AccountName,
        permlink: String,
        fzd_payout: Asset,
        freezone_payout: Asset,
        vesting_payout: Asset,
    },
    CurationReward {
        curator: AccountName,
        reward: Asset,
        author: AccountName,
        permlink: String,
    },
    CommentBenefactorReward {
        benefactor: AccountName,
        author: AccountName,
        permlink: String,
        fzd_payout: Asset,
        freezone_payout: Asset,
        vesting_payout: Asset,
    },
    /// Total value paid for a comment across all parties, in dollars.
    CommentReward { author: AccountName, permlink: String, payout: Asset },
    CommentPayoutUpdate { author: AccountName, permlink: String },
    FillOrder {
        current_owner: AccountName,
        current_order_id: u32,
        current_pays: Asset,
        open_owner: AccountName,
        open_order_id: u32,
        open_pays: Asset,
    },
    FillConvertRequest {
        owner: AccountName,
        request_id: u32,
        amount_in: Asset,
        amount_out: Asset,
    },
    FillVestingWithdraw {
        from_account: AccountName,
        to_account: AccountName,
        withdrawn: Asset,
        deposited: Asset,
    },
    FillTransferFromSavings {
        from: AccountName,
        to: AccountName,
        amount: Asset,
        request_id: u32,
        memo: String,
    },
    /// Dollar interest accrued on a balance touch.
    Interest { owner: AccountName, interest: Asset },
    LiquidityReward { owner: AccountName, payout: Asset },
    ReturnVestingDelegation { account: AccountName, vesting_shares: Asset },
    ClearNullAccountBalance { total_cleared: Vec<Asset> },
    /// Witness stopped signing and was descheduled.
    ShutdownWitness { witness: AccountName },
    Hardfork { hardfork_id: u32, version: ProtocolVersion },
    ProposalPay { receiver: AccountName, payment: Asset },
}

impl VirtualOperation {
    pub fn name(&self) -> &'static str {
        match self {
            VirtualOperation::ProducerReward { .. } => "ProducerReward",
            VirtualOperation::AuthorReward { .. } => "AuthorReward",
            VirtualOperation::CurationReward { .. } => "CurationReward",
            VirtualOperation::CommentBenefactorReward { .. } => "CommentBenefactorReward",
            VirtualOperation::CommentReward { .. } => "CommentReward",
            VirtualOperation::CommentPayoutUpdate { .. } => "CommentPayoutUpdate",
            VirtualOperation::FillOrder { .. } => "FillOrder",
            VirtualOperation::FillConvertRequest { .. } => "FillConvertRequest",
            VirtualOperation::FillVestingWithdraw { .. } => "FillVestingWithdraw",
            VirtualOperation::FillTransferFromSavings { .. } => "FillTransferFromSavings",
            VirtualOperation::Interest { .. } => "Interest",
            VirtualOperation::LiquidityReward { .. } => "LiquidityReward",
            VirtualOperation::ReturnVestingDelegation { .. } => "ReturnVestingDelegation",
            VirtualOperation::ClearNullAccountBalance { .. } => "ClearNullAccountBalance",
            VirtualOperation::ShutdownWitness { .. } => "ShutdownWitness",
            VirtualOperation::Hardfork { .. } => "Hardfork",
            VirtualOperation::ProposalPay { .. } => "ProposalPay",
        }
    }
}

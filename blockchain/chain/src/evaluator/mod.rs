// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Operation and automated-action evaluators. Dispatch is an exhaustive
//! match over the closed sum types; every evaluator receives the engine and
//! mutates state only through it.

mod account;
mod comment;
mod custom;
mod escrow;
mod market;
mod optional;
mod proposal;
mod required;
mod sst;
mod transfer;
mod witness;

use crate::database::Database;
use crate::errors::Result;
use freezone_message::{OptionalAction, Operation, RequiredAction};

pub(crate) fn apply(db: &mut Database, op: &Operation) -> Result<()> {
    use Operation::*;
    match op {
        AccountCreate(op) => account::account_create(db, op),
        AccountUpdate(op) => account::account_update(db, op),
        ClaimAccount(op) => account::claim_account(db, op),
        CreateClaimedAccount(op) => account::create_claimed_account(db, op),
        Transfer(op) => transfer::transfer(db, op),
        TransferToVesting(op) => transfer::transfer_to_vesting(db, op),
        WithdrawVesting(op) => transfer::withdraw_vesting(db, op),
        SetWithdrawVestingRoute(op) => transfer::set_withdraw_vesting_route(db, op),
        DelegateVestingShares(op) => transfer::delegate_vesting_shares(db, op),
        TransferToSavings(op) => transfer::transfer_to_savings(db, op),
        TransferFromSavings(op) => transfer::transfer_from_savings(db, op),
        CancelTransferFromSavings(op) => transfer::cancel_transfer_from_savings(db, op),
        Convert(op) => transfer::convert(db, op),
        ClaimRewardBalance(op) => transfer::claim_reward_balance(db, op),
        LimitOrderCreate(op) => market::limit_order_create(db, op),
        LimitOrderCancel(op) => market::limit_order_cancel(db, op),
        FeedPublish(op) => witness::feed_publish(db, op),
        WitnessUpdate(op) => witness::witness_update(db, op),
        WitnessSetProperties(op) => witness::witness_set_properties(db, op),
        AccountWitnessVote(op) => witness::account_witness_vote(db, op),
        AccountWitnessProxy(op) => witness::account_witness_proxy(db, op),
        Comment(op) => comment::comment(db, op),
        CommentOptions(op) => comment::comment_options(db, op),
        DeleteComment(op) => comment::delete_comment(db, op),
        Vote(op) => comment::vote(db, op),
        EscrowTransfer(op) => escrow::escrow_transfer(db, op),
        EscrowApprove(op) => escrow::escrow_approve(db, op),
        EscrowDispute(op) => escrow::escrow_dispute(db, op),
        EscrowRelease(op) => escrow::escrow_release(db, op),
        RequestAccountRecovery(op) => account::request_account_recovery(db, op),
        RecoverAccount(op) => account::recover_account(db, op),
        ChangeRecoveryAccount(op) => account::change_recovery_account(db, op),
        DeclineVotingRights(op) => account::decline_voting_rights(db, op),
        CustomJson(op) => custom::custom_json(db, op),
        CreateProposal(op) => proposal::create_proposal(db, op),
        UpdateProposalVotes(op) => proposal::update_proposal_votes(db, op),
        RemoveProposal(op) => proposal::remove_proposal(db, op),
        SstCreate(op) => sst::sst_create(db, op),
        SstSetup(op) => sst::sst_setup(db, op),
        SstSetupIcoTier(op) => sst::sst_setup_ico_tier(db, op),
        SstSetupEmissions(op) => sst::sst_setup_emissions(db, op),
        SstSetSetupParameters(op) => sst::sst_set_setup_parameters(db, op),
        SstSetRuntimeParameters(op) => sst::sst_set_runtime_parameters(db, op),
        SstContribute(op) => sst::sst_contribute(db, op),
    }
}

pub(crate) fn apply_required(db: &mut Database, action: &RequiredAction) -> Result<()> {
    required::apply(db, action)
}

pub(crate) fn apply_optional(db: &mut Database, action: &OptionalAction) -> Result<()> {
    optional::apply(db, action)
}

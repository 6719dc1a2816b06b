// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{ProposalObject, ProposalVoteKey, ProposalVoteObject};
use freezone_message::ops::*;
use freezone_types::config::TREASURY_ACCOUNT;
use freezone_types::{AccountName, Asset, FZD_SYMBOL};

/// Flat fee for filing a proposal, paid to the treasury.
fn proposal_fee() -> Asset {
    Asset::new(10_000, FZD_SYMBOL)
}

pub(super) fn create_proposal(db: &mut Database, op: &CreateProposalOperation) -> Result<()> {
    if !crate::hardfork::has_hardfork(db, crate::hardfork::TREASURY_HARDFORK) {
        return Err(Error::precondition("proposals are not enabled yet"));
    }
    if op.end_date <= db.head_block_time() {
        return Err(Error::precondition("proposal ends in the past"));
    }
    db.state().get_account(&op.receiver)?;

    db.adjust_balance(&op.creator, -proposal_fee())?;
    db.adjust_balance(&AccountName::unchecked(TREASURY_ACCOUNT), proposal_fee())?;

    let op = op.clone();
    db.state.proposals.create(|p: &mut ProposalObject| {
        p.creator = op.creator;
        p.receiver = op.receiver;
        p.start_date = op.start_date;
        p.end_date = op.end_date;
        p.daily_pay = op.daily_pay;
        p.subject = op.subject;
        p.permlink = op.permlink;
    });
    Ok(())
}

pub(super) fn update_proposal_votes(
    db: &mut Database,
    op: &UpdateProposalVotesOperation,
) -> Result<()> {
    for proposal_id in &op.proposal_ids {
        if db.state().proposals.find(*proposal_id).is_none() {
            // Votes for vanished proposals are ignored, not fatal, so one
            // sweep cannot invalidate in-flight transactions.
            continue;
        }
        let key = ProposalVoteKey::ByVoterProposal(op.voter.clone(), *proposal_id);
        let existing = db.state().proposal_votes.id_by_key(&key);
        match (existing, op.approve) {
            (None, true) => {
                let (voter, proposal_id) = (op.voter.clone(), *proposal_id);
                db.state.proposal_votes.create(|v: &mut ProposalVoteObject| {
                    v.voter = voter;
                    v.proposal_id = proposal_id;
                });
            }
            (Some(id), false) => db.state.proposal_votes.remove(id)?,
            _ => {}
        }
    }
    Ok(())
}

pub(super) fn remove_proposal(db: &mut Database, op: &RemoveProposalOperation) -> Result<()> {
    for proposal_id in &op.proposal_ids {
        let proposal = match db.state().proposals.find(*proposal_id) {
            Some(p) => p,
            None => continue,
        };
        if proposal.creator != op.proposal_owner {
            return Err(Error::precondition("only the creator may remove a proposal"));
        }
        db.remove_proposal_with_votes(*proposal_id)?;
    }
    Ok(())
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{EscrowKey, EscrowObject};
use freezone_message::ops::*;

fn get_escrow_id(db: &Database, from: &freezone_types::AccountName, escrow_id: u32) -> Result<freezone_db::Id> {
    db.state()
        .escrows
        .id_by_key(&EscrowKey::ByFromId(from.clone(), escrow_id))
        .ok_or_else(|| Error::precondition("no such escrow"))
}

pub(super) fn escrow_transfer(db: &mut Database, op: &EscrowTransferOperation) -> Result<()> {
    db.state().get_account(&op.to)?;
    db.state().get_account(&op.agent)?;
    let now = db.head_block_time();
    if op.ratification_deadline <= now {
        return Err(Error::precondition("ratification deadline is in the past"));
    }
    if db
        .state()
        .escrows
        .id_by_key(&EscrowKey::ByFromId(op.from.clone(), op.escrow_id))
        .is_some()
    {
        return Err(Error::precondition("escrow id already in use"));
    }

    db.adjust_balance(&op.from, -op.freezone_amount)?;
    db.adjust_balance(&op.from, -op.fzd_amount)?;
    db.adjust_balance(&op.from, -op.fee)?;

    let op = op.clone();
    db.state.escrows.create(|e: &mut EscrowObject| {
        e.escrow_id = op.escrow_id;
        e.from = op.from;
        e.to = op.to;
        e.agent = op.agent;
        e.ratification_deadline = op.ratification_deadline;
        e.escrow_expiration = op.escrow_expiration;
        e.fzd_balance = op.fzd_amount;
        e.freezone_balance = op.freezone_amount;
        e.pending_fee = op.fee;
    });
    Ok(())
}

pub(super) fn escrow_approve(db: &mut Database, op: &EscrowApproveOperation) -> Result<()> {
    let id = get_escrow_id(db, &op.from, op.escrow_id)?;
    let escrow = db.state().escrows.get(id)?.clone();
    if escrow.to != op.to || escrow.agent != op.agent {
        return Err(Error::precondition("escrow parties do not match"));
    }
    if db.head_block_time() >= escrow.ratification_deadline {
        return Err(Error::precondition("the ratification deadline has passed"));
    }

    if !op.approve {
        // Any disapproval dissolves the escrow and refunds everything.
        db.adjust_balance(&escrow.from, escrow.freezone_balance)?;
        db.adjust_balance(&escrow.from, escrow.fzd_balance)?;
        db.adjust_balance(&escrow.from, escrow.pending_fee)?;
        db.state.escrows.remove(id)?;
        return Ok(());
    }

    let already = if op.who == escrow.to { escrow.to_approved } else { escrow.agent_approved };
    if already {
        return Err(Error::precondition("party has already approved"));
    }
    let who_is_to = op.who == escrow.to;
    db.state.escrows.modify(id, |e| {
        if who_is_to {
            e.to_approved = true;
        } else {
            e.agent_approved = true;
        }
    })?;

    // Full ratification releases the fee to the agent.
    let escrow = db.state().escrows.get(id)?.clone();
    if escrow.is_approved() && escrow.pending_fee.amount > 0 {
        db.adjust_balance(&escrow.agent, escrow.pending_fee)?;
        db.state.escrows.modify(id, |e| e.pending_fee.amount = 0)?;
    }
    Ok(())
}

pub(super) fn escrow_dispute(db: &mut Database, op: &EscrowDisputeOperation) -> Result<()> {
    let id = get_escrow_id(db, &op.from, op.escrow_id)?;
    let escrow = db.state().escrows.get(id)?.clone();
    if !escrow.is_approved() {
        return Err(Error::precondition("escrow is not fully ratified"));
    }
    if db.head_block_time() >= escrow.escrow_expiration {
        return Err(Error::precondition("the escrow has expired"));
    }
    if escrow.disputed {
        return Err(Error::precondition("escrow is already disputed"));
    }
    db.state.escrows.modify(id, |e| e.disputed = true)?;
    Ok(())
}

pub(super) fn escrow_release(db: &mut Database, op: &EscrowReleaseOperation) -> Result<()> {
    let id = get_escrow_id(db, &op.from, op.escrow_id)?;
    let escrow = db.state().escrows.get(id)?.clone();
    if !escrow.is_approved() {
        return Err(Error::precondition("escrow is not fully ratified"));
    }
    let now = db.head_block_time();

    // Who may release to whom depends on dispute state and expiration.
    if escrow.disputed {
        if op.who != escrow.agent {
            return Err(Error::precondition("only the agent may release a disputed escrow"));
        }
    } else if now < escrow.escrow_expiration {
        if op.who == escrow.from {
            if op.receiver != escrow.to {
                return Err(Error::precondition("sender may only release to the receiver"));
            }
        } else if op.who == escrow.to {
            if op.receiver != escrow.from {
                return Err(Error::precondition("receiver may only release back to the sender"));
            }
        } else {
            return Err(Error::precondition("only from or to may release before expiration"));
        }
    } else if op.who != escrow.from && op.who != escrow.to {
        return Err(Error::precondition("only from or to may release after expiration"));
    }

    if op.freezone_amount.amount > escrow.freezone_balance.amount
        || op.fzd_amount.amount > escrow.fzd_balance.amount
    {
        return Err(Error::precondition("release exceeds the escrowed balance"));
    }

    db.adjust_balance(&op.receiver, op.freezone_amount)?;
    db.adjust_balance(&op.receiver, op.fzd_amount)?;
    db.state.escrows.modify(id, |e| {
        e.freezone_balance -= op.freezone_amount;
        e.fzd_balance -= op.fzd_amount;
    })?;

    let escrow = db.state().escrows.get(id)?;
    if escrow.freezone_balance.amount == 0
        && escrow.fzd_balance.amount == 0
        && escrow.pending_fee.amount == 0
    {
        db.state.escrows.remove(id)?;
    }
    Ok(())
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{WitnessKey, WitnessObject, WitnessVoteKey, WitnessVoteObject};
use freezone_message::ops::*;
use freezone_types::config::{MAX_PROXY_RECURSION_DEPTH, MAX_WITNESSES_VOTED_FOR};
use freezone_types::FZD_SYMBOL;

pub(super) fn witness_update(db: &mut Database, op: &WitnessUpdateOperation) -> Result<()> {
    db.state().get_account(&op.owner)?;
    let now = db.head_block_time();
    match db.state().witnesses.id_by_key(&WitnessKey::ByName(op.owner.clone())) {
        Some(id) => {
            let (url, key, props) = (op.url.clone(), op.block_signing_key, op.props.clone());
            db.state.witnesses.modify(id, |w| {
                w.url = url;
                w.signing_key = key;
                w.props = props;
            })?;
        }
        None => {
            let (owner, url, key, props) =
                (op.owner.clone(), op.url.clone(), op.block_signing_key, op.props.clone());
            db.state.witnesses.create(|w: &mut WitnessObject| {
                w.owner = owner;
                w.created = now;
                w.url = url;
                w.signing_key = key;
                w.props = props;
            });
        }
    }
    Ok(())
}

pub(super) fn witness_set_properties(
    db: &mut Database,
    op: &WitnessSetPropertiesOperation,
) -> Result<()> {
    let witness = db.state().get_witness(&op.owner)?;
    if witness.signing_key != op.current_signing_key {
        return Err(Error::precondition("signing key does not match the witness"));
    }
    let id = db
        .state()
        .witnesses
        .id_by_key(&WitnessKey::ByName(op.owner.clone()))
        .expect("witness exists");
    let (props, new_key, new_url) = (op.props.clone(), op.new_signing_key, op.new_url.clone());
    db.state.witnesses.modify(id, |w| {
        w.props = props;
        if let Some(key) = new_key {
            w.signing_key = key;
        }
        if let Some(url) = new_url {
            w.url = url;
        }
    })?;
    Ok(())
}

pub(super) fn account_witness_vote(
    db: &mut Database,
    op: &AccountWitnessVoteOperation,
) -> Result<()> {
    let account = db.state().get_account(&op.account)?.clone();
    if !account.can_vote {
        return Err(Error::precondition("account has declined its voting rights"));
    }
    if account.has_proxy() {
        return Err(Error::precondition("cannot vote for witnesses while a proxy is set"));
    }
    db.state().get_witness(&op.witness)?;

    let key = WitnessVoteKey::ByAccountWitness(op.account.clone(), op.witness.clone());
    let existing = db.state().witness_votes.id_by_key(&key);
    let weight = account.witness_vote_weight();

    if op.approve {
        if existing.is_some() {
            return Err(Error::precondition("already voting for this witness"));
        }
        if account.witnesses_voted_for >= MAX_WITNESSES_VOTED_FOR {
            return Err(Error::precondition("voted for too many witnesses"));
        }
        let (voter, witness) = (op.account.clone(), op.witness.clone());
        db.state.witness_votes.create(|v: &mut WitnessVoteObject| {
            v.account = voter;
            v.witness = witness;
        });
        let id = db.state.account_id(&op.account)?;
        db.state.accounts.modify(id, |a| a.witnesses_voted_for += 1)?;
        db.adjust_witness_vote(&op.witness, weight)?;
    } else {
        let vote_id =
            existing.ok_or_else(|| Error::precondition("not voting for this witness"))?;
        db.state.witness_votes.remove(vote_id)?;
        let id = db.state.account_id(&op.account)?;
        db.state.accounts.modify(id, |a| a.witnesses_voted_for -= 1)?;
        db.adjust_witness_vote(&op.witness, -weight)?;
    }
    Ok(())
}

pub(super) fn account_witness_proxy(
    db: &mut Database,
    op: &AccountWitnessProxyOperation,
) -> Result<()> {
    let account = db.state().get_account(&op.account)?.clone();
    if !account.can_vote {
        return Err(Error::precondition("account has declined its voting rights"));
    }
    if account.proxy == op.proxy {
        return Err(Error::precondition("proxy is unchanged"));
    }

    if !op.proxy.is_empty() {
        db.state().get_account(&op.proxy)?;
        // The new chain must not loop back to this account.
        let mut cursor = op.proxy.clone();
        for _ in 0..MAX_PROXY_RECURSION_DEPTH {
            if cursor == op.account {
                return Err(Error::precondition("proxy chain would form a cycle"));
            }
            match db.state().find_account(&cursor) {
                Some(next) if next.has_proxy() => cursor = next.proxy.clone(),
                _ => break,
            }
        }
    }

    let weight = account.witness_vote_weight();
    // Remove the current influence, switch the proxy, then re-apply.
    if account.has_proxy() {
        db.adjust_proxied_witness_votes(&op.account, -weight)?;
    } else {
        db.adjust_witness_votes(&op.account, -weight)?;
    }

    let id = db.state.account_id(&op.account)?;
    let new_proxy = op.proxy.clone();
    db.state.accounts.modify(id, |a| a.proxy = new_proxy)?;
    if !op.proxy.is_empty() {
        // Own witness approvals are void while proxied.
        db.clear_witness_votes(&op.account)?;
    }

    let account = db.state().get_account(&op.account)?.clone();
    if account.has_proxy() {
        db.adjust_proxied_witness_votes(&op.account, weight)?;
    } else {
        db.adjust_witness_votes(&op.account, weight)?;
    }
    Ok(())
}

pub(super) fn feed_publish(db: &mut Database, op: &FeedPublishOperation) -> Result<()> {
    db.state().get_witness(&op.publisher)?;
    // Feeds are stored dollar-based regardless of published orientation.
    let rate = if op.exchange_rate.base.symbol == FZD_SYMBOL {
        op.exchange_rate
    } else {
        op.exchange_rate.invert()
    };
    let id = db
        .state()
        .witnesses
        .id_by_key(&WitnessKey::ByName(op.publisher.clone()))
        .expect("witness exists");
    let now = db.head_block_time();
    db.state.witnesses.modify(id, |w| {
        w.fzd_exchange_rate = rate;
        w.last_fzd_exchange_update = now;
    })?;
    Ok(())
}

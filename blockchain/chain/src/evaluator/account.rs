// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{
    AccountAuthorityKey, AccountAuthorityObject, AccountObject, AccountRecoveryRequestKey,
    AccountRecoveryRequestObject, ChangeRecoveryAccountRequestKey,
    ChangeRecoveryAccountRequestObject, DeclineVotingRightsRequestKey,
    DeclineVotingRightsRequestObject, OwnerAuthorityHistoryKey,
};
use freezone_db::Id;
use freezone_message::ops::*;
use freezone_types::config::PERCENT_100;
use freezone_types::{AccountName, Authority};

/// Cost of one claimed account in subsidy units.
const ACCOUNT_SUBSIDY_UNIT: i64 = PERCENT_100 as i64;

fn check_member_accounts_exist(db: &Database, auth: &Authority) -> Result<()> {
    for name in auth.account_auths.keys() {
        if db.state().find_account(name).is_none() {
            return Err(Error::precondition(format!(
                "authority member account {name} does not exist"
            )));
        }
    }
    Ok(())
}

fn create_account_with_authorities(
    db: &mut Database,
    creator: &AccountName,
    name: &AccountName,
    owner: &Authority,
    active: &Authority,
    posting: &Authority,
    memo_key: freezone_types::PublicKey,
) -> Result<()> {
    if db.state().find_account(name).is_some() {
        return Err(Error::precondition(format!("account {name} already exists")));
    }
    check_member_accounts_exist(db, owner)?;
    check_member_accounts_exist(db, active)?;
    check_member_accounts_exist(db, posting)?;

    let now = db.head_block_time();
    let account_name = name.clone();
    let recovery = creator.clone();
    db.state.accounts.create(|a: &mut AccountObject| {
        a.name = account_name;
        a.memo_key = memo_key;
        a.created = now;
        a.recovery_account = recovery;
    });
    let account_name = name.clone();
    let (owner, active, posting) = (owner.clone(), active.clone(), posting.clone());
    db.state.account_authorities.create(|auth: &mut AccountAuthorityObject| {
        auth.account = account_name;
        auth.owner = owner;
        auth.active = active;
        auth.posting = posting;
        auth.last_owner_update = now;
    });
    Ok(())
}

pub(super) fn account_create(db: &mut Database, op: &AccountCreateOperation) -> Result<()> {
    let required_fee = db.state().wso().median_props.account_creation_fee;
    if op.fee.amount < required_fee.amount {
        return Err(Error::precondition(format!(
            "insufficient fee: {} required",
            required_fee
        )));
    }
    db.adjust_balance(&op.creator, -op.fee)?;
    create_account_with_authorities(
        db,
        &op.creator,
        &op.new_account_name,
        &op.owner,
        &op.active,
        &op.posting,
        op.memo_key,
    )?;
    // The creation fee seeds the new account's vesting.
    if op.fee.amount > 0 {
        db.create_vesting(&op.new_account_name, op.fee, false)?;
    }
    Ok(())
}

pub(super) fn account_update(db: &mut Database, op: &AccountUpdateOperation) -> Result<()> {
    db.state().get_account(&op.account)?;
    if let Some(owner) = &op.owner {
        let limit = db.config().owner_update_limit_secs;
        let auth = db.state().get_account_authority(&op.account)?;
        if db.head_block_time() < auth.last_owner_update.saturating_add(limit) {
            return Err(Error::precondition("owner authority updated too recently"));
        }
        check_member_accounts_exist(db, owner)?;
        db.update_owner_authority(&op.account, owner.clone())?;
    }
    if let Some(active) = &op.active {
        check_member_accounts_exist(db, active)?;
    }
    if let Some(posting) = &op.posting {
        check_member_accounts_exist(db, posting)?;
    }
    let auth_id = db
        .state()
        .account_authorities
        .id_by_key(&AccountAuthorityKey::ByAccount(op.account.clone()))
        .ok_or_else(|| Error::precondition("account authority missing"))?;
    let (active, posting) = (op.active.clone(), op.posting.clone());
    db.state.account_authorities.modify(auth_id, |auth| {
        if let Some(active) = active {
            auth.active = active;
        }
        if let Some(posting) = posting {
            auth.posting = posting;
        }
    })?;
    if let Some(memo_key) = op.memo_key {
        let id = db.state.account_id(&op.account)?;
        db.state.accounts.modify(id, |a| a.memo_key = memo_key)?;
    }
    Ok(())
}

pub(super) fn claim_account(db: &mut Database, op: &ClaimAccountOperation) -> Result<()> {
    let creator_id = db.state.account_id(&op.creator)?;
    let median_fee = db.state().wso().median_props.account_creation_fee;

    if op.fee.amount == 0 {
        // Free claims spend the global and per-witness subsidy pools.
        let available = db.state().gpo().available_account_subsidies;
        if available < ACCOUNT_SUBSIDY_UNIT {
            return Err(Error::precondition("no account subsidies available"));
        }
        db.state.modify_gpo(|gpo| {
            gpo.available_account_subsidies -= ACCOUNT_SUBSIDY_UNIT;
        });
        let current_witness = db.state().gpo().current_witness.clone();
        if let Some(witness) = db.state().find_witness(&current_witness) {
            if witness.available_witness_account_subsidies >= ACCOUNT_SUBSIDY_UNIT {
                let id = db
                    .state()
                    .witnesses
                    .id_by_key(&crate::state::WitnessKey::ByName(current_witness))
                    .expect("current witness exists");
                db.state.witnesses.modify(id, |w| {
                    w.available_witness_account_subsidies -= ACCOUNT_SUBSIDY_UNIT;
                })?;
            }
        }
    } else {
        if op.fee != median_fee {
            return Err(Error::precondition(format!(
                "claim fee must equal the creation fee of {median_fee}"
            )));
        }
        db.adjust_balance(&op.creator, -op.fee)?;
        db.adjust_balance(&AccountName::unchecked(freezone_types::config::NULL_ACCOUNT), op.fee)?;
    }
    db.state.accounts.modify(creator_id, |a| a.pending_claimed_accounts += 1)?;
    Ok(())
}

pub(super) fn create_claimed_account(
    db: &mut Database,
    op: &CreateClaimedAccountOperation,
) -> Result<()> {
    let creator = db.state().get_account(&op.creator)?;
    if creator.pending_claimed_accounts <= 0 {
        return Err(Error::precondition("no claimed accounts banked"));
    }
    let creator_id = db.state.account_id(&op.creator)?;
    db.state.accounts.modify(creator_id, |a| a.pending_claimed_accounts -= 1)?;
    create_account_with_authorities(
        db,
        &op.creator,
        &op.new_account_name,
        &op.owner,
        &op.active,
        &op.posting,
        op.memo_key,
    )
}

pub(super) fn request_account_recovery(
    db: &mut Database,
    op: &RequestAccountRecoveryOperation,
) -> Result<()> {
    let account = db.state().get_account(&op.account_to_recover)?;
    if account.recovery_account != op.recovery_account {
        return Err(Error::precondition(
            "only the listed recovery partner may request a recovery",
        ));
    }
    check_member_accounts_exist(db, &op.new_owner_authority)?;

    let key = AccountRecoveryRequestKey::ByAccount(op.account_to_recover.clone());
    let existing = db.state().recovery_requests.id_by_key(&key);
    if op.new_owner_authority.is_impossible() {
        // An unsatisfiable authority cancels the open request.
        if let Some(id) = existing {
            db.state.recovery_requests.remove(id)?;
        }
        return Ok(());
    }
    let expires = db
        .head_block_time()
        .saturating_add(db.config().account_recovery_request_expiration_secs);
    match existing {
        Some(id) => db.state.recovery_requests.modify(id, |r| {
            r.new_owner_authority = op.new_owner_authority.clone();
            r.expires = expires;
        })?,
        None => {
            let account = op.account_to_recover.clone();
            let authority = op.new_owner_authority.clone();
            db.state.recovery_requests.create(|r: &mut AccountRecoveryRequestObject| {
                r.account_to_recover = account;
                r.new_owner_authority = authority;
                r.expires = expires;
            });
        }
    }
    Ok(())
}

pub(super) fn recover_account(db: &mut Database, op: &RecoverAccountOperation) -> Result<()> {
    let account = db.state().get_account(&op.account_to_recover)?;
    let now = db.head_block_time();
    if now < account.last_account_recovery.saturating_add(db.config().owner_update_limit_secs) {
        return Err(Error::precondition("account was recovered too recently"));
    }

    let key = AccountRecoveryRequestKey::ByAccount(op.account_to_recover.clone());
    let request_id = db
        .state()
        .recovery_requests
        .id_by_key(&key)
        .ok_or_else(|| Error::precondition("no open recovery request"))?;
    let request = db.state().recovery_requests.get(request_id)?;
    if request.new_owner_authority != op.new_owner_authority {
        return Err(Error::precondition("new owner authority does not match the request"));
    }

    // The recent authority must actually have been the account's owner
    // within the recovery window.
    let in_history = db
        .state()
        .owner_authority_histories
        .range(
            OwnerAuthorityHistoryKey::ByAccount(op.account_to_recover.clone(), 0)
                ..=OwnerAuthorityHistoryKey::ByAccount(op.account_to_recover.clone(), Id::MAX),
        )
        .any(|(_, hist)| hist.previous_owner_authority == op.recent_owner_authority);
    if !in_history {
        return Err(Error::precondition("recent owner authority not found in history"));
    }

    db.state.recovery_requests.remove(request_id)?;
    db.update_owner_authority(&op.account_to_recover, op.new_owner_authority.clone())?;
    let id = db.state.account_id(&op.account_to_recover)?;
    db.state.accounts.modify(id, |a| a.last_account_recovery = now)?;
    Ok(())
}

pub(super) fn change_recovery_account(
    db: &mut Database,
    op: &ChangeRecoveryAccountOperation,
) -> Result<()> {
    db.state().get_account(&op.new_recovery_account)?;
    let account = db.state().get_account(&op.account_to_recover)?;
    let effective_on = db.head_block_time().saturating_add(db.config().owner_auth_recovery_secs);

    let key = ChangeRecoveryAccountRequestKey::ByAccount(op.account_to_recover.clone());
    let existing = db.state().change_recovery_requests.id_by_key(&key);
    if account.recovery_account == op.new_recovery_account {
        // Changing back to the current partner cancels any pending change.
        if let Some(id) = existing {
            db.state.change_recovery_requests.remove(id)?;
        }
        return Ok(());
    }
    match existing {
        Some(id) => db.state.change_recovery_requests.modify(id, |r| {
            r.recovery_account = op.new_recovery_account.clone();
            r.effective_on = effective_on;
        })?,
        None => {
            let account = op.account_to_recover.clone();
            let recovery = op.new_recovery_account.clone();
            db.state
                .change_recovery_requests
                .create(|r: &mut ChangeRecoveryAccountRequestObject| {
                    r.account_to_recover = account;
                    r.recovery_account = recovery;
                    r.effective_on = effective_on;
                });
        }
    }
    Ok(())
}

pub(super) fn decline_voting_rights(
    db: &mut Database,
    op: &DeclineVotingRightsOperation,
) -> Result<()> {
    let account = db.state().get_account(&op.account)?;
    if !account.can_vote {
        return Err(Error::precondition("voting rights already declined"));
    }
    let key = DeclineVotingRightsRequestKey::ByAccount(op.account.clone());
    let existing = db.state().decline_voting_requests.id_by_key(&key);
    if op.decline {
        if existing.is_some() {
            return Err(Error::precondition("decline request already open"));
        }
        let effective_date =
            db.head_block_time().saturating_add(db.config().owner_auth_recovery_secs);
        let account = op.account.clone();
        db.state.decline_voting_requests.create(|r: &mut DeclineVotingRightsRequestObject| {
            r.account = account;
            r.effective_date = effective_date;
        });
    } else {
        let id = existing.ok_or_else(|| Error::precondition("no decline request to cancel"))?;
        db.state.decline_voting_requests.remove(id)?;
    }
    Ok(())
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! One-shot schema initialization. Runs outside any undo session; nothing
//! here is reversible.

use crate::database::Database;
use crate::errors::Result;
use crate::state::{
    AccountAuthorityObject, AccountObject, BlockSummaryObject, FeedHistory, GlobalProperties,
    HardforkProperty, NaiPool, WitnessObject, WitnessSchedule,
};
use freezone_types::config::{
    BLOCK_SUMMARY_RING_SIZE, INIT_WITNESS_NAME, NULL_ACCOUNT, TEMP_ACCOUNT,
};
use freezone_types::{
    AccountName, Asset, Authority, PrivateKey, PublicKey, TimePointSec, FREEZONE_SYMBOL,
    FZD_SYMBOL,
};

/// Signing key of the genesis witness when the operator supplies none.
pub fn default_init_witness_key() -> PublicKey {
    PrivateKey::from_seed(INIT_WITNESS_NAME).public_key()
}

pub(crate) fn create_system_account(
    db: &mut Database,
    name: &AccountName,
    authority: Authority,
    created: TimePointSec,
) {
    let account_name = name.clone();
    db.state.accounts.create(|a: &mut AccountObject| {
        a.name = account_name;
        a.created = created;
        a.memo_key = match authority.key_auths.keys().next() {
            Some(key) => *key,
            None => PublicKey::nil(),
        };
    });
    let account_name = name.clone();
    db.state.account_authorities.create(|auth: &mut AccountAuthorityObject| {
        auth.account = account_name;
        auth.owner = authority.clone();
        auth.active = authority.clone();
        auth.posting = authority;
    });
}

/// Builds the genesis state: system accounts, the initial witness, the
/// singletons and the block-summary ring.
pub(crate) fn init_genesis(
    db: &mut Database,
    initial_supply: i64,
    fzd_initial_supply: i64,
) -> Result<()> {
    if !db.state.globals.is_empty() {
        return Ok(());
    }
    let genesis_time = db.config().genesis_time;
    let init_witness = AccountName::unchecked(INIT_WITNESS_NAME);
    let init_key = db.init_witness_key;

    create_system_account(db, &AccountName::unchecked(NULL_ACCOUNT), Authority::impossible(), genesis_time);
    create_system_account(db, &AccountName::unchecked(TEMP_ACCOUNT), Authority::impossible(), genesis_time);
    create_system_account(db, &init_witness, Authority::single_key(init_key), genesis_time);

    let witness = init_witness.clone();
    db.state.witnesses.create(|w: &mut WitnessObject| {
        w.owner = witness;
        w.created = genesis_time;
        w.signing_key = init_key;
        w.virtual_scheduled_time = 0;
    });

    // The genesis witness holds the initial supply.
    let init_id = db.state.account_id(&init_witness)?;
    db.state.accounts.modify(init_id, |a| {
        a.balance = Asset::new(initial_supply, FREEZONE_SYMBOL);
        a.fzd_balance = Asset::new(fzd_initial_supply, FZD_SYMBOL);
    })?;

    let current_witness = init_witness.clone();
    db.state.globals.create(|gpo: &mut GlobalProperties| {
        gpo.current_witness = current_witness;
        gpo.time = genesis_time;
        gpo.current_supply = Asset::new(initial_supply, FREEZONE_SYMBOL);
        gpo.virtual_supply = Asset::new(initial_supply, FREEZONE_SYMBOL);
        gpo.current_fzd_supply = Asset::new(fzd_initial_supply, FZD_SYMBOL);
        gpo.init_fzd_supply = Asset::new(fzd_initial_supply, FZD_SYMBOL);
    });

    let scheduled = init_witness.clone();
    db.state.witness_schedules.create(|wso: &mut WitnessSchedule| {
        wso.current_shuffled_witnesses = vec![scheduled];
        wso.num_scheduled_witnesses = 1;
    });

    db.state.hardfork_properties.create(|hf: &mut HardforkProperty| {
        hf.processed_hardforks.push(genesis_time);
        hf.next_hardfork_time = TimePointSec::MAX;
    });
    db.state.feed_histories.create(|_: &mut FeedHistory| {});
    db.state.nai_pools.create(|_: &mut NaiPool| {});

    for _ in 0..BLOCK_SUMMARY_RING_SIZE {
        db.state.block_summaries.create(|_: &mut BlockSummaryObject| {});
    }

    db.state.set_revision(0);
    Ok(())
}

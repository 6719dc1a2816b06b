// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Hardfork gating. Forks are a strictly ordered sequence of version bumps;
//! early forks activate on wall-clock alone, later ones additionally demand
//! a witness supermajority vote. Activation is monotonic and may run a
//! one-time state migration.

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{RewardFundKey, RewardFundObject};
use freezone_blocks::MerkleRoot;
use freezone_message::VirtualOperation;
use freezone_types::config::{SST_MAX_NAI_POOL_COUNT, TREASURY_ACCOUNT};
use freezone_types::{
    AccountName, Asset, AssetSymbol, Authority, ChainId, ProtocolVersion, TimePointSec,
    FREEZONE_SYMBOL,
};

/// Number of defined hardforks; index 0 is genesis.
pub const NUM_HARDFORKS: u32 = 24;

/// Forks at or after this index need a witness supermajority in addition to
/// their activation time.
pub const SUPERMAJORITY_GATING_HARDFORK: u32 = 5;

/// Fork that created the named reward funds.
pub const REWARD_FUND_HARDFORK: u32 = 17;
/// Fork that disabled the liquidity-provider reward.
pub const LIQUIDITY_REWARD_DISABLE_HARDFORK: u32 = 12;
/// Fork that created the treasury.
pub const TREASURY_HARDFORK: u32 = 21;
/// Fork enabling user tokens and automated actions.
pub const SST_HARDFORK: u32 = 24;
/// Fork that split vesting shares a million-to-one.
pub const VESTING_SPLIT_HARDFORK: u32 = 1;
const VESTING_SPLIT_MAGNITUDE: i64 = 1_000_000;

/// The production chain id; chain-id-bound compensations only apply here.
pub const MAINNET_CHAIN_ID: ChainId = [0u8; 32];

pub fn hardfork_version(index: u32) -> ProtocolVersion {
    ProtocolVersion::new(0, index as u16, 0)
}

/// Activation times. Every defined fork activates at genesis so fresh
/// chains start fully forked; replaying another chain's history supplies
/// its own table through the chain id.
pub fn hardfork_time(db: &Database, index: u32) -> TimePointSec {
    let _ = index;
    db.config().genesis_time
}

pub fn has_hardfork(db: &Database, index: u32) -> bool {
    db.state().hardforks().last_hardfork >= index
}

pub fn has_sst_hardfork(db: &Database) -> bool {
    has_hardfork(db, SST_HARDFORK)
}

/// Merkle mismatches tolerated on the production chain: blocks that shipped
/// with bad roots before the check hardened.
pub fn is_known_bad_merkle(chain_id: &ChainId, block_num: u32, _computed: &MerkleRoot) -> bool {
    if *chain_id != MAINNET_CHAIN_ID {
        return false;
    }
    const KNOWN_BAD_BLOCKS: [u32; 2] = [2_726_331, 2_851_142];
    KNOWN_BAD_BLOCKS.contains(&block_num)
}

/// Block one of a fresh chain applies every hardfork whose activation time
/// has already passed, so test networks launch with history pre-forked.
pub fn apply_genesis_hardforks(db: &mut Database, block_time: TimePointSec) -> Result<()> {
    let mut n = 0;
    while n < NUM_HARDFORKS && hardfork_time(db, n + 1) <= block_time {
        n += 1;
    }
    if n == 0 {
        return Ok(());
    }
    log::info!("processing {n} genesis hardforks");
    for index in 1..=n {
        apply_hardfork(db, index)?;
    }

    let version = hardfork_version(n);
    let time = hardfork_time(db, n);
    let witness_ids: Vec<freezone_db::Id> =
        db.state().witnesses.iter().map(|(id, _)| id).collect();
    for id in witness_ids {
        db.state.witnesses.modify(id, |w| {
            w.running_version = version;
            w.hardfork_version_vote = version;
            w.hardfork_time_vote = time;
        })?;
    }
    Ok(())
}

impl Database {
    /// Applies any hardfork whose activation condition now holds.
    pub(crate) fn process_hardforks(&mut self) -> Result<()> {
        loop {
            let hf_state = self.state.hardforks();
            let next = hf_state.last_hardfork + 1;
            if next > NUM_HARDFORKS {
                if hf_state.last_hardfork > NUM_HARDFORKS {
                    return Err(Error::UnknownHardfork(hf_state.last_hardfork));
                }
                return Ok(());
            }
            let due = if next < SUPERMAJORITY_GATING_HARDFORK {
                hardfork_time(self, next) <= self.head_block_time()
            } else {
                hf_state.next_hardfork >= hardfork_version(next)
                    && hf_state.next_hardfork_time <= self.head_block_time()
                    && hardfork_time(self, next) <= self.head_block_time()
            };
            if !due {
                return Ok(());
            }
            apply_hardfork(self, next)?;
        }
    }
}

pub(crate) fn apply_hardfork(db: &mut Database, index: u32) -> Result<()> {
    if index > NUM_HARDFORKS {
        return Err(Error::UnknownHardfork(index));
    }
    log::info!("applying hardfork {index}");
    db.push_virtual_operation(VirtualOperation::Hardfork {
        hardfork_id: index,
        version: hardfork_version(index),
    })?;

    match index {
        VESTING_SPLIT_HARDFORK => perform_vesting_share_split(db, VESTING_SPLIT_MAGNITUDE)?,
        REWARD_FUND_HARDFORK => create_post_reward_fund(db)?,
        TREASURY_HARDFORK => create_treasury_account(db)?,
        SST_HARDFORK => replenish_nai_pool(db)?,
        _ => {}
    }

    apply_compensations(db)?;

    let time = hardfork_time(db, index);
    db.state.modify_hardforks(|hf| {
        hf.processed_hardforks.push(time);
        hf.last_hardfork = index;
        hf.current_hardfork_version = hardfork_version(index);
        if hf.next_hardfork < hf.current_hardfork_version {
            hf.next_hardfork = hf.current_hardfork_version;
        }
    });
    Ok(())
}

/// Multiplies all vesting positions by the split magnitude.
fn perform_vesting_share_split(db: &mut Database, magnitude: i64) -> Result<()> {
    let account_ids: Vec<freezone_db::Id> = db.state.accounts.iter().map(|(id, _)| id).collect();
    for id in account_ids {
        db.state.accounts.modify(id, |a| {
            a.vesting_shares.amount *= magnitude;
            a.withdrawn *= magnitude;
            a.to_withdraw *= magnitude;
            a.vesting_withdraw_rate.amount *= magnitude;
        })?;
    }
    db.state.modify_gpo(|gpo| gpo.total_vesting_shares.amount *= magnitude);
    Ok(())
}

fn create_post_reward_fund(db: &mut Database) -> Result<()> {
    if db
        .state
        .reward_funds
        .find_by_key(&RewardFundKey::ByName("post".to_string()))
        .is_some()
    {
        return Ok(());
    }
    let now = db.head_block_time();
    db.state.reward_funds.create(|fund: &mut RewardFundObject| {
        fund.name = "post".to_string();
        fund.reward_balance = Asset::new(0, FREEZONE_SYMBOL);
        fund.last_update = now;
    });
    Ok(())
}

fn create_treasury_account(db: &mut Database) -> Result<()> {
    let treasury = AccountName::unchecked(TREASURY_ACCOUNT);
    if db.state().find_account(&treasury).is_some() {
        return Ok(());
    }
    let now = db.head_block_time();
    crate::genesis::create_system_account(db, &treasury, Authority::impossible(), now);
    Ok(())
}

/// Tops the NAI pool back up to its bound with deterministically generated
/// identifiers not yet in use.
pub(crate) fn replenish_nai_pool(db: &mut Database) -> Result<()> {
    use freezone_types::asset::{NAI_DATA_MAX, NAI_DATA_MIN};
    use freezone_types::crypto::sha256;

    let mut pool = db.state.nai_pool().nais.clone();
    let mut counter: u64 = 0;
    let head_id = db.head_block_id();
    while pool.len() < SST_MAX_NAI_POOL_COUNT {
        let mut seed = head_id.0.to_vec();
        seed.extend_from_slice(&counter.to_le_bytes());
        counter += 1;
        let digest = sha256(&seed);
        let raw = u32::from_le_bytes(digest[..4].try_into().unwrap());
        let nai = NAI_DATA_MIN + raw % (NAI_DATA_MAX - NAI_DATA_MIN + 1);
        let candidate = match AssetSymbol::from_nai(nai, 3) {
            Ok(sym) => sym,
            Err(_) => continue,
        };
        if pool.iter().any(|s| s.to_nai() == nai) {
            continue;
        }
        if db.state().find_sst_token(candidate).is_some() {
            continue;
        }
        pool.push(candidate);
    }
    db.state.modify_nai_pool(|p| p.nais = pool);
    Ok(())
}

/// One-off state compensations bound to a specific chain id; never
/// generalized.
fn apply_compensations(db: &mut Database) -> Result<()> {
    if db.chain_id() != MAINNET_CHAIN_ID {
        return Ok(());
    }
    let broken = AccountName::unchecked("barbara2");
    if let Some(account) = db.state().find_account(&broken) {
        if account.to_withdraw < 0 {
            let id = db.state.account_id(&broken)?;
            db.state.accounts.modify(id, |a| {
                a.to_withdraw = 0;
                a.withdrawn = 0;
                a.vesting_withdraw_rate.amount = 0;
                a.next_vesting_withdrawal = TimePointSec::MAX;
            })?;
        }
    }
    Ok(())
}

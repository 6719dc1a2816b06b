// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Witness vote accounting and the round-boundary schedule update:
//! reshuffle, median property computation, virtual-time lap scheduling and
//! the majority hardfork-version scan.

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{
    WitnessKey, WitnessSchedulePlacement, WitnessVoteKey,
};
use freezone_types::config::{MAX_PROXY_RECURSION_DEPTH, VIRTUAL_SCHEDULE_LAP_LENGTH};
use freezone_types::crypto::sha256;
use freezone_types::{AccountName, TimePointSec};

impl Database {
    /// Propagates a stake delta up the proxy chain, applying it to witness
    /// votes at the end of the chain.
    pub(crate) fn adjust_proxied_witness_votes(
        &mut self,
        name: &AccountName,
        delta: i64,
    ) -> Result<()> {
        self.adjust_proxied_witness_votes_depth(name, delta, 0)
    }

    fn adjust_proxied_witness_votes_depth(
        &mut self,
        name: &AccountName,
        delta: i64,
        depth: usize,
    ) -> Result<()> {
        let account = self.state.get_account(name)?;
        if account.has_proxy() {
            // Nested proxies beyond the cap do not propagate.
            if depth >= MAX_PROXY_RECURSION_DEPTH {
                return Ok(());
            }
            let proxy = account.proxy.clone();
            let proxy_id = self.state.account_id(&proxy)?;
            self.state.accounts.modify(proxy_id, |a| {
                a.proxied_vsf_votes[depth] += delta;
            })?;
            self.adjust_proxied_witness_votes_depth(&proxy, delta, depth + 1)
        } else {
            let name = name.clone();
            self.adjust_witness_votes(&name, delta)
        }
    }

    /// Applies a delta to every witness this account approves.
    pub(crate) fn adjust_witness_votes(&mut self, name: &AccountName, delta: i64) -> Result<()> {
        let upper = AccountName::unchecked(&format!("{name}\u{7f}"));
        let witnesses: Vec<AccountName> = self
            .state
            .witness_votes
            .range(
                WitnessVoteKey::ByAccountWitness(name.clone(), AccountName::default())
                    ..WitnessVoteKey::ByAccountWitness(upper, AccountName::default()),
            )
            .map(|(_, vote)| vote.witness.clone())
            .collect();
        for witness in witnesses {
            self.adjust_witness_vote(&witness, delta)?;
        }
        Ok(())
    }

    /// Applies a vote delta to one witness and reprojects its virtual
    /// scheduled time.
    pub(crate) fn adjust_witness_vote(&mut self, witness: &AccountName, delta: i64) -> Result<()> {
        let total_vesting = self.state.gpo().total_vesting_shares.amount;
        let current_virtual_time = self.state.wso().current_virtual_time;
        let id = self
            .state
            .witnesses
            .id_by_key(&WitnessKey::ByName(witness.clone()))
            .ok_or_else(|| Error::precondition(format!("unknown witness {witness}")))?;
        let mut overflow = false;
        self.state.witnesses.modify(id, |w| {
            let delta_pos = (w.votes as u128)
                .saturating_mul(current_virtual_time.wrapping_sub(w.virtual_last_update));
            w.virtual_position = w.virtual_position.saturating_add(delta_pos);
            w.virtual_last_update = current_virtual_time;
            w.votes += delta;
            overflow = w.votes > total_vesting;

            w.virtual_scheduled_time = current_virtual_time.saturating_add(
                VIRTUAL_SCHEDULE_LAP_LENGTH.saturating_sub(w.virtual_position)
                    / (w.votes.max(0) as u128 + 1),
            );
            if w.virtual_scheduled_time < current_virtual_time {
                w.virtual_scheduled_time = u128::MAX;
            }
        })?;
        if overflow {
            return Err(Error::fatal("witness votes exceed total vesting shares"));
        }
        Ok(())
    }

    /// Drops every witness approval an account holds.
    pub(crate) fn clear_witness_votes(&mut self, name: &AccountName) -> Result<()> {
        let ids = self.state.witness_votes.ids_in_range(
            WitnessVoteKey::ByAccountWitness(name.clone(), AccountName::default())
                ..WitnessVoteKey::ByAccountWitness(
                    AccountName::unchecked(&format!("{name}\u{7f}")),
                    AccountName::default(),
                ),
        );
        for id in ids {
            self.state.witness_votes.remove(id)?;
        }
        let account_id = self.state.account_id(name)?;
        self.state.accounts.modify(account_id, |a| a.witnesses_voted_for = 0)?;
        Ok(())
    }

    /// Runs at every round boundary: picks the top-voted witnesses plus the
    /// virtual-time winner, shuffles them deterministically, recomputes
    /// median parameters and advances virtual time.
    pub(crate) fn update_witness_schedule(&mut self) -> Result<()> {
        let head = self.head_block_num();
        let wso = self.state.wso();
        if head != wso.next_shuffle_block_num {
            return Ok(());
        }
        let max_voted = wso.max_voted_witnesses as usize;
        let max_runner = wso.max_runner_witnesses as usize;
        let current_virtual_time = wso.current_virtual_time;

        // Top of the stake-weighted vote, skipping witnesses that stopped
        // signing.
        let mut elected: Vec<AccountName> = Vec::new();
        for (_, witness) in self.state.witnesses.range(
            WitnessKey::ByVote(i64::MIN, AccountName::default())..WitnessKey::BySchedule(0, 0),
        ) {
            if elected.len() >= max_voted {
                break;
            }
            if witness.signing_key.is_nil() {
                continue;
            }
            elected.push(witness.owner.clone());
        }

        // Timeshare slots go to the earliest virtual scheduled times among
        // the rest.
        let mut new_virtual_time = current_virtual_time;
        let mut timeshare: Vec<AccountName> = Vec::new();
        for (_, witness) in self.state.witnesses.range(WitnessKey::BySchedule(0, 0)..) {
            if timeshare.len() >= max_runner {
                break;
            }
            if witness.signing_key.is_nil() || elected.contains(&witness.owner) {
                continue;
            }
            new_virtual_time = witness.virtual_scheduled_time;
            timeshare.push(witness.owner.clone());
        }

        // Reset virtual scheduling for the winners and tag placements.
        for name in elected.iter().chain(timeshare.iter()) {
            let is_timeshare = timeshare.contains(name);
            let id = self
                .state
                .witnesses
                .id_by_key(&WitnessKey::ByName(name.clone()))
                .expect("scheduled witness exists");
            self.state.witnesses.modify(id, |w| {
                w.schedule = if is_timeshare {
                    WitnessSchedulePlacement::Timeshare
                } else {
                    WitnessSchedulePlacement::Elected
                };
                if is_timeshare {
                    w.virtual_position = 0;
                    w.virtual_last_update = new_virtual_time;
                    w.virtual_scheduled_time = new_virtual_time.saturating_add(
                        VIRTUAL_SCHEDULE_LAP_LENGTH / (w.votes.max(0) as u128 + 1),
                    );
                }
            })?;
        }

        let mut shuffled: Vec<AccountName> =
            elected.into_iter().chain(timeshare.into_iter()).collect();
        if shuffled.is_empty() {
            return Err(Error::fatal("no active witnesses to schedule"));
        }

        // Deterministic Fisher-Yates keyed by the head block id.
        let seed = sha256(&self.head_block_id().0);
        let mut rand_state = u64::from_le_bytes(seed[..8].try_into().unwrap());
        let mut next_rand = || {
            // xorshift64
            rand_state ^= rand_state << 13;
            rand_state ^= rand_state >> 7;
            rand_state ^= rand_state << 17;
            rand_state
        };
        let len = shuffled.len();
        for i in 0..len.saturating_sub(1) {
            let j = i + (next_rand() as usize) % (len - i);
            shuffled.swap(i, j);
        }

        let medians = self.compute_median_properties(&shuffled)?;
        let majority_version = self.compute_majority_version(&shuffled);

        self.state.modify_gpo(|gpo| {
            gpo.maximum_block_size = medians.maximum_block_size;
            gpo.fzd_interest_rate = medians.fzd_interest_rate;
        });

        let num = shuffled.len() as u8;
        self.state.modify_wso(|wso| {
            wso.current_virtual_time = new_virtual_time;
            wso.current_shuffled_witnesses = shuffled;
            wso.num_scheduled_witnesses = num;
            wso.median_props = medians.clone();
            wso.majority_version = majority_version;
            wso.account_subsidy_budget = medians.account_subsidy_budget;
            wso.account_subsidy_decay = medians.account_subsidy_decay;
            wso.next_shuffle_block_num = head + num as u32;
        });

        self.update_hardfork_votes()?;
        Ok(())
    }

    fn compute_median_properties(
        &self,
        scheduled: &[AccountName],
    ) -> Result<freezone_message::ops::ChainProperties> {
        let mut fees = Vec::with_capacity(scheduled.len());
        let mut sizes = Vec::with_capacity(scheduled.len());
        let mut rates = Vec::with_capacity(scheduled.len());
        let mut budgets = Vec::with_capacity(scheduled.len());
        let mut decays = Vec::with_capacity(scheduled.len());
        for name in scheduled {
            let witness = self.state.get_witness(name)?;
            fees.push(witness.props.account_creation_fee.amount);
            sizes.push(witness.props.maximum_block_size);
            rates.push(witness.props.fzd_interest_rate);
            budgets.push(witness.props.account_subsidy_budget);
            decays.push(witness.props.account_subsidy_decay);
        }
        fees.sort_unstable();
        sizes.sort_unstable();
        rates.sort_unstable();
        budgets.sort_unstable();
        decays.sort_unstable();
        let mid = scheduled.len() / 2;
        Ok(freezone_message::ops::ChainProperties {
            account_creation_fee: freezone_types::Asset::new(
                fees[mid],
                freezone_types::FREEZONE_SYMBOL,
            ),
            maximum_block_size: sizes[mid],
            fzd_interest_rate: rates[mid],
            account_subsidy_budget: budgets[mid],
            account_subsidy_decay: decays[mid],
        })
    }

    fn compute_majority_version(&self, scheduled: &[AccountName]) -> freezone_types::ProtocolVersion {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<freezone_types::ProtocolVersion, usize> = BTreeMap::new();
        for name in scheduled {
            if let Some(witness) = self.state.find_witness(name) {
                *counts.entry(witness.running_version.hardfork_version()).or_default() += 1;
            }
        }
        // Highest version run by a two-thirds majority, counting higher
        // versions toward lower ones.
        let required = scheduled.len() * 2 / 3 + 1;
        let mut accumulated = 0usize;
        for (version, count) in counts.iter().rev() {
            accumulated += count;
            if accumulated >= required {
                return *version;
            }
        }
        freezone_types::ProtocolVersion::default()
    }

    /// Scans scheduled witnesses' hardfork votes; when enough vote for the
    /// next fork at a consistent time, schedules it.
    fn update_hardfork_votes(&mut self) -> Result<()> {
        use std::collections::BTreeMap;
        let wso = self.state.wso();
        let required = wso.hardfork_required_witnesses as usize;
        let mut votes: BTreeMap<(freezone_types::ProtocolVersion, TimePointSec), usize> =
            BTreeMap::new();
        for name in &wso.current_shuffled_witnesses {
            if let Some(witness) = self.state.find_witness(name) {
                *votes
                    .entry((witness.hardfork_version_vote, witness.hardfork_time_vote))
                    .or_default() += 1;
            }
        }
        let hf_state = self.state.hardforks();
        let mut next = hf_state.next_hardfork;
        let mut next_time = hf_state.next_hardfork_time;
        let current = hf_state.current_hardfork_version;
        let mut scheduled = false;
        for ((version, time), count) in votes.iter().rev() {
            if *count >= required && *version > current {
                next = *version;
                next_time = *time;
                scheduled = true;
                break;
            }
        }
        if !scheduled {
            // Without a supermajority the next fork stays unscheduled.
            next = current;
            next_time = TimePointSec::MAX;
        }
        self.state.modify_hardforks(|hf| {
            hf.next_hardfork = next;
            hf.next_hardfork_time = next_time;
        });
        Ok(())
    }
}

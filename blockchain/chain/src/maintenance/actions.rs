// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::signals::{
    BlockNotification, OptionalActionNotification, RequiredActionNotification,
};
use crate::state::{PendingOptionalActionKey, PendingRequiredActionKey};
use freezone_db::Id;
use freezone_message::{OptionalAction, RequiredAction};
use freezone_types::config::PERCENT_100;
use freezone_types::TimePointSec;

impl Database {
    /// Maintenance hook for enqueueing required actions; the base path
    /// schedules nothing here (the lifecycle evaluators do).
    pub(crate) fn generate_required_actions(&mut self) -> Result<()> {
        Ok(())
    }

    /// Enqueues optional actions: the built-in token-emission scheduler
    /// plus any registered external generators.
    pub(crate) fn generate_optional_actions(&mut self, note: &BlockNotification) -> Result<()> {
        if !crate::hardfork::has_sst_hardfork(self) {
            return Ok(());
        }
        let now = self.head_block_time();

        // Schedule the next due emission for every launched token.
        let tokens: Vec<(freezone_types::AssetSymbol, TimePointSec)> = self
            .state
            .sst_tokens
            .iter()
            .filter(|(_, t)| t.phase == crate::state::SstPhase::LaunchSuccess)
            .map(|(_, t)| (t.liquid_symbol, t.last_virtual_emission_time))
            .collect();
        for (symbol, last_emission) in tokens {
            if let Some(next) = crate::sst::next_emission_time(self, symbol, last_emission) {
                if next <= now {
                    let token = self.state.get_sst_token(symbol)?;
                    if let Some(emission_id) = crate::sst::get_emission_object(self, symbol, next) {
                        let emission = self.state.sst_token_emissions.get(emission_id)?;
                        let emissions = crate::sst::generate_emissions(token, emission, next);
                        if !emissions.is_empty() {
                            self.push_optional_action(
                                OptionalAction::SstTokenEmission {
                                    symbol,
                                    emission_time: next,
                                    emissions,
                                },
                                next,
                            );
                        }
                    }
                }
            }
        }

        let generated = self.signals.run_optional_generators(note);
        for action in generated {
            let due = self.head_block_time();
            self.push_optional_action(action, due);
        }
        Ok(())
    }

    /// Processes the required actions a block carried. Each must match the
    /// earliest due pending action exactly, and once the included actions'
    /// serialized size passes the partition bound no due action may be left
    /// out.
    pub(crate) fn process_required_actions(&mut self, actions: &[RequiredAction]) -> Result<()> {
        if !crate::hardfork::has_sst_hardfork(self) && actions.is_empty() {
            return Ok(());
        }
        let mut total_actions_size: u64 = 0;
        let mut action_iter = actions.iter();
        loop {
            let pending = self
                .state
                .pending_required_actions
                .first_in_range(
                    PendingRequiredActionKey::ByExecution(TimePointSec::MIN, 0)
                        ..=PendingRequiredActionKey::ByExecution(TimePointSec::MAX, Id::MAX),
                )
                .map(|(id, p)| (id, p.action.clone(), p.execution_time));

            let included = match action_iter.next() {
                Some(action) => action,
                None => {
                    // The block stopped including actions; that is only
                    // acceptable when the partition is already full.
                    if let Some((_, pending_action, execution_time)) = pending {
                        if execution_time <= self.head_block_time() {
                            let gpo = self.state.gpo();
                            let partition = gpo.maximum_block_size as u64
                                * gpo.required_actions_partition_percent as u64
                                / PERCENT_100 as u64;
                            total_actions_size +=
                                serde_cbor::to_vec(&pending_action)?.len() as u64;
                            if total_actions_size <= partition {
                                return Err(Error::MissingRequiredAction(format!(
                                    "{} due at {execution_time}",
                                    pending_action.name()
                                )));
                            }
                        }
                    }
                    return Ok(());
                }
            };

            let (pending_id, pending_action, execution_time) = pending.ok_or_else(|| {
                Error::UnexpectedRequiredAction(
                    "block included a required action but none is queued".into(),
                )
            })?;
            if execution_time > self.head_block_time() {
                return Err(Error::UnexpectedRequiredAction(format!(
                    "{} is not due until {execution_time}",
                    pending_action.name()
                )));
            }
            if *included != pending_action {
                return Err(Error::UnexpectedRequiredAction(format!(
                    "expected {}, observed {}",
                    pending_action.name(),
                    included.name()
                )));
            }

            self.apply_required_action(included)?;
            total_actions_size += serde_cbor::to_vec(included)?.len() as u64;
            self.state.pending_required_actions.remove(pending_id)?;
        }
    }

    fn apply_required_action(&mut self, action: &RequiredAction) -> Result<()> {
        let note = RequiredActionNotification { action: action.clone() };
        self.signals.notify_pre_apply_required_action(&note)?;
        crate::evaluator::apply_required(self, action)?;
        self.signals.notify_post_apply_required_action(&note)?;
        Ok(())
    }

    /// Processes the optional actions a block carried, then garbage-collects
    /// pending records whose execution time fell behind the irreversible
    /// block: a supermajority has chosen not to include them.
    pub(crate) fn process_optional_actions(&mut self, actions: &[OptionalAction]) -> Result<()> {
        if !crate::hardfork::has_sst_hardfork(self) {
            return Ok(());
        }
        for action in actions {
            action.validate()?;
            // Premature execution is prevented by the action evaluator;
            // there is no queue-order check because optional actions index
            // by content hash.
            self.apply_optional_action(action)?;
            let hash = action.hash();
            if let Some(id) = self
                .state
                .pending_optional_actions
                .id_by_key(&PendingOptionalActionKey::ByHash(hash))
            {
                self.state.pending_optional_actions.remove(id)?;
            }
        }

        let lib = self.state.gpo().last_irreversible_block_num;
        if lib == 0 {
            return Ok(());
        }
        let lib_time = match self.fetch_block_by_number(lib)? {
            Some(block) => block.header.timestamp,
            None => return Ok(()),
        };
        let stale: Vec<Id> = self.state.pending_optional_actions.ids_in_range(
            PendingOptionalActionKey::ByExecution(TimePointSec::MIN, 0)
                ..=PendingOptionalActionKey::ByExecution(lib_time, Id::MAX),
        );
        for id in stale {
            self.state.pending_optional_actions.remove(id)?;
        }
        Ok(())
    }

    fn apply_optional_action(&mut self, action: &OptionalAction) -> Result<()> {
        let note = OptionalActionNotification { action: action.clone() };
        self.signals.notify_pre_apply_optional_action(&note)?;
        crate::evaluator::apply_optional(self, action)?;
        self.signals.notify_post_apply_optional_action(&note)?;
        Ok(())
    }
}

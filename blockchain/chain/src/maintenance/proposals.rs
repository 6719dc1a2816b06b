// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::Result;
use crate::signals::BlockNotification;
use crate::state::{ProposalKey, ProposalVoteKey};
use freezone_db::Id;
use freezone_message::VirtualOperation;
use freezone_types::config::{SECONDS_PER_DAY, TREASURY_ACCOUNT};
use freezone_types::{AccountName, Asset, TimePointSec, FZD_SYMBOL};

/// Share of the treasury spendable per day.
const TREASURY_DAILY_BUDGET_DIVISOR: i64 = 100;

impl Database {
    /// Periodic governance funding: sweeps finished proposals, recomputes
    /// stake-weighted approval and pays active proposals from the treasury
    /// in vote order until the period budget runs out.
    pub(crate) fn process_proposals(&mut self, _note: &BlockNotification) -> Result<()> {
        if !crate::hardfork::has_hardfork(self, crate::hardfork::TREASURY_HARDFORK) {
            return Ok(());
        }
        let now = self.head_block_time();
        if now < self.state.gpo().next_sps_maintenance_time {
            return Ok(());
        }
        let period = self.config.proposal_maintenance_period_secs;
        self.state.modify_gpo(|gpo| {
            gpo.next_sps_maintenance_time = now.saturating_add(period);
        });

        self.remove_old_proposals(now)?;
        self.update_proposal_votes()?;
        self.pay_proposals(now, period)?;
        Ok(())
    }

    /// Removes proposals past their end date, bounded per sweep so one
    /// block never does unbounded cleanup work.
    fn remove_old_proposals(&mut self, now: TimePointSec) -> Result<()> {
        let threshold = self.sps_remove_threshold as usize;
        let expired: Vec<Id> = self
            .state
            .proposals
            .ids_in_range(
                ProposalKey::ByEndDate(TimePointSec::MIN, 0)..ProposalKey::ByEndDate(now, 0),
            )
            .into_iter()
            .take(threshold)
            .collect();
        for id in expired {
            self.remove_proposal_with_votes(id)?;
        }
        Ok(())
    }

    pub(crate) fn remove_proposal_with_votes(&mut self, proposal_id: Id) -> Result<()> {
        let votes: Vec<Id> = self.state.proposal_votes.ids_in_range(
            ProposalVoteKey::ByProposalVoter(proposal_id, AccountName::default())
                ..=ProposalVoteKey::ByProposalVoter(proposal_id, AccountName::unchecked("\u{7f}")),
        );
        for vote_id in votes {
            self.state.proposal_votes.remove(vote_id)?;
        }
        self.state.proposals.remove(proposal_id)?;
        Ok(())
    }

    /// Recomputes each proposal's approval as the sum of its voters'
    /// effective stake.
    fn update_proposal_votes(&mut self) -> Result<()> {
        let proposal_ids: Vec<Id> = self.state.proposals.iter().map(|(id, _)| id).collect();
        for proposal_id in proposal_ids {
            let voters: Vec<AccountName> = self
                .state
                .proposal_votes
                .range(
                    ProposalVoteKey::ByProposalVoter(proposal_id, AccountName::default())
                        ..=ProposalVoteKey::ByProposalVoter(
                            proposal_id,
                            AccountName::unchecked("\u{7f}"),
                        ),
                )
                .map(|(_, vote)| vote.voter.clone())
                .collect();
            let mut total: u128 = 0;
            for voter in voters {
                if let Some(account) = self.state.find_account(&voter) {
                    if account.can_vote {
                        total += account.witness_vote_weight().max(0) as u128;
                    }
                }
            }
            self.state.proposals.modify(proposal_id, |p| p.total_votes = total)?;
        }
        Ok(())
    }

    fn pay_proposals(&mut self, now: TimePointSec, period: u32) -> Result<()> {
        let treasury = AccountName::unchecked(TREASURY_ACCOUNT);
        let treasury_fzd = self.state.get_account(&treasury)?.fzd_balance;
        let daily_budget = treasury_fzd.amount / TREASURY_DAILY_BUDGET_DIVISOR;
        let mut remaining =
            (daily_budget as i128 * period as i128 / SECONDS_PER_DAY as i128) as i64;
        if remaining <= 0 {
            return Ok(());
        }

        // Highest-approval proposals first.
        let ranked: Vec<Id> = self
            .state
            .proposals
            .ids_in_range(ProposalKey::ByTotalVotes(0, 0)..=ProposalKey::ByTotalVotes(u128::MAX, Id::MAX));
        for id in ranked {
            if remaining == 0 {
                break;
            }
            let proposal = self.state.proposals.get(id)?.clone();
            if proposal.start_date > now || proposal.end_date <= now || proposal.total_votes == 0 {
                continue;
            }
            let period_pay =
                (proposal.daily_pay.amount as i128 * period as i128 / SECONDS_PER_DAY as i128)
                    as i64;
            let payment = Asset::new(period_pay.min(remaining), FZD_SYMBOL);
            if payment.amount <= 0 {
                continue;
            }
            remaining -= payment.amount;
            self.adjust_balance(&treasury, -payment)?;
            self.adjust_balance(&proposal.receiver, payment)?;
            self.push_virtual_operation(VirtualOperation::ProposalPay {
                receiver: proposal.receiver.clone(),
                payment,
            })?;
        }
        Ok(())
    }
}

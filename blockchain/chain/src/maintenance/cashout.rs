// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::Result;
use crate::rewards::{claim_rshare_reward, evaluate_reward_curve, CommentRewardContext};
use crate::state::{CommentKey, CommentVoteKey, RewardFundKey};
use freezone_db::Id;
use freezone_message::VirtualOperation;
use freezone_types::config::{MIN_PAYOUT_FZD_SATOSHI, PERCENT_100, TREASURY_ACCOUNT};
use freezone_types::{AccountName, Asset, TimePointSec, FREEZONE_SYMBOL};

#[derive(Clone, Default)]
struct RewardFundContext {
    recent_claims: u128,
    reward_balance: i64,
    tokens_awarded: i64,
}

impl Database {
    /// Pays out every comment whose cashout time has arrived.
    ///
    /// Claims are snapshotted per fund before any payout so every comment in
    /// the block gets the same satoshi-per-rshare rate.
    pub(crate) fn process_comment_cashout(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let decay_secs = self.config.recent_rshares_decay_secs;

        // Decay each fund's claim total and snapshot it.
        let fund_ids: Vec<Id> = self.state.reward_funds.iter().map(|(id, _)| id).collect();
        let mut funds: Vec<RewardFundContext> = Vec::with_capacity(fund_ids.len());
        for id in &fund_ids {
            self.state.reward_funds.modify(*id, |fund| {
                let elapsed = now.saturating_elapsed(fund.last_update);
                fund.recent_claims -=
                    fund.recent_claims * elapsed as u128 / decay_secs.max(1) as u128;
                fund.last_update = now;
            })?;
            let fund = self.state.reward_funds.get(*id)?;
            funds.push(RewardFundContext {
                recent_claims: fund.recent_claims,
                reward_balance: fund.reward_balance.amount,
                tokens_awarded: 0,
            });
        }
        if funds.is_empty() {
            return Ok(());
        }

        let due: Vec<Id> = self.state.comments.ids_in_range(
            CommentKey::ByCashoutTime(TimePointSec::MIN, 0)
                ..=CommentKey::ByCashoutTime(now, Id::MAX),
        );

        // First pass adds the due rshares to the claim totals so payouts
        // share one denominator.
        for comment_id in &due {
            let comment = self.state.comments.get(*comment_id)?;
            if comment.net_rshares > 0 {
                let fund = self.reward_fund_index_for_comment()?;
                let rf = self.state.reward_funds.get(fund_ids[fund])?;
                funds[fund].recent_claims += evaluate_reward_curve(
                    comment.net_rshares as u128,
                    rf.author_reward_curve,
                    rf.content_constant,
                );
            }
        }

        for comment_id in due {
            let fund = self.reward_fund_index_for_comment()?;
            let rf = self.state.reward_funds.get(fund_ids[fund])?;
            let ctx = CommentRewardContext {
                rshares: self.state.comments.get(comment_id)?.net_rshares,
                reward_weight: self.state.comments.get(comment_id)?.reward_weight,
                total_claims: funds[fund].recent_claims,
                reward_fund: funds[fund].reward_balance,
                reward_curve: rf.author_reward_curve,
                content_constant: rf.content_constant,
            };
            funds[fund].tokens_awarded += self.cashout_comment(comment_id, &ctx)?;
        }

        for (i, id) in fund_ids.iter().enumerate() {
            self.state.reward_funds.modify(*id, |fund| {
                fund.recent_claims = funds[i].recent_claims;
                fund.reward_balance -= Asset::new(funds[i].tokens_awarded, FREEZONE_SYMBOL);
            })?;
        }
        Ok(())
    }

    /// All comments currently pay from the single post fund.
    fn reward_fund_index_for_comment(&self) -> Result<usize> {
        let _ = self
            .state
            .reward_funds
            .get_by_key(&RewardFundKey::ByName("post".to_string()))?;
        Ok(0)
    }

    /// Pays one comment: curation first, then beneficiaries, then the
    /// author's dollar/vesting split. Returns the tokens claimed from the
    /// fund.
    fn cashout_comment(&mut self, comment_id: Id, ctx: &CommentRewardContext) -> Result<i64> {
        let now = self.head_block_time();
        let comment = self.state.comments.get(comment_id)?.clone();
        let mut claimed: i64 = 0;

        if comment.net_rshares > 0 {
            let mut reward = claim_rshare_reward(ctx) as i64;

            // Dust payouts round to nothing.
            if self.to_fzd(Asset::new(reward, FREEZONE_SYMBOL)).amount < MIN_PAYOUT_FZD_SATOSHI {
                reward = 0;
            }
            let max_freezone = self.to_freezone(comment.max_accepted_payout);
            if !self.state.feed().current_median_history.is_null() {
                reward = reward.min(max_freezone.amount);
            }

            if reward > 0 {
                let curation_percent = self
                    .state
                    .reward_funds
                    .get_by_key(&RewardFundKey::ByName("post".to_string()))?
                    .percent_curation_rewards;
                let mut curation_tokens =
                    (reward as i128 * curation_percent as i128 / PERCENT_100 as i128) as i64;
                let mut author_tokens = reward - curation_tokens;

                let unclaimed_curation = self.pay_curators(comment_id, &mut curation_tokens)?;
                let _ = unclaimed_curation;

                let mut total_beneficiary: i64 = 0;
                claimed = author_tokens + curation_tokens;

                for route in &comment.beneficiaries {
                    let benefactor_tokens =
                        (author_tokens as i128 * route.weight as i128 / PERCENT_100 as i128) as i64;
                    let median = self.state.feed().current_median_history;
                    if route.account.as_str() == TREASURY_ACCOUNT && !median.is_null() {
                        // The treasury takes its share entirely in dollars.
                        let fzd_payout = Asset::new(benefactor_tokens, FREEZONE_SYMBOL) * median;
                        self.adjust_balance(&route.account, fzd_payout)?;
                        self.adjust_supply(Asset::new(-benefactor_tokens, FREEZONE_SYMBOL), false)?;
                        self.adjust_supply(fzd_payout, false)?;
                        self.push_virtual_operation(VirtualOperation::CommentBenefactorReward {
                            benefactor: route.account.clone(),
                            author: comment.author.clone(),
                            permlink: comment.permlink.clone(),
                            fzd_payout,
                            freezone_payout: Asset::new(0, FREEZONE_SYMBOL),
                            vesting_payout: Asset::new(0, freezone_types::VESTS_SYMBOL),
                        })?;
                    } else {
                        let fzd_freezone = (benefactor_tokens as i128
                            * comment.percent_freezone_dollars as i128
                            / (2 * PERCENT_100 as i128)) as i64;
                        let vesting_freezone = benefactor_tokens - fzd_freezone;
                        let (fzd_payout, freezone_payout) = self.create_fzd(
                            &route.account,
                            Asset::new(fzd_freezone, FREEZONE_SYMBOL),
                            true,
                        )?;
                        let vesting_payout = self.create_vesting(
                            &route.account,
                            Asset::new(vesting_freezone, FREEZONE_SYMBOL),
                            true,
                        )?;
                        self.push_virtual_operation(VirtualOperation::CommentBenefactorReward {
                            benefactor: route.account.clone(),
                            author: comment.author.clone(),
                            permlink: comment.permlink.clone(),
                            fzd_payout,
                            freezone_payout,
                            vesting_payout,
                        })?;
                    }
                    total_beneficiary += benefactor_tokens;
                }
                author_tokens -= total_beneficiary;

                let fzd_freezone = (author_tokens as i128 * comment.percent_freezone_dollars as i128
                    / (2 * PERCENT_100 as i128)) as i64;
                let vesting_freezone = author_tokens - fzd_freezone;

                let (fzd_payout, freezone_payout) =
                    self.create_fzd(&comment.author, Asset::new(fzd_freezone, FREEZONE_SYMBOL), true)?;
                let vesting_payout = self.create_vesting(
                    &comment.author,
                    Asset::new(vesting_freezone, FREEZONE_SYMBOL),
                    true,
                )?;
                self.push_virtual_operation(VirtualOperation::AuthorReward {
                    author: comment.author.clone(),
                    permlink: comment.permlink.clone(),
                    fzd_payout,
                    freezone_payout,
                    vesting_payout,
                })?;

                let total_fzd_value = fzd_payout
                    + self.to_fzd(freezone_payout + Asset::new(vesting_freezone, FREEZONE_SYMBOL));
                let curator_fzd_value = self.to_fzd(Asset::new(curation_tokens, FREEZONE_SYMBOL));
                let beneficiary_fzd_value =
                    self.to_fzd(Asset::new(total_beneficiary, FREEZONE_SYMBOL));
                self.state.comments.modify(comment_id, |c| {
                    c.total_payout_value += total_fzd_value;
                    c.curator_payout_value += curator_fzd_value;
                    c.beneficiary_payout_value += beneficiary_fzd_value;
                    c.author_rewards += author_tokens;
                })?;

                let claimed_fzd = self.to_fzd(Asset::new(claimed, FREEZONE_SYMBOL));
                self.push_virtual_operation(VirtualOperation::CommentReward {
                    author: comment.author.clone(),
                    permlink: comment.permlink.clone(),
                    payout: claimed_fzd,
                })?;

                let author_id = self.state.account_id(&comment.author)?;
                self.state
                    .accounts
                    .modify(author_id, |a| a.posting_rewards += author_tokens)?;
            }
        }

        // A payout only settles positive rshares; negative rshares persist
        // for a future upvote.
        self.state.comments.modify(comment_id, |c| {
            if c.net_rshares > 0 {
                c.net_rshares = 0;
            }
            c.children_abs_rshares = 0;
            c.abs_rshares = 0;
            c.vote_rshares = 0;
            c.total_vote_weight = 0;
            c.max_cashout_time = TimePointSec::MAX;
            c.cashout_time = TimePointSec::MAX;
            c.last_payout = now;
        })?;

        self.push_virtual_operation(VirtualOperation::CommentPayoutUpdate {
            author: comment.author.clone(),
            permlink: comment.permlink.clone(),
        })?;

        // Poison the recorded votes so edits after payout cannot re-earn.
        let vote_ids = self.state.comment_votes.ids_in_range(
            CommentVoteKey::ByCommentSymbolVoter(comment_id, FREEZONE_SYMBOL, AccountName::default())
                ..=CommentVoteKey::ByCommentSymbolVoter(
                    comment_id,
                    FREEZONE_SYMBOL,
                    AccountName::unchecked("\u{7f}"),
                ),
        );
        for vote_id in vote_ids {
            self.state.comment_votes.modify(vote_id, |v| v.num_changes = -1)?;
        }

        Ok(claimed)
    }

    /// Splits the curation pool among voters in proportion to their
    /// recorded weights, highest weight first. `max_rewards` is reduced to
    /// the amount actually claimed; the unclaimed remainder is returned.
    fn pay_curators(&mut self, comment_id: Id, max_rewards: &mut i64) -> Result<i64> {
        let comment = self.state.comments.get(comment_id)?;
        let total_weight = comment.total_vote_weight as u128;
        let allow_curation = comment.allow_curation_rewards;
        let author = comment.author.clone();
        let permlink = comment.permlink.clone();
        let mut unclaimed = *max_rewards;

        if !allow_curation {
            *max_rewards = 0;
            return Ok(0);
        }
        if total_weight == 0 {
            *max_rewards -= unclaimed;
            return Ok(unclaimed);
        }

        let mut votes: Vec<(u64, AccountName)> = self
            .state
            .comment_votes
            .range(
                CommentVoteKey::ByCommentSymbolVoter(
                    comment_id,
                    FREEZONE_SYMBOL,
                    AccountName::default(),
                )
                    ..=CommentVoteKey::ByCommentSymbolVoter(
                        comment_id,
                        FREEZONE_SYMBOL,
                        AccountName::unchecked("\u{7f}"),
                    ),
            )
            .map(|(_, vote)| (vote.weight, vote.voter.clone()))
            .collect();
        votes.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (weight, voter) in votes {
            let claim = ((*max_rewards as u128 * weight as u128) / total_weight) as i64;
            if claim > 0 {
                unclaimed -= claim;
                let reward =
                    self.create_vesting(&voter, Asset::new(claim, FREEZONE_SYMBOL), true)?;
                self.push_virtual_operation(VirtualOperation::CurationReward {
                    curator: voter.clone(),
                    reward,
                    author: author.clone(),
                    permlink: permlink.clone(),
                })?;
                let voter_id = self.state.account_id(&voter)?;
                self.state.accounts.modify(voter_id, |a| a.curation_rewards += claim)?;
            }
        }

        *max_rewards -= unclaimed;
        Ok(unclaimed)
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::rewards::curation_weight;
use crate::state::{CommentKey, CommentObject, CommentVoteKey, CommentVoteObject};
use freezone_message::ops::*;
use freezone_types::config::PERCENT_100;
use freezone_types::FREEZONE_SYMBOL;

const MAX_COMMENT_DEPTH: u16 = 6;
const MAX_VOTE_CHANGES: i8 = 5;

pub(super) fn comment(db: &mut Database, op: &CommentOperation) -> Result<()> {
    let now = db.head_block_time();
    let existing = db.state().find_comment(&op.author, &op.permlink).map(|c| c.is_paid_out());

    if let Some(paid_out) = existing {
        if paid_out {
            return Err(Error::precondition("cannot edit a comment after payout"));
        }
        let id = db
            .state()
            .comments
            .id_by_key(&CommentKey::ByPermlink(op.author.clone(), op.permlink.clone()))
            .expect("comment exists");
        db.state.comments.modify(id, |c| c.last_update = now)?;
        return Ok(());
    }

    let author = db.state().get_account(&op.author)?.clone();
    let (parent_id, depth) = if op.is_root() {
        let interval = db.config().min_root_comment_interval_secs;
        if now < author.last_root_post.saturating_add(interval) {
            return Err(Error::precondition("posting too quickly"));
        }
        (None, 0u16)
    } else {
        let parent = db
            .state()
            .find_comment(&op.parent_author, &op.parent_permlink)
            .ok_or_else(|| Error::precondition("parent comment does not exist"))?;
        if parent.depth >= MAX_COMMENT_DEPTH {
            return Err(Error::precondition("comment nested too deeply"));
        }
        let depth = parent.depth + 1;
        let id = db
            .state()
            .comments
            .id_by_key(&CommentKey::ByPermlink(op.parent_author.clone(), op.parent_permlink.clone()))
            .expect("parent exists");
        (Some(id), depth)
    };

    let cashout_time = now.saturating_add(db.config().cashout_window_secs);
    let root = parent_id
        .map(|id| db.state().comments.get(id).map(|p| p.root_comment))
        .transpose()?;

    let (author_name, permlink) = (op.author.clone(), op.permlink.clone());
    let (parent_author, parent_permlink) = (op.parent_author.clone(), op.parent_permlink.clone());
    db.state.comments.create(|c: &mut CommentObject| {
        c.author = author_name;
        c.permlink = permlink;
        c.parent_author = parent_author;
        c.parent_permlink = parent_permlink;
        c.depth = depth;
        c.created = now;
        c.last_update = now;
        c.cashout_time = cashout_time;
    });
    let new_id = db
        .state()
        .comments
        .id_by_key(&CommentKey::ByPermlink(op.author.clone(), op.permlink.clone()))
        .expect("comment just created");
    let root_id = root.unwrap_or(new_id);
    db.state.comments.modify(new_id, |c| c.root_comment = root_id)?;

    if let Some(parent_id) = parent_id {
        db.state.comments.modify(parent_id, |p| p.children += 1)?;
    }

    let account_id = db.state.account_id(&op.author)?;
    db.state.accounts.modify(account_id, |a| {
        a.post_count += 1;
        a.last_post = now;
        if op.parent_author.is_empty() {
            a.last_root_post = now;
        }
    })?;
    Ok(())
}

pub(super) fn comment_options(db: &mut Database, op: &CommentOptionsOperation) -> Result<()> {
    let comment = db.state().get_comment(&op.author, &op.permlink)?.clone();
    if comment.is_paid_out() {
        return Err(Error::precondition("comment has already been paid"));
    }
    // Payout terms may only tighten, and never after votes have landed.
    if op.max_accepted_payout.amount > comment.max_accepted_payout.amount
        || op.percent_freezone_dollars > comment.percent_freezone_dollars
        || (!op.allow_votes && comment.abs_rshares != 0)
    {
        return Err(Error::precondition("comment options may only be restricted"));
    }
    if !op.beneficiaries.is_empty() {
        if !comment.beneficiaries.is_empty() {
            return Err(Error::precondition("beneficiaries may only be set once"));
        }
        if comment.abs_rshares != 0 {
            return Err(Error::precondition("cannot add beneficiaries after votes"));
        }
        for route in &op.beneficiaries {
            db.state().get_account(&route.account)?;
        }
    }
    let id = db
        .state()
        .comments
        .id_by_key(&CommentKey::ByPermlink(op.author.clone(), op.permlink.clone()))
        .expect("comment exists");
    let op = op.clone();
    db.state.comments.modify(id, |c| {
        c.max_accepted_payout = op.max_accepted_payout;
        c.percent_freezone_dollars = op.percent_freezone_dollars;
        c.allow_votes = op.allow_votes;
        c.allow_curation_rewards = op.allow_curation_rewards;
        if !op.beneficiaries.is_empty() {
            c.beneficiaries = op.beneficiaries;
        }
    })?;
    Ok(())
}

pub(super) fn delete_comment(db: &mut Database, op: &DeleteCommentOperation) -> Result<()> {
    let comment = db.state().get_comment(&op.author, &op.permlink)?.clone();
    if comment.children > 0 {
        return Err(Error::precondition("cannot delete a comment with replies"));
    }
    if comment.net_rshares > 0 {
        return Err(Error::precondition("cannot delete a comment with positive votes"));
    }
    if comment.is_paid_out() {
        return Err(Error::precondition("cannot delete a comment after payout"));
    }
    let id = db
        .state()
        .comments
        .id_by_key(&CommentKey::ByPermlink(op.author.clone(), op.permlink.clone()))
        .expect("comment exists");

    let vote_ids = db.state().comment_votes.ids_in_range(
        CommentVoteKey::ByCommentSymbolVoter(id, FREEZONE_SYMBOL, freezone_types::AccountName::default())
            ..=CommentVoteKey::ByCommentSymbolVoter(
                id,
                FREEZONE_SYMBOL,
                freezone_types::AccountName::unchecked("\u{7f}"),
            ),
    );
    for vote_id in vote_ids {
        db.state.comment_votes.remove(vote_id)?;
    }

    if !comment.parent_author.is_empty() {
        if let Some(parent_id) = db.state().comments.id_by_key(&CommentKey::ByPermlink(
            comment.parent_author.clone(),
            comment.parent_permlink.clone(),
        )) {
            db.state.comments.modify(parent_id, |p| p.children -= 1)?;
        }
    }
    db.state.comments.remove(id)?;
    Ok(())
}

pub(super) fn vote(db: &mut Database, op: &VoteOperation) -> Result<()> {
    let now = db.head_block_time();
    let voter = db.state().get_account(&op.voter)?.clone();
    if !voter.can_vote {
        return Err(Error::precondition("account has declined its voting rights"));
    }
    let comment = db.state().get_comment(&op.author, &op.permlink)?.clone();
    if !comment.allow_votes {
        return Err(Error::precondition("votes are not allowed on this comment"));
    }
    if comment.cashout_time <= now || comment.is_paid_out() {
        return Err(Error::precondition("the voting window for this comment has closed"));
    }

    let comment_id = db
        .state()
        .comments
        .id_by_key(&CommentKey::ByPermlink(op.author.clone(), op.permlink.clone()))
        .expect("comment exists");

    // Voting power regenerates linearly against effective stake; the vote
    // consumes mana proportional to its weight.
    let max_mana = voter.effective_vesting_shares().max(0);
    let regen = db.config().voting_mana_regeneration_secs;
    let voter_id = db.state.account_id(&op.voter)?;
    db.state.accounts.modify(voter_id, |a| {
        a.voting_manabar.regenerate(max_mana, now, regen);
        a.downvote_manabar.regenerate(max_mana / 4, now, regen);
    })?;
    let voter = db.state().get_account(&op.voter)?.clone();

    let abs_weight = op.weight.unsigned_abs() as i64;
    let desired = (max_mana as i128 * abs_weight as i128 / PERCENT_100 as i128) as i64;
    let available = if op.weight < 0 {
        voter.downvote_manabar.current_mana + voter.voting_manabar.current_mana
    } else {
        voter.voting_manabar.current_mana
    };
    let used = desired.min(available.max(0));
    let rshares = if op.weight < 0 { -used } else { used };

    db.state.accounts.modify(voter_id, |a| {
        if op.weight < 0 {
            // Downvotes drain the downvote pool first.
            let from_downvote = used.min(a.downvote_manabar.current_mana);
            a.downvote_manabar.use_mana(from_downvote);
            a.voting_manabar.use_mana(used - from_downvote);
        } else {
            a.voting_manabar.use_mana(used);
        }
        a.last_vote_time = now;
    })?;

    let vote_key =
        CommentVoteKey::ByCommentSymbolVoter(comment_id, FREEZONE_SYMBOL, op.voter.clone());
    let existing = db.state().comment_votes.id_by_key(&vote_key);

    match existing {
        Some(vote_id) => {
            let old = db.state().comment_votes.get(vote_id)?.clone();
            if old.num_changes < 0 {
                return Err(Error::precondition("cannot change a vote after payout"));
            }
            if old.num_changes >= MAX_VOTE_CHANGES {
                return Err(Error::precondition("vote changed too many times"));
            }
            if old.vote_percent == op.weight {
                return Err(Error::precondition("vote is unchanged"));
            }
            db.state.comments.modify(comment_id, |c| {
                c.net_rshares -= old.rshares;
                c.net_rshares += rshares;
                c.abs_rshares += rshares.abs();
                c.total_vote_weight -= old.weight;
                if old.rshares < 0 && rshares >= 0 {
                    c.net_votes += 2;
                } else if old.rshares >= 0 && rshares < 0 {
                    c.net_votes -= 2;
                }
            })?;
            let weight = op.weight;
            db.state.comment_votes.modify(vote_id, |v| {
                v.rshares = rshares;
                v.vote_percent = weight;
                v.weight = 0;
                v.last_update = now;
                v.num_changes += 1;
            })?;
        }
        None => {
            // The curation claim is the marginal square-root weight this
            // vote adds, discounted inside the reverse-auction window.
            let old_vote_rshares = comment.vote_rshares.max(0) as u128;
            let new_vote_rshares = old_vote_rshares + rshares.max(0) as u128;
            let mut weight = if rshares > 0 && comment.allow_curation_rewards {
                curation_weight(old_vote_rshares, new_vote_rshares)
            } else {
                0
            };
            let auction = db.config().reverse_auction_window_secs;
            if auction > 0 && weight > 0 {
                let elapsed = now.saturating_elapsed(comment.created).min(auction) as u64;
                weight = weight * elapsed / auction as u64;
            }

            let (voter_name, vote_percent) = (op.voter.clone(), op.weight);
            db.state.comment_votes.create(|v: &mut CommentVoteObject| {
                v.comment = comment_id;
                v.voter = voter_name;
                v.symbol = FREEZONE_SYMBOL;
                v.rshares = rshares;
                v.vote_percent = vote_percent;
                v.weight = weight;
                v.last_update = now;
            });
            db.state.comments.modify(comment_id, |c| {
                c.net_rshares += rshares;
                c.abs_rshares += rshares.abs();
                if rshares > 0 {
                    c.vote_rshares += rshares;
                }
                c.total_vote_weight += weight;
                if rshares > 0 {
                    c.net_votes += 1;
                } else if rshares < 0 {
                    c.net_votes -= 1;
                }
            })?;
        }
    }
    Ok(())
}

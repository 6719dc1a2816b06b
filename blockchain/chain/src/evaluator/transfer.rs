// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{
    AccountRegularBalanceKey, ConvertRequestKey, ConvertRequestObject, SavingsWithdrawKey,
    SavingsWithdrawObject, VestingDelegationExpirationObject, VestingDelegationKey,
    VestingDelegationObject, WithdrawVestingRouteKey, WithdrawVestingRouteObject,
};
use freezone_message::ops::*;
use freezone_types::config::{
    MAX_WITHDRAW_ROUTES, PERCENT_100, SAVINGS_WITHDRAW_REQUEST_LIMIT, VESTING_WITHDRAW_INTERVALS,
};
use freezone_types::{Asset, TimePointSec, VESTS_SYMBOL};

pub(super) fn transfer(db: &mut Database, op: &TransferOperation) -> Result<()> {
    db.state().get_account(&op.to)?;
    db.adjust_balance(&op.from, -op.amount)?;
    db.adjust_balance(&op.to, op.amount)?;
    Ok(())
}

pub(super) fn transfer_to_vesting(db: &mut Database, op: &TransferToVestingOperation) -> Result<()> {
    let target = op.target().clone();
    db.state().get_account(&target)?;
    db.adjust_balance(&op.from, -op.amount)?;
    db.create_vesting(&target, op.amount, false)?;
    Ok(())
}

pub(super) fn withdraw_vesting(db: &mut Database, op: &WithdrawVestingOperation) -> Result<()> {
    let now = db.head_block_time();
    if op.vesting_shares.symbol == VESTS_SYMBOL {
        let account = db.state().get_account(&op.account)?;
        let available = account.vesting_shares.amount - account.delegated_vesting_shares.amount;
        if op.vesting_shares.amount > available {
            return Err(Error::precondition(
                "cannot withdraw more vesting shares than are undelegated",
            ));
        }
        let id = db.state.account_id(&op.account)?;
        let interval = db.config().vesting_withdraw_interval_secs;
        let amount = op.vesting_shares.amount;
        db.state.accounts.modify(id, |a| {
            if amount == 0 {
                a.vesting_withdraw_rate.amount = 0;
                a.to_withdraw = 0;
                a.withdrawn = 0;
                a.next_vesting_withdrawal = TimePointSec::MAX;
            } else {
                let mut rate = amount / VESTING_WITHDRAW_INTERVALS as i64;
                if rate == 0 {
                    rate = 1;
                }
                a.vesting_withdraw_rate.amount = rate;
                a.to_withdraw = amount;
                a.withdrawn = 0;
                a.next_vesting_withdrawal = now.saturating_add(interval);
            }
        })?;
        return Ok(());
    }

    // User-token withdrawal state lives on the balance row.
    let liquid = op.vesting_shares.symbol.liquid_symbol();
    db.state().get_sst_token(liquid)?;
    let key = AccountRegularBalanceKey::ByNameLiquidSymbol(op.account.clone(), liquid);
    let row_id = db
        .state()
        .account_regular_balances
        .id_by_key(&key)
        .ok_or_else(|| Error::precondition("no balance in this token"))?;
    let row = db.state().account_regular_balances.get(row_id)?;
    if op.vesting_shares.amount > row.vesting_shares.amount - row.delegated_vesting_shares.amount {
        return Err(Error::precondition(
            "cannot withdraw more vesting shares than are undelegated",
        ));
    }
    let interval = db.config().sst_vesting_withdraw_interval_secs;
    let amount = op.vesting_shares.amount;
    db.state.account_regular_balances.modify(row_id, |row| {
        if amount == 0 {
            row.vesting_withdraw_rate.amount = 0;
            row.to_withdraw = 0;
            row.withdrawn = 0;
            row.next_vesting_withdrawal = TimePointSec::MAX;
        } else {
            let mut rate = amount / VESTING_WITHDRAW_INTERVALS as i64;
            if rate == 0 {
                rate = 1;
            }
            row.vesting_withdraw_rate.amount = rate;
            row.to_withdraw = amount;
            row.withdrawn = 0;
            row.next_vesting_withdrawal = now.saturating_add(interval);
        }
    })?;
    Ok(())
}

pub(super) fn set_withdraw_vesting_route(
    db: &mut Database,
    op: &SetWithdrawVestingRouteOperation,
) -> Result<()> {
    db.state().get_account(&op.to_account)?;
    let from = db.state().get_account(&op.from_account)?;
    let route_count = from.withdraw_routes;
    let key =
        WithdrawVestingRouteKey::ByWithdrawRoute(op.from_account.clone(), op.to_account.clone());
    let existing = db.state().withdraw_routes.id_by_key(&key);

    match (existing, op.percent) {
        (None, 0) => {
            return Err(Error::precondition("cannot remove a route that does not exist"))
        }
        (None, _) => {
            if route_count as usize >= MAX_WITHDRAW_ROUTES {
                return Err(Error::precondition("account already has the maximum withdraw routes"));
            }
            let (from_account, to_account) = (op.from_account.clone(), op.to_account.clone());
            let (percent, auto_vest) = (op.percent, op.auto_vest);
            db.state.withdraw_routes.create(|r: &mut WithdrawVestingRouteObject| {
                r.from_account = from_account;
                r.to_account = to_account;
                r.percent = percent;
                r.auto_vest = auto_vest;
            });
            let id = db.state.account_id(&op.from_account)?;
            db.state.accounts.modify(id, |a| a.withdraw_routes += 1)?;
        }
        (Some(route_id), 0) => {
            db.state.withdraw_routes.remove(route_id)?;
            let id = db.state.account_id(&op.from_account)?;
            db.state.accounts.modify(id, |a| a.withdraw_routes -= 1)?;
        }
        (Some(route_id), percent) => {
            let auto_vest = op.auto_vest;
            db.state.withdraw_routes.modify(route_id, |r| {
                r.percent = percent;
                r.auto_vest = auto_vest;
            })?;
        }
    }

    // The account's routes may never commit more than all of each fill.
    let upper = freezone_types::AccountName::unchecked("\u{7f}");
    let total: u32 = db
        .state()
        .withdraw_routes
        .range(
            WithdrawVestingRouteKey::ByWithdrawRoute(
                op.from_account.clone(),
                freezone_types::AccountName::default(),
            )
                ..=WithdrawVestingRouteKey::ByWithdrawRoute(op.from_account.clone(), upper),
        )
        .map(|(_, r)| r.percent as u32)
        .sum();
    if total > PERCENT_100 as u32 {
        return Err(Error::precondition("withdraw routes exceed 100%"));
    }
    Ok(())
}

pub(super) fn delegate_vesting_shares(
    db: &mut Database,
    op: &DelegateVestingSharesOperation,
) -> Result<()> {
    if op.vesting_shares.symbol != VESTS_SYMBOL {
        return Err(Error::precondition("only global vesting shares can be delegated"));
    }
    let delegator = db.state().get_account(&op.delegator)?.clone();
    db.state().get_account(&op.delegatee)?;

    let key = VestingDelegationKey::ByDelegation(op.delegator.clone(), op.delegatee.clone());
    let existing = db.state().vesting_delegations.id_by_key(&key);
    let current = match existing {
        Some(id) => db.state().vesting_delegations.get(id)?.vesting_shares,
        None => Asset::new(0, VESTS_SYMBOL),
    };
    let delta = op.vesting_shares - current;
    let now = db.head_block_time();

    if delta.amount > 0 {
        let remaining_withdrawal = delegator.to_withdraw - delegator.withdrawn;
        let available = delegator.vesting_shares.amount
            - delegator.delegated_vesting_shares.amount
            - remaining_withdrawal.max(0);
        if delta.amount > available {
            return Err(Error::precondition("not enough undelegated vesting shares"));
        }
        let delegator_id = db.state.account_id(&op.delegator)?;
        db.state.accounts.modify(delegator_id, |a| {
            a.delegated_vesting_shares += delta;
            a.voting_manabar.use_mana(delta.amount);
        })?;
        let delegatee_id = db.state.account_id(&op.delegatee)?;
        db.state.accounts.modify(delegatee_id, |a| {
            a.received_vesting_shares += delta;
            a.voting_manabar.current_mana =
                a.voting_manabar.current_mana.saturating_add(delta.amount);
        })?;
    } else if delta.amount < 0 {
        // Revoked shares cool down before returning to the delegator.
        let returned = -delta;
        let expiration = now.saturating_add(db.config().delegation_return_period_secs);
        let delegator_name = op.delegator.clone();
        db.state
            .vesting_delegation_expirations
            .create(|e: &mut VestingDelegationExpirationObject| {
                e.delegator = delegator_name;
                e.vesting_shares = returned;
                e.expiration = expiration;
            });
        let delegatee_id = db.state.account_id(&op.delegatee)?;
        db.state.accounts.modify(delegatee_id, |a| {
            a.received_vesting_shares -= returned;
            a.voting_manabar.use_mana(returned.amount);
        })?;
    } else {
        return Err(Error::precondition("delegation is unchanged"));
    }

    match (existing, op.vesting_shares.amount) {
        (Some(id), 0) => db.state.vesting_delegations.remove(id)?,
        (Some(id), _) => {
            let shares = op.vesting_shares;
            db.state.vesting_delegations.modify(id, |d| d.vesting_shares = shares)?
        }
        (None, 0) => return Err(Error::precondition("no delegation to revoke")),
        (None, _) => {
            let (from, to, shares) =
                (op.delegator.clone(), op.delegatee.clone(), op.vesting_shares);
            db.state.vesting_delegations.create(|d: &mut VestingDelegationObject| {
                d.delegator = from;
                d.delegatee = to;
                d.vesting_shares = shares;
                d.min_delegation_time = now;
            });
        }
    }
    Ok(())
}

pub(super) fn transfer_to_savings(db: &mut Database, op: &TransferToSavingsOperation) -> Result<()> {
    db.state().get_account(&op.to)?;
    db.adjust_balance(&op.from, -op.amount)?;
    db.adjust_savings_balance(&op.to, op.amount)?;
    Ok(())
}

pub(super) fn transfer_from_savings(
    db: &mut Database,
    op: &TransferFromSavingsOperation,
) -> Result<()> {
    db.state().get_account(&op.to)?;
    let from = db.state().get_account(&op.from)?;
    if from.savings_withdraw_requests >= SAVINGS_WITHDRAW_REQUEST_LIMIT {
        return Err(Error::precondition("too many open savings withdrawals"));
    }
    let key = SavingsWithdrawKey::ByFromRid(op.from.clone(), op.request_id);
    if db.state().savings_withdraws.id_by_key(&key).is_some() {
        return Err(Error::precondition("request id already in use"));
    }
    db.adjust_savings_balance(&op.from, -op.amount)?;
    let complete = db.head_block_time().saturating_add(db.config().savings_withdraw_secs);
    let (from, to, memo, request_id, amount) = (
        op.from.clone(),
        op.to.clone(),
        op.memo.clone(),
        op.request_id,
        op.amount,
    );
    db.state.savings_withdraws.create(|w: &mut SavingsWithdrawObject| {
        w.from = from;
        w.to = to;
        w.memo = memo;
        w.request_id = request_id;
        w.amount = amount;
        w.complete = complete;
    });
    let id = db.state.account_id(&op.from)?;
    db.state.accounts.modify(id, |a| a.savings_withdraw_requests += 1)?;
    Ok(())
}

pub(super) fn cancel_transfer_from_savings(
    db: &mut Database,
    op: &CancelTransferFromSavingsOperation,
) -> Result<()> {
    let key = SavingsWithdrawKey::ByFromRid(op.from.clone(), op.request_id);
    let withdraw_id = db
        .state()
        .savings_withdraws
        .id_by_key(&key)
        .ok_or_else(|| Error::precondition("no such savings withdrawal"))?;
    let withdraw = db.state().savings_withdraws.get(withdraw_id)?.clone();
    db.adjust_savings_balance(&withdraw.from, withdraw.amount)?;
    db.state.savings_withdraws.remove(withdraw_id)?;
    let id = db.state.account_id(&op.from)?;
    db.state.accounts.modify(id, |a| a.savings_withdraw_requests -= 1)?;
    Ok(())
}

pub(super) fn convert(db: &mut Database, op: &ConvertOperation) -> Result<()> {
    let key = ConvertRequestKey::ByOwner(op.owner.clone(), op.request_id);
    if db.state().convert_requests.id_by_key(&key).is_some() {
        return Err(Error::precondition("request id already in use"));
    }
    db.adjust_balance(&op.owner, -op.amount)?;
    let conversion_date = db.head_block_time().saturating_add(db.config().conversion_delay_secs);
    let (owner, request_id, amount) = (op.owner.clone(), op.request_id, op.amount);
    db.state.convert_requests.create(|r: &mut ConvertRequestObject| {
        r.owner = owner;
        r.request_id = request_id;
        r.amount = amount;
        r.conversion_date = conversion_date;
    });
    Ok(())
}

pub(super) fn claim_reward_balance(
    db: &mut Database,
    op: &ClaimRewardBalanceOperation,
) -> Result<()> {
    let account = db.state().get_account(&op.account)?.clone();
    if op.reward_freezone.amount > account.reward_freezone_balance.amount
        || op.reward_fzd.amount > account.reward_fzd_balance.amount
        || op.reward_vests.amount > account.reward_vesting_balance.amount
    {
        return Err(Error::precondition("cannot claim more than the pending reward"));
    }

    // Vesting claims carry a proportional share of the backing fund.
    let reward_vesting_freezone = if op.reward_vests.amount == account.reward_vesting_balance.amount
    {
        account.reward_vesting_freezone
    } else {
        Asset::new(
            (account.reward_vesting_freezone.amount as i128 * op.reward_vests.amount as i128
                / account.reward_vesting_balance.amount.max(1) as i128) as i64,
            freezone_types::FREEZONE_SYMBOL,
        )
    };

    let id = db.state.account_id(&op.account)?;
    let (freezone, fzd, vests) = (op.reward_freezone, op.reward_fzd, op.reward_vests);
    db.state.accounts.modify(id, |a| {
        a.reward_freezone_balance -= freezone;
        a.balance += freezone;
        a.reward_fzd_balance -= fzd;
        a.fzd_balance += fzd;
        a.reward_vesting_balance -= vests;
        a.vesting_shares += vests;
        a.reward_vesting_freezone -= reward_vesting_freezone;
        a.voting_manabar.current_mana = a.voting_manabar.current_mana.saturating_add(vests.amount);
    })?;
    db.state.modify_gpo(|gpo| {
        gpo.pending_rewarded_vesting_shares -= vests;
        gpo.pending_rewarded_vesting_freezone -= reward_vesting_freezone;
        gpo.total_vesting_shares += vests;
        gpo.total_vesting_fund_freezone += reward_vesting_freezone;
    });
    if op.reward_vests.amount > 0 {
        db.adjust_proxied_witness_votes(&op.account, op.reward_vests.amount)?;
    }
    Ok(())
}

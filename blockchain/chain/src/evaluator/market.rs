// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{LimitOrderKey, LimitOrderObject};
use freezone_message::ops::*;

pub(super) fn limit_order_create(db: &mut Database, op: &LimitOrderCreateOperation) -> Result<()> {
    if op.expiration <= db.head_block_time() {
        return Err(Error::precondition("order would expire immediately"));
    }
    // Only markets against the native token exist; a user-token market
    // requires the token to be tradable.
    let other = if op.exchange_rate.base.symbol == freezone_types::FREEZONE_SYMBOL {
        op.exchange_rate.quote.symbol
    } else {
        op.exchange_rate.base.symbol
    };
    if other.is_sst() {
        let token = db.state().get_sst_token(other)?;
        if token.phase != crate::state::SstPhase::LaunchSuccess {
            return Err(Error::precondition("token is not yet tradable"));
        }
    }

    let key = LimitOrderKey::ByAccount(op.owner.clone(), op.order_id);
    if db.state().limit_orders.id_by_key(&key).is_some() {
        return Err(Error::precondition("order id already in use"));
    }
    db.adjust_balance(&op.owner, -op.amount_to_sell)?;

    let now = db.head_block_time();
    let (seller, order_id, expiration) = (op.owner.clone(), op.order_id, op.expiration);
    let (for_sale, sell_price) = (op.amount_to_sell.amount, op.exchange_rate);
    db.state.limit_orders.create(|o: &mut LimitOrderObject| {
        o.created = now;
        o.expiration = expiration;
        o.seller = seller;
        o.order_id = order_id;
        o.for_sale = for_sale;
        o.sell_price = sell_price;
    });
    let id = db.state().limit_orders.id_by_key(&key).expect("order just created");

    let filled = db.apply_order(id)?;
    if op.fill_or_kill && !filled {
        return Err(Error::precondition("fill-or-kill order was not filled"));
    }
    Ok(())
}

pub(super) fn limit_order_cancel(db: &mut Database, op: &LimitOrderCancelOperation) -> Result<()> {
    let key = LimitOrderKey::ByAccount(op.owner.clone(), op.order_id);
    let id = db
        .state()
        .limit_orders
        .id_by_key(&key)
        .ok_or_else(|| Error::precondition("no such order"))?;
    db.cancel_order(id)
}

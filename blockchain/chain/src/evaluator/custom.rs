// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::Result;
use crate::signals::CustomOperationNotification;
use freezone_message::ops::CustomJsonOperation;

/// The engine only authenticates custom payloads; interpretation belongs to
/// registered observers.
pub(super) fn custom_json(db: &mut Database, op: &CustomJsonOperation) -> Result<()> {
    for name in op.required_auths.iter().chain(&op.required_posting_auths) {
        db.state().get_account(name)?;
    }
    let note = CustomOperationNotification { trx_id: db.current_trx_id, op: op.clone() };
    db.signals.notify_pre_apply_custom_operation(&note)?;
    db.signals.notify_post_apply_custom_operation(&note)?;
    Ok(())
}

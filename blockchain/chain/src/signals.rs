// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Observer dispatch.
//!
//! External components register callbacks against typed hooks and receive
//! notification records by value; callbacks hold no references into state.
//! Delivery is synchronous, in registration order. A failing observer is
//! logged and skipped unless it reports a plugin error, which aborts the
//! notifying operation.

use crate::errors::{Error, Result};
use freezone_blocks::{BlockId, SignedBlock};
use freezone_message::ops::CustomJsonOperation;
use freezone_message::{
    OptionalAction, Operation, RequiredAction, TransactionId, VirtualOperation,
};
use std::fmt;

/// Error surface of an observer callback.
#[derive(Debug)]
pub enum ObserverError {
    /// Aborts the notifying block or transaction.
    Plugin(String),
    /// Logged and swallowed.
    Other(String),
}

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverError::Plugin(msg) => write!(f, "plugin error: {msg}"),
            ObserverError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

pub type ObserverResult = std::result::Result<(), ObserverError>;

#[derive(Debug, Clone)]
pub struct BlockNotification {
    pub block_id: BlockId,
    pub block_num: u32,
    pub block: SignedBlock,
}

impl BlockNotification {
    pub fn new(block: &SignedBlock) -> Self {
        BlockNotification { block_id: block.id(), block_num: block.block_num(), block: block.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionNotification {
    pub transaction_id: TransactionId,
    pub transaction: freezone_message::SignedTransaction,
}

/// Either a user operation or an engine-synthesised virtual operation.
#[derive(Debug, Clone)]
pub enum NotifiedOperation {
    User(Operation),
    Virtual(VirtualOperation),
}

#[derive(Debug, Clone)]
pub struct OperationNotification {
    pub trx_id: TransactionId,
    pub block: u32,
    /// Index of the transaction within the block; `-1` for operations
    /// emitted outside any transaction (maintenance passes).
    pub trx_in_block: i32,
    pub op_in_trx: u32,
    /// Monotonic per-block counter; zero for user operations.
    pub virtual_op: u32,
    pub op: NotifiedOperation,
}

#[derive(Debug, Clone)]
pub struct CustomOperationNotification {
    pub trx_id: TransactionId,
    pub op: CustomJsonOperation,
}

#[derive(Debug, Clone)]
pub struct RequiredActionNotification {
    pub action: RequiredAction,
}

#[derive(Debug, Clone)]
pub struct OptionalActionNotification {
    pub action: OptionalAction,
}

type Observers<N> = Vec<(u64, Box<dyn Fn(&N) -> ObserverResult + Send>)>;

/// Generators invoked at the optional-action generation pass; returned
/// actions are enqueued by hash.
type OptionalGenerator = Box<dyn Fn(&BlockNotification) -> Vec<OptionalAction> + Send>;

#[derive(Default)]
pub struct Signals {
    next_handle: u64,
    pre_apply_block: Observers<BlockNotification>,
    post_apply_block: Observers<BlockNotification>,
    irreversible_block: Observers<u32>,
    pre_apply_transaction: Observers<TransactionNotification>,
    post_apply_transaction: Observers<TransactionNotification>,
    pre_apply_operation: Observers<OperationNotification>,
    post_apply_operation: Observers<OperationNotification>,
    pre_apply_required_action: Observers<RequiredActionNotification>,
    post_apply_required_action: Observers<RequiredActionNotification>,
    pre_apply_optional_action: Observers<OptionalActionNotification>,
    post_apply_optional_action: Observers<OptionalActionNotification>,
    pre_apply_custom_operation: Observers<CustomOperationNotification>,
    post_apply_custom_operation: Observers<CustomOperationNotification>,
    pre_reindex: Observers<u32>,
    post_reindex: Observers<u32>,
    generate_optional_actions: Vec<(u64, OptionalGenerator)>,
}

fn notify<N>(observers: &Observers<N>, what: &'static str, note: &N) -> Result<()> {
    for (_, cb) in observers {
        match cb(note) {
            Ok(()) => {}
            Err(ObserverError::Plugin(msg)) => return Err(Error::Plugin(msg)),
            Err(ObserverError::Other(msg)) => {
                log::warn!("observer on {what} failed: {msg}");
            }
        }
    }
    Ok(())
}

macro_rules! hook {
    ($register:ident, $notify:ident, $field:ident, $ty:ty) => {
        pub fn $register(
            &mut self,
            cb: impl Fn(&$ty) -> ObserverResult + Send + 'static,
        ) -> u64 {
            let handle = self.next_handle;
            self.next_handle += 1;
            self.$field.push((handle, Box::new(cb)));
            handle
        }

        pub(crate) fn $notify(&self, note: &$ty) -> Result<()> {
            notify(&self.$field, stringify!($field), note)
        }
    };
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    hook!(on_pre_apply_block, notify_pre_apply_block, pre_apply_block, BlockNotification);
    hook!(on_post_apply_block, notify_post_apply_block, post_apply_block, BlockNotification);
    hook!(on_irreversible_block, notify_irreversible_block, irreversible_block, u32);
    hook!(
        on_pre_apply_transaction,
        notify_pre_apply_transaction,
        pre_apply_transaction,
        TransactionNotification
    );
    hook!(
        on_post_apply_transaction,
        notify_post_apply_transaction,
        post_apply_transaction,
        TransactionNotification
    );
    hook!(
        on_pre_apply_operation,
        notify_pre_apply_operation,
        pre_apply_operation,
        OperationNotification
    );
    hook!(
        on_post_apply_operation,
        notify_post_apply_operation,
        post_apply_operation,
        OperationNotification
    );
    hook!(
        on_pre_apply_required_action,
        notify_pre_apply_required_action,
        pre_apply_required_action,
        RequiredActionNotification
    );
    hook!(
        on_post_apply_required_action,
        notify_post_apply_required_action,
        post_apply_required_action,
        RequiredActionNotification
    );
    hook!(
        on_pre_apply_optional_action,
        notify_pre_apply_optional_action,
        pre_apply_optional_action,
        OptionalActionNotification
    );
    hook!(
        on_post_apply_optional_action,
        notify_post_apply_optional_action,
        post_apply_optional_action,
        OptionalActionNotification
    );
    hook!(
        on_pre_apply_custom_operation,
        notify_pre_apply_custom_operation,
        pre_apply_custom_operation,
        CustomOperationNotification
    );
    hook!(
        on_post_apply_custom_operation,
        notify_post_apply_custom_operation,
        post_apply_custom_operation,
        CustomOperationNotification
    );
    hook!(on_pre_reindex, notify_pre_reindex, pre_reindex, u32);
    hook!(on_post_reindex, notify_post_reindex, post_reindex, u32);

    /// Registers an optional-action generator (e.g. the token-emission
    /// scheduler).
    pub fn on_generate_optional_actions(
        &mut self,
        generator: impl Fn(&BlockNotification) -> Vec<OptionalAction> + Send + 'static,
    ) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.generate_optional_actions.push((handle, Box::new(generator)));
        handle
    }

    pub(crate) fn run_optional_generators(&self, note: &BlockNotification) -> Vec<OptionalAction> {
        let mut actions = Vec::new();
        for (_, generator) in &self.generate_optional_actions {
            actions.extend(generator(note));
        }
        actions
    }

    /// Deregisters an observer by the handle its registration returned.
    pub fn deregister(&mut self, handle: u64) {
        macro_rules! drop_handle {
            ($($field:ident),+) => {
                $( self.$field.retain(|(h, _)| *h != handle); )+
            };
        }
        drop_handle!(
            pre_apply_block,
            post_apply_block,
            irreversible_block,
            pre_apply_transaction,
            post_apply_transaction,
            pre_apply_operation,
            post_apply_operation,
            pre_apply_required_action,
            post_apply_required_action,
            pre_apply_optional_action,
            post_apply_optional_action,
            pre_apply_custom_operation,
            post_apply_custom_operation,
            pre_reindex,
            post_reindex,
            generate_optional_actions
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn observers_fire_in_registration_order() {
        let mut signals = Signals::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for tag in [1, 2, 3] {
            let order = order.clone();
            signals.on_irreversible_block(move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }
        signals.notify_irreversible_block(&5).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn plain_errors_are_swallowed_plugin_errors_propagate() {
        let mut signals = Signals::new();
        let hits = Arc::new(AtomicU32::new(0));
        signals.on_irreversible_block(|_| Err(ObserverError::Other("broken".into())));
        let hits2 = hits.clone();
        signals.on_irreversible_block(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        signals.notify_irreversible_block(&1).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        signals.on_irreversible_block(|_| Err(ObserverError::Plugin("fatal".into())));
        assert!(signals.notify_irreversible_block(&2).is_err());
    }

    #[test]
    fn deregistration_stops_delivery() {
        let mut signals = Signals::new();
        let hits = Arc::new(AtomicU32::new(0));
        let hits2 = hits.clone();
        let handle = signals.on_irreversible_block(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        signals.notify_irreversible_block(&1).unwrap();
        signals.deregister(handle);
        signals.notify_irreversible_block(&2).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::AccountName;
use serde::{Deserialize, Serialize};

pub const MAX_CUSTOM_JSON_SIZE: usize = 8192;

/// Consensus-neutral payload interpreted by external plugins. The engine
/// only authenticates it and forwards a custom-operation notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomJsonOperation {
    pub required_auths: Vec<AccountName>,
    pub required_posting_auths: Vec<AccountName>,
    pub id: String,
    pub json: String,
}

impl OperationBehavior for CustomJsonOperation {
    fn validate(&self) -> Result<(), Error> {
        if self.required_auths.is_empty() && self.required_posting_auths.is_empty() {
            return Err(Error::validation("at least one authority is required"));
        }
        for name in self.required_auths.iter().chain(&self.required_posting_auths) {
            check_account(name)?;
        }
        if self.id.len() > 32 {
            return Err(Error::validation("custom id is too long"));
        }
        if self.json.len() > MAX_CUSTOM_JSON_SIZE {
            return Err(Error::validation("custom json is too large"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.extend(self.required_auths.iter().cloned());
        auths.posting.extend(self.required_posting_auths.iter().cloned());
    }
}

// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! User operations. Every operation is a variant of the closed [`Operation`]
//! sum type; dispatch anywhere in the engine is an exhaustive match.

pub mod account;
pub mod comment;
pub mod custom;
pub mod escrow;
pub mod market;
pub mod proposal;
pub mod sst;
pub mod transfer;
pub mod witness;

use crate::Error;
use freezone_types::{AccountName, Authority};
use serde::{Deserialize, Serialize};

pub use account::*;
pub use comment::*;
pub use custom::*;
pub use escrow::*;
pub use market::*;
pub use proposal::*;
pub use sst::*;
pub use transfer::*;
pub use witness::*;

/// Authority classes an operation may demand. Collected before signature
/// checking; the resolver then proves each name (or explicit authority) is
/// satisfied by the provided signatures.
#[derive(Debug, Default)]
pub struct RequiredAuthorities {
    pub active: Vec<AccountName>,
    pub owner: Vec<AccountName>,
    pub posting: Vec<AccountName>,
    pub other: Vec<Authority>,
}

/// Structural validation and authority declaration, implemented by every
/// operation. `validate` never touches state.
pub trait OperationBehavior {
    fn validate(&self) -> Result<(), Error>;
    fn required_authorities(&self, auths: &mut RequiredAuthorities);
}

macro_rules! operations {
    ( $( $variant:ident ( $ty:ty ) ),+ $(,)? ) => {
        /// The closed set of user operations.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Operation {
            $( $variant($ty), )+
        }

        impl Operation {
            pub fn validate(&self) -> Result<(), Error> {
                match self {
                    $( Operation::$variant(op) => op.validate(), )+
                }
            }

            pub fn required_authorities(&self, auths: &mut RequiredAuthorities) {
                match self {
                    $( Operation::$variant(op) => op.required_authorities(auths), )+
                }
            }

            /// Stable name used in diagnostics and benchmark labels.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Operation::$variant(_) => stringify!($variant), )+
                }
            }
        }

        $(
            impl From<$ty> for Operation {
                fn from(op: $ty) -> Operation {
                    Operation::$variant(op)
                }
            }
        )+
    };
}

operations! {
    AccountCreate(AccountCreateOperation),
    AccountUpdate(AccountUpdateOperation),
    ClaimAccount(ClaimAccountOperation),
    CreateClaimedAccount(CreateClaimedAccountOperation),
    Transfer(TransferOperation),
    TransferToVesting(TransferToVestingOperation),
    WithdrawVesting(WithdrawVestingOperation),
    SetWithdrawVestingRoute(SetWithdrawVestingRouteOperation),
    DelegateVestingShares(DelegateVestingSharesOperation),
    TransferToSavings(TransferToSavingsOperation),
    TransferFromSavings(TransferFromSavingsOperation),
    CancelTransferFromSavings(CancelTransferFromSavingsOperation),
    Convert(ConvertOperation),
    ClaimRewardBalance(ClaimRewardBalanceOperation),
    LimitOrderCreate(LimitOrderCreateOperation),
    LimitOrderCancel(LimitOrderCancelOperation),
    FeedPublish(FeedPublishOperation),
    WitnessUpdate(WitnessUpdateOperation),
    WitnessSetProperties(WitnessSetPropertiesOperation),
    AccountWitnessVote(AccountWitnessVoteOperation),
    AccountWitnessProxy(AccountWitnessProxyOperation),
    Comment(CommentOperation),
    CommentOptions(CommentOptionsOperation),
    DeleteComment(DeleteCommentOperation),
    Vote(VoteOperation),
    EscrowTransfer(EscrowTransferOperation),
    EscrowApprove(EscrowApproveOperation),
    EscrowDispute(EscrowDisputeOperation),
    EscrowRelease(EscrowReleaseOperation),
    RequestAccountRecovery(RequestAccountRecoveryOperation),
    RecoverAccount(RecoverAccountOperation),
    ChangeRecoveryAccount(ChangeRecoveryAccountOperation),
    DeclineVotingRights(DeclineVotingRightsOperation),
    CustomJson(CustomJsonOperation),
    CreateProposal(CreateProposalOperation),
    UpdateProposalVotes(UpdateProposalVotesOperation),
    RemoveProposal(RemoveProposalOperation),
    SstCreate(SstCreateOperation),
    SstSetup(SstSetupOperation),
    SstSetupIcoTier(SstSetupIcoTierOperation),
    SstSetupEmissions(SstSetupEmissionsOperation),
    SstSetSetupParameters(SstSetSetupParametersOperation),
    SstSetRuntimeParameters(SstSetRuntimeParametersOperation),
    SstContribute(SstContributeOperation),
}

pub(crate) fn check_account(name: &AccountName) -> Result<(), Error> {
    AccountName::new(name.as_str())?;
    Ok(())
}

pub(crate) fn check_memo(memo: &str) -> Result<(), Error> {
    if memo.len() > 2048 {
        return Err(Error::validation("memo is too large"));
    }
    if std::str::from_utf8(memo.as_bytes()).is_err() {
        return Err(Error::validation("memo is not valid utf-8"));
    }
    Ok(())
}

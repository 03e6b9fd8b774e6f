//! Identity provider seam used by the partner invitation workflow.
//!
//! The provider creates (or finds) the portal user for a partner profile and
//! hands back a handle through which the caller refreshes the user and sends
//! the invitation. Two implementations ship here: [`LocalIdentityProvider`]
//! (users live in the partner store, deliveries land in an outbox) and
//! [`HttpIdentityProvider`] (a remote identity service).

use async_trait::async_trait;

use essentials_core::UserId;
use essentials_partners::ProfileId;

use crate::store::StoreError;

pub mod http;
pub mod local;

pub use http::HttpIdentityProvider;
pub use local::{DeliveredInvitation, LocalIdentityProvider};

/// Parameters of an invite call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InviteRequest {
    pub email: String,
    pub profile_id: ProfileId,
    /// Create the user without sending the invitation email yet.
    pub skip_invitation: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity service unreachable: {0}")]
    Network(String),
    #[error("identity service returned {0}: {1}")]
    Api(u16, String),
    #[error("invalid identity service response: {0}")]
    Parse(String),
    #[error("invitation rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handle to a user returned by [`IdentityProvider::invite`].
#[async_trait]
pub trait InvitedUser: Send {
    fn user_id(&self) -> UserId;

    /// Refresh the handle from the provider.
    async fn reload(&mut self) -> Result<(), IdentityError>;

    /// Send the invitation that `invite` deferred.
    async fn deliver_invitation(&mut self) -> Result<(), IdentityError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn invite(&self, request: InviteRequest) -> Result<Box<dyn InvitedUser>, IdentityError>;
}

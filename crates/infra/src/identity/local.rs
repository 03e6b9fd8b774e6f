use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use essentials_core::UserId;
use essentials_partners::PartnerUser;

use super::{IdentityError, IdentityProvider, InviteRequest, InvitedUser};
use crate::store::{PartnerStore, StoreError};

/// An invitation "sent" by the local provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredInvitation {
    pub user_id: UserId,
    pub email: String,
    pub delivered_at: DateTime<Utc>,
}

type Outbox = Arc<Mutex<Vec<DeliveredInvitation>>>;

/// Identity provider backed by the partner store.
///
/// Deliveries are appended to an in-process outbox instead of sending mail.
pub struct LocalIdentityProvider {
    store: Arc<dyn PartnerStore>,
    outbox: Outbox,
}

impl LocalIdentityProvider {
    pub fn new(store: Arc<dyn PartnerStore>) -> Self {
        Self {
            store,
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Invitations delivered so far.
    pub fn deliveries(&self) -> Vec<DeliveredInvitation> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn invite(&self, request: InviteRequest) -> Result<Box<dyn InvitedUser>, IdentityError> {
        let user = PartnerUser::invited(UserId::new(), &request.email, request.profile_id, Utc::now());

        match self.store.insert_user(user.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(IdentityError::Rejected(format!(
                    "a user with email {} already exists",
                    user.email
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, profile_id = %request.profile_id, "local user created");

        let mut handle = LocalInvitedUser {
            store: Arc::clone(&self.store),
            outbox: Arc::clone(&self.outbox),
            user,
        };
        if !request.skip_invitation {
            handle.deliver_invitation().await?;
        }
        Ok(Box::new(handle))
    }
}

struct LocalInvitedUser {
    store: Arc<dyn PartnerStore>,
    outbox: Outbox,
    user: PartnerUser,
}

#[async_trait]
impl InvitedUser for LocalInvitedUser {
    fn user_id(&self) -> UserId {
        self.user.id
    }

    async fn reload(&mut self) -> Result<(), IdentityError> {
        self.user = self
            .store
            .get_user(self.user.id)
            .await?
            .ok_or(IdentityError::Store(StoreError::NotFound))?;
        Ok(())
    }

    async fn deliver_invitation(&mut self) -> Result<(), IdentityError> {
        let now = Utc::now();
        self.store.mark_invitation_sent(self.user.id, now).await?;
        self.user.invitation_sent_at = Some(now);

        self.outbox
            .lock()
            .map_err(|_| StoreError::Storage("outbox lock poisoned".to_string()))?
            .push(DeliveredInvitation {
                user_id: self.user.id,
                email: self.user.email.clone(),
                delivered_at: now,
            });

        info!(user_id = %self.user.id, "invitation delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPartnerStore;
    use essentials_partners::ProfileId;

    fn request(email: &str, skip_invitation: bool) -> InviteRequest {
        InviteRequest {
            email: email.to_string(),
            profile_id: ProfileId::new(),
            skip_invitation,
        }
    }

    #[tokio::test]
    async fn invite_with_skip_creates_user_without_delivery() {
        let store: Arc<dyn PartnerStore> = Arc::new(InMemoryPartnerStore::new());
        let provider = LocalIdentityProvider::new(Arc::clone(&store));

        let handle = provider.invite(request("me@partner.org", true)).await.unwrap();

        let user = store.get_user(handle.user_id()).await.unwrap().unwrap();
        assert_eq!(user.email, "me@partner.org");
        assert!(!user.invitation_sent());
        assert!(provider.deliveries().is_empty());
    }

    #[tokio::test]
    async fn deliver_marks_user_and_fills_outbox() {
        let store: Arc<dyn PartnerStore> = Arc::new(InMemoryPartnerStore::new());
        let provider = LocalIdentityProvider::new(Arc::clone(&store));

        let mut handle = provider.invite(request("me@partner.org", true)).await.unwrap();
        handle.reload().await.unwrap();
        handle.deliver_invitation().await.unwrap();

        let user = store.get_user(handle.user_id()).await.unwrap().unwrap();
        assert!(user.invitation_sent());
        let deliveries = provider.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].user_id, handle.user_id());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store: Arc<dyn PartnerStore> = Arc::new(InMemoryPartnerStore::new());
        let provider = LocalIdentityProvider::new(store);

        provider.invite(request("me@partner.org", true)).await.unwrap();
        let err = provider.invite(request("ME@partner.org", true)).await.err().unwrap();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }
}

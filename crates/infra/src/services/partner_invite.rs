//! Partner invitation workflow.
//!
//! ```text
//! partner (uninvited)
//!   ↓  profile already has a primary user? → AlreadyInvited, nothing changes
//!   ↓
//! IdentityProvider::invite { email, profile, skip_invitation: true }
//!   ↓  failure → ExternalService, nothing changes
//!   ↓
//! status → invited + primary user, saved only if no other invite got there first
//!   ↓  lost the race → AlreadyInvited, nothing delivered
//!   ↓
//! reload user → deliver invitation
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use essentials_core::{OrganizationId, UserId};
use essentials_partners::PartnerId;

use super::ServiceError;
use crate::identity::{IdentityProvider, InviteRequest};
use crate::store::PartnerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InviteOutcome {
    /// The partner already had a primary user; nothing was done.
    AlreadyInvited,
    Invited { user_id: UserId },
}

pub struct PartnerInviteService {
    partners: Arc<dyn PartnerStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl PartnerInviteService {
    pub fn new(partners: Arc<dyn PartnerStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { partners, identity }
    }

    /// Invite the partner's contact to the partner portal. Never retries.
    pub async fn call(&self, organization_id: OrganizationId, partner_id: PartnerId) -> Result<InviteOutcome, ServiceError> {
        let mut partner = self
            .partners
            .get_partner(organization_id, partner_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if partner.has_primary_user() {
            info!(partner_id = %partner.id, "partner already invited");
            return Ok(InviteOutcome::AlreadyInvited);
        }
        if !partner.can_be_invited() {
            warn!(partner_id = %partner.id, status = %partner.status, "invitation refused for partner status");
            return Err(ServiceError::InvariantViolation(format!(
                "partner in status '{}' cannot be invited",
                partner.status
            )));
        }

        let request = InviteRequest {
            email: partner.email.clone(),
            profile_id: partner.profile.id,
            skip_invitation: true,
        };
        let mut user = self.identity.invite(request).await.map_err(|e| {
            warn!(partner_id = %partner.id, error = %e, "identity provider invite failed");
            ServiceError::from(e)
        })?;

        let user_id = user.user_id();
        partner.mark_invited(user_id, Utc::now())?;
        if !self.partners.mark_invited(&partner).await? {
            warn!(partner_id = %partner.id, user_id = %user_id, "concurrent invite already set a primary user; not delivering");
            return Ok(InviteOutcome::AlreadyInvited);
        }
        info!(organization_id = %organization_id, partner_id = %partner.id, user_id = %user_id, "partner invited");

        user.reload().await?;
        user.deliver_invitation().await.map_err(|e| {
            warn!(partner_id = %partner.id, user_id = %user_id, error = %e, "invitation delivery failed");
            ServiceError::from(e)
        })?;

        Ok(InviteOutcome::Invited { user_id })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::identity::{IdentityError, InvitedUser};
    use crate::store::InMemoryPartnerStore;
    use essentials_partners::{Partner, PartnerStatus};

    #[derive(Debug, Default)]
    struct Calls {
        invites: Vec<InviteRequest>,
        reloads: usize,
        deliveries: usize,
    }

    #[derive(Default)]
    struct RecordingIdentity {
        calls: Arc<Mutex<Calls>>,
        fail: bool,
        /// Hold every `invite` until this many callers are inside it.
        rendezvous: Option<Arc<tokio::sync::Barrier>>,
    }

    struct RecordedUser {
        id: UserId,
        calls: Arc<Mutex<Calls>>,
    }

    #[async_trait]
    impl IdentityProvider for RecordingIdentity {
        async fn invite(&self, request: InviteRequest) -> Result<Box<dyn InvitedUser>, IdentityError> {
            self.calls.lock().unwrap().invites.push(request);
            if let Some(barrier) = &self.rendezvous {
                barrier.wait().await;
            }
            if self.fail {
                return Err(IdentityError::Api(503, "unavailable".to_string()));
            }
            Ok(Box::new(RecordedUser {
                id: UserId::new(),
                calls: Arc::clone(&self.calls),
            }))
        }
    }

    #[async_trait]
    impl InvitedUser for RecordedUser {
        fn user_id(&self) -> UserId {
            self.id
        }

        async fn reload(&mut self) -> Result<(), IdentityError> {
            self.calls.lock().unwrap().reloads += 1;
            Ok(())
        }

        async fn deliver_invitation(&mut self) -> Result<(), IdentityError> {
            self.calls.lock().unwrap().deliveries += 1;
            Ok(())
        }
    }

    async fn setup(identity: RecordingIdentity) -> (PartnerInviteService, Arc<InMemoryPartnerStore>, Partner, Arc<Mutex<Calls>>) {
        let store = Arc::new(InMemoryPartnerStore::new());
        let partner = Partner::create(
            PartnerId::new(),
            OrganizationId::new(),
            "Helping Hands",
            "contact@helping-hands.org",
            Utc::now(),
        )
        .unwrap();
        store.insert_partner(partner.clone()).await.unwrap();
        let calls = Arc::clone(&identity.calls);
        let service = PartnerInviteService::new(store.clone(), Arc::new(identity));
        (service, store, partner, calls)
    }

    #[tokio::test]
    async fn uninvited_partner_is_invited_once() {
        let (service, store, partner, calls) = setup(RecordingIdentity::default()).await;

        let outcome = service.call(partner.organization_id, partner.id).await.unwrap();
        let InviteOutcome::Invited { user_id } = outcome else {
            panic!("expected Invited, got {outcome:?}");
        };

        let saved = store.get_partner(partner.organization_id, partner.id).await.unwrap().unwrap();
        assert_eq!(saved.status, PartnerStatus::Invited);
        assert_eq!(saved.profile.primary_user_id, Some(user_id));

        let calls = calls.lock().unwrap();
        assert_eq!(
            calls.invites,
            vec![InviteRequest {
                email: partner.email.clone(),
                profile_id: partner.profile.id,
                skip_invitation: true,
            }]
        );
        assert_eq!(calls.reloads, 1);
        assert_eq!(calls.deliveries, 1);
    }

    #[tokio::test]
    async fn already_invited_partner_is_left_alone() {
        let (service, store, partner, calls) = setup(RecordingIdentity::default()).await;
        service.call(partner.organization_id, partner.id).await.unwrap();
        let before = store.get_partner(partner.organization_id, partner.id).await.unwrap();

        let outcome = service.call(partner.organization_id, partner.id).await.unwrap();
        assert_eq!(outcome, InviteOutcome::AlreadyInvited);
        assert_eq!(store.get_partner(partner.organization_id, partner.id).await.unwrap(), before);
        assert_eq!(calls.lock().unwrap().invites.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_changes_nothing() {
        let identity = RecordingIdentity {
            fail: true,
            ..Default::default()
        };
        let (service, store, partner, calls) = setup(identity).await;

        let err = service.call(partner.organization_id, partner.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ExternalService(_)));

        let saved = store.get_partner(partner.organization_id, partner.id).await.unwrap().unwrap();
        assert_eq!(saved.status, PartnerStatus::Uninvited);
        assert!(!saved.has_primary_user());
        let calls = calls.lock().unwrap();
        assert_eq!((calls.reloads, calls.deliveries), (0, 0));
    }

    #[tokio::test]
    async fn deactivated_partner_is_refused_before_calling_provider() {
        let (service, store, mut partner, calls) = setup(RecordingIdentity::default()).await;
        partner.status = PartnerStatus::Deactivated;
        store.save_partner(&partner).await.unwrap();

        let err = service.call(partner.organization_id, partner.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));
        assert!(calls.lock().unwrap().invites.is_empty());
    }

    #[tokio::test]
    async fn other_organization_cannot_invite() {
        let (service, _, partner, calls) = setup(RecordingIdentity::default()).await;

        let err = service.call(OrganizationId::new(), partner.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
        assert!(calls.lock().unwrap().invites.is_empty());
    }

    #[tokio::test]
    async fn concurrent_invites_deliver_once() {
        let identity = RecordingIdentity {
            rendezvous: Some(Arc::new(tokio::sync::Barrier::new(2))),
            ..Default::default()
        };
        let (service, store, partner, calls) = setup(identity).await;

        let (a, b) = tokio::join!(
            service.call(partner.organization_id, partner.id),
            service.call(partner.organization_id, partner.id),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let winners: Vec<UserId> = outcomes
            .iter()
            .filter_map(|o| match o {
                InviteOutcome::Invited { user_id } => Some(*user_id),
                InviteOutcome::AlreadyInvited => None,
            })
            .collect();
        assert_eq!(winners.len(), 1);
        assert!(outcomes.contains(&InviteOutcome::AlreadyInvited));

        let saved = store.get_partner(partner.organization_id, partner.id).await.unwrap().unwrap();
        assert_eq!(saved.status, PartnerStatus::Invited);
        assert_eq!(saved.profile.primary_user_id, Some(winners[0]));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.invites.len(), 2);
        assert_eq!((calls.reloads, calls.deliveries), (1, 1));
    }
}

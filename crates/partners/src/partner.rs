use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use essentials_core::{DomainError, DomainResult, Entity, OrganizationId, OrganizationScoped, UserId};

essentials_core::entity_id!(
    /// Partner agency identifier (organization-scoped via `organization_id`).
    PartnerId
);

essentials_core::entity_id!(
    /// Partner profile identifier.
    ProfileId
);

/// Partner status lifecycle.
///
/// This system drives `Uninvited -> Invited`; the later states are set by the
/// partner review flow and only matter here as invitation guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    Uninvited,
    Invited,
    AwaitingReview,
    Approved,
    Deactivated,
}

impl PartnerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PartnerStatus::Uninvited => "uninvited",
            PartnerStatus::Invited => "invited",
            PartnerStatus::AwaitingReview => "awaiting_review",
            PartnerStatus::Approved => "approved",
            PartnerStatus::Deactivated => "deactivated",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "uninvited" => Ok(PartnerStatus::Uninvited),
            "invited" => Ok(PartnerStatus::Invited),
            "awaiting_review" => Ok(PartnerStatus::AwaitingReview),
            "approved" => Ok(PartnerStatus::Approved),
            "deactivated" => Ok(PartnerStatus::Deactivated),
            other => Err(DomainError::validation(format!("unknown partner status: {other}"))),
        }
    }
}

impl core::fmt::Display for PartnerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partner's profile. Holds the link to the partner's primary portal user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub primary_user_id: Option<UserId>,
}

/// A partner agency that receives distributions from an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: String,
    pub status: PartnerStatus,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    /// Register a new, uninvited partner.
    pub fn create(
        id: PartnerId,
        organization_id: OrganizationId,
        name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = Vec::new();

        let name = name.trim();
        if name.is_empty() {
            errors.push("name can't be blank".to_string());
        }
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            errors.push("email is invalid".to_string());
        }

        if let Some(err) = DomainError::from_messages(errors) {
            return Err(err);
        }

        Ok(Self {
            id,
            organization_id,
            name: name.to_string(),
            email,
            status: PartnerStatus::Uninvited,
            profile: Profile {
                id: ProfileId::new(),
                primary_user_id: None,
            },
            created_at: now,
            updated_at: now,
        })
    }

    /// A partner counts as invited once its profile has a primary user.
    pub fn has_primary_user(&self) -> bool {
        self.profile.primary_user_id.is_some()
    }

    /// Whether an invitation may be issued from the current status.
    pub fn can_be_invited(&self) -> bool {
        matches!(self.status, PartnerStatus::Uninvited | PartnerStatus::Invited)
    }

    /// Record a successful invitation: status becomes `Invited` and the invited
    /// user becomes the profile's primary user.
    pub fn mark_invited(&mut self, user_id: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.can_be_invited() {
            return Err(DomainError::invariant(format!(
                "partner in status '{}' cannot be invited",
                self.status
            )));
        }
        self.status = PartnerStatus::Invited;
        self.profile.primary_user_id = Some(user_id);
        self.updated_at = now;
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

impl Entity for Partner {
    type Id = PartnerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OrganizationScoped for Partner {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

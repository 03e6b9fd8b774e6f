use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use essentials_core::{Entity, UserId};

use crate::ProfileId;

/// Portal user attached to a partner profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerUser {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub profile_id: ProfileId,
    pub invitation_sent_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PartnerUser {
    /// A freshly invited user whose invitation has not been sent yet.
    pub fn invited(id: UserId, email: &str, profile_id: ProfileId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: email.trim().to_lowercase(),
            name: None,
            profile_id,
            invitation_sent_at: None,
            last_sign_in_at: None,
            created_at: now,
        }
    }

    pub fn invitation_sent(&self) -> bool {
        self.invitation_sent_at.is_some()
    }
}

impl Entity for PartnerUser {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

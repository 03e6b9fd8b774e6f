use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use essentials_core::UserId;

use super::{IdentityError, IdentityProvider, InviteRequest, InvitedUser};

/// User record as returned by the identity service.
#[derive(Debug, Clone, Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    invitation_sent_at: Option<DateTime<Utc>>,
}

/// Identity provider that delegates to a remote identity service.
///
/// Endpoints (relative to the base URL):
/// - `POST /invitations` with an [`InviteRequest`] body, returns the user
/// - `GET /users/{id}`
/// - `POST /users/{id}/deliver_invitation`
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, IdentityError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "identity service request failed");
        return Err(IdentityError::Api(status.as_u16(), body));
    }
    resp.json().await.map_err(|e| IdentityError::Parse(e.to_string()))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn invite(&self, request: InviteRequest) -> Result<Box<dyn InvitedUser>, IdentityError> {
        let url = format!("{}/invitations", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        let user: RemoteUser = read_json(resp).await?;

        Ok(Box::new(HttpInvitedUser {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            user,
        }))
    }
}

struct HttpInvitedUser {
    client: Client,
    base_url: String,
    user: RemoteUser,
}

impl HttpInvitedUser {
    fn user_url(&self) -> String {
        format!("{}/users/{}", self.base_url, self.user.id)
    }
}

#[async_trait]
impl InvitedUser for HttpInvitedUser {
    fn user_id(&self) -> UserId {
        UserId::from_uuid(self.user.id)
    }

    async fn reload(&mut self) -> Result<(), IdentityError> {
        let resp = self
            .client
            .get(self.user_url())
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        self.user = read_json(resp).await?;
        Ok(())
    }

    async fn deliver_invitation(&mut self) -> Result<(), IdentityError> {
        let url = format!("{}/deliver_invitation", self.user_url());
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        self.user = read_json(resp).await?;
        if self.user.invitation_sent_at.is_none() {
            return Err(IdentityError::Rejected("invitation was not sent".to_string()));
        }
        Ok(())
    }
}

//! Clerk Backend API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::types::{
    ApiErrorBody, CreateMembershipRequest, CreateOrganizationRequest, CreateUserRequest,
    ObjectWithId,
};
use crate::{
    GatewayError, IdentityGateway, IdentityHandle, MembershipRole, NewIdentity, OrganizationId,
};

/// Base URL of the hosted Clerk Backend API.
pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

/// Which Clerk instance a secret key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEnvironment {
    Production,
    Development,
}

impl KeyEnvironment {
    /// Classify a secret key by its prefix. Returns `None` for strings that
    /// are not Clerk secret keys at all.
    pub fn of_secret_key(key: &str) -> Option<Self> {
        if key.starts_with("sk_live_") {
            Some(KeyEnvironment::Production)
        } else if key.starts_with("sk_test_") {
            Some(KeyEnvironment::Development)
        } else {
            None
        }
    }
}

/// Client for the Clerk Backend API.
pub struct ClerkClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl ClerkClient {
    /// Create a new client for the given API base URL.
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle an API response, translating failures into [`GatewayError`].
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(GatewayError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                GatewayError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;

            // Prefer the structured error message when the body has one
            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&text)
                && let Some(detail) = body.errors.into_iter().next()
            {
                return Err(GatewayError::Api {
                    status: status.as_u16(),
                    code: detail.code,
                    message: detail.long_message.unwrap_or(detail.message),
                });
            }

            return Err(GatewayError::Api {
                status: status.as_u16(),
                code: None,
                message: text,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl IdentityGateway for ClerkClient {
    async fn create_organization(
        &self,
        name: &str,
        created_by: &str,
    ) -> Result<OrganizationId, GatewayError> {
        let created: ObjectWithId = self
            .post(
                "/organizations",
                &CreateOrganizationRequest { name, created_by },
            )
            .await?;

        debug!(organization_id = %created.id, name = %name, "created organization");
        Ok(OrganizationId(created.id))
    }

    async fn create_identity(
        &self,
        identity: &NewIdentity<'_>,
    ) -> Result<IdentityHandle, GatewayError> {
        let result: Result<ObjectWithId, _> = self
            .post("/users", &CreateUserRequest::from(identity))
            .await;

        match result {
            Ok(created) => {
                debug!(user_id = %created.id, email = %identity.email, "created user");
                Ok(IdentityHandle(created.id))
            }
            Err(GatewayError::Api {
                status: 422,
                message,
                ..
            }) => Err(GatewayError::Conflict(message)),
            Err(e) => Err(e),
        }
    }

    async fn create_membership(
        &self,
        organization: &OrganizationId,
        identity: &IdentityHandle,
        role: MembershipRole,
    ) -> Result<(), GatewayError> {
        let path = format!("/organizations/{}/memberships", organization);
        let _: serde_json::Value = self
            .post(
                &path,
                &CreateMembershipRequest {
                    user_id: identity.as_str(),
                    role,
                },
            )
            .await?;

        debug!(
            organization_id = %organization,
            user_id = %identity,
            role = role.as_str(),
            "created membership"
        );
        Ok(())
    }
}

//! Recording test doubles for the store and the identity gateway.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use idmigrate_gateway::{
    GatewayError, IdentityGateway, IdentityHandle, MembershipRole, NewIdentity, OrganizationId,
};
use idmigrate_pipeline::{LogEntry, LogSink, Pipeline, PipelineSettings, RunContext};
use idmigrate_store::{SourceLogin, SourceStore, SourceUser, StoreError};

pub fn user(id: i64, company: &str) -> SourceUser {
    SourceUser {
        id,
        email: format!("owner{id}@example.test"),
        first_name: "Owner".to_string(),
        last_name: format!("{id}"),
        password: "$2b$10$owner".to_string(),
        company: company.to_string(),
        organization_id: None,
    }
}

pub fn login(id: i64, seller_id: i64) -> SourceLogin {
    SourceLogin {
        id,
        email: format!("login{id}@example.test"),
        first_name: "Login".to_string(),
        last_name: format!("{id}"),
        password: format!("$2b$10$login{id}"),
        seller_id,
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
pub struct StoreState {
    pub users: Vec<SourceUser>,
    pub logins: Vec<SourceLogin>,
    pub persist_calls: Vec<(i64, OrganizationId)>,
    pub fetch_logins_calls: Vec<i64>,
    pub fail_persist: bool,
    pub fail_fetch_logins: bool,
    pub closed: bool,
}

/// In-memory store with the same write semantics as the SQL store.
#[derive(Clone, Default)]
pub struct FakeStore {
    pub state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    pub fn new(users: Vec<SourceUser>, logins: Vec<SourceLogin>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.users = users;
            state.logins = logins;
        }
        store
    }

    pub fn persist_calls(&self) -> Vec<(i64, OrganizationId)> {
        self.state.lock().unwrap().persist_calls.clone()
    }

    pub fn fetch_logins_calls(&self) -> Vec<i64> {
        self.state.lock().unwrap().fetch_logins_calls.clone()
    }

    pub fn organization_of(&self, user_id: i64) -> Option<OrganizationId> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.organization_id.clone())
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl SourceStore for FakeStore {
    async fn fetch_users(&self, offset: u64) -> Result<Vec<SourceUser>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut users = state.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users.into_iter().skip(offset as usize).collect())
    }

    async fn fetch_logins_for_user(&self, user_id: i64) -> Result<Vec<SourceLogin>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.fetch_logins_calls.push(user_id);
        if state.fail_fetch_logins {
            return Err(unavailable());
        }
        Ok(state
            .logins
            .iter()
            .filter(|l| l.seller_id == user_id)
            .cloned()
            .collect())
    }

    async fn persist_organization_id(
        &self,
        user_id: i64,
        organization: &OrganizationId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.persist_calls.push((user_id, organization.clone()));
        if state.fail_persist {
            return Err(unavailable());
        }

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::UserNotFound { user_id })?;
        match &user.organization_id {
            Some(existing) if existing != organization => {
                Err(StoreError::OrganizationAlreadyAssigned { user_id })
            }
            _ => {
                user.organization_id = Some(organization.clone());
                Ok(())
            }
        }
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// A scripted gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Conflict,
    RateLimited,
    Fatal(&'static str),
}

impl Reply {
    fn into_error(self) -> Option<GatewayError> {
        match self {
            Reply::Ok => None,
            Reply::Conflict => Some(GatewayError::Conflict("already exists".to_string())),
            Reply::RateLimited => Some(GatewayError::RateLimited {
                retry_after_secs: None,
            }),
            Reply::Fatal(message) => Some(GatewayError::api(500, message)),
        }
    }
}

#[derive(Default)]
pub struct GatewayState {
    pub organization_replies: VecDeque<Reply>,
    pub identity_replies: HashMap<String, VecDeque<Reply>>,
    pub membership_replies: VecDeque<Reply>,
    /// Emails that have been created, so later attempts conflict like the real service.
    pub existing_identities: HashMap<String, IdentityHandle>,

    pub organization_calls: Vec<(String, String)>,
    pub identity_calls: Vec<String>,
    pub membership_calls: Vec<(OrganizationId, IdentityHandle, MembershipRole)>,
    next_id: u64,
}

/// Gateway double. Unscripted calls succeed; created identities conflict
/// on the next attempt.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    pub fn script_organization(&self, replies: impl IntoIterator<Item = Reply>) {
        self.state
            .lock()
            .unwrap()
            .organization_replies
            .extend(replies);
    }

    pub fn script_identity(&self, email: &str, replies: impl IntoIterator<Item = Reply>) {
        self.state
            .lock()
            .unwrap()
            .identity_replies
            .entry(email.to_string())
            .or_default()
            .extend(replies);
    }

    pub fn script_membership(&self, replies: impl IntoIterator<Item = Reply>) {
        self.state
            .lock()
            .unwrap()
            .membership_replies
            .extend(replies);
    }

    pub fn organization_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().organization_calls.clone()
    }

    pub fn identity_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().identity_calls.clone()
    }

    pub fn membership_calls(&self) -> Vec<(OrganizationId, IdentityHandle, MembershipRole)> {
        self.state.lock().unwrap().membership_calls.clone()
    }
}

#[async_trait]
impl IdentityGateway for FakeGateway {
    async fn create_organization(
        &self,
        name: &str,
        created_by: &str,
    ) -> Result<OrganizationId, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state
            .organization_calls
            .push((name.to_string(), created_by.to_string()));

        let reply = state.organization_replies.pop_front().unwrap_or(Reply::Ok);
        if let Some(e) = reply.into_error() {
            return Err(e);
        }
        state.next_id += 1;
        Ok(OrganizationId(format!("org_{}", state.next_id)))
    }

    async fn create_identity(
        &self,
        identity: &NewIdentity<'_>,
    ) -> Result<IdentityHandle, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.identity_calls.push(identity.email.to_string());

        let scripted = state
            .identity_replies
            .get_mut(identity.email)
            .and_then(|replies| replies.pop_front());
        let reply = match scripted {
            Some(reply) => reply,
            None if state.existing_identities.contains_key(identity.email) => Reply::Conflict,
            None => Reply::Ok,
        };
        if let Some(e) = reply.into_error() {
            return Err(e);
        }

        state.next_id += 1;
        let handle = IdentityHandle(format!("user_{}", state.next_id));
        state
            .existing_identities
            .insert(identity.email.to_string(), handle.clone());
        Ok(handle)
    }

    async fn create_membership(
        &self,
        organization: &OrganizationId,
        identity: &IdentityHandle,
        role: MembershipRole,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state
            .membership_calls
            .push((organization.clone(), identity.clone(), role));

        let reply = state.membership_replies.pop_front().unwrap_or(Reply::Ok);
        match reply.into_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

pub fn settings() -> PipelineSettings {
    PipelineSettings::default()
}

pub fn pipeline(
    store: &FakeStore,
    gateway: &FakeGateway,
    settings: PipelineSettings,
) -> Pipeline<FakeStore, FakeGateway> {
    Pipeline::new(store.clone(), gateway.clone(), settings)
}

pub fn context(dir: &tempfile::TempDir) -> RunContext {
    RunContext::start(dir.path()).unwrap()
}

pub fn entries(ctx: &RunContext) -> Vec<LogEntry> {
    LogSink::read_entries(ctx.log_path()).unwrap()
}

//! The per-user migration state machine.

use std::time::Duration;

use idmigrate_gateway::{
    GatewayError, GatewayErrorKind, IdentityGateway, MembershipRole, OrganizationId,
};
use idmigrate_store::{SourceLogin, SourceStore, SourceUser, StoreError};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{LogEntry, LogSinkError, PipelineError, RunContext, RunSummary};

/// Tuning knobs for a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Pause after every login attempt.
    pub inter_login_delay: Duration,
    /// Pause before restarting a user that hit a rate limit.
    pub rate_limit_retry_delay: Duration,
    /// Number of users (ordered by id) to skip.
    pub resume_offset: u64,
    /// Give up on a user after this many rate-limit restarts. `None` retries forever.
    pub max_rate_limit_restarts: Option<u32>,
    pub membership_role: MembershipRole,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            inter_login_delay: Duration::from_millis(1000),
            rate_limit_retry_delay: Duration::from_millis(10_000),
            resume_offset: 0,
            max_rate_limit_restarts: None,
            membership_role: MembershipRole::BasicMember,
        }
    }
}

/// What happened to a single login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Migrated,
    AlreadyExists,
    Failed,
}

/// What happened to a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOutcome {
    /// Every login was attempted (individual logins may still have failed).
    Completed,
    /// The user was abandoned; the reason is in the run log.
    Failed,
}

/// Preview of what a run would do, computed without side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPreview {
    pub users: usize,
    pub organizations_to_create: usize,
    pub logins_to_attempt: usize,
    /// Human-readable descriptions of changes.
    pub changes: Vec<String>,
}

/// Why one pass over a user stopped early.
#[derive(Debug, Error)]
enum UserError {
    #[error("{0}")]
    RateLimited(GatewayError),

    #[error("failed to create organization: {0}")]
    Organization(GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    LogSink(#[from] LogSinkError),
}

/// Migrates users and their logins from a [`SourceStore`] into an
/// [`IdentityGateway`], one record at a time.
pub struct Pipeline<S, G> {
    store: S,
    gateway: G,
    settings: PipelineSettings,
}

impl<S: SourceStore, G: IdentityGateway> Pipeline<S, G> {
    pub fn new(store: S, gateway: G, settings: PipelineSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Migrate every user past the resume offset.
    ///
    /// Per-user failures are written to the run log and skipped. Only store
    /// and log sink errors abort the run.
    pub async fn run(&self, ctx: &mut RunContext) -> Result<RunSummary, PipelineError> {
        let offset = self.settings.resume_offset;
        let mut users = self.store.fetch_users(offset).await?;
        let total = users.len();
        info!(total, offset, "loaded users");

        for (index, user) in users.iter_mut().enumerate() {
            info!(
                user_id = user.id,
                position = index + 1,
                total,
                resume_offset = offset + index as u64,
                "migrating user"
            );
            self.migrate_user(user, ctx).await?;
            ctx.counters.users_processed += 1;
        }

        let summary = ctx.summary();
        info!(
            migrated = summary.counters.migrated,
            already_exists = summary.counters.already_exists,
            "run complete"
        );
        Ok(summary)
    }

    /// Migrate one user, restarting from the top whenever the identity
    /// service rate limits us.
    ///
    /// Restarting re-attempts logins that already succeeded on the previous
    /// pass. That is only safe because the gateway reports an existing
    /// identity as a conflict instead of creating a duplicate; a backend
    /// without duplicate detection would need to resume mid-list instead.
    pub async fn migrate_user(
        &self,
        user: &mut SourceUser,
        ctx: &mut RunContext,
    ) -> Result<UserOutcome, PipelineError> {
        let mut restarts: u32 = 0;

        loop {
            let error = match self.migrate_user_once(user, ctx).await {
                Ok(()) => return Ok(UserOutcome::Completed),
                Err(e) => e,
            };

            match error {
                UserError::RateLimited(e) => {
                    if let Some(max) = self.settings.max_rate_limit_restarts
                        && restarts >= max
                    {
                        error!(user_id = user.id, restarts, "giving up after repeated rate limiting");
                        ctx.counters.users_failed += 1;
                        ctx.log(
                            LogEntry::user(
                                user.id,
                                format!("gave up after {} rate limit restarts", restarts),
                            )
                            .with_error(&e),
                        )?;
                        return Ok(UserOutcome::Failed);
                    }

                    restarts += 1;
                    ctx.counters.rate_limit_restarts += 1;
                    warn!(
                        user_id = user.id,
                        attempt = restarts,
                        delay_ms = self.settings.rate_limit_retry_delay.as_millis() as u64,
                        error = %e,
                        "rate limited, restarting user"
                    );
                    sleep(self.settings.rate_limit_retry_delay).await;
                }
                e @ (UserError::Organization(_)
                | UserError::Store(
                    StoreError::OrganizationAlreadyAssigned { .. }
                    | StoreError::UserNotFound { .. },
                )) => {
                    error!(user_id = user.id, error = %e, "user migration failed");
                    ctx.counters.users_failed += 1;
                    ctx.log(LogEntry::user(user.id, "user migration failed").with_error(&e))?;
                    return Ok(UserOutcome::Failed);
                }
                UserError::Store(e) => return Err(e.into()),
                UserError::LogSink(e) => return Err(e.into()),
            }
        }
    }

    /// One pass: ensure the organization, then attempt every login.
    async fn migrate_user_once(
        &self,
        user: &mut SourceUser,
        ctx: &mut RunContext,
    ) -> Result<(), UserError> {
        let organization = self.ensure_organization(user, ctx).await?;
        let logins = self.store.fetch_logins_for_user(user.id).await?;
        debug!(user_id = user.id, logins = logins.len(), "loaded logins");

        for login in &logins {
            let outcome = self.process_login(login, &organization, ctx).await?;
            debug!(login_id = login.id, ?outcome, "processed login");
            sleep(self.settings.inter_login_delay).await;
        }

        Ok(())
    }

    /// Return the user's organization, creating and recording it if needed.
    ///
    /// The id is written back to the store before any login is processed and
    /// then kept on `user`, so a restart reuses it.
    async fn ensure_organization(
        &self,
        user: &mut SourceUser,
        ctx: &mut RunContext,
    ) -> Result<OrganizationId, UserError> {
        if let Some(organization) = &user.organization_id {
            return Ok(organization.clone());
        }

        let organization = self
            .gateway
            .create_organization(&user.company, &user.email)
            .await
            .map_err(|e| match e.kind() {
                GatewayErrorKind::RateLimited => UserError::RateLimited(e),
                _ => UserError::Organization(e),
            })?;

        if let Err(e) = self
            .store
            .persist_organization_id(user.id, &organization)
            .await
        {
            // The organization exists upstream now; leave a trail to it
            ctx.log(
                LogEntry::user(
                    user.id,
                    format!("created organization {} but could not record it", organization),
                )
                .with_error(&e),
            )?;
            return Err(e.into());
        }

        ctx.counters.organizations_created += 1;
        info!(user_id = user.id, organization_id = %organization, "created organization");
        user.organization_id = Some(organization.clone());
        Ok(organization)
    }

    /// Create the identity for one login and add it to the organization.
    async fn process_login(
        &self,
        login: &SourceLogin,
        organization: &OrganizationId,
        ctx: &mut RunContext,
    ) -> Result<LoginOutcome, UserError> {
        let identity = match self
            .gateway
            .create_identity(&login.as_new_identity())
            .await
        {
            Ok(identity) => identity,
            Err(e) => match e.kind() {
                GatewayErrorKind::Conflict => {
                    ctx.counters.already_exists += 1;
                    ctx.log(LogEntry::login(login.id, "login already exists").with_error(&e))?;
                    return Ok(LoginOutcome::AlreadyExists);
                }
                GatewayErrorKind::RateLimited => return Err(UserError::RateLimited(e)),
                GatewayErrorKind::Fatal => {
                    error!(login_id = login.id, error = %e, "failed to create user");
                    ctx.counters.logins_failed += 1;
                    ctx.log(LogEntry::login(login.id, "failed to create user").with_error(&e))?;
                    return Ok(LoginOutcome::Failed);
                }
            },
        };

        match self
            .gateway
            .create_membership(organization, &identity, self.settings.membership_role)
            .await
        {
            Ok(()) => {
                ctx.counters.migrated += 1;
                Ok(LoginOutcome::Migrated)
            }
            Err(e) if e.is_rate_limited() => {
                // The restart will see this identity as existing and skip the
                // membership, so record the orphan for manual follow-up.
                warn!(
                    login_id = login.id,
                    identity = %identity,
                    error = %e,
                    "membership rate limited"
                );
                ctx.log(LogEntry::login(
                    login.id,
                    format!(
                        "user {} created without membership in {}, add it manually",
                        identity, organization
                    ),
                ))?;
                Err(UserError::RateLimited(e))
            }
            Err(e) => {
                error!(login_id = login.id, error = %e, "failed to create membership");
                ctx.counters.logins_failed += 1;
                ctx.log(
                    LogEntry::login(
                        login.id,
                        format!("user {} created but membership failed", identity),
                    )
                    .with_error(&e),
                )?;
                Ok(LoginOutcome::Failed)
            }
        }
    }

    /// Count what a run would do, without calling the gateway or writing anything.
    pub async fn preview(&self) -> Result<MigrationPreview, PipelineError> {
        let users = self.store.fetch_users(self.settings.resume_offset).await?;
        let mut preview = MigrationPreview {
            users: users.len(),
            ..Default::default()
        };

        for user in &users {
            let logins = self.store.fetch_logins_for_user(user.id).await?;
            preview.logins_to_attempt += logins.len();

            match &user.organization_id {
                Some(organization) => preview.changes.push(format!(
                    "User {} ({}): reuse organization {}, attempt {} login(s)",
                    user.id,
                    user.email,
                    organization,
                    logins.len()
                )),
                None => {
                    preview.organizations_to_create += 1;
                    preview.changes.push(format!(
                        "User {} ({}): create organization '{}', attempt {} login(s)",
                        user.id,
                        user.email,
                        user.company,
                        logins.len()
                    ));
                }
            }
        }

        Ok(preview)
    }
}

//! Identity gateway for idmigrate.
//!
//! This crate provides the narrow slice of the Clerk Backend API the
//! migration needs: creating organizations, creating users from existing
//! password digests, and linking the two through memberships.
//!
//! ## Features
//!
//! - **Gateway trait**: [`IdentityGateway`], the capability surface the pipeline calls
//! - **HTTP Client**: [`ClerkClient`], a reqwest-based implementation
//! - **Error taxonomy**: provider status codes folded into [`GatewayErrorKind`]

mod client;
mod error;
mod gateway;
mod types;

pub use client::{ClerkClient, DEFAULT_CLERK_API_URL, KeyEnvironment};
pub use error::{GatewayError, GatewayErrorKind};
pub use gateway::IdentityGateway;
pub use types::*;

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Request Context
//!
//! Explicit tenant and actor context threaded through every service call.
//! There is no ambient or thread-local tenant: a call without a resolvable
//! tenant fails before touching any aggregate.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{TenantId, UserId};

/// Errors resolving a request context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Caller identity carried no tenant
    #[error("tenant context unavailable")]
    TenantContextUnavailable,

    /// Caller identity carried no user
    #[error("user context unavailable")]
    UserContextUnavailable,
}

/// Identity and tracing context for a single service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Tenant every touched aggregate must belong to
    pub tenant_id: TenantId,

    /// Acting user
    pub user_id: UserId,

    /// Correlation ID for the whole flow this call belongs to
    pub correlation_id: Uuid,
}

impl RequestContext {
    /// Build a context with a fresh correlation ID
    pub fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self {
            tenant_id,
            user_id,
            correlation_id: Uuid::now_v7(),
        }
    }

    /// Build a context from authentication claims.
    ///
    /// Claims are optional at the transport layer; absence is an error
    /// here, never a default tenant.
    pub fn from_claims(
        tenant_id: Option<TenantId>,
        user_id: Option<UserId>,
    ) -> Result<Self, ContextError> {
        let tenant_id = tenant_id.ok_or(ContextError::TenantContextUnavailable)?;
        let user_id = user_id.ok_or(ContextError::UserContextUnavailable)?;
        Ok(Self::new(tenant_id, user_id))
    }

    /// The same identity under an existing correlation ID
    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

//! Named authorization policies over a principal's claims

use super::{ClaimsPrincipal, ROLE_CLAIM, SCOPE_CLAIM};
use log::debug;
use std::collections::HashMap;

pub const RECORDS_ADMIN: &str = "records-admin";
pub const RECORDS_USER: &str = "records-user";
pub const RECORDS_SCOPE: &str = "records-scope";

/// The predicate a policy requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A `role` claim with exactly this value
    RoleEquals(String),
    /// A `scope` claim with exactly this value
    ScopeEquals(String),
}

impl Requirement {
    pub fn is_satisfied_by(&self, principal: &ClaimsPrincipal) -> bool {
        match self {
            Requirement::RoleEquals(role) => principal.has_claim(ROLE_CLAIM, role),
            Requirement::ScopeEquals(scope) => principal.has_claim(SCOPE_CLAIM, scope),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Policies registered at startup, looked up by name
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Requirement>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The policies guarding the data event record API
    pub fn records() -> Self {
        Self::new()
            .with_policy(
                RECORDS_ADMIN,
                Requirement::RoleEquals("records.admin".to_string()),
            )
            .with_policy(
                RECORDS_USER,
                Requirement::RoleEquals("records.user".to_string()),
            )
            .with_policy(
                RECORDS_SCOPE,
                Requirement::ScopeEquals("records".to_string()),
            )
    }

    pub fn with_policy(mut self, name: impl Into<String>, requirement: Requirement) -> Self {
        self.policies.insert(name.into(), requirement);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    /// Evaluate the named policy. Unknown policies deny.
    pub fn evaluate(&self, name: &str, principal: &ClaimsPrincipal) -> Decision {
        match self.policies.get(name) {
            Some(requirement) if requirement.is_satisfied_by(principal) => Decision::Allow,
            Some(_) => Decision::Deny,
            None => {
                debug!("Policy '{}' is not registered, denying", name);
                Decision::Deny
            }
        }
    }
}

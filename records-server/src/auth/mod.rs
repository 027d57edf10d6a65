//! Claims-based authentication and authorization
//!
//! Bearer tokens are validated by the authority's introspection endpoint
//! (RFC 7662). An active token yields a [`ClaimsPrincipal`], which named
//! [`policy`] predicates are then evaluated against.

pub mod cache;
pub mod introspection;
pub mod policy;

use crate::errors::ApiError;
use axum::extract::FromRequestParts;
use http::request::Parts;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Claim types the policies look at
pub const ROLE_CLAIM: &str = "role";
pub const SCOPE_CLAIM: &str = "scope";

/// Introspection response fields that describe the response itself rather
/// than the subject
const NON_CLAIM_FIELDS: &[&str] = &["active"];

/// A single named attribute of an authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// The set of claims attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimsPrincipal {
    claims: Vec<Claim>,
    name_claim_type: String,
}

impl ClaimsPrincipal {
    pub fn new(claims: Vec<Claim>, name_claim_type: impl Into<String>) -> Self {
        Self {
            claims,
            name_claim_type: name_claim_type.into(),
        }
    }

    /// Build a principal from the fields of an active introspection response.
    ///
    /// Arrays become one claim per element, `scope` strings are split on
    /// whitespace, other scalars keep their JSON text.
    pub fn from_introspection(fields: &Map<String, Value>, name_claim_type: &str) -> Self {
        let mut claims = Vec::new();
        for (claim_type, value) in fields {
            if NON_CLAIM_FIELDS.contains(&claim_type.as_str()) {
                continue;
            }
            push_claims(&mut claims, claim_type, value);
        }
        Self::new(claims, name_claim_type)
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Whether a claim with exactly this type and value is present
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims
            .iter()
            .any(|c| c.claim_type == claim_type && c.value == value)
    }

    /// First value of the given claim type
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Display identity, read from the configured name claim
    pub fn name(&self) -> Option<&str> {
        self.find_first(&self.name_claim_type)
    }
}

fn push_claims(claims: &mut Vec<Claim>, claim_type: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) if claim_type == SCOPE_CLAIM => {
            claims.extend(s.split_whitespace().map(|s| Claim::new(claim_type, s)));
        }
        Value::String(s) => claims.push(Claim::new(claim_type, s.as_str())),
        Value::Array(values) => {
            for value in values {
                push_claims(claims, claim_type, value);
            }
        }
        other => claims.push(Claim::new(claim_type, other.to_string())),
    }
}

/// Outcome of the authentication stage, stored in the request extensions
#[derive(Debug, Clone)]
pub enum Authentication {
    /// No bearer token was presented
    Anonymous,
    /// A token was presented but is inactive or could not be introspected
    Rejected,
    Authenticated(ClaimsPrincipal),
}

impl Authentication {
    pub fn principal(&self) -> Option<&ClaimsPrincipal> {
        match self {
            Authentication::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClaimsPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authentication>()
            .and_then(Authentication::principal)
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required", "Bearer"))
    }
}

//! Enforcement gate
//!
//! The boundary check invoked per protected operation. A gate evaluates a
//! [`Requirement`] against the resolver and yields a terminal
//! [`Decision`]: `Unauthenticated` when no principal is bound to the call,
//! `Forbidden` (carrying the failing requirement for diagnostics) when the
//! principal lacks it, `Allowed` otherwise. Evaluation is a pure decision
//! function with no side effects beyond the returned value, so gates
//! compose: [`Gate::check_all`] stacks requirements with AND semantics.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccessResult;
use crate::resolver::Resolver;

/// What a protected operation requires: a permission or a role, by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Requirement {
    /// The principal's effective permission set must contain this name
    Permission(String),

    /// The principal must hold a role with this name
    Role(String),
}

impl Requirement {
    /// Require a permission by name.
    pub fn permission(name: impl Into<String>) -> Self {
        Self::Permission(name.into())
    }

    /// Require a role by name.
    pub fn role(name: impl Into<String>) -> Self {
        Self::Role(name.into())
    }

    /// The required name, whichever kind it is.
    pub fn name(&self) -> &str {
        match self {
            Self::Permission(name) | Self::Role(name) => name,
        }
    }
}

/// Terminal outcome of a gate evaluation.
///
/// `Forbidden` names the failing requirement and nothing else; it never
/// leaks unrelated permission data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The check passed; the operation may proceed
    Allowed,

    /// The principal lacks the requirement
    Forbidden {
        /// The requirement that failed, for diagnostics
        requirement: Requirement,
    },

    /// No principal is bound to the call context
    Unauthenticated,
}

impl Decision {
    /// Returns true if the operation may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// A principal as yielded by the session/credential collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    /// Principal id
    pub id: Uuid,

    /// Guard the principal authenticated under
    pub guard: String,
}

/// The session/credential collaborator: maps the incoming call to an
/// authenticated principal, or signals that none is bound.
///
/// Token and session mechanics live entirely on the implementing side;
/// the gate only consumes the resulting principal id and guard.
pub trait PrincipalSource: Send + Sync {
    /// The principal bound to the current call, if any.
    fn current_principal(&self) -> Option<AuthenticatedPrincipal>;
}

/// Evaluates requirements against the resolver.
#[derive(Clone)]
pub struct Gate {
    resolver: Resolver,
}

impl Gate {
    /// Create a gate over a resolver.
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Evaluate one requirement for an optionally-bound principal.
    ///
    /// The authentication check always runs first: an unbound principal
    /// yields `Unauthenticated` regardless of the requirement.
    pub fn check(
        &self,
        principal: Option<Uuid>,
        requirement: &Requirement,
        guard: &str,
    ) -> AccessResult<Decision> {
        let principal = match principal {
            Some(principal) => principal,
            None => return Ok(Decision::Unauthenticated),
        };

        let satisfied = match requirement {
            Requirement::Permission(name) => {
                self.resolver.has_permission(principal, name, guard)?
            }
            Requirement::Role(name) => self.resolver.has_role(principal, name, guard)?,
        };

        if satisfied {
            Ok(Decision::Allowed)
        } else {
            Ok(Decision::Forbidden {
                requirement: requirement.clone(),
            })
        }
    }

    /// Evaluate a stack of requirements with AND semantics.
    ///
    /// The first non-allow decision is terminal; an empty stack allows.
    pub fn check_all(
        &self,
        principal: Option<Uuid>,
        requirements: &[Requirement],
        guard: &str,
    ) -> AccessResult<Decision> {
        for requirement in requirements {
            let decision = self.check(principal, requirement, guard)?;
            if !decision.is_allowed() {
                return Ok(decision);
            }
        }
        Ok(Decision::Allowed)
    }

    /// Evaluate a requirement for whatever principal the collaborator
    /// yields, using the guard it authenticated under.
    pub fn check_source(
        &self,
        source: &dyn PrincipalSource,
        requirement: &Requirement,
    ) -> AccessResult<Decision> {
        match source.current_principal() {
            Some(principal) => self.check(Some(principal.id), requirement, &principal.guard),
            None => Ok(Decision::Unauthenticated),
        }
    }
}

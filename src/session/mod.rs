//! Per-request session: the verified token plus one profile-store read.

use std::{fmt, str::FromStr, time::Duration};

use serde::Serialize;
use tracing::{error, warn};

use crate::{
    auth::claims::Claims,
    db::normalize_stored,
    profiles::{repo::ProfileStore, repo_types::UserProfile},
};

pub mod guard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    /// Total mapping from the raw stored value.
    pub fn resolve(raw: Option<&str>) -> RoleResolution {
        match raw.map(str::trim) {
            None | Some("") => RoleResolution::Degraded(DegradedReason::MissingRole),
            Some(value) => match value.parse::<Role>() {
                Ok(role) => RoleResolution::Assigned(role),
                Err(_) => RoleResolution::Unrecognized(value.to_string()),
            },
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_stored(s).as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    MissingProfile,
    ProfileUnavailable,
    MissingRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleResolution {
    Assigned(Role),
    /// Fell back to `Student`.
    Degraded(DegradedReason),
    /// Stored value is neither role; grants nothing.
    Unrecognized(String),
}

impl RoleResolution {
    pub fn effective(&self) -> Option<Role> {
        match self {
            RoleResolution::Assigned(role) => Some(*role),
            RoleResolution::Degraded(_) => Some(Role::Student),
            RoleResolution::Unrecognized(_) => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            RoleResolution::Assigned(_) => "assigned",
            RoleResolution::Degraded(_) => "degraded",
            RoleResolution::Unrecognized(_) => "unrecognized",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub role: RoleResolution,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn effective_role(&self) -> Option<Role> {
        self.role.effective()
    }

    pub fn is_admin(&self) -> bool {
        self.effective_role() == Some(Role::Admin)
    }
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Unauthenticated,
    /// The profile read did not settle within the resolve budget.
    Resolving,
    Authenticated(Session),
}

/// Builds the session for a verified token. Profile errors degrade the role
/// instead of failing the request.
pub async fn resolve(
    profiles: &dyn ProfileStore,
    claims: &Claims,
    budget: Duration,
) -> SessionState {
    let fetched = match tokio::time::timeout(budget, profiles.get(&claims.sub)).await {
        Ok(fetched) => fetched,
        Err(_) => {
            warn!(user_id = %claims.sub, budget_ms = budget.as_millis() as u64, "profile read still in flight");
            return SessionState::Resolving;
        }
    };

    let (role, profile) = match fetched {
        Ok(Some(profile)) => {
            let role = Role::resolve(profile.role.as_deref());
            (role, Some(profile))
        }
        Ok(None) => (RoleResolution::Degraded(DegradedReason::MissingProfile), None),
        Err(e) => {
            error!(error = %e, user_id = %claims.sub, "profile read failed");
            (
                RoleResolution::Degraded(DegradedReason::ProfileUnavailable),
                None,
            )
        }
    };

    match &role {
        RoleResolution::Degraded(reason) => {
            warn!(user_id = %claims.sub, reason = ?reason, "role defaulted to student")
        }
        RoleResolution::Unrecognized(raw) => {
            warn!(user_id = %claims.sub, role = %raw, "unrecognized role")
        }
        RoleResolution::Assigned(_) => {}
    }

    SessionState::Authenticated(Session {
        user_id: claims.sub.clone(),
        email: claims.email.clone(),
        role,
        profile,
    })
}

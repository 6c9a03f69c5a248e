use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::model::EntityClass;

/// Roles granted by the fronting proxy. Reads never require a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Write access to server and tool entities.
    ServerEditor,
    /// Write access to workload entities.
    WorkloadEditor,
    /// All writes plus the soft-delete maintenance surface.
    Admin,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "server-editor" => Some(Role::ServerEditor),
            "workload-editor" => Some(Role::WorkloadEditor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authorization decision carried on the request. Authentication itself is
/// delegated to a fronting proxy that injects `x-catalog-roles` (comma
/// separated); an absent or empty header means read-only access.
#[derive(Debug, Clone, Default)]
pub struct RoleContext {
    roles: Vec<Role>,
}

impl RoleContext {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    pub fn can_write(&self, class: EntityClass) -> bool {
        self.roles.iter().any(|role| match role {
            Role::Admin => true,
            Role::ServerEditor => {
                matches!(class, EntityClass::Server | EntityClass::Tool)
            }
            Role::WorkloadEditor => class == EntityClass::Workload,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RoleContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(roles_from_headers(&parts.headers))
    }
}

fn roles_from_headers(headers: &HeaderMap) -> RoleContext {
    let roles = headers
        .get("x-catalog-roles")
        .and_then(|value| value.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .filter_map(|part| Role::parse(part.trim()))
                .collect()
        })
        .unwrap_or_default();
    RoleContext::new(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_means_read_only() {
        let ctx = roles_from_headers(&HeaderMap::new());
        assert!(!ctx.can_write(EntityClass::Server));
        assert!(!ctx.can_write(EntityClass::Workload));
        assert!(!ctx.is_admin());
    }

    #[test]
    fn server_editor_covers_servers_and_tools_only() {
        let mut headers = HeaderMap::new();
        headers.insert("x-catalog-roles", HeaderValue::from_static("server-editor"));
        let ctx = roles_from_headers(&headers);
        assert!(ctx.can_write(EntityClass::Server));
        assert!(ctx.can_write(EntityClass::Tool));
        assert!(!ctx.can_write(EntityClass::Workload));
        assert!(!ctx.is_admin());
    }

    #[test]
    fn unknown_role_names_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-catalog-roles",
            HeaderValue::from_static("superuser, workload-editor"),
        );
        let ctx = roles_from_headers(&headers);
        assert!(ctx.can_write(EntityClass::Workload));
        assert!(!ctx.can_write(EntityClass::Server));
    }

    #[test]
    fn admin_covers_everything() {
        let mut headers = HeaderMap::new();
        headers.insert("x-catalog-roles", HeaderValue::from_static("admin"));
        let ctx = roles_from_headers(&headers);
        assert!(ctx.can_write(EntityClass::Server));
        assert!(ctx.can_write(EntityClass::Workload));
        assert!(ctx.is_admin());
    }
}

use std::collections::HashSet;

use crate::{AppState, config::ConfigError, gate, handlers, models::Role};
use axum::{
    Router, middleware,
    routing::{MethodRouter, get},
};

/// Role-group table: path prefix and the role tag its gate requires.
pub const ROLE_GROUPS: &[(&str, &str)] = &[
    ("/admin", "admin"),
    ("/manager", "manager"),
    ("/user", "user"),
];

/// RoleGroup
///
/// A parsed entry of the role-group table. Built once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGroup<'a> {
    pub prefix: &'a str,
    pub role: Role,
}

/// parse_role_groups
///
/// Validates the table before any route is registered. An empty or unknown role tag
/// or a repeated prefix is a configuration error and the router is never built.
pub fn parse_role_groups<'a>(table: &[(&'a str, &str)]) -> Result<Vec<RoleGroup<'a>>, ConfigError> {
    let mut seen = HashSet::new();
    table
        .iter()
        .map(|&(prefix, tag)| {
            if !seen.insert(prefix) {
                return Err(ConfigError::DuplicatePrefix {
                    prefix: prefix.to_string(),
                });
            }
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(ConfigError::MissingRole {
                    prefix: prefix.to_string(),
                });
            }
            let role = tag.parse::<Role>().map_err(|_| ConfigError::UnknownRole {
                prefix: prefix.to_string(),
                tag: tag.to_string(),
            })?;
            Ok(RoleGroup { prefix, role })
        })
        .collect()
}

fn dashboard_handler(role: Role) -> MethodRouter<AppState> {
    match role {
        Role::Admin => get(handlers::admin_dashboard),
        Role::Manager => get(handlers::manager_dashboard),
        Role::User => get(handlers::user_dashboard),
    }
}

/// Role Groups Router Module
///
/// Builds one nested router per table entry. Each group runs
/// `require_auth` then `role_gate` bound to the group's role, and only then the
/// dashboard handler.
///
/// Groups are independent routers, so passing one group's gate grants nothing
/// under another prefix.
pub fn role_group_routes(table: &[(&str, &str)]) -> Result<Router<AppState>, ConfigError> {
    let groups = parse_role_groups(table)?;

    let router = groups.into_iter().fold(Router::new(), |router, group| {
        tracing::debug!(prefix = group.prefix, role = %group.role, "registering role group");
        let scoped = Router::new()
            // GET {prefix}/dashboard
            .route("/dashboard", dashboard_handler(group.role))
            .route_layer(middleware::from_fn_with_state(group.role, gate::role_gate))
            .route_layer(middleware::from_fn(gate::require_auth));
        router.nest(group.prefix, scoped)
    });

    Ok(router)
}

/// Router Module Index
///
/// Routing is split by access level so every gate is applied at the module
/// boundary (via Axum route layers) rather than inside handlers.

/// Routes reachable by anyone, signed in or not.
pub mod public;

/// Routes behind the identity gate, open to every role.
pub mod authenticated;

/// One prefix-scoped group per role, each behind the identity gate and a role gate
/// bound to that role.
pub mod role_groups;

//! Role membership lookup
//!
//! Neither the ledger nor the verifier owns identity data. Both ask a
//! [`RoleResolver`] whether an actor holds a role, and the actor system
//! behind it decides.

use std::collections::{BTreeSet, HashMap};

/// Answers whether an actor holds a role
pub trait RoleResolver: Send + Sync {
    fn has_role(&self, actor: &str, role: &str) -> bool;
}

impl<F> RoleResolver for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn has_role(&self, actor: &str, role: &str) -> bool {
        self(actor, role)
    }
}

/// Fixed actor -> roles table, loaded from configuration
#[derive(Clone, Debug, Default)]
pub struct StaticRoleResolver {
    roles: HashMap<String, BTreeSet<String>>,
}

impl StaticRoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<I, R>(table: I) -> Self
    where
        I: IntoIterator<Item = (String, R)>,
        R: IntoIterator<Item = String>,
    {
        let roles = table
            .into_iter()
            .map(|(actor, roles)| (actor, roles.into_iter().collect()))
            .collect();
        Self { roles }
    }

    pub fn with_role(mut self, actor: impl Into<String>, role: impl Into<String>) -> Self {
        self.grant(actor, role);
        self
    }

    pub fn grant(&mut self, actor: impl Into<String>, role: impl Into<String>) {
        self.roles
            .entry(actor.into())
            .or_default()
            .insert(role.into());
    }
}

impl RoleResolver for StaticRoleResolver {
    fn has_role(&self, actor: &str, role: &str) -> bool {
        self.roles
            .get(actor)
            .map(|roles| roles.contains(role))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver() {
        let resolver = StaticRoleResolver::new()
            .with_role("mgr", "manager")
            .with_role("mgr", "approver");

        assert!(resolver.has_role("mgr", "manager"));
        assert!(!resolver.has_role("mgr", "auditor"));
        assert!(!resolver.has_role("clerk", "manager"));
        assert!(resolver.has_role("mgr", "approver"));
    }

    #[test]
    fn test_from_map() {
        let resolver = StaticRoleResolver::from_map([(
            "ann".to_string(),
            vec!["auditor".to_string()],
        )]);
        assert!(resolver.has_role("ann", "auditor"));
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |actor: &str, role: &str| actor.starts_with(role);
        assert!(resolver.has_role("manager-1", "manager"));
        assert!(!resolver.has_role("clerk-1", "manager"));
    }
}

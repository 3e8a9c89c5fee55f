//! Ownership-based access control.
//!
//! Every task read or mutation is confined to the identity that owns it. The
//! owner id compared here is the one declared in the request path, checked
//! against the resolved caller, never a client-supplied body field.

use std::collections::BTreeSet;

use super::resolver::Identity;

/// Privileges beyond ownership.
///
/// Nothing grants these today; users carry no role data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Act on resources owned by any identity.
    ActOnAnyOwner,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn grant(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allowed
    }
}

/// Allowed iff `actor_id == resource_owner_id`.
pub fn authorize(actor_id: &str, resource_owner_id: &str) -> Access {
    if actor_id == resource_owner_id {
        Access::Allowed
    } else {
        Access::Denied
    }
}

/// Ownership check for a resolved identity, honouring its capability set.
pub fn authorize_identity(actor: &Identity, resource_owner_id: &str) -> Access {
    if actor.capabilities.contains(Capability::ActOnAnyOwner) {
        return Access::Allowed;
    }
    authorize(&actor.subject, resource_owner_id)
}

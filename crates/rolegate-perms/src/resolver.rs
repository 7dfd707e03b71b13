//! Role hierarchy resolution.
//!
//! Roles form a forest through their `parent_id` links. The resolver walks
//! those links over a [`Catalogue`] snapshot to produce ancestor chains and
//! role closures. Every walk is bounded: a revisited role fails with
//! [`PermsError::CyclicHierarchy`] and a chain longer than
//! [`ResolverConfig::max_depth`] fails with [`PermsError::HierarchyTooDeep`].

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rolegate_core::{Catalogue, Role, RoleId, RoleRef};

use crate::error::{PermsError, Result};

/// Default bound on the number of ancestors above any role.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for hierarchy walks.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum number of ancestors a role may have.
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolverConfig {
    /// Set the maximum ancestor depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A role plus every ancestor reachable from it, deduplicated by id.
#[derive(Debug, Clone, Default)]
pub struct RoleClosure<'a> {
    roles: BTreeMap<RoleId, &'a Role>,
}

impl<'a> RoleClosure<'a> {
    fn insert(&mut self, role: &'a Role) -> bool {
        self.roles.insert(role.id, role).is_none()
    }

    /// Membership by identity.
    pub fn contains_id(&self, id: RoleId) -> bool {
        self.roles.contains_key(&id)
    }

    /// Membership by name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.roles.values().any(|role| role.name == name)
    }

    /// Membership of a reference: names match by name, instances by id.
    pub fn contains(&self, role: &RoleRef) -> bool {
        match role {
            RoleRef::Name(name) => self.contains_name(name),
            RoleRef::Role(role) => self.contains_id(role.id),
        }
    }

    /// Names of every role in the closure.
    pub fn names(&self) -> BTreeSet<&'a str> {
        self.roles.values().map(|role| role.name.as_str()).collect()
    }

    /// Ids of every role in the closure, ascending.
    pub fn ids(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.roles.keys().copied()
    }

    /// Roles in the closure, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &'a Role> + '_ {
        self.roles.values().copied()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Walks parent links over a catalogue snapshot.
#[derive(Debug, Clone)]
pub struct HierarchyResolver<'a> {
    catalogue: &'a Catalogue,
    config: ResolverConfig,
}

impl<'a> HierarchyResolver<'a> {
    /// Create a resolver with the default depth bound.
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Self::with_config(catalogue, ResolverConfig::default())
    }

    pub fn with_config(catalogue: &'a Catalogue, config: ResolverConfig) -> Self {
        Self { catalogue, config }
    }

    /// The snapshot this resolver reads.
    pub fn catalogue(&self) -> &'a Catalogue {
        self.catalogue
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Ancestors of `role`, nearest first, excluding the role itself.
    ///
    /// A parent id missing from the catalogue ends the chain.
    pub fn ancestors_of(&self, role: &Role) -> Result<Vec<&'a Role>> {
        let mut ancestors = Vec::new();
        let mut visited = HashSet::from([role.id]);
        let mut next = role.parent_id;

        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                let name = self
                    .catalogue
                    .role(parent_id)
                    .map_or_else(|| parent_id.to_string(), |r| r.name.clone());
                tracing::warn!(role = %name, "cycle detected in role hierarchy");
                return Err(PermsError::CyclicHierarchy { role: name });
            }

            if ancestors.len() >= self.config.max_depth {
                return Err(PermsError::HierarchyTooDeep {
                    role: role.name.clone(),
                    limit: self.config.max_depth,
                });
            }

            let Some(parent) = self.catalogue.role(parent_id) else {
                tracing::warn!(
                    role = %role.name,
                    parent = %parent_id,
                    "parent role missing from catalogue, treating as root"
                );
                break;
            };

            ancestors.push(parent);
            next = parent.parent_id;
        }

        Ok(ancestors)
    }

    /// Ancestors of the role with the given id. Unknown ids have none.
    pub fn ancestors_of_id(&self, id: RoleId) -> Result<Vec<&'a Role>> {
        match self.catalogue.role(id) {
            Some(role) => self.ancestors_of(role),
            None => Ok(Vec::new()),
        }
    }

    /// The given roles together with all of their ancestors.
    ///
    /// Ids missing from the catalogue are skipped.
    pub fn closure_of<I>(&self, roles: I) -> Result<RoleClosure<'a>>
    where
        I: IntoIterator<Item = RoleId>,
    {
        let mut closure = RoleClosure::default();

        for id in roles {
            let Some(role) = self.catalogue.role(id) else {
                continue;
            };

            // A role already present brought its ancestors with it.
            if !closure.insert(role) {
                continue;
            }

            for ancestor in self.ancestors_of(role)? {
                closure.insert(ancestor);
            }
        }

        Ok(closure)
    }

    /// Whether making `parent` the parent of `role` would close a loop.
    pub fn would_create_cycle(&self, role: RoleId, parent: RoleId) -> Result<bool> {
        if role == parent {
            return Ok(true);
        }

        Ok(self
            .ancestors_of_id(parent)?
            .iter()
            .any(|ancestor| ancestor.id == role))
    }
}

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use rolegate_core::{Catalogue, Permission, PermissionId, Role, RoleId, SubjectId};
use rolegate_perms::SubjectGrants;

/// Generate a role or permission name.
pub fn entity_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

/// Generate parent links for an acyclic role forest of up to `max_roles`.
///
/// Entry `i` is the index of role `i`'s parent, always lower than `i`.
pub fn role_forest(max_roles: usize) -> impl Strategy<Value = Vec<Option<usize>>> {
    (1..=max_roles.max(1)).prop_flat_map(|len| {
        (0..len)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    prop::option::of(0..i).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

/// A role forest, one permission per role, and one subject's assignments.
///
/// Role `i` has id `i + 1` and name `role-i`; permission `i` is attached to
/// role `i` and named `perm-i`.
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub parents: Vec<Option<usize>>,
    /// Indices of the roles assigned to the subject.
    pub assigned: Vec<usize>,
}

impl Arbitrary for ForestParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        role_forest(24)
            .prop_flat_map(|parents| {
                let len = parents.len();
                (Just(parents), prop::collection::vec(0..len, 0..=3))
            })
            .prop_map(|(parents, assigned)| ForestParams { parents, assigned })
            .boxed()
    }
}

impl ForestParams {
    pub fn role_id(index: usize) -> RoleId {
        RoleId::new(index as u64 + 1)
    }

    pub fn role_name(index: usize) -> String {
        format!("role-{}", index)
    }

    pub fn permission_name(index: usize) -> String {
        format!("perm-{}", index)
    }

    /// The forest as a catalogue.
    pub fn catalogue(&self) -> Catalogue {
        catalogue_from_parents(&self.parents)
    }

    /// The subject holding the assigned roles and no direct grants.
    pub fn grants(&self) -> SubjectGrants {
        SubjectGrants::new(SubjectId::new(1))
            .with_roles(self.assigned.iter().map(|&i| Self::role_id(i)))
    }

    /// Ancestor indices of role `index`, nearest first, by walking the
    /// parent vector directly.
    pub fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut ancestors = Vec::new();
        let mut next = self.parents[index];
        while let Some(parent) = next {
            ancestors.push(parent);
            next = self.parents[parent];
        }
        ancestors
    }

    /// Whether role `index` is an assigned role or an ancestor of one.
    pub fn in_closure(&self, index: usize) -> bool {
        self.assigned
            .iter()
            .any(|&assigned| assigned == index || self.ancestors(assigned).contains(&index))
    }
}

/// Build a catalogue from parent links, one attached permission per role.
pub fn catalogue_from_parents(parents: &[Option<usize>]) -> Catalogue {
    let mut builder = Catalogue::builder();
    for (i, parent) in parents.iter().enumerate() {
        let mut role = Role::new(ForestParams::role_id(i), ForestParams::role_name(i));
        role.parent_id = parent.map(ForestParams::role_id);

        let permission = PermissionId::new(i as u64 + 1);
        builder = builder
            .role(role)
            .permission(Permission::new(permission, ForestParams::permission_name(i)))
            .attach(ForestParams::role_id(i), permission);
    }
    builder.build()
}

/// Parent links forming a single loop over `len` roles.
pub fn ring(len: usize) -> Vec<Option<usize>> {
    (0..len).map(|i| Some((i + 1) % len)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_perms::{HierarchyResolver, PermsError, SubjectAuthority};

    proptest! {
        #[test]
        fn test_forest_parents_point_backwards(parents in role_forest(32)) {
            for (i, parent) in parents.iter().enumerate() {
                if let Some(parent) = parent {
                    prop_assert!(*parent < i);
                }
            }
        }

        #[test]
        fn test_ancestors_match_parent_walk(params: ForestParams) {
            let catalogue = params.catalogue();
            let resolver = HierarchyResolver::new(&catalogue);

            for i in 0..params.parents.len() {
                let ancestors: Vec<RoleId> = resolver
                    .ancestors_of_id(ForestParams::role_id(i))
                    .unwrap()
                    .iter()
                    .map(|role| role.id)
                    .collect();
                let expected: Vec<RoleId> = params
                    .ancestors(i)
                    .into_iter()
                    .map(ForestParams::role_id)
                    .collect();
                prop_assert_eq!(ancestors, expected);
            }
        }

        #[test]
        fn test_role_checks_follow_closure(params: ForestParams) {
            let catalogue = params.catalogue();
            let grants = params.grants();
            let subject = SubjectAuthority::new(&grants, &catalogue);

            for i in 0..params.parents.len() {
                let expected = params.in_closure(i);
                prop_assert_eq!(
                    subject.has_role(ForestParams::role_name(i).as_str()).unwrap(),
                    expected
                );
                prop_assert_eq!(
                    subject.has_permission_to(ForestParams::permission_name(i)).unwrap(),
                    expected
                );
            }
        }

        #[test]
        fn test_ring_is_reported_as_cycle(len in 1usize..16) {
            let catalogue = catalogue_from_parents(&ring(len));
            let resolver = HierarchyResolver::new(&catalogue);
            let is_cyclic = matches!(
                resolver.ancestors_of_id(RoleId::new(1)),
                Err(PermsError::CyclicHierarchy { .. })
            );
            prop_assert!(is_cyclic);
        }
    }

    #[test]
    fn test_entity_names_are_valid() {
        use proptest::strategy::ValueTree;
        use proptest::test_runner::TestRunner;

        let mut runner = TestRunner::default();
        for _ in 0..64 {
            let name = entity_name().new_tree(&mut runner).unwrap().current();
            assert!(rolegate_core::validate_name(&name).is_ok(), "{}", name);
        }
    }
}

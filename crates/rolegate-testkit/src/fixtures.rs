//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. A [`FixtureSpec`] describes a
//! catalogue and subject assignments by name and can be written as JSON.

use rolegate::store::MemoryStore;
use rolegate::{Authorizer, Result, SubjectId};
use serde::{Deserialize, Serialize};

/// A role to create. Parents must be listed before their children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Names of permissions attached to this role.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSpec {
    pub name: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSpec {
    pub id: u64,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Directly granted permissions, in grant order.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A whole authorization setup, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSpec {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionSpec>,
    #[serde(default)]
    pub roles: Vec<RoleSpec>,
    #[serde(default)]
    pub subjects: Vec<SubjectSpec>,
}

impl FixtureSpec {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// admin <- editor <- author.
    ///
    /// `manage-users` on admin, `publish-post` on editor, `edit-post` (the
    /// `edit` action on `post`) on author. Subject 1 is an editor, subject 2
    /// an admin, subject 3 an author with a direct `manage-users` grant.
    pub fn editorial() -> Self {
        let role = |name: &str, parent: Option<&str>, permissions: &[&str]| RoleSpec {
            name: name.to_owned(),
            parent: parent.map(str::to_owned),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        };
        let permission = |name: &str| PermissionSpec {
            name: name.to_owned(),
            ..Default::default()
        };

        Self {
            actions: vec!["edit".into()],
            objects: vec!["post".into()],
            permissions: vec![
                permission("manage-users"),
                permission("publish-post"),
                PermissionSpec {
                    name: "edit-post".into(),
                    action: Some("edit".into()),
                    object: Some("post".into()),
                },
            ],
            roles: vec![
                role("admin", None, &["manage-users"]),
                role("editor", Some("admin"), &["publish-post"]),
                role("author", Some("editor"), &["edit-post"]),
            ],
            subjects: vec![
                SubjectSpec {
                    id: 1,
                    roles: vec!["editor".into()],
                    ..Default::default()
                },
                SubjectSpec {
                    id: 2,
                    roles: vec!["admin".into()],
                    ..Default::default()
                },
                SubjectSpec {
                    id: 3,
                    roles: vec!["author".into()],
                    permissions: vec!["manage-users".into()],
                },
            ],
        }
    }
}

/// An authorizer over a memory store seeded from a [`FixtureSpec`].
pub struct TestFixture {
    pub authz: Authorizer<MemoryStore>,
}

impl TestFixture {
    /// An empty fixture.
    pub fn new() -> Self {
        Self {
            authz: Authorizer::new(MemoryStore::new()),
        }
    }

    /// A fixture seeded with [`FixtureSpec::editorial`].
    pub async fn editorial() -> Result<Self> {
        Self::from_spec(&FixtureSpec::editorial()).await
    }

    pub async fn from_spec(spec: &FixtureSpec) -> Result<Self> {
        let fixture = Self::new();
        fixture.seed(spec).await?;
        Ok(fixture)
    }

    /// Create everything in `spec` through the authorizer.
    pub async fn seed(&self, spec: &FixtureSpec) -> Result<()> {
        let authz = &self.authz;

        for action in &spec.actions {
            authz.create_action(action).await?;
        }
        for object in &spec.objects {
            authz.create_object(object).await?;
        }
        for permission in &spec.permissions {
            authz
                .create_permission(
                    &permission.name,
                    permission.action.as_deref(),
                    permission.object.as_deref(),
                )
                .await?;
        }
        for role in &spec.roles {
            authz
                .create_role(&role.name, role.parent.as_deref().map(Into::into))
                .await?;
            for permission in &role.permissions {
                authz.attach_permission(role.name.as_str(), permission.as_str()).await?;
            }
        }
        for subject in &spec.subjects {
            let id = SubjectId::new(subject.id);
            if !subject.roles.is_empty() {
                authz.assign_role(id, subject.roles.clone()).await?;
            }
            authz
                .give_permission_to(id, subject.permissions.iter().map(String::as_str))
                .await?;
        }

        Ok(())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

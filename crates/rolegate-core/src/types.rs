//! Strong identifier types.
//!
//! Every entity kind gets its own newtype so a `RoleId` can never be passed
//! where a `PermissionId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create an identifier from its raw value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw numeric value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Role`](crate::Role).
    RoleId,
    "RoleId"
);
define_id!(
    /// Identifier of a [`Permission`](crate::Permission).
    PermissionId,
    "PermissionId"
);
define_id!(
    /// Identifier of an [`Action`](crate::Action).
    ActionId,
    "ActionId"
);
define_id!(
    /// Identifier of an [`Object`](crate::Object).
    ObjectId,
    "ObjectId"
);
define_id!(
    /// Identifier of a subject (an external principal such as a user).
    SubjectId,
    "SubjectId"
);

impl ActionId {
    /// Sentinel for a permission that names no action.
    pub const NONE: Self = Self(0);

    /// Whether this is the "no action" sentinel.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl ObjectId {
    /// Sentinel for a permission that names no object.
    pub const NONE: Self = Self(0);

    /// Whether this is the "no object" sentinel.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

//! Typed identifiers for issues, users and projects.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl $name {
            /// Widened value for binding to signed database columns.
            pub fn as_i64(&self) -> i64 {
                i64::from(self.0)
            }
        }
    };
}

id_type!(
    /// Tracked work item.
    IssueId
);
id_type!(UserId);
id_type!(ProjectId);

impl UserId {
    /// Wildcard user for configuration overrides.
    pub const ALL_USERS: UserId = UserId(0);
}

impl ProjectId {
    /// Wildcard project; also the "no project selected" value of a request.
    pub const ALL_PROJECTS: ProjectId = ProjectId(0);
}

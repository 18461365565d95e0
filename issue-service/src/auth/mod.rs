//! Authentication policy: flags and their per-user selection.

pub mod flags;
pub mod provider;

pub use flags::{load_auth_flags, AuthFlags, ResolvedAuthFlags, Setting};
pub use provider::{auth_flags_for, AuthFlagsProvider, PerUserAuthFlags};

pub mod access;
pub mod database;
pub mod error;
pub mod lang;
pub mod memory;
pub mod metrics;
pub mod settings;
pub mod store;
pub mod tracker;

pub use access::{AccessEvaluator, ProjectAccess};
pub use database::Database;
pub use error::ServiceError;
pub use lang::{Localizer, MessageCatalog};
pub use memory::MemoryTracker;
pub use settings::{ConfigOverride, ConfigResolver, ConfigResolverExt, LayeredSettings, ScopedSettings};
pub use store::{IssueStore, UserStore};
pub use tracker::Tracker;

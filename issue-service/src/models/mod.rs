pub mod access_level;
pub mod caller;
pub mod config_value;
pub mod ids;
pub mod issue;
pub mod user;

pub use access_level::{AccessLevel, Threshold};
pub use caller::Caller;
pub use config_value::{ConfigValue, OFF, ON};
pub use ids::{IssueId, ProjectId, UserId};
pub use issue::{Issue, MonitorList};
pub use user::User;

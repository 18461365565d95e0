//! Localized user-facing strings.

use std::collections::HashMap;

pub const PASSWORD_MANAGED_ELSEWHERE_MESSAGE: &str = "password_managed_elsewhere_message";

pub trait Localizer: Send + Sync {
    fn message(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn english() -> Self {
        let mut catalog = Self::default();
        catalog.insert(
            PASSWORD_MANAGED_ELSEWHERE_MESSAGE,
            "Your password is managed by another system and cannot be changed here.",
        );
        catalog
    }

    pub fn insert(&mut self, key: &str, message: &str) {
        self.messages.insert(key.to_string(), message.to_string());
    }
}

impl Localizer for MessageCatalog {
    fn message(&self, key: &str) -> Option<String> {
        self.messages.get(key).cloned()
    }
}

pub mod token;

pub use token::hash_api_token;

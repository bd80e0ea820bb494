pub mod credentials;
pub mod error;
pub mod failures;
pub mod models;
pub mod settings;
pub mod token_store;

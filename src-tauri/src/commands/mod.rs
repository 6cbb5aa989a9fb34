pub mod analyze;
pub mod catalog;
pub mod config;
pub mod health;
pub mod keychain;

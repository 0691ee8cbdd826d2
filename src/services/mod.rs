pub mod credentials;
pub mod reconciliation;
pub mod settings_admin;
pub mod signature;
pub mod wallet;

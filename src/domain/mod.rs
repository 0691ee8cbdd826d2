pub mod error;
pub mod event;
pub mod gateway;
pub mod id;
pub mod ledger;
pub mod money;
pub mod order;
pub mod settings;
pub mod stores;
pub mod transaction;

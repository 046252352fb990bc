pub mod backup;
pub mod cipher;
pub mod codec;
pub mod config;
pub mod error;
pub mod ipc;
pub mod persist;
pub mod query;
pub mod record;
pub mod store;

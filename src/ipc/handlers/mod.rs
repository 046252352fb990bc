pub mod backup_exchange;
pub mod core;
pub mod queries;
pub mod students;

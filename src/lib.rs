pub mod config;
pub mod directory;
pub mod export;
pub mod http;
pub mod records;
pub mod store;
pub mod xlsx;

pub mod bootstrap;
pub mod manager;
pub mod models;
pub mod store;

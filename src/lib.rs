pub mod cache;
pub mod config;
pub mod gateway;
pub mod model;
pub mod provider;

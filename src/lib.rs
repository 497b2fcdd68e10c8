// src/lib.rs
pub mod config;
pub mod driver;
pub mod health;
pub mod metrics;
pub mod retry;
pub mod server;

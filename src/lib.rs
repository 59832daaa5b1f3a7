pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod repository;
pub mod services;

// Library exports for the binary and tests
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod resources;
pub mod services;

pub mod location;
pub mod migration;
pub mod placeholders;

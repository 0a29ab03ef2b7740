pub mod api;
pub mod config;
pub mod control;
pub mod sensors;
pub mod settings;
pub mod snapshot;
pub mod station;

pub mod agent;
pub mod build_info;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod schedule;
pub mod store;
pub mod timestamp;

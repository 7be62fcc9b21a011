pub mod agent;
pub mod create;
pub mod delete;
pub mod health;
pub mod list;
pub mod schedule;
pub mod show;
pub mod tools;
pub mod update;

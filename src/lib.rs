pub mod async_task;
pub mod cli;
pub mod command;
pub mod config;
pub mod controller;
pub mod directory;
pub mod entry;
pub mod error;
pub mod gateway;
pub mod history;
pub mod local_gateway;
pub mod search;
pub mod selection;
pub mod subscription;
pub mod test_runner;

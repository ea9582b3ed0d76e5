pub mod catalog;
pub mod commands;
pub mod config;
pub mod dialoguer;
pub mod download;
pub mod postprocess;
pub mod resolver;
pub mod sanitize;
pub mod session;

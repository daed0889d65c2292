pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod core;
pub mod exit;
pub mod logs;
pub mod source;
pub mod tui;
pub mod ui;

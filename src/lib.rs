pub mod app;
pub mod cli;
pub mod config;
pub mod feed;
pub mod logging;
pub mod services;
pub mod source;
pub mod state;
pub mod story;
pub mod utils;
pub mod web;

pub mod api;
pub mod config;
pub mod control;
pub mod poller;
pub mod status_cache;
pub mod switchbot;

pub mod service;

pub use service::StatusPoller;

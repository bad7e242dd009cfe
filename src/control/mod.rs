pub mod service;

pub use service::{CommandOutcome, CommandService};

//! Pushes a parsed seed document into a running API.

pub mod api;
pub mod error;
pub mod payload;
pub mod populator;

pub use api::{ContentApi, CreateOutcome, DryRunApi, HttpApi};
pub use error::PopulateError;
pub use populator::{PopulateReport, Populator};

//! `harvest` command-line arguments and environment-backed settings.

mod args;
mod settings;

pub use args::{FixedListArg, HarvestArgs};
pub use settings::{DEFAULT_REGION, HarvestSettings};

// Application layer - use cases and orchestration over the repository.
// Both the HTTP API and the CLI go through `LedgerService`.

pub mod error;
mod seed;
mod service;
mod transfer;

pub use error::*;
pub use seed::{SeedOptions, SeedReport};
pub use service::*;
pub use transfer::MAX_TRANSFER_ATTEMPTS;

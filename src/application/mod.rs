// Application layer: ledger use cases and orchestration.
// Clients (CLI, HTTP API) talk to `LedgerService`, never to storage directly.

mod commands;
pub mod error;
mod queries;
mod reversal;
mod service;
mod settings;

pub use commands::*;
pub use error::*;
pub use queries::*;
pub use reversal::*;
pub use service::{EntryResult, LedgerService, OpenedAccount, PaymentResult, TransferResult};
pub use settings::*;

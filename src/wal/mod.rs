//! Write-Ahead Log (WAL) Module
//!
//! Provides per-shard durability through append-only logging.
//!
//! ## Responsibilities
//! - Append one record per logical write (single put/delete or a whole batch)
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Strict reading for normal opens, lenient recovery after corruption
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! `Data` is a bincode-encoded [`WalEntry`]; the CRC covers `Data` only.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::{WalReader, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};

//! # flatkv
//!
//! A flat-file, record-oriented store for service state with:
//! - Sentinel-delimited records (no length prefixes)
//! - A 4-byte big-endian version header per file
//! - Previous-generation `.temp` copies with rollback on failed writes
//! - Day-boundary backup rotation with a retention window
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Host Process                            │
//! │         (decides what to persist, drives the tick)           │
//! └──────────────┬─────────────────────────────┬────────────────┘
//!                │                             │
//!                ▼                             ▼
//!   ┌────────────────────────┐      ┌────────────────────────┐
//!   │      File Session      │      │     Backup Rotator     │
//!   │  (DbReader / DbWriter) │      │  (rename + prune by    │
//!   └───────────┬────────────┘      │   calendar day)        │
//!               │                   └────────────────────────┘
//!               ▼
//!   ┌────────────────────────┐
//!   │      Entry Codec       │
//!   │  key ^ value \0 ... \n │
//!   └────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod db;
pub mod backup;
pub mod relay;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlatError, Result};
pub use config::Config;
pub use codec::{Decoded, Record, WriteOutcome};
pub use db::{DbHandle, DbReader, DbWriter};
pub use backup::BackupRotator;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flatkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

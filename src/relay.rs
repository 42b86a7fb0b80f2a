//! SQL relay boundary
//!
//! Optional mirroring of state into an SQL server. The store never looks
//! behind this trait; a host plugs in a real relay or runs with
//! [`DisabledRelay`].

/// Returned by a relay that is switched off or failed
pub const RELAY_DISABLED: i64 = -1;

/// How urgently a query should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPriority {
    /// Execute now on the caller's connection
    Direct,
    /// Hand to a background queue
    Queued,
}

/// Sink for SQL query strings
pub trait SqlRelay {
    /// Submit `sql`; the result is backend-defined or [`RELAY_DISABLED`]
    fn query(&self, sql: &str, priority: QueryPriority) -> i64;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Relay used when no SQL backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRelay;

impl SqlRelay for DisabledRelay {
    fn query(&self, _sql: &str, _priority: QueryPriority) -> i64 {
        RELAY_DISABLED
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

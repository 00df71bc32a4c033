//! Sans-I/O protocol state machines.
//!
//! The state machines never touch a socket. Each `resume` call consumes the
//! outcome of the previously requested step and returns the next [`Step`]
//! for the driver to perform.

pub mod buffer;
pub mod exec;
pub mod read_response;
pub mod startup;

use crate::error::{Diagnostics, Error};
use crate::protocol::types::TransactionStatus;

pub use buffer::ReadBuffer;
pub use exec::ExecFsm;
pub use startup::StartupFsm;

/// Protocol phase of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created, not yet connected
    #[default]
    Idle,
    /// Startup message sent
    Startup,
    /// Authentication exchange in progress
    Authenticating,
    /// Between operations; the server is idle
    ReadyForQuery,
    /// An operation is outstanding
    Busy,
    /// Protocol sync lost; only reconnect helps
    Failed,
    /// Socket closed
    Closed,
}

/// Per-connection protocol state shared by the state machines.
///
/// Owns the growable read buffer and the diagnostics slot that are reused
/// across operations to avoid reallocation.
#[derive(Debug, Default)]
pub struct ConnectionState {
    /// Incoming bytes not yet parsed
    pub buffer: ReadBuffer,
    /// Diagnostics of the last server error
    pub shared_diag: Diagnostics,
    /// Protocol phase
    pub phase: Phase,
    /// Transaction status from the last ReadyForQuery
    pub txn_status: TransactionStatus,
}

impl ConnectionState {
    /// Create a fresh Idle state.
    pub fn new() -> Self {
        Self::default()
    }
}

/// I/O intention returned by a state machine.
///
/// The driver performs the requested I/O and calls `resume` again with its
/// outcome: `Ok(bytes_transferred)` or the transport error.
#[derive(Debug)]
pub enum Step<'a> {
    /// Establish the transport to the server.
    Connect,
    /// Write all of these bytes.
    Write(&'a [u8]),
    /// Read some bytes into this slice; 0 bytes read means EOF.
    Read(&'a mut [u8]),
    /// Close the transport.
    Close,
    /// The operation finished.
    Done(Result<(), Error>),
}

/// Which step a state machine is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Requested {
    #[default]
    None,
    Connect,
    Write,
    Read,
    Close,
}

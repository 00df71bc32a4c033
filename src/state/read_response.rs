//! Read-response state machine: frontend/backend cursor coupling.
//!
//! Tracks which request message each incoming backend message answers and
//! dispatches it to the handler chain at that offset. On a server error the
//! stream is truncated to the next Sync: the unattended request messages are
//! fed to their handlers as [`ResponseMessage::Skipped`] sentinels and
//! everything the server sends before the resynchronizing ReadyForQuery is
//! dropped.

use crate::error::{Diagnostics, Kind};
use crate::protocol::backend::BackendMessage;
use crate::protocol::types::TransactionStatus;
use crate::request::MessageTag;
use crate::response::{Response, ResponseMessage};

/// Cursor over the request tag stream, advanced by backend messages.
#[derive(Debug)]
pub(crate) struct ReadResponseFsm<'req> {
    tags: &'req [MessageTag],
    cursor: usize,
    /// Dropping messages until the ReadyForQuery that answers the Sync at
    /// `cursor`
    skipping: bool,
    /// A truncating error found no Sync to resynchronize on
    sync_lost: bool,
}

impl<'req> ReadResponseFsm<'req> {
    pub(crate) fn new(tags: &'req [MessageTag]) -> Self {
        Self {
            tags,
            cursor: 0,
            skipping: false,
            sync_lost: false,
        }
    }

    /// True when a truncating error could not resynchronize on a Sync.
    pub(crate) fn sync_lost(&self) -> bool {
        self.sync_lost
    }

    /// Flush messages elicit no backend reply; step over them.
    fn skip_flushes(&mut self) {
        while self.cursor < self.tags.len() && self.tags[self.cursor] == MessageTag::Flush {
            self.cursor += 1;
        }
    }

    /// True once every request message has been answered.
    pub(crate) fn finished(&mut self) -> bool {
        self.skip_flushes();
        !self.skipping && self.cursor >= self.tags.len()
    }

    /// Account one backend message, dispatching it to the chain.
    ///
    /// Returns `Ok(true)` when the whole response has been consumed.
    pub(crate) fn apply(
        &mut self,
        msg: &BackendMessage<'_>,
        chain: &mut Response<'_>,
        shared_diag: &mut Diagnostics,
        txn_status: &mut TransactionStatus,
    ) -> Result<bool, Kind> {
        // Session-level messages may arrive at any time and answer nothing
        match msg {
            BackendMessage::NoticeResponse(_)
            | BackendMessage::ParameterStatus(_)
            | BackendMessage::NotificationResponse(_)
            | BackendMessage::BackendKeyData(_)
            | BackendMessage::Unknown { .. } => return Ok(self.finished()),
            _ => {}
        }

        if self.skipping {
            // The server discards everything up to the Sync; only its
            // ReadyForQuery matters
            if let BackendMessage::ReadyForQuery(ready) = msg {
                *txn_status = ready.transaction_status().unwrap_or_default();
                self.cursor += 1;
                self.skipping = false;
            }
            return Ok(self.finished());
        }

        self.skip_flushes();
        if self.cursor >= self.tags.len() {
            // The server answered more than we asked
            return Err(Kind::ProtocolValueError);
        }
        let tag = self.tags[self.cursor];

        match msg {
            BackendMessage::ParseComplete => {
                chain.on_message(&ResponseMessage::ParseComplete, self.cursor);
                if tag == MessageTag::Parse {
                    self.cursor += 1;
                }
            }
            BackendMessage::BindComplete => {
                chain.on_message(&ResponseMessage::BindComplete, self.cursor);
                if tag == MessageTag::Bind {
                    self.cursor += 1;
                }
            }
            BackendMessage::CloseComplete => {
                chain.on_message(&ResponseMessage::CloseComplete, self.cursor);
                if tag == MessageTag::Close {
                    self.cursor += 1;
                }
            }
            BackendMessage::ParameterDescription(desc) => {
                // First half of a statement Describe; RowDescription or
                // NoData follows for the same request message
                chain.on_message(&ResponseMessage::ParameterDescription(desc), self.cursor);
            }
            BackendMessage::NoData => {
                chain.on_message(&ResponseMessage::NoData, self.cursor);
                if tag == MessageTag::Describe {
                    self.cursor += 1;
                }
            }
            BackendMessage::RowDescription(desc) => {
                chain.on_message(&ResponseMessage::RowDescription(desc), self.cursor);
                if tag == MessageTag::Describe {
                    self.cursor += 1;
                }
            }
            BackendMessage::DataRow(row) => {
                chain.on_message(&ResponseMessage::DataRow(row), self.cursor);
            }
            BackendMessage::CommandComplete(complete) => {
                chain.on_message(&ResponseMessage::CommandComplete(complete), self.cursor);
                if tag == MessageTag::Execute {
                    self.cursor += 1;
                }
            }
            BackendMessage::EmptyQueryResponse => {
                chain.on_message(&ResponseMessage::EmptyQueryResponse, self.cursor);
                if tag == MessageTag::Execute {
                    self.cursor += 1;
                }
            }
            BackendMessage::PortalSuspended => {
                // Row limit reached; terminal for this Execute
                chain.on_message(&ResponseMessage::PortalSuspended, self.cursor);
                if tag == MessageTag::Execute {
                    self.cursor += 1;
                }
            }
            BackendMessage::ReadyForQuery(ready) => {
                *txn_status = ready.transaction_status().unwrap_or_default();
                match tag {
                    // Answers the Sync, or terminates a simple query
                    MessageTag::Sync | MessageTag::Query => self.cursor += 1,
                    _ => return Err(Kind::ProtocolValueError),
                }
            }
            BackendMessage::ErrorResponse(diag) => {
                shared_diag.clone_from(diag);
                chain.on_message(&ResponseMessage::ErrorResponse(diag), self.cursor);

                if tag == MessageTag::Query {
                    // A failed simple query is still terminated by its own
                    // ReadyForQuery
                    self.skipping = true;
                } else {
                    // Everything up to the next Sync is skipped server-side
                    let mut i = self.cursor + 1;
                    while i < self.tags.len() && self.tags[i] != MessageTag::Sync {
                        if self.tags[i] != MessageTag::Flush {
                            chain.on_message(&ResponseMessage::Skipped, i);
                        }
                        i += 1;
                    }
                    if i < self.tags.len() {
                        self.cursor = i;
                        self.skipping = true;
                    } else {
                        self.cursor = self.tags.len();
                        self.sync_lost = true;
                    }
                }
            }
            BackendMessage::Authentication(_) => return Err(Kind::ProtocolValueError),
            // Session-level messages were handled above
            _ => {}
        }

        Ok(self.finished())
    }
}

//! Execute state machine: write the request, then read until all handlers
//! settle.

use std::io;

use crate::error::{Error, Kind};
use crate::protocol::backend::{frame_len, next_message};
use crate::request::Request;
use crate::response::Response;
use crate::state::read_response::ReadResponseFsm;
use crate::state::{ConnectionState, Requested, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Writing,
    Reading,
    Finished,
}

/// Runs one `exec`: a single write of the full request payload followed by
/// response reads until the handler chain has covered every request message.
pub struct ExecFsm<'a, 'h> {
    state: State,
    requested: Requested,
    req: &'a Request,
    chain: &'a mut Response<'h>,
    read: ReadResponseFsm<'a>,
}

impl<'a, 'h> ExecFsm<'a, 'h> {
    /// Create an execute state machine over a request and handler chain.
    pub fn new(req: &'a Request, chain: &'a mut Response<'h>) -> Self {
        Self {
            state: State::Initial,
            requested: Requested::None,
            req,
            chain,
            read: ReadResponseFsm::new(req.tags()),
        }
    }

    /// True when a truncating server error found no Sync to resynchronize
    /// on; the connection must be considered desynced.
    pub fn desynced(&self) -> bool {
        self.read.sync_lost()
    }

    /// Advance with the outcome of the previously requested step.
    pub fn resume<'s>(
        &'s mut self,
        st: &'s mut ConnectionState,
        io: io::Result<usize>,
    ) -> Step<'s> {
        match self.requested {
            Requested::Read => match io {
                Ok(0) => {
                    return self.finish(Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()))
                }
                Ok(n) => st.buffer.note_read(n),
                Err(e) => return self.finish(Err(e.into())),
            },
            Requested::Write => {
                if let Err(e) = io {
                    return self.finish(Err(e.into()));
                }
            }
            _ => {}
        }
        self.requested = Requested::None;

        match self.state {
            State::Initial => {
                // Handler chain setup must cover the request exactly
                match self.chain.setup(self.req, 0) {
                    Ok(end) if end == self.req.tags().len() => {}
                    Ok(_) => return self.finish(Err(Kind::IncompatibleResponseType.into())),
                    Err(kind) => return self.finish(Err(kind.into())),
                }
                if self.req.is_empty() {
                    return self.finish(Ok(()));
                }
                self.state = State::Writing;
                self.requested = Requested::Write;
                Step::Write(self.req.payload())
            }
            State::Writing => {
                self.state = State::Reading;
                self.drive_read(st)
            }
            State::Reading => self.drive_read(st),
            State::Finished => self.finish(Err(Kind::OperationInProgress.into())),
        }
    }

    fn finish(&mut self, result: Result<(), Error>) -> Step<'static> {
        self.state = State::Finished;
        Step::Done(result)
    }

    fn drive_read<'s>(&'s mut self, st: &'s mut ConnectionState) -> Step<'s> {
        if self.read.finished() {
            return self.finish(Ok(()));
        }
        loop {
            let outcome = {
                let data = st.buffer.unparsed();
                match next_message(data) {
                    Err(kind) => Some((Err(kind), 0)),
                    Ok(None) => None,
                    Ok(Some((msg, frame))) => {
                        let applied = self.read.apply(
                            &msg,
                            self.chain,
                            &mut st.shared_diag,
                            &mut st.txn_status,
                        );
                        Some((applied, frame))
                    }
                }
            };

            match outcome {
                Some((Err(kind), _)) => return self.finish(Err(kind.into())),
                Some((Ok(done), frame)) => {
                    st.buffer.consume(frame);
                    if done {
                        return self.finish(Ok(()));
                    }
                }
                None => {
                    let have = st.buffer.len();
                    let need = match frame_len(st.buffer.unparsed()) {
                        Ok(Some(total)) => total.saturating_sub(have),
                        _ => 5usize.saturating_sub(have),
                    }
                    .max(1);
                    self.requested = Requested::Read;
                    return Step::Read(st.buffer.read_target(need));
                }
            }
        }
    }
}

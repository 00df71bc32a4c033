//! Connection startup and authentication state machine.

use std::io;

use crate::config::ConnectParams;
use crate::error::{Diagnostics, Error, ExecError, Kind};
use crate::protocol::backend::{
    frame_len, next_message, AuthRequest, BackendKeyData, BackendMessage,
};
use crate::protocol::frontend::{md5_password, write_password, write_startup};
use crate::protocol::types::TransactionStatus;
use crate::state::{ConnectionState, Phase, Requested, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Connecting,
    SendingStartup,
    AwaitingAuth,
    SendingPassword,
    AwaitingReady,
    Closing,
    Finished,
}

/// What to do after one parsed backend message.
enum Decision {
    Continue,
    SendPassword(String),
    Ready(Option<TransactionStatus>),
    ServerError(Diagnostics),
    Fail(Kind),
}

/// Drives connection establishment until ReadyForQuery.
///
/// Understands cleartext and MD5 password authentication; every other
/// method is refused with `unsupported_auth_method`. A server ErrorResponse
/// is captured into the shared diagnostics slot, the socket is closed, and
/// the operation fails with `server_startup_error`.
pub struct StartupFsm {
    state: State,
    requested: Requested,
    params: ConnectParams,
    write_buffer: Vec<u8>,
    pending_error: Option<Kind>,
    backend_key: Option<BackendKeyData>,
    server_params: Vec<(String, String)>,
}

impl StartupFsm {
    /// Create a startup state machine for the given parameters.
    pub fn new(params: ConnectParams) -> Self {
        Self {
            state: State::Initial,
            requested: Requested::None,
            params,
            write_buffer: Vec::new(),
            pending_error: None,
            backend_key: None,
            server_params: Vec::new(),
        }
    }

    /// The connect parameters this FSM was created with.
    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    /// Backend key data received during startup, for CancelRequest.
    pub fn backend_key(&self) -> Option<&BackendKeyData> {
        self.backend_key.as_ref()
    }

    /// Take the server parameters reported during startup.
    pub fn take_server_params(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.server_params)
    }

    /// Advance with the outcome of the previously requested step.
    pub fn resume<'a>(
        &'a mut self,
        st: &'a mut ConnectionState,
        io: io::Result<usize>,
    ) -> Step<'a> {
        // Account the finished step
        match self.requested {
            Requested::Read => match io {
                Ok(0) => {
                    return self.finish(Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()))
                }
                Ok(n) => st.buffer.note_read(n),
                Err(e) => return self.finish(Err(e.into())),
            },
            Requested::Connect | Requested::Write => {
                if let Err(e) = io {
                    return self.finish(Err(e.into()));
                }
            }
            // Close outcome is irrelevant; the stored error wins
            Requested::Close | Requested::None => {}
        }
        self.requested = Requested::None;

        match self.state {
            State::Initial => {
                st.phase = Phase::Startup;
                self.state = State::Connecting;
                self.requested = Requested::Connect;
                Step::Connect
            }
            State::Connecting => {
                self.write_buffer.clear();
                let mut startup_params: Vec<(&str, &str)> =
                    vec![("user", &self.params.username), ("client_encoding", "UTF8")];
                if let Some(db) = &self.params.database {
                    startup_params.push(("database", db));
                }
                for (name, value) in &self.params.options {
                    startup_params.push((name, value));
                }
                if let Err(kind) = write_startup(&mut self.write_buffer, &startup_params) {
                    return self.finish(Err(kind.into()));
                }
                self.state = State::SendingStartup;
                self.requested = Requested::Write;
                Step::Write(&self.write_buffer)
            }
            State::SendingStartup | State::SendingPassword => {
                st.phase = Phase::Authenticating;
                self.state = State::AwaitingAuth;
                self.drive_read(st)
            }
            State::AwaitingAuth | State::AwaitingReady => self.drive_read(st),
            State::Closing => {
                let kind = self.pending_error.take().unwrap_or(Kind::ServerStartupError);
                let diag = st.shared_diag.clone();
                self.finish(Err(ExecError::with_diag(kind, diag).into()))
            }
            State::Finished => self.finish(Err(Kind::OperationInProgress.into())),
        }
    }

    fn finish(&mut self, result: Result<(), Error>) -> Step<'static> {
        self.state = State::Finished;
        Step::Done(result)
    }

    fn drive_read<'a>(&'a mut self, st: &'a mut ConnectionState) -> Step<'a> {
        loop {
            let parsed = {
                let data = st.buffer.unparsed();
                match next_message(data) {
                    Err(kind) => return self.finish(Err(kind.into())),
                    Ok(None) => None,
                    Ok(Some((msg, frame))) => Some((self.on_message(&msg), frame)),
                }
            };

            let (decision, frame) = match parsed {
                Some(v) => v,
                None => {
                    // Not enough buffered; ask for the remainder of the frame
                    let have = st.buffer.len();
                    let need = match frame_len(st.buffer.unparsed()) {
                        Ok(Some(total)) => total.saturating_sub(have),
                        _ => 5usize.saturating_sub(have),
                    }
                    .max(1);
                    self.requested = Requested::Read;
                    return Step::Read(st.buffer.read_target(need));
                }
            };
            st.buffer.consume(frame);

            match decision {
                Decision::Continue => continue,
                Decision::SendPassword(secret) => {
                    self.write_buffer.clear();
                    if let Err(kind) = write_password(&mut self.write_buffer, &secret) {
                        return self.finish(Err(kind.into()));
                    }
                    self.state = State::SendingPassword;
                    self.requested = Requested::Write;
                    return Step::Write(&self.write_buffer);
                }
                Decision::Ready(txn_status) => {
                    st.txn_status = txn_status.unwrap_or_default();
                    st.phase = Phase::ReadyForQuery;
                    return self.finish(Ok(()));
                }
                Decision::ServerError(diag) => {
                    st.shared_diag = diag;
                    self.pending_error = Some(Kind::ServerStartupError);
                    self.state = State::Closing;
                    self.requested = Requested::Close;
                    return Step::Close;
                }
                Decision::Fail(kind) => {
                    return self.finish(Err(kind.into()));
                }
            }
        }
    }

    fn on_message(&mut self, msg: &BackendMessage<'_>) -> Decision {
        match msg {
            BackendMessage::Authentication(auth) => {
                if self.state != State::AwaitingAuth {
                    return Decision::Fail(Kind::ProtocolValueError);
                }
                match auth {
                    AuthRequest::Ok => {
                        self.state = State::AwaitingReady;
                        Decision::Continue
                    }
                    AuthRequest::CleartextPassword => match &self.params.password {
                        Some(password) => Decision::SendPassword(password.clone()),
                        None => Decision::Fail(Kind::PasswordRequired),
                    },
                    AuthRequest::Md5Password { salt } => match &self.params.password {
                        Some(password) => {
                            Decision::SendPassword(md5_password(&self.params.username, password, salt))
                        }
                        None => Decision::Fail(Kind::PasswordRequired),
                    },
                    AuthRequest::Unsupported { .. } => Decision::Fail(Kind::UnsupportedAuthMethod),
                }
            }
            BackendMessage::BackendKeyData(key) => {
                self.backend_key = Some(*key);
                Decision::Continue
            }
            BackendMessage::ParameterStatus(param) => {
                self.server_params
                    .push((param.name.to_string(), param.value.to_string()));
                Decision::Continue
            }
            BackendMessage::NoticeResponse(_)
            | BackendMessage::NotificationResponse(_)
            | BackendMessage::Unknown { .. } => Decision::Continue,
            BackendMessage::ReadyForQuery(ready) => {
                if self.state != State::AwaitingReady {
                    return Decision::Fail(Kind::ProtocolValueError);
                }
                Decision::Ready(ready.transaction_status())
            }
            BackendMessage::ErrorResponse(diag) => Decision::ServerError(diag.clone()),
            _ => Decision::Fail(Kind::ProtocolValueError),
        }
    }
}

//! Asynchronous PostgreSQL connection.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ConnectParams;
use crate::error::{Error, Kind, Result};
use crate::protocol::backend::BackendKeyData;
use crate::protocol::frontend::write_terminate;
use crate::protocol::types::TransactionStatus;
use crate::request::Request;
use crate::response::{IgnoreHandler, Response};
use crate::state::{ConnectionState, ExecFsm, Phase, StartupFsm, Step};

/// An asynchronous connection to a PostgreSQL server.
///
/// Owns the socket and protocol state. One operation may be outstanding at a
/// time; cancelling an operation mid-flight (dropping its future) loses
/// protocol synchronization and marks the connection Failed.
#[derive(Debug)]
pub struct Connection {
    stream: Option<TcpStream>,
    st: ConnectionState,
    backend_key: Option<BackendKeyData>,
    server_params: Vec<(String, String)>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Create an unconnected (Idle) connection.
    pub fn new() -> Self {
        Self {
            stream: None,
            st: ConnectionState::new(),
            backend_key: None,
            server_params: Vec::new(),
        }
    }

    /// Connect and authenticate, returning a ready connection.
    pub async fn open(params: &ConnectParams) -> Result<Self> {
        let mut conn = Self::new();
        conn.connect(params).await?;
        Ok(conn)
    }

    /// Connect using a `postgres://` URL.
    pub async fn open_url(url: &str) -> Result<Self> {
        let params = ConnectParams::try_from(url)?;
        Self::open(&params).await
    }

    /// The current protocol phase.
    pub fn phase(&self) -> Phase {
        self.st.phase
    }

    /// Transaction status from the last ReadyForQuery.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.st.txn_status
    }

    /// Backend key data for an out-of-band CancelRequest.
    pub fn backend_key(&self) -> Option<&BackendKeyData> {
        self.backend_key.as_ref()
    }

    /// Server parameters reported during startup.
    pub fn server_params(&self) -> &[(String, String)] {
        &self.server_params
    }

    /// Establish the connection and drive startup until ReadyForQuery.
    ///
    /// Single-shot: fails unless the connection is Idle. Honors
    /// `params.connect_timeout` over the whole operation.
    pub async fn connect(&mut self, params: &ConnectParams) -> Result<()> {
        if self.st.phase != Phase::Idle {
            return Err(Kind::ConnectionUnusable.into());
        }
        if params.hostname.is_empty() || params.username.is_empty() {
            return Err(Kind::InvalidParams.into());
        }

        let result = match params.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.connect_inner(params)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Io(io::Error::from(io::ErrorKind::TimedOut))),
            },
            None => self.connect_inner(params).await,
        };

        if result.is_err() {
            self.stream = None;
            self.st.buffer.clear();
            self.st.phase = Phase::Failed;
        }
        result
    }

    async fn connect_inner(&mut self, params: &ConnectParams) -> Result<()> {
        let mut fsm = StartupFsm::new(params.clone());
        let mut io: io::Result<usize> = Ok(0);
        let done;
        loop {
            match fsm.resume(&mut self.st, io) {
                Step::Connect => {
                    io = match TcpStream::connect((params.hostname.as_str(), params.port)).await {
                        Ok(stream) => match stream.set_nodelay(true) {
                            Ok(()) => {
                                self.stream = Some(stream);
                                Ok(0)
                            }
                            Err(e) => Err(e),
                        },
                        Err(e) => Err(e),
                    };
                }
                Step::Write(buf) => {
                    io = Self::do_write(self.stream.as_mut(), buf).await;
                }
                Step::Read(target) => {
                    io = Self::do_read(self.stream.as_mut(), target).await;
                }
                Step::Close => {
                    io = Self::do_close(self.stream.as_mut()).await;
                }
                Step::Done(result) => {
                    done = result;
                    break;
                }
            }
        }
        done?;

        self.backend_key = fsm.backend_key().copied();
        self.server_params = fsm.take_server_params();
        Ok(())
    }

    async fn do_write(stream: Option<&mut TcpStream>, buf: &[u8]) -> io::Result<usize> {
        match stream {
            Some(stream) => {
                stream.write_all(buf).await?;
                Ok(buf.len())
            }
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    async fn do_read(stream: Option<&mut TcpStream>, target: &mut [u8]) -> io::Result<usize> {
        match stream {
            Some(stream) => stream.read(target).await,
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    async fn do_close(stream: Option<&mut TcpStream>) -> io::Result<usize> {
        if let Some(stream) = stream {
            let _ = stream.shutdown().await;
        }
        Ok(0)
    }

    /// Execute a request, dispatching responses to the handler chain.
    ///
    /// Fails with `connection_unusable` unless the connection is
    /// ReadyForQuery. On completion the aggregate handler error is returned,
    /// or the transport error if one occurred earlier. A server error leaves
    /// the connection usable (it resynchronizes on ReadyForQuery); transport
    /// and protocol errors mark it Failed.
    pub async fn exec(&mut self, req: &Request, resp: &mut Response<'_>) -> Result<()> {
        match self.st.phase {
            Phase::ReadyForQuery => {}
            Phase::Busy => {
                // A previous exec was cancelled mid-operation
                self.st.phase = Phase::Failed;
                return Err(Kind::ConnectionUnusable.into());
            }
            _ => return Err(Kind::ConnectionUnusable.into()),
        }
        self.st.phase = Phase::Busy;

        let mut fsm = ExecFsm::new(req, resp);
        let result = self.drive_exec(&mut fsm).await;
        let desynced = fsm.desynced();
        drop(fsm);

        match result {
            Ok(()) => {
                self.st.phase = if desynced {
                    Phase::Failed
                } else {
                    Phase::ReadyForQuery
                };
                match resp.first_error() {
                    Some(err) => Err(Error::Exec(err.clone())),
                    None => Ok(()),
                }
            }
            Err(err) => {
                self.st.buffer.clear();
                self.st.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    /// Execute a request, discarding all results.
    ///
    /// Fails only on transport errors or a server ErrorResponse.
    pub async fn exec_ignore(&mut self, req: &Request) -> Result<()> {
        let mut ignore = IgnoreHandler::new();
        let mut resp = crate::response![&mut ignore];
        self.exec(req, &mut resp).await
    }

    async fn drive_exec(&mut self, fsm: &mut ExecFsm<'_, '_>) -> Result<()> {
        let mut io: io::Result<usize> = Ok(0);
        loop {
            match fsm.resume(&mut self.st, io) {
                Step::Write(buf) => {
                    io = Self::do_write(self.stream.as_mut(), buf).await;
                }
                Step::Read(target) => {
                    io = Self::do_read(self.stream.as_mut(), target).await;
                }
                Step::Close => {
                    io = Self::do_close(self.stream.as_mut()).await;
                }
                Step::Connect => {
                    return Err(Kind::ProtocolValueError.into());
                }
                Step::Done(result) => return result,
            }
        }
    }

    /// Close the connection gracefully with a Terminate message.
    pub async fn close(mut self) -> Result<()> {
        if let Some(stream) = self.stream.as_mut() {
            let mut buf = Vec::new();
            write_terminate(&mut buf)?;
            stream.write_all(&buf).await?;
            stream.shutdown().await?;
        }
        self.st.phase = Phase::Closed;
        Ok(())
    }
}

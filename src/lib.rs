//! A native asynchronous PostgreSQL client.
//!
//! # Features
//!
//! - **Sans-I/O state machines**: startup/authentication and query
//!   execution are driven by step intentions; only the connection facade
//!   touches the socket
//! - **Pipelined requests**: a [`Request`] accumulates any number of simple
//!   and extended-query steps into one payload, written in a single batch
//! - **Typed resultsets**: rows decode into plain structs positioned by
//!   column name, with type-OID compatibility checked up front
//! - **Structured server errors**: every ErrorResponse field is captured as
//!   [`Diagnostics`]
//!
//! # Example
//!
//! ```no_run
//! use pglink::{ConnectParams, Connection, Request};
//!
//! pglink::record! {
//!     #[derive(Debug, Default)]
//!     struct Count {
//!         amount: i64,
//!     }
//! }
//!
//! # async fn run() -> pglink::Result<()> {
//! let params = ConnectParams {
//!     hostname: "localhost".into(),
//!     username: "postgres".into(),
//!     database: Some("mydb".into()),
//!     ..ConnectParams::default()
//! };
//! let mut conn = Connection::open(&params).await?;
//!
//! let mut req = Request::new();
//! req.add_query("SELECT count(*) AS amount FROM items", &[])?;
//!
//! let mut counts: Vec<Count> = Vec::new();
//! let mut handler = pglink::into_vec(&mut counts);
//! let mut resp = pglink::response![&mut handler];
//! conn.exec(&req, &mut resp).await?;
//! drop(resp);
//! drop(handler);
//!
//! println!("{} items", counts[0].amount);
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod request;
pub mod response;
pub mod row;
pub mod state;
pub mod types;
pub mod value;

pub use config::ConnectParams;
pub use connection::Connection;
pub use error::{Diagnostics, Error, ExecError, Kind, Result};
pub use protocol::frontend::extended::Target;
pub use protocol::types::{oid, FormatCode, Oid, TransactionStatus};
pub use request::{FrontendMessage, MessageTag, Request};
pub use response::{into_vec, IgnoreHandler, Response, ResponseHandler, ResponseMessage, RowsHandler};
pub use row::{ColumnMeta, DestMap, FieldDecode, FromRecord};
pub use state::{Phase, Step};
pub use types::{Date, Interval, Time, TimeTz, Timestamp, TimestampTz};
pub use value::{Param, ParamFormat};

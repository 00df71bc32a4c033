//! Request composer: pipelined batches of frontend messages.

use crate::error::Kind;
use crate::protocol::frontend::extended::Target;
use crate::protocol::frontend::{
    write_bind, write_close, write_describe, write_execute, write_flush, write_parse, write_query,
    write_sync,
};
use crate::protocol::types::{FormatCode, Oid};
use crate::value::{Param, ParamFormat};

/// Kind of one serialized frontend message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    Bind,
    Close,
    Describe,
    Execute,
    Flush,
    Parse,
    Query,
    Sync,
}

/// A raw frontend message, for the low-level [`Request::add`] escape hatch.
#[derive(Debug, Clone, Copy)]
pub enum FrontendMessage<'a> {
    Query {
        sql: &'a str,
    },
    Parse {
        statement: &'a str,
        sql: &'a str,
        param_oids: &'a [Oid],
    },
    Bind {
        portal: &'a str,
        statement: &'a str,
        params: &'a [Param<'a>],
        fmt: ParamFormat,
        result_fmt: FormatCode,
    },
    Describe {
        target: Target,
        name: &'a str,
    },
    Execute {
        portal: &'a str,
        max_rows: i32,
    },
    Close {
        target: Target,
        name: &'a str,
    },
    Sync,
    Flush,
}

impl FrontendMessage<'_> {
    fn tag(&self) -> MessageTag {
        match self {
            FrontendMessage::Query { .. } => MessageTag::Query,
            FrontendMessage::Parse { .. } => MessageTag::Parse,
            FrontendMessage::Bind { .. } => MessageTag::Bind,
            FrontendMessage::Describe { .. } => MessageTag::Describe,
            FrontendMessage::Execute { .. } => MessageTag::Execute,
            FrontendMessage::Close { .. } => MessageTag::Close,
            FrontendMessage::Sync => MessageTag::Sync,
            FrontendMessage::Flush => MessageTag::Flush,
        }
    }
}

/// An append-only batch of frontend messages.
///
/// Holds the serialized payload plus a parallel vector of [`MessageTag`]s,
/// one per message. With `autosync` enabled (the default) the builder helpers
/// that complete a logical step append a Sync after it; disable it and add
/// syncs manually for custom pipeline patterns.
///
/// A request is not bound to a connection; the same request may be executed
/// on any number of connections.
#[derive(Debug, Default)]
pub struct Request {
    buffer: Vec<u8>,
    tags: Vec<MessageTag>,
    autosync: bool,
}

impl Request {
    /// Create an empty request with autosync enabled.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            tags: Vec::new(),
            autosync: true,
        }
    }

    /// Create an empty request with explicit autosync behavior.
    pub fn with_autosync(autosync: bool) -> Self {
        Self {
            buffer: Vec::new(),
            tags: Vec::new(),
            autosync,
        }
    }

    /// Whether syncs are appended automatically.
    pub fn autosync(&self) -> bool {
        self.autosync
    }

    /// Change the autosync behavior for subsequent additions.
    pub fn set_autosync(&mut self, value: bool) {
        self.autosync = value;
    }

    /// The serialized payload.
    pub fn payload(&self) -> &[u8] {
        &self.buffer
    }

    /// The message tags, one per serialized message.
    pub fn tags(&self) -> &[MessageTag] {
        &self.tags
    }

    /// True if no messages have been added.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Add one raw frontend message, exactly as given; never appends a Sync.
    pub fn add(&mut self, msg: FrontendMessage<'_>) -> Result<&mut Self, Kind> {
        let tag = msg.tag();
        self.tags.reserve(1);
        let start = self.buffer.len();
        let res = match msg {
            FrontendMessage::Query { sql } => write_query(&mut self.buffer, sql),
            FrontendMessage::Parse {
                statement,
                sql,
                param_oids,
            } => write_parse(&mut self.buffer, statement, sql, param_oids),
            FrontendMessage::Bind {
                portal,
                statement,
                params,
                fmt,
                result_fmt,
            } => write_bind(&mut self.buffer, portal, statement, params, fmt, result_fmt),
            FrontendMessage::Describe { target, name } => {
                write_describe(&mut self.buffer, target, name)
            }
            FrontendMessage::Execute { portal, max_rows } => {
                write_execute(&mut self.buffer, portal, max_rows)
            }
            FrontendMessage::Close { target, name } => write_close(&mut self.buffer, target, name),
            FrontendMessage::Sync => write_sync(&mut self.buffer),
            FrontendMessage::Flush => write_flush(&mut self.buffer),
        };
        match res {
            Ok(()) => {
                self.tags.push(tag);
                Ok(self)
            }
            Err(e) => {
                // Keep payload and tags aligned
                self.buffer.truncate(start);
                Err(e)
            }
        }
    }

    fn maybe_add_sync(&mut self) -> Result<(), Kind> {
        if self.autosync {
            self.add(FrontendMessage::Sync)?;
        }
        Ok(())
    }

    /// Add a simple query. Emits: Query. No sync is appended.
    pub fn add_simple_query(&mut self, sql: &str) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Query { sql })
    }

    /// Add a parameterized query over the extended protocol with default
    /// options: best-format parameters, text results, unlimited rows.
    ///
    /// Emits: Parse(unnamed) + Bind(unnamed, unnamed) + Describe(portal) +
    /// Execute + Sync (if autosync).
    pub fn add_query(&mut self, sql: &str, params: &[Param<'_>]) -> Result<&mut Self, Kind> {
        self.add_query_with(sql, params, ParamFormat::SelectBest, FormatCode::Text, 0)
    }

    /// Add a parameterized query with explicit format and row-limit options.
    pub fn add_query_with(
        &mut self,
        sql: &str,
        params: &[Param<'_>],
        fmt: ParamFormat,
        result_fmt: FormatCode,
        max_rows: i32,
    ) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Parse {
            statement: "",
            sql,
            param_oids: &[],
        })?;
        self.add(FrontendMessage::Bind {
            portal: "",
            statement: "",
            params,
            fmt,
            result_fmt,
        })?;
        self.add(FrontendMessage::Describe {
            target: Target::Portal,
            name: "",
        })?;
        self.add(FrontendMessage::Execute {
            portal: "",
            max_rows,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Prepare a named statement. Emits: Parse(name) + Sync (if autosync).
    ///
    /// `param_oids` may pin parameter types; a zero OID leaves the type for
    /// the server to infer.
    pub fn add_prepare(
        &mut self,
        sql: &str,
        statement_name: &str,
        param_oids: &[Oid],
    ) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Parse {
            statement: statement_name,
            sql,
            param_oids,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Execute a named prepared statement with default options.
    ///
    /// Parameter format defaults to text because binary requires the type
    /// OIDs to have been pinned in the prepare, which the builder cannot
    /// verify here.
    ///
    /// Emits: Bind(unnamed, name) + Describe(portal) + Execute + Sync (if
    /// autosync).
    pub fn add_execute(
        &mut self,
        statement_name: &str,
        params: &[Param<'_>],
    ) -> Result<&mut Self, Kind> {
        self.add_execute_with(statement_name, params, ParamFormat::Text, FormatCode::Text, 0)
    }

    /// Execute a named prepared statement with explicit options.
    pub fn add_execute_with(
        &mut self,
        statement_name: &str,
        params: &[Param<'_>],
        fmt: ParamFormat,
        result_fmt: FormatCode,
        max_rows: i32,
    ) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Bind {
            portal: "",
            statement: statement_name,
            params,
            fmt,
            result_fmt,
        })?;
        self.add(FrontendMessage::Describe {
            target: Target::Portal,
            name: "",
        })?;
        self.add(FrontendMessage::Execute {
            portal: "",
            max_rows,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Describe a named prepared statement. Emits: Describe + Sync (if
    /// autosync).
    pub fn add_describe_statement(&mut self, statement_name: &str) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Describe {
            target: Target::Statement,
            name: statement_name,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Describe a named portal. Emits: Describe + Sync (if autosync).
    pub fn add_describe_portal(&mut self, portal_name: &str) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Describe {
            target: Target::Portal,
            name: portal_name,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Close a named prepared statement. Emits: Close + Sync (if autosync).
    pub fn add_close_statement(&mut self, statement_name: &str) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Close {
            target: Target::Statement,
            name: statement_name,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Close a named portal. Emits: Close + Sync (if autosync).
    pub fn add_close_portal(&mut self, portal_name: &str) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Close {
            target: Target::Portal,
            name: portal_name,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Bind a named prepared statement to a portal without executing it.
    /// Emits: Bind + Sync (if autosync).
    pub fn add_bind(
        &mut self,
        statement_name: &str,
        params: &[Param<'_>],
        fmt: ParamFormat,
        portal_name: &str,
        result_fmt: FormatCode,
    ) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Bind {
            portal: portal_name,
            statement: statement_name,
            params,
            fmt,
            result_fmt,
        })?;
        self.maybe_add_sync()?;
        Ok(self)
    }

    /// Add a Sync message.
    pub fn add_sync(&mut self) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Sync)
    }

    /// Add a Flush message.
    pub fn add_flush(&mut self) -> Result<&mut Self, Kind> {
        self.add(FrontendMessage::Flush)
    }
}

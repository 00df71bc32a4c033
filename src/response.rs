//! Response handlers: dispatch of backend messages to typed decoders.

use std::marker::PhantomData;

use crate::error::{Diagnostics, ExecError, Kind};
use crate::protocol::backend::extended::ParameterDescription;
use crate::protocol::backend::query::{CommandComplete, DataRow, RowDescription};
use crate::request::{MessageTag, Request};
use crate::row::{compute_dest_map, DestMap, FromRecord};

/// A backend message as delivered to response handlers.
///
/// Borrowed variants alias the connection's read buffer; handlers must not
/// retain them past one `on_message` call (copy-on-retain).
#[derive(Debug)]
pub enum ResponseMessage<'a> {
    ParseComplete,
    BindComplete,
    CloseComplete,
    NoData,
    ParameterDescription(&'a ParameterDescription),
    RowDescription(&'a RowDescription<'a>),
    DataRow(&'a DataRow<'a>),
    CommandComplete(&'a CommandComplete<'a>),
    EmptyQueryResponse,
    PortalSuspended,
    ErrorResponse(&'a Diagnostics),
    /// Placeholder for a message that was skipped due to a previous error
    Skipped,
}

/// A handler for a contiguous range of request messages.
///
/// `setup` walks the request tag stream from `offset` and returns the
/// absolute tag index at which the next handler takes over (exclusive upper
/// bound). `on_message` receives every backend message answering a request
/// message within the claimed range. `result` reports the handler's outcome;
/// `None` is success.
pub trait ResponseHandler {
    fn setup(&mut self, req: &Request, offset: usize) -> Result<usize, Kind>;
    fn on_message(&mut self, msg: &ResponseMessage<'_>, offset: usize);
    fn result(&self) -> Option<&ExecError>;
}

struct Slot<'h> {
    handler: &'h mut dyn ResponseHandler,
    end: usize,
}

/// A chain of response handlers covering one request.
///
/// Handler slots are dispatched by request-message offset: each slot covers
/// the tag range between its predecessor's end and its own. The aggregate
/// result is the first non-OK slot result in slot order.
pub struct Response<'h> {
    slots: Vec<Slot<'h>>,
    current: usize,
}

impl<'h> Response<'h> {
    /// Build a chain from handlers in slot order.
    pub fn new(handlers: Vec<&'h mut dyn ResponseHandler>) -> Self {
        Self {
            slots: handlers
                .into_iter()
                .map(|handler| Slot { handler, end: 0 })
                .collect(),
            current: 0,
        }
    }

    /// Run the setup pass, assigning each slot its tag range.
    ///
    /// Returns the first uncovered tag index (which must equal the request's
    /// tag count for full coverage).
    pub fn setup(&mut self, req: &Request, mut offset: usize) -> Result<usize, Kind> {
        for slot in &mut self.slots {
            offset = slot.handler.setup(req, offset)?;
            slot.end = offset;
        }
        Ok(offset)
    }

    /// Dispatch one message to the slot covering `offset`.
    pub fn on_message(&mut self, msg: &ResponseMessage<'_>, offset: usize) {
        while self.current < self.slots.len() && offset >= self.slots[self.current].end {
            self.current += 1;
        }
        if let Some(slot) = self.slots.get_mut(self.current) {
            slot.handler.on_message(msg, offset);
        }
    }

    /// The first non-OK slot result, in slot order.
    pub fn first_error(&self) -> Option<&ExecError> {
        self.slots.iter().find_map(|slot| slot.handler.result())
    }

    /// Number of handler slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the chain has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Build a [`Response`] chain from handler references.
///
/// ```ignore
/// let mut rows = Vec::new();
/// let mut h = pglink::into_vec::<Count>(&mut rows);
/// let mut resp = pglink::response![&mut h];
/// ```
#[macro_export]
macro_rules! response {
    ( $($handler:expr),+ $(,)? ) => {
        $crate::response::Response::new(vec![
            $( $handler as &mut dyn $crate::response::ResponseHandler ),+
        ])
    };
}

/// Walk the tag stream of a resultset-producing step.
///
/// Skips leading Sync/Flush. A Query consumes exactly one tag. Otherwise an
/// extended-query group is expected: any of {Parse, Bind, Flush}, exactly
/// one Describe, then exactly one Execute, with trailing Sync/Flush
/// absorbed. Anything else is `incompatible_response_type`.
pub(crate) fn resultset_setup(tags: &[MessageTag], offset: usize) -> Result<usize, Kind> {
    let mut i = offset;

    // Skip any leading syncs
    while i < tags.len() && matches!(tags[i], MessageTag::Sync | MessageTag::Flush) {
        i += 1;
    }
    if i >= tags.len() {
        return Err(Kind::IncompatibleResponseType);
    }

    // A simple query is a resultset on its own
    if tags[i] == MessageTag::Query {
        return Ok(i + 1);
    }

    let mut describe_found = false;
    let mut execute_found = false;
    while i < tags.len() && !execute_found {
        match tags[i] {
            MessageTag::Sync | MessageTag::Flush | MessageTag::Parse | MessageTag::Bind => {}
            MessageTag::Describe => {
                if describe_found {
                    return Err(Kind::IncompatibleResponseType);
                }
                describe_found = true;
            }
            MessageTag::Execute => {
                if !describe_found {
                    return Err(Kind::IncompatibleResponseType);
                }
                execute_found = true;
            }
            _ => return Err(Kind::IncompatibleResponseType),
        }
        i += 1;
    }
    if !execute_found {
        return Err(Kind::IncompatibleResponseType);
    }

    // Absorb trailing syncs
    while i < tags.len() && matches!(tags[i], MessageTag::Sync | MessageTag::Flush) {
        i += 1;
    }
    Ok(i)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowsState {
    ParsingMeta,
    ParsingData,
    Done,
}

/// Typed resultset handler: decodes one RowDescription + DataRow* +
/// CommandComplete sequence into records of `T`, invoking a callback per
/// row.
///
/// Column compatibility is verified once against the RowDescription; on any
/// row error the row is dropped, the first error is kept, and the remaining
/// stream is still consumed to preserve frame synchrony.
pub struct RowsHandler<T, F>
where
    T: FromRecord,
    F: FnMut(T),
{
    state: RowsState,
    map: Option<DestMap>,
    err: Option<ExecError>,
    on_row: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> RowsHandler<T, F>
where
    T: FromRecord,
    F: FnMut(T),
{
    /// Create a handler invoking `on_row` for every decoded record.
    pub fn new(on_row: F) -> Self {
        Self {
            state: RowsState::ParsingMeta,
            map: None,
            err: None,
            on_row,
            _marker: PhantomData,
        }
    }

    fn store_error(&mut self, kind: Kind) {
        if self.err.is_none() {
            self.err = Some(ExecError::new(kind));
        }
    }
}

impl<T, F> ResponseHandler for RowsHandler<T, F>
where
    T: FromRecord,
    F: FnMut(T),
{
    fn setup(&mut self, req: &Request, offset: usize) -> Result<usize, Kind> {
        resultset_setup(req.tags(), offset)
    }

    fn on_message(&mut self, msg: &ResponseMessage<'_>, _offset: usize) {
        match msg {
            // May or may not appear depending on the request shape
            ResponseMessage::ParseComplete
            | ResponseMessage::BindComplete
            | ResponseMessage::NoData
            | ResponseMessage::ParameterDescription(_) => {}

            ResponseMessage::RowDescription(desc) => {
                if self.state != RowsState::ParsingMeta {
                    self.store_error(Kind::IncompatibleResponseType);
                    return;
                }
                // Rows and the CommandComplete follow
                self.state = RowsState::ParsingData;

                match compute_dest_map(desc, T::FIELDS)
                    .and_then(|map| T::check(&map).map(|()| map))
                {
                    Ok(map) => self.map = Some(map),
                    // Rows will be consumed but not parsed
                    Err(kind) => self.store_error(kind),
                }
            }

            ResponseMessage::DataRow(row) => {
                if self.state != RowsState::ParsingData {
                    self.store_error(Kind::IncompatibleResponseType);
                    return;
                }
                // After a failure the field map may be missing; keep
                // consuming up to the CommandComplete without parsing
                if self.err.is_some() {
                    return;
                }
                let map = match &self.map {
                    Some(map) => map,
                    None => {
                        self.store_error(Kind::IncompatibleResponseType);
                        return;
                    }
                };

                let values = match row.values() {
                    Ok(values) => values,
                    Err(kind) => {
                        self.store_error(kind);
                        return;
                    }
                };
                if values.len() < map.column_count() {
                    self.store_error(Kind::ProtocolValueError);
                    return;
                }

                match T::decode(map, &values) {
                    Ok(record) => (self.on_row)(record),
                    Err(kind) => self.store_error(kind),
                }
            }

            ResponseMessage::CommandComplete(_)
            | ResponseMessage::EmptyQueryResponse
            | ResponseMessage::PortalSuspended => {
                self.state = RowsState::Done;
            }

            ResponseMessage::ErrorResponse(diag) => {
                match &mut self.err {
                    None => {
                        self.err =
                            Some(ExecError::with_diag(Kind::ExecServerError, (*diag).clone()));
                    }
                    // An earlier client-side error keeps its code; the
                    // server diagnostics are still attached
                    Some(err) if err.diag.is_empty() => err.diag = (*diag).clone(),
                    Some(_) => {}
                }
                self.state = RowsState::Done;
            }

            ResponseMessage::Skipped => self.store_error(Kind::StepSkipped),

            ResponseMessage::CloseComplete => self.store_error(Kind::IncompatibleResponseType),
        }
    }

    fn result(&self) -> Option<&ExecError> {
        self.err.as_ref()
    }
}

/// Typed resultset handler that pushes decoded records into a vector.
pub fn into_vec<T: FromRecord>(out: &mut Vec<T>) -> RowsHandler<T, impl FnMut(T) + '_> {
    RowsHandler::new(move |record| out.push(record))
}

/// Handler that accepts any backend message sequence and claims the rest of
/// the request.
///
/// Always succeeds unless the server reports an error.
#[derive(Debug, Default)]
pub struct IgnoreHandler {
    err: Option<ExecError>,
}

impl IgnoreHandler {
    /// Create an ignore handler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseHandler for IgnoreHandler {
    fn setup(&mut self, req: &Request, _offset: usize) -> Result<usize, Kind> {
        Ok(req.tags().len())
    }

    fn on_message(&mut self, msg: &ResponseMessage<'_>, _offset: usize) {
        if let ResponseMessage::ErrorResponse(diag) = msg {
            if self.err.is_none() {
                self.err = Some(ExecError::with_diag(Kind::ExecServerError, (*diag).clone()));
            }
        }
    }

    fn result(&self) -> Option<&ExecError> {
        self.err.as_ref()
    }
}

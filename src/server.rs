//! The server session: the authoritative document plus the receive
//! pipeline that validates, transforms, and broadcasts incoming ops.

use tracing::{debug, warn};

use crate::codec::{Codec, JsonCodec};
use crate::doc::Doc;
use crate::error::OtError;
use crate::event::{Event, EventType};
use crate::hash::ZERO_HASH;
use crate::op::Op;
use crate::xform::xform;

/// The authoritative document for a collaboration session, plus the
/// `send`/`event` callback pair every session is constructed with.
pub struct Server {
    pub doc: Doc,
    send: Box<dyn FnMut(String)>,
    event: Box<dyn FnMut(Event<'_>)>,
}

impl Server {
    pub fn new(send: impl FnMut(String) + 'static, event: impl FnMut(Event<'_>) + 'static) -> Self {
        Server {
            doc: Doc::new(),
            send: Box::new(send),
            event: Box::new(event),
        }
    }

    fn fire(&mut self, kind: EventType, op: Option<&Op>) {
        (self.event)(Event { kind, op });
    }

    fn send_json(&mut self, json: String) {
        (self.send)(json);
        debug!("sent message");
    }

    fn send_err(&mut self, err: OtError) {
        let json = JsonCodec.encode_err(err);
        self.send_json(json);
    }

    /// True if `op` can be appended directly onto the current document
    /// head without transforming against concurrent history.
    fn can_append(&self, op: &Op) -> bool {
        if self.doc.is_empty() {
            return op.parent == ZERO_HASH;
        }
        op.parent == self.doc.head_hash()
    }

    /// Decodes and integrates a message from a client: appends it directly
    /// if it's already based on the document head, otherwise rebases it
    /// via `compose_after` + `xform` before appending. Broadcasts the
    /// appended op on success; on any failure, replies to the sender with
    /// the error code and leaves the document untouched.
    pub fn receive(&mut self, json: &str) {
        debug!("received message");

        let decoded = match JsonCodec.decode_op(json) {
            Ok(op) => op,
            Err(err) => {
                warn!(?err, "couldn't decode the received operation");
                self.send_err(err);
                self.fire(EventType::Error, None);
                return;
            }
        };

        let result = if self.can_append(&decoded) {
            self.append(decoded)
        } else {
            match self.rebase(decoded) {
                Ok(rebased) => self.append(rebased),
                Err(err) => Err(err),
            }
        };

        match result {
            Ok(ref appended) => self.fire(EventType::OpApplied, Some(appended)),
            Err(err) => {
                self.send_err(err);
                self.fire(EventType::Error, None);
            }
        }
    }

    fn rebase(&self, op: Op) -> Result<Op, OtError> {
        let concurrent = self.doc.compose_after(&op.parent).ok_or_else(|| {
            warn!("couldn't find the operation's parent in history");
            OtError::XformFailed
        })?;

        let (_server_prime, client_prime) = xform(&concurrent, &op).map_err(|_| {
            warn!("transforming received operation against server history failed");
            OtError::XformFailed
        })?;
        Ok(client_prime)
    }

    fn append(&mut self, op: Op) -> Result<Op, OtError> {
        let appended = self.doc.append(op)?.clone();
        let json = JsonCodec.encode_op(&appended);
        self.send_json(json);
        Ok(appended)
    }
}

//! The client session state machine: local apply, the anticipated/buffer
//! pipeline, and remote integration.

use tracing::{debug, warn};

use crate::codec::{Codec, JsonCodec};
use crate::compose::compose;
use crate::doc::Doc;
use crate::error::{OtError, OtResult};
use crate::event::{Event, EventType};
use crate::hash::Hash;
use crate::op::Op;
use crate::xform::xform;

/// A local editing session for one client.
///
/// Tracks at most one in-flight op (`anticipated`) plus whatever local
/// edits have accumulated since (`buffer`), enforcing the causal
/// guarantee that this client's ops reach the server in authoring order.
pub struct Client {
    pub doc: Doc,
    client_id: u32,
    anticipated: Option<Op>,
    buffer: Option<Op>,
    ack_required: bool,
    send: Box<dyn FnMut(String)>,
    event: Box<dyn FnMut(Event<'_>)>,
}

impl Client {
    pub fn new(client_id: u32, send: impl FnMut(String) + 'static, event: impl FnMut(Event<'_>) + 'static) -> Self {
        Client {
            doc: Doc::new(),
            client_id,
            anticipated: None,
            buffer: None,
            ack_required: false,
            send: Box::new(send),
            event: Box::new(event),
        }
    }

    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    fn fire(&mut self, kind: EventType, op: Option<&Op>) {
        (self.event)(Event { kind, op });
    }

    /// Applies a locally authored edit: appends it to the local document,
    /// folds it into the outgoing buffer, and sends the buffer immediately
    /// if no ack is outstanding.
    ///
    /// Checks that the edit would fold into the buffer *before* touching
    /// `self.doc`: `compose` only reads component contents, so the check
    /// succeeds or fails identically whether it runs before or after
    /// `doc.append` assigns `op`'s parent/hash. Running it first means a
    /// `BufferFailed` leaves `self.doc` untouched, per §7's rollback
    /// requirement — `Doc` has no way to undo an append once it succeeds.
    pub fn apply(&mut self, mut op: Op) -> OtResult<()> {
        op.client_id = self.client_id;

        debug!(client_id = self.client_id, "editor applying operation");

        if let Some(buffer) = &self.buffer {
            if compose(buffer, &op).is_err() {
                warn!("composing buffer with applied operation failed");
                return Err(OtError::BufferFailed);
            }
        }

        let appended = self.doc.append(op)?.clone();

        self.buffer = Some(match self.buffer.take() {
            None => appended,
            Some(buffer) => compose(&buffer, &appended).expect("already validated above"),
        });

        if !self.ack_required {
            self.send_buffer(None);
        }

        Ok(())
    }

    /// Flushes the outgoing buffer over `send`, rebasing it onto
    /// `ack_hash` (the state the server just confirmed) if provided.
    pub fn send_buffer(&mut self, ack_hash: Option<Hash>) {
        let mut buffer = match self.buffer.take() {
            None => {
                self.anticipated = None;
                return;
            }
            Some(buffer) => buffer,
        };

        if let Some(hash) = ack_hash {
            buffer.parent = hash;
        }

        let json = JsonCodec.encode_op(&buffer);
        (self.send)(json);
        debug!("sent message");

        self.anticipated = Some(buffer);
        self.ack_required = true;
    }

    /// Decodes and integrates a message received from the server: either
    /// an acknowledgment of this client's own in-flight op, or a foreign op
    /// that must be reconciled against `anticipated`/`buffer` before being
    /// applied locally. A message that fails to decode fires `Error` and
    /// leaves the session otherwise untouched.
    pub fn receive(&mut self, json: &str) {
        let decoded = match JsonCodec.decode_op(json) {
            Ok(op) => op,
            Err(err) => {
                warn!(?err, "couldn't decode the received operation");
                self.fire(EventType::Error, None);
                return;
            }
        };
        self.integrate(decoded);
    }

    fn integrate(&mut self, decoded: Op) {
        if decoded.client_id == self.client_id {
            debug!("operation was acknowledged");
            self.ack_required = false;
            self.send_buffer(Some(decoded.hash));
            return;
        }

        self.fire(EventType::OpIncoming, None);

        let inter = match self.xform_anticipated(decoded) {
            Ok(inter) => inter,
            Err(_) => {
                self.fire(EventType::Error, None);
                return;
            }
        };

        let apply_op = match self.xform_buffer(inter) {
            Ok(apply_op) => apply_op,
            Err(_) => {
                self.fire(EventType::Error, None);
                return;
            }
        };

        if self.doc.append(apply_op.clone()).is_err() {
            self.fire(EventType::Error, None);
            return;
        }
        self.fire(EventType::OpApplied, Some(&apply_op));
    }

    /// Transforms a received foreign op against our anticipated in-flight
    /// op (if any), replacing `anticipated` with its transformed
    /// counterpart and returning the foreign op rebased past it.
    fn xform_anticipated(&mut self, received: Op) -> OtResult<Op> {
        let Some(anticipated) = self.anticipated.take() else {
            return Ok(received);
        };

        let (inter, anticipated_prime) = xform(&received, &anticipated).map_err(|_| {
            warn!("transforming received operation against anticipated operation failed");
            OtError::XformFailed
        })?;
        self.anticipated = Some(anticipated_prime);
        Ok(inter)
    }

    /// Transforms the outgoing buffer (if any) against an intermediate
    /// foreign op, replacing `buffer` with its transformed counterpart and
    /// returning the op to apply locally.
    fn xform_buffer(&mut self, inter: Op) -> OtResult<Op> {
        let Some(buffer) = self.buffer.take() else {
            return Ok(inter);
        };

        let (buffer_prime, apply_op) = xform(&buffer, &inter).map_err(|_| {
            warn!("transforming buffer against intermediate operation failed");
            OtError::XformFailed
        })?;
        self.buffer = Some(buffer_prime);
        Ok(apply_op)
    }
}

use crate::error::ProtocolError;
use crate::protocol::field::{write_field, Value};
use crate::protocol::float::FloatMode;
use crate::protocol::packet::Packet;
use crate::protocol::schema::Schema;
use crate::protocol::window::PacketWindow;
use bytes::{Bytes, BytesMut};
use std::io;
use std::sync::Arc;
use tokio_util::codec::Encoder;

/// Frames and builds packets against a schema. Cheap to clone.
#[derive(Clone)]
pub struct Codec {
    schema: Arc<Schema>,
    floats: FloatMode,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::new(Schema::beta()), FloatMode::Native)
    }
}

impl Codec {
    pub fn new(schema: Arc<Schema>, floats: FloatMode) -> Self {
        Self { schema, floats }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Finds the extent of the frame at the start of `buf`.
    /// Returns the field offsets (with the end sentinel), or `None` if `buf`
    /// does not hold the whole frame yet.
    pub fn frame(&self, buf: &[u8]) -> Result<Option<Vec<usize>>, ProtocolError> {
        let Some(&kind) = buf.first() else {
            return Ok(None);
        };
        let spec = self
            .schema
            .get(kind)
            .ok_or(ProtocolError::UnknownPacket { kind })?;

        let mut offsets = Vec::with_capacity(spec.fields.len() + 1);
        let mut pos = 1;
        for (index, field) in spec.fields.iter().enumerate() {
            offsets.push(pos);
            pos = match field.scan(buf, pos, kind, index)? {
                Some(next) => next,
                None => return Ok(None),
            };
        }
        offsets.push(pos);
        Ok(Some(offsets))
    }

    /// Decodes the next packet from the window's lookahead.
    /// `Ok(None)` means more bytes are needed; the window is left untouched.
    pub fn try_decode(&self, window: &mut PacketWindow) -> Result<Option<Packet>, ProtocolError> {
        let lookahead = window.lookahead();
        let Some(offsets) = self.frame(lookahead)? else {
            if window.is_full() && window.lookahead().len() == window.capacity() {
                return Err(ProtocolError::FrameTooLarge {
                    kind: lookahead[0],
                    capacity: window.capacity(),
                });
            }
            return Ok(None);
        };
        let kind = lookahead[0];
        let spec = self
            .schema
            .get(kind)
            .ok_or(ProtocolError::UnknownPacket { kind })?;

        let length = offsets[offsets.len() - 1];
        window.consume(length);
        let data = Bytes::copy_from_slice(window.last_frame());
        Ok(Some(Packet::new(
            spec,
            data,
            offsets.into_boxed_slice(),
            self.floats,
        )))
    }

    /// Builds a packet of type `kind` from one argument per schema field.
    pub fn encode(&self, kind: u8, args: &[Value]) -> Result<Packet, ProtocolError> {
        let spec = self
            .schema
            .get(kind)
            .ok_or(ProtocolError::UnknownPacket { kind })?;
        if args.len() != spec.fields.len() {
            return Err(ProtocolError::ArgumentCount {
                kind,
                expected: spec.fields.len(),
                actual: args.len(),
            });
        }

        let mut out = BytesMut::with_capacity(64);
        out.extend_from_slice(&[kind]);
        let mut offsets = Vec::with_capacity(spec.fields.len() + 1);
        for (index, (field, value)) in spec.fields.iter().zip(args).enumerate() {
            offsets.push(out.len());
            write_field(*field, value, &mut out, self.floats, kind, index)?;
        }
        offsets.push(out.len());

        Ok(Packet::new(
            spec,
            out.freeze(),
            offsets.into_boxed_slice(),
            self.floats,
        ))
    }
}

/// Writes packets to a `FramedWrite` sink verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketEncoder;

impl Encoder<Packet> for PacketEncoder {
    type Error = io::Error;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> io::Result<()> {
        dst.extend_from_slice(packet.as_bytes());
        Ok(())
    }
}

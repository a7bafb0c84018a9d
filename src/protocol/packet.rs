use crate::error::ProtocolError;
use crate::protocol::field::{read_field, FieldKind, Value};
use crate::protocol::float::FloatMode;
use crate::protocol::schema::PacketSpec;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use std::fmt;

/// One complete framed packet, including its leading type byte, plus the byte
/// offset of every field. `offsets` has one entry per field and a trailing
/// sentinel equal to the frame length.
#[derive(Clone)]
pub struct Packet {
    spec: &'static PacketSpec,
    data: Bytes,
    offsets: Box<[usize]>,
    floats: FloatMode,
}

impl Packet {
    pub(crate) fn new(
        spec: &'static PacketSpec,
        data: Bytes,
        offsets: Box<[usize]>,
        floats: FloatMode,
    ) -> Self {
        debug_assert_eq!(offsets.len(), spec.fields.len() + 1);
        Self {
            spec,
            data,
            offsets,
            floats,
        }
    }

    pub fn kind(&self) -> u8 {
        self.spec.id
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// The exact wire bytes of the packet.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.spec.fields.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    fn raw_field(&self, index: usize) -> Result<(FieldKind, &[u8]), ProtocolError> {
        let kind = *self
            .spec
            .fields
            .get(index)
            .ok_or(ProtocolError::NoSuchField {
                kind: self.kind(),
                field: index,
            })?;
        Ok((kind, &self.data[self.offsets[index]..self.offsets[index + 1]]))
    }

    fn wrong_type(&self, index: usize, requested: &'static str, actual: FieldKind) -> ProtocolError {
        ProtocolError::FieldType {
            kind: self.kind(),
            field: index,
            requested,
            actual,
        }
    }

    /// Decodes any field into its typed value.
    pub fn field(&self, index: usize) -> Result<Value, ProtocolError> {
        let (kind, bytes) = self.raw_field(index)?;
        read_field(kind, bytes, self.floats).ok_or(ProtocolError::InvalidField {
            kind: self.kind(),
            field: index,
        })
    }

    /// Reads a byte, short or int field, sign-extended.
    pub fn field_as_int(&self, index: usize) -> Result<i32, ProtocolError> {
        let (kind, bytes) = self.raw_field(index)?;
        match kind {
            FieldKind::Byte => Ok(bytes[0] as i8 as i32),
            FieldKind::Short => Ok(BigEndian::read_i16(bytes) as i32),
            FieldKind::Int => Ok(BigEndian::read_i32(bytes)),
            other => Err(self.wrong_type(index, "int", other)),
        }
    }

    /// Reads any integer field, sign-extended.
    pub fn field_as_long(&self, index: usize) -> Result<i64, ProtocolError> {
        let (kind, bytes) = self.raw_field(index)?;
        match kind {
            FieldKind::Long => Ok(BigEndian::read_i64(bytes)),
            FieldKind::Byte | FieldKind::Short | FieldKind::Int => {
                self.field_as_int(index).map(i64::from)
            }
            other => Err(self.wrong_type(index, "long", other)),
        }
    }

    /// Reads a float or double field.
    pub fn field_as_double(&self, index: usize) -> Result<f64, ProtocolError> {
        let (kind, bytes) = self.raw_field(index)?;
        match kind {
            FieldKind::Float => Ok(self.floats.f32_from_bits(BigEndian::read_u32(bytes)) as f64),
            FieldKind::Double => Ok(self.floats.f64_from_bits(BigEndian::read_u64(bytes))),
            other => Err(self.wrong_type(index, "double", other)),
        }
    }

    pub fn field_as_string(&self, index: usize) -> Result<String, ProtocolError> {
        let (kind, _) = self.raw_field(index)?;
        match kind {
            FieldKind::Str16 | FieldKind::Str8 => match self.field(index)? {
                Value::Str(s) => Ok(s),
                _ => Err(self.wrong_type(index, "string", kind)),
            },
            other => Err(self.wrong_type(index, "string", other)),
        }
    }

    /// Borrows the payload of a byte array field, without its length prefix.
    pub fn field_as_bytes(&self, index: usize) -> Result<&[u8], ProtocolError> {
        let (kind, bytes) = self.raw_field(index)?;
        match kind {
            FieldKind::ByteArray => Ok(&bytes[4..]),
            FieldKind::ShortBytes => Ok(&bytes[1..]),
            other => Err(self.wrong_type(index, "byte array", other)),
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("kind", &format_args!("0x{:02x}", self.kind()))
            .field("name", &self.name())
            .field("len", &self.len())
            .finish()
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.spec.id == other.spec.id && self.data == other.data && self.offsets == other.offsets
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ProtocolError;
    use crate::protocol::codec::Codec;
    use crate::protocol::field::Value;
    use crate::protocol::schema::ids;
    use crate::protocol::window::PacketWindow;
    use assert_matches::assert_matches;

    fn chunk_packet() -> crate::protocol::Packet {
        Codec::default()
            .encode(
                ids::MAP_CHUNK,
                &[
                    Value::Int(-32),
                    Value::Short(0),
                    Value::Int(16),
                    Value::Byte(15),
                    Value::Byte(127),
                    Value::Byte(15),
                    Value::Bytes(vec![1, 2, 3]),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_offsets_have_sentinel() {
        let packet = chunk_packet();
        assert_eq!(packet.offsets().len(), packet.field_count() + 1);
        assert_eq!(packet.offsets()[0], 1);
        assert_eq!(*packet.offsets().last().unwrap(), packet.len());
    }

    #[test]
    fn test_typed_access() {
        let packet = chunk_packet();
        assert_eq!(packet.name(), "map_chunk");
        assert_eq!(packet.field_as_int(0).unwrap(), -32);
        assert_eq!(packet.field_as_int(3).unwrap(), 15);
        assert_eq!(packet.field_as_long(2).unwrap(), 16);
        assert_eq!(packet.field_as_bytes(6).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_incompatible_access_is_an_error() {
        let packet = chunk_packet();
        assert_matches!(
            packet.field_as_int(6),
            Err(ProtocolError::FieldType {
                kind: 0x33,
                field: 6,
                requested: "int",
                ..
            })
        );
        assert_matches!(packet.field_as_string(0), Err(ProtocolError::FieldType { .. }));
        assert_matches!(packet.field_as_double(1), Err(ProtocolError::FieldType { .. }));
        assert_matches!(packet.field_as_int(7), Err(ProtocolError::NoSuchField { field: 7, .. }));
    }

    #[test]
    fn test_undecodable_field_is_reported_by_position() {
        let mut window = PacketWindow::with_capacity(64);
        window.extend(&[ids::CHAT, 0x00, 0x01, 0xD8, 0x00]);
        let packet = Codec::default().try_decode(&mut window).unwrap().unwrap();

        let err = packet.field(0).unwrap_err();
        assert_matches!(err, ProtocolError::InvalidField { kind: 0x03, field: 0 });
        assert_eq!(err.to_string(), "packet 0x03 field 0: undecodable value");
        assert_matches!(
            packet.field_as_string(0),
            Err(ProtocolError::InvalidField { field: 0, .. })
        );
    }

    #[test]
    fn test_clone_is_equal() {
        let packet = chunk_packet();
        let copy = packet.clone();
        assert_eq!(packet, copy);
        assert_eq!(copy.as_bytes(), packet.as_bytes());
    }
}

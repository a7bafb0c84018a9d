use crate::error::ProtocolError;
use crate::protocol::float::FloatMode;
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};

/// Marks the end of an entity metadata list.
pub const METADATA_END: u8 = 0x7F;

/// Wire shape of a single packet field. All multi-byte integers are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// u16 length in UTF-16 code units, then the units.
    Str16,
    /// u16 byte length, then UTF-8 bytes.
    Str8,
    /// i16 item id, then count and damage unless the id is -1.
    Slot,
    /// i32 length, then raw bytes.
    ByteArray,
    /// u16 count, then 4 bytes per block change.
    BlockChanges,
    /// u16 count, then that many slots.
    Items,
    /// i32 count, then 3 bytes per explosion record.
    Records,
    /// u8 length, then raw bytes.
    ShortBytes,
    /// Tagged entries terminated by [`METADATA_END`].
    Metadata,
    /// i32 flag, followed by three i16 when the flag is positive.
    ObjectData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub id: i16,
    pub count: i8,
    pub damage: i16,
}

/// One entry of a multi block change, in chunk-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChange {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub block: u8,
    pub meta: u8,
}

impl BlockChange {
    fn packed_position(&self) -> u16 {
        ((self.x as u16 & 0x0F) << 12) | ((self.z as u16 & 0x0F) << 8) | self.y as u16
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Float(f32),
    Str(String),
    Item(ItemStack),
}

impl MetaValue {
    fn class(&self) -> u8 {
        match self {
            MetaValue::Byte(_) => 0,
            MetaValue::Short(_) => 1,
            MetaValue::Int(_) => 2,
            MetaValue::Float(_) => 3,
            MetaValue::Str(_) => 4,
            MetaValue::Item(_) => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaEntry {
    /// Low five bits of the entry's leading byte.
    pub index: u8,
    pub value: MetaValue,
}

/// A typed field value: builder argument on the way out, decoded field on the way in.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Slot(Option<ItemStack>),
    Bytes(Vec<u8>),
    BlockChanges(Vec<BlockChange>),
    Items(Vec<Option<ItemStack>>),
    Records(Vec<(i8, i8, i8)>),
    Metadata(Vec<MetaEntry>),
    ObjectData(Option<(i16, i16, i16)>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Byte(value as i8)
    }
}

/// Returns early with `Ok(None)` when the buffer is too short.
macro_rules! ready {
    ($e:expr) => {
        match $e {
            Some(value) => value,
            None => return Ok(None),
        }
    };
}

fn advance(buf: &[u8], pos: usize, n: usize) -> Option<usize> {
    let end = pos.checked_add(n)?;
    (end <= buf.len()).then_some(end)
}

fn peek_u8(buf: &[u8], pos: usize) -> Option<u8> {
    buf.get(pos).copied()
}

fn peek_u16(buf: &[u8], pos: usize) -> Option<u16> {
    buf.get(pos..pos + 2).map(BigEndian::read_u16)
}

fn peek_i16(buf: &[u8], pos: usize) -> Option<i16> {
    buf.get(pos..pos + 2).map(BigEndian::read_i16)
}

fn peek_i32(buf: &[u8], pos: usize) -> Option<i32> {
    buf.get(pos..pos + 4).map(BigEndian::read_i32)
}

fn scan_slot(buf: &[u8], pos: usize) -> Option<usize> {
    let id = peek_i16(buf, pos)?;
    let pos = advance(buf, pos, 2)?;
    if id == -1 {
        Some(pos)
    } else {
        advance(buf, pos, 3)
    }
}

impl FieldKind {
    /// Walks over one field starting at `pos`. Returns the position just past it,
    /// or `None` when `buf` ends before the field does.
    pub fn scan(
        self,
        buf: &[u8],
        pos: usize,
        kind: u8,
        field: usize,
    ) -> Result<Option<usize>, ProtocolError> {
        let end = match self {
            FieldKind::Byte => ready!(advance(buf, pos, 1)),
            FieldKind::Short => ready!(advance(buf, pos, 2)),
            FieldKind::Int | FieldKind::Float => ready!(advance(buf, pos, 4)),
            FieldKind::Long | FieldKind::Double => ready!(advance(buf, pos, 8)),
            FieldKind::Str16 => {
                let units = ready!(peek_u16(buf, pos)) as usize;
                ready!(advance(buf, pos + 2, units * 2))
            }
            FieldKind::Str8 => {
                let length = ready!(peek_u16(buf, pos)) as usize;
                ready!(advance(buf, pos + 2, length))
            }
            FieldKind::Slot => ready!(scan_slot(buf, pos)),
            FieldKind::ByteArray | FieldKind::Records => {
                let length = ready!(peek_i32(buf, pos));
                if length < 0 {
                    return Err(ProtocolError::NegativeLength {
                        kind,
                        field,
                        length,
                    });
                }
                let width = if self == FieldKind::Records { 3 } else { 1 };
                ready!(advance(buf, pos + 4, length as usize * width))
            }
            FieldKind::BlockChanges => {
                let count = ready!(peek_u16(buf, pos)) as usize;
                ready!(advance(buf, pos + 2, count * 4))
            }
            FieldKind::Items => {
                let count = ready!(peek_u16(buf, pos));
                let mut cursor = pos + 2;
                for _ in 0..count {
                    cursor = ready!(scan_slot(buf, cursor));
                }
                cursor
            }
            FieldKind::ShortBytes => {
                let length = ready!(peek_u8(buf, pos)) as usize;
                ready!(advance(buf, pos + 1, length))
            }
            FieldKind::Metadata => {
                let mut cursor = pos;
                loop {
                    let lead = ready!(peek_u8(buf, cursor));
                    cursor += 1;
                    if lead == METADATA_END {
                        break;
                    }
                    cursor = match lead >> 5 {
                        0 => ready!(advance(buf, cursor, 1)),
                        1 => ready!(advance(buf, cursor, 2)),
                        2 | 3 => ready!(advance(buf, cursor, 4)),
                        4 => {
                            let length = ready!(peek_u16(buf, cursor)) as usize;
                            ready!(advance(buf, cursor + 2, length))
                        }
                        5 => ready!(advance(buf, cursor, 5)),
                        class => {
                            return Err(ProtocolError::InvalidMetadata { kind, field, class })
                        }
                    };
                }
                cursor
            }
            FieldKind::ObjectData => {
                let flag = ready!(peek_i32(buf, pos));
                let extra = if flag > 0 { 6 } else { 0 };
                ready!(advance(buf, pos, 4 + extra))
            }
        };
        Ok(Some(end))
    }

    /// Human readable name used in usage errors.
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Byte => "byte",
            FieldKind::Short => "short",
            FieldKind::Int => "int",
            FieldKind::Long => "long",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Str16 | FieldKind::Str8 => "string",
            FieldKind::Slot => "item slot",
            FieldKind::ByteArray | FieldKind::ShortBytes => "byte array",
            FieldKind::BlockChanges => "block change array",
            FieldKind::Items => "item array",
            FieldKind::Records => "record array",
            FieldKind::Metadata => "entity metadata",
            FieldKind::ObjectData => "object data",
        }
    }
}

fn put_slot(out: &mut BytesMut, slot: &Option<ItemStack>) {
    match slot {
        Some(item) => {
            out.put_i16(item.id);
            out.put_i8(item.count);
            out.put_i16(item.damage);
        }
        None => out.put_i16(-1),
    }
}

/// Appends `value` to `out` in the shape `kind` requires.
pub fn write_field(
    kind: FieldKind,
    value: &Value,
    out: &mut BytesMut,
    floats: FloatMode,
    packet: u8,
    field: usize,
) -> Result<(), ProtocolError> {
    let too_long = |length: usize| ProtocolError::TooLong {
        kind: packet,
        field,
        length,
    };

    match (kind, value) {
        (FieldKind::Byte, Value::Byte(v)) => out.put_i8(*v),
        (FieldKind::Short, Value::Short(v)) => out.put_i16(*v),
        (FieldKind::Int, Value::Int(v)) => out.put_i32(*v),
        (FieldKind::Long, Value::Long(v)) => out.put_i64(*v),
        (FieldKind::Float, Value::Float(v)) => out.put_u32(floats.f32_to_bits(*v)),
        (FieldKind::Double, Value::Double(v)) => out.put_u64(floats.f64_to_bits(*v)),
        (FieldKind::Str16, Value::Str(s)) => {
            let units: Vec<u16> = s.encode_utf16().collect();
            let count = u16::try_from(units.len()).map_err(|_| too_long(units.len()))?;
            out.put_u16(count);
            for unit in units {
                out.put_u16(unit);
            }
        }
        (FieldKind::Str8, Value::Str(s)) => {
            let length = u16::try_from(s.len()).map_err(|_| too_long(s.len()))?;
            out.put_u16(length);
            out.put_slice(s.as_bytes());
        }
        (FieldKind::Slot, Value::Slot(slot)) => put_slot(out, slot),
        (FieldKind::ByteArray, Value::Bytes(bytes)) => {
            let length = i32::try_from(bytes.len()).map_err(|_| too_long(bytes.len()))?;
            out.put_i32(length);
            out.put_slice(bytes);
        }
        (FieldKind::ShortBytes, Value::Bytes(bytes)) => {
            let length = u8::try_from(bytes.len()).map_err(|_| too_long(bytes.len()))?;
            out.put_u8(length);
            out.put_slice(bytes);
        }
        (FieldKind::BlockChanges, Value::BlockChanges(changes)) => {
            let count = u16::try_from(changes.len()).map_err(|_| too_long(changes.len()))?;
            out.put_u16(count);
            for change in changes {
                out.put_u16(change.packed_position());
            }
            for change in changes {
                out.put_u8(change.block);
            }
            for change in changes {
                out.put_u8(change.meta);
            }
        }
        (FieldKind::Items, Value::Items(items)) => {
            let count = u16::try_from(items.len()).map_err(|_| too_long(items.len()))?;
            out.put_u16(count);
            for slot in items {
                put_slot(out, slot);
            }
        }
        (FieldKind::Records, Value::Records(records)) => {
            let count = i32::try_from(records.len()).map_err(|_| too_long(records.len()))?;
            out.put_i32(count);
            for (x, y, z) in records {
                out.put_i8(*x);
                out.put_i8(*y);
                out.put_i8(*z);
            }
        }
        (FieldKind::Metadata, Value::Metadata(entries)) => {
            for entry in entries {
                out.put_u8((entry.value.class() << 5) | (entry.index & 0x1F));
                match &entry.value {
                    MetaValue::Byte(v) => out.put_i8(*v),
                    MetaValue::Short(v) => out.put_i16(*v),
                    MetaValue::Int(v) => out.put_i32(*v),
                    MetaValue::Float(v) => out.put_u32(floats.f32_to_bits(*v)),
                    MetaValue::Str(s) => {
                        let length = u16::try_from(s.len()).map_err(|_| too_long(s.len()))?;
                        out.put_u16(length);
                        out.put_slice(s.as_bytes());
                    }
                    MetaValue::Item(item) => {
                        out.put_i16(item.id);
                        out.put_i8(item.count);
                        out.put_i16(item.damage);
                    }
                }
            }
            out.put_u8(METADATA_END);
        }
        (FieldKind::ObjectData, Value::ObjectData(data)) => match data {
            Some((x, y, z)) => {
                out.put_i32(1);
                out.put_i16(*x);
                out.put_i16(*y);
                out.put_i16(*z);
            }
            None => out.put_i32(0),
        },
        (expected, _) => {
            return Err(ProtocolError::ArgumentMismatch {
                kind: packet,
                field,
                expected,
            })
        }
    }
    Ok(())
}

/// Sequential reader over one field's bytes. Framing already checked the lengths,
/// so running short here means the caller handed in a bad slice.
struct FieldBytes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldBytes<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.data.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(bytes)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn i8(&mut self) -> Option<i8> {
        self.u8().map(|b| b as i8)
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(BigEndian::read_u16)
    }

    fn i16(&mut self) -> Option<i16> {
        self.take(2).map(BigEndian::read_i16)
    }

    fn i32(&mut self) -> Option<i32> {
        self.take(4).map(BigEndian::read_i32)
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(BigEndian::read_u32)
    }

    fn slot(&mut self) -> Option<Option<ItemStack>> {
        let id = self.i16()?;
        if id == -1 {
            return Some(None);
        }
        Some(Some(ItemStack {
            id,
            count: self.i8()?,
            damage: self.i16()?,
        }))
    }

    fn utf8(&mut self, length: usize) -> Option<String> {
        String::from_utf8(self.take(length)?.to_vec()).ok()
    }
}

/// Decodes a field from exactly the bytes framing recorded for it.
/// Returns `None` when the bytes do not form a valid value of `kind`.
pub fn read_field(kind: FieldKind, data: &[u8], floats: FloatMode) -> Option<Value> {
    let mut bytes = FieldBytes { data, pos: 0 };
    let value = match kind {
        FieldKind::Byte => Value::Byte(bytes.i8()?),
        FieldKind::Short => Value::Short(bytes.i16()?),
        FieldKind::Int => Value::Int(bytes.i32()?),
        FieldKind::Long => Value::Long(BigEndian::read_i64(bytes.take(8)?)),
        FieldKind::Float => Value::Float(floats.f32_from_bits(bytes.u32()?)),
        FieldKind::Double => Value::Double(floats.f64_from_bits(BigEndian::read_u64(bytes.take(8)?))),
        FieldKind::Str16 => {
            let units = bytes.u16()? as usize;
            let raw = bytes.take(units * 2)?;
            let units: Vec<u16> = raw.chunks_exact(2).map(BigEndian::read_u16).collect();
            Value::Str(String::from_utf16(&units).ok()?)
        }
        FieldKind::Str8 => {
            let length = bytes.u16()? as usize;
            Value::Str(bytes.utf8(length)?)
        }
        FieldKind::Slot => Value::Slot(bytes.slot()?),
        FieldKind::ByteArray => {
            let length = usize::try_from(bytes.i32()?).ok()?;
            Value::Bytes(bytes.take(length)?.to_vec())
        }
        FieldKind::ShortBytes => {
            let length = bytes.u8()? as usize;
            Value::Bytes(bytes.take(length)?.to_vec())
        }
        FieldKind::BlockChanges => {
            let count = bytes.u16()? as usize;
            let positions = bytes.take(count * 2)?;
            let blocks = bytes.take(count)?;
            let metas = bytes.take(count)?;
            let changes = positions
                .chunks_exact(2)
                .map(BigEndian::read_u16)
                .zip(blocks.iter().zip(metas))
                .map(|(position, (&block, &meta))| BlockChange {
                    x: (position >> 12) as u8 & 0x0F,
                    z: (position >> 8) as u8 & 0x0F,
                    y: position as u8,
                    block,
                    meta,
                })
                .collect();
            Value::BlockChanges(changes)
        }
        FieldKind::Items => {
            let count = bytes.u16()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(bytes.slot()?);
            }
            Value::Items(items)
        }
        FieldKind::Records => {
            let count = usize::try_from(bytes.i32()?).ok()?;
            let mut records = Vec::with_capacity(count);
            for _ in 0..count {
                records.push((bytes.i8()?, bytes.i8()?, bytes.i8()?));
            }
            Value::Records(records)
        }
        FieldKind::Metadata => {
            let mut entries = Vec::new();
            loop {
                let lead = bytes.u8()?;
                if lead == METADATA_END {
                    break;
                }
                let value = match lead >> 5 {
                    0 => MetaValue::Byte(bytes.i8()?),
                    1 => MetaValue::Short(bytes.i16()?),
                    2 => MetaValue::Int(bytes.i32()?),
                    3 => MetaValue::Float(floats.f32_from_bits(bytes.u32()?)),
                    4 => {
                        let length = bytes.u16()? as usize;
                        MetaValue::Str(bytes.utf8(length)?)
                    }
                    5 => MetaValue::Item(ItemStack {
                        id: bytes.i16()?,
                        count: bytes.i8()?,
                        damage: bytes.i16()?,
                    }),
                    _ => return None,
                };
                entries.push(MetaEntry {
                    index: lead & 0x1F,
                    value,
                });
            }
            Value::Metadata(entries)
        }
        FieldKind::ObjectData => {
            if bytes.i32()? > 0 {
                Value::ObjectData(Some((bytes.i16()?, bytes.i16()?, bytes.i16()?)))
            } else {
                Value::ObjectData(None)
            }
        }
    };
    Some(value)
}

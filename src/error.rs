use crate::protocol::field::FieldKind;
use crate::protocol::Direction;
use std::error::Error;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, WaypointError>;

/// Errors raised while framing, building or reading packets.
#[derive(Debug)]
pub enum ProtocolError {
    /// No schema entry exists for the type byte, so the frame length is unknowable.
    UnknownPacket { kind: u8 },
    /// An entity metadata entry carried a payload class outside 0..=5.
    InvalidMetadata { kind: u8, field: usize, class: u8 },
    /// A length prefix that must be non-negative was negative.
    NegativeLength { kind: u8, field: usize, length: i32 },
    /// A single frame does not fit in the decode window.
    FrameTooLarge { kind: u8, capacity: usize },
    /// A framed field whose bytes do not decode as its kind, e.g. a string
    /// that is not valid UTF-8/UTF-16.
    InvalidField { kind: u8, field: usize },
    /// A field was requested as a type its tag cannot be read as.
    FieldType {
        kind: u8,
        field: usize,
        requested: &'static str,
        actual: FieldKind,
    },
    /// The field index is past the end of the packet's field list.
    NoSuchField { kind: u8, field: usize },
    /// A builder argument's shape disagrees with the field tag.
    ArgumentMismatch {
        kind: u8,
        field: usize,
        expected: FieldKind,
    },
    /// The builder received the wrong number of arguments.
    ArgumentCount {
        kind: u8,
        expected: usize,
        actual: usize,
    },
    /// A value is too large for the length prefix of its field.
    TooLong { kind: u8, field: usize, length: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownPacket { kind } => {
                write!(f, "unknown packet type 0x{:02x}", kind)
            }
            ProtocolError::InvalidMetadata { kind, field, class } => write!(
                f,
                "packet 0x{:02x} field {}: invalid metadata class {}",
                kind, field, class
            ),
            ProtocolError::NegativeLength {
                kind,
                field,
                length,
            } => write!(
                f,
                "packet 0x{:02x} field {}: negative length {}",
                kind, field, length
            ),
            ProtocolError::FrameTooLarge { kind, capacity } => write!(
                f,
                "packet 0x{:02x} does not fit in a {} byte window",
                kind, capacity
            ),
            ProtocolError::InvalidField { kind, field } => {
                write!(f, "packet 0x{:02x} field {}: undecodable value", kind, field)
            }
            ProtocolError::FieldType {
                kind,
                field,
                requested,
                actual,
            } => write!(
                f,
                "packet 0x{:02x} field {}: cannot read {} as {}",
                kind,
                field,
                actual.describe(),
                requested
            ),
            ProtocolError::NoSuchField { kind, field } => {
                write!(f, "packet 0x{:02x} has no field {}", kind, field)
            }
            ProtocolError::ArgumentMismatch {
                kind,
                field,
                expected,
            } => write!(
                f,
                "packet 0x{:02x} field {}: argument is not a {}",
                kind,
                field,
                expected.describe()
            ),
            ProtocolError::ArgumentCount {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "packet 0x{:02x} takes {} arguments, got {}",
                kind, expected, actual
            ),
            ProtocolError::TooLong {
                kind,
                field,
                length,
            } => write!(
                f,
                "packet 0x{:02x} field {}: length {} overflows its prefix",
                kind, field, length
            ),
        }
    }
}

impl Error for ProtocolError {}

/// Errors raised while ingesting terrain into the world model.
#[derive(Debug)]
pub enum WorldError {
    Decompression(io::Error),
    OutOfBounds { y: i32, height: i32 },
    Protocol(ProtocolError),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::Decompression(err) => write!(f, "terrain decompression failed: {}", err),
            WorldError::OutOfBounds { y, height } => {
                write!(f, "vertical range {}+{} leaves the chunk", y, height)
            }
            WorldError::Protocol(err) => write!(f, "malformed world packet: {}", err),
        }
    }
}

impl Error for WorldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldError::Decompression(err) => Some(err),
            WorldError::Protocol(err) => Some(err),
            WorldError::OutOfBounds { .. } => None,
        }
    }
}

impl From<ProtocolError> for WorldError {
    fn from(err: ProtocolError) -> Self {
        WorldError::Protocol(err)
    }
}

#[derive(Debug)]
pub enum WaypointError {
    IoError(io::Error),
    ProtocolError {
        direction: Option<Direction>,
        source: ProtocolError,
    },
    WorldError(WorldError),
    ConfigError(String),
    SessionClosed,
}

impl WaypointError {
    /// Attaches the direction of the stream the protocol error happened on.
    pub fn in_direction(self, direction: Direction) -> Self {
        match self {
            WaypointError::ProtocolError { source, .. } => WaypointError::ProtocolError {
                direction: Some(direction),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for WaypointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaypointError::IoError(err) => write!(f, "IO error: {}", err),
            WaypointError::ProtocolError {
                direction: Some(direction),
                source,
            } => write!(f, "Protocol error ({}): {}", direction, source),
            WaypointError::ProtocolError {
                direction: None,
                source,
            } => write!(f, "Protocol error: {}", source),
            WaypointError::WorldError(err) => write!(f, "World error: {}", err),
            WaypointError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            WaypointError::SessionClosed => write!(f, "Session closed"),
        }
    }
}

impl Error for WaypointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WaypointError::IoError(err) => Some(err),
            WaypointError::ProtocolError { source, .. } => Some(source),
            WaypointError::WorldError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for WaypointError {
    fn from(err: io::Error) -> Self {
        WaypointError::IoError(err)
    }
}

impl From<ProtocolError> for WaypointError {
    fn from(err: ProtocolError) -> Self {
        WaypointError::ProtocolError {
            direction: None,
            source: err,
        }
    }
}

impl From<WorldError> for WaypointError {
    fn from(err: WorldError) -> Self {
        WaypointError::WorldError(err)
    }
}

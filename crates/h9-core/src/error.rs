//! Error types for the H9 engine.
//!
//! All failures are local and non-fatal: every fallible operation either
//! applies completely or leaves state untouched and returns one of these.

use std::fmt;

use crate::types::ControlId;

/// Errors raised while decoding a sysex frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than the smallest valid frame for this message.
    TooShort { len: usize, min: usize },
    /// Trailing checksum does not match the payload.
    BadChecksum { expected: u8, actual: u8 },
    /// Start/end markers, vendor id, command or length are wrong.
    BadFraming(&'static str),
    /// A decoded index exceeds catalog or protocol bounds.
    FieldOutOfRange { field: &'static str, value: u8 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len, min } => {
                write!(f, "Frame too short: {} bytes, need at least {}", len, min)
            }
            Self::BadChecksum { expected, actual } => write!(
                f,
                "Bad checksum: expected {:#04x}, got {:#04x}",
                expected, actual
            ),
            Self::BadFraming(msg) => write!(f, "Bad framing: {}", msg),
            Self::FieldOutOfRange { field, value } => {
                write!(f, "Field out of range: {} = {}", field, value)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Errors that can occur when driving the H9 engine.
#[derive(Debug, Clone, PartialEq)]
pub enum H9Error {
    /// Control id is not below `NUM_CONTROLS`.
    InvalidControl(ControlId),
    /// Curve operation on a control that is not a knob.
    NotAKnob(ControlId),
    /// Module or algorithm selection outside the catalog.
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// CC assignment outside 0-99 that is not the disabled sentinel.
    InvalidCc(String),
    /// MIDI channel outside 1-16.
    InvalidMidiChannel(u8),
    /// Sysex device id outside 0-16.
    InvalidSysexId(u8),
    /// Preset name too long or not representable on the wire.
    InvalidName(String),
    /// Bulk input with the wrong number of entries.
    WrongLength { expected: usize, actual: usize },
    /// Bulk control input with a value outside `[0.0, 1.0]`.
    ValueOutOfRange { id: ControlId, value: f32 },
    /// Frame would exceed `MAX_FRAME_SIZE`.
    FrameTooLarge { len: usize, max: usize },
    /// Sysex decode failure.
    Codec(CodecError),
}

impl fmt::Display for H9Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidControl(id) => write!(f, "Invalid control id: {}", id),
            Self::NotAKnob(id) => write!(f, "Control {} is not a knob", id),
            Self::IndexOutOfRange { what, index, len } => {
                write!(f, "{} index {} out of range (count {})", what, index, len)
            }
            Self::InvalidCc(token) => write!(f, "Invalid CC assignment: {}", token),
            Self::InvalidMidiChannel(ch) => write!(f, "Invalid MIDI channel: {}", ch),
            Self::InvalidSysexId(id) => write!(f, "Invalid sysex device id: {}", id),
            Self::InvalidName(msg) => write!(f, "Invalid preset name: {}", msg),
            Self::WrongLength { expected, actual } => {
                write!(f, "Expected exactly {} values, got {}", expected, actual)
            }
            Self::ValueOutOfRange { id, value } => {
                write!(f, "Value {} for control {} is outside 0.0-1.0", value, id)
            }
            Self::FrameTooLarge { len, max } => {
                write!(f, "Sysex frame of {} bytes exceeds maximum of {}", len, max)
            }
            Self::Codec(err) => write!(f, "Sysex error: {}", err),
        }
    }
}

impl std::error::Error for H9Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for H9Error {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

/// Result type for H9 operations.
pub type H9Result<T> = Result<T, H9Error>;

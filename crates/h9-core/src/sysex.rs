//! Sysex codec for the H9 wire protocol.
//!
//! This module converts a [`Preset`] to and from the device's program
//! dump, and builds the short request/command frames the engine sends.
//!
//! ## Framing
//!
//! Every message has the same envelope:
//!
//! ```text
//! F0 1C 70 <device id> <command> <payload ...> F7
//! ```
//!
//! `1C` is Eventide's manufacturer id and `70` the H9 product id. All bytes
//! between the markers are 7-bit clean.
//!
//! ## Program Dump Payload
//!
//! | Field             | Bytes                 | Encoding                        |
//! |-------------------|-----------------------|---------------------------------|
//! | name              | `H9_MAX_NAME_LEN`     | ASCII, space padded             |
//! | module            | 1                     | index                           |
//! | algorithm         | 1                     | index                           |
//! | MIDI channel      | 1                     | channel - 1                     |
//! | flags             | 1                     | bit 0: knob curves follow       |
//! | control values    | 2 × `NUM_CONTROLS`    | 14-bit, MSB first               |
//! | knob curves       | 6 × `H9_NUM_KNOBS`    | exp_min, exp_max, psw; 14-bit   |
//! | checksum          | 1                     | see below                       |
//!
//! The checksum is the sum of every payload byte before it, masked to
//! 7 bits ([`h9_utils::checksum_7bit`]). Field widths and the checksum rule
//! are a hardware-conformance assumption pending validation against a
//! capture from a real unit.
//!
//! ## Size Limits
//!
//! No frame may exceed [`MAX_FRAME_SIZE`]. The fixed-layout frames are
//! checked at compile time; [`frame_message`] checks at runtime and reports
//! [`H9Error::FrameTooLarge`] instead of truncating.

use h9_utils::{
    checksum_7bit, combine_14bit, combine_u16, dequantize_unit, is_7bit_clean, quantize_unit,
    split_14bit, split_u16,
};

use crate::catalog::Catalog;
use crate::control_store::ControlStore;
use crate::curve::KnobCurve;
use crate::error::{CodecError, H9Error, H9Result};
use crate::preset::{MidiConfig, Preset};
use crate::types::{H9_MAX_NAME_LEN, H9_NUM_KNOBS, MAX_FRAME_SIZE, MAX_SYSEX_ID, NUM_CONTROLS};

// =============================================================================
// Protocol Constants
// =============================================================================

/// Start of system exclusive.
pub const SYSEX_START: u8 = 0xF0;

/// End of system exclusive.
pub const SYSEX_END: u8 = 0xF7;

/// Eventide manufacturer id.
pub const EVENTIDE_ID: u8 = 0x1C;

/// H9 product id.
pub const H9_PRODUCT_ID: u8 = 0x70;

/// Command bytes (fifth byte of every frame).
pub mod command {
    /// Write a system variable.
    pub const VALUE_PUT: u8 = 0x2D;
    /// Read a system variable.
    pub const VALUE_WANT: u8 = 0x3B;
    /// Device reply to [`VALUE_WANT`].
    pub const VALUE_DUMP: u8 = 0x3C;
    /// Request the system variable block.
    pub const SYSVARS_WANT: u8 = 0x4C;
    /// Device reply to [`SYSVARS_WANT`].
    pub const SYSVARS_DUMP: u8 = 0x4D;
    /// Request the current program.
    pub const PROGRAM_WANT: u8 = 0x4E;
    /// Program dump, sent by either side.
    pub const PROGRAM_DUMP: u8 = 0x4F;
}

/// Bytes before the payload: start, vendor, product, device id, command.
pub const HEADER_LEN: usize = 5;

/// Smallest well-formed frame (header plus end marker).
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// Flag bit: knob curves are present in a program dump.
pub const FLAG_KNOB_CURVES: u8 = 0x01;

const NAME_OFFSET: usize = 0;
const MODULE_OFFSET: usize = NAME_OFFSET + H9_MAX_NAME_LEN;
const ALGORITHM_OFFSET: usize = MODULE_OFFSET + 1;
const CHANNEL_OFFSET: usize = ALGORITHM_OFFSET + 1;
const FLAGS_OFFSET: usize = CHANNEL_OFFSET + 1;
const VALUES_OFFSET: usize = FLAGS_OFFSET + 1;
const CURVES_OFFSET: usize = VALUES_OFFSET + 2 * NUM_CONTROLS;
const CURVES_LEN: usize = 6 * H9_NUM_KNOBS;

/// Program dump frame length without knob curves.
pub const DUMP_FRAME_LEN: usize = HEADER_LEN + CURVES_OFFSET + 1 + 1;

/// Program dump frame length with knob curves.
pub const DUMP_FRAME_LEN_WITH_CURVES: usize = DUMP_FRAME_LEN + CURVES_LEN;

const _: () = assert!(DUMP_FRAME_LEN_WITH_CURVES <= MAX_FRAME_SIZE);

// =============================================================================
// Frame Building
// =============================================================================

/// Incremental frame writer.
struct FrameBuilder {
    bytes: Vec<u8>,
}

impl FrameBuilder {
    fn new(device_id: u8, command: u8, payload_hint: usize) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload_hint + 1);
        bytes.extend_from_slice(&[SYSEX_START, EVENTIDE_ID, H9_PRODUCT_ID, device_id & 0x7F, command]);
        Self { bytes }
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    #[inline]
    fn extend(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    fn push_unit(&mut self, value: f32) {
        let (msb, lsb) = split_14bit(quantize_unit(value));
        self.extend(&[msb, lsb]);
    }

    fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Close a frame whose size is bounded at compile time.
    fn finish(mut self) -> Vec<u8> {
        self.bytes.push(SYSEX_END);
        self.bytes
    }

    /// Close a frame of arbitrary size.
    fn finish_checked(self) -> H9Result<Vec<u8>> {
        let len = self.bytes.len() + 1;
        if len > MAX_FRAME_SIZE {
            return Err(H9Error::FrameTooLarge {
                len,
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(self.finish())
    }
}

/// Wrap an arbitrary payload in an H9 frame.
///
/// Fails with [`H9Error::FrameTooLarge`] if the result would exceed
/// [`MAX_FRAME_SIZE`], or [`CodecError::BadFraming`] if the payload is not
/// 7-bit clean.
pub fn frame_message(device_id: u8, command: u8, payload: &[u8]) -> H9Result<Vec<u8>> {
    if !is_7bit_clean(payload) || command & 0x80 != 0 {
        return Err(CodecError::BadFraming("payload is not 7-bit clean").into());
    }
    let mut frame = FrameBuilder::new(device_id, command, payload.len());
    frame.extend(payload);
    frame.finish_checked()
}

// =============================================================================
// Inbound Messages
// =============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SysexMessage {
    /// A complete program dump.
    Program(Preset),
    /// Reply to a config variable read.
    ValueDump { address: u16, value: u16 },
    /// System variable block, passed through undecoded.
    SystemConfig(Vec<u8>),
    /// Valid H9 envelope with a command the engine does not interpret.
    Other { command: u8, payload: Vec<u8> },
}

/// Split a frame into `(device_id, command, payload)` after checking the
/// envelope.
fn open_frame(bytes: &[u8]) -> Result<(u8, u8, &[u8]), CodecError> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(CodecError::TooShort {
            len: bytes.len(),
            min: MIN_FRAME_LEN,
        });
    }
    if bytes[0] != SYSEX_START {
        return Err(CodecError::BadFraming("missing start marker"));
    }
    if bytes[bytes.len() - 1] != SYSEX_END {
        return Err(CodecError::BadFraming("missing end marker"));
    }
    if bytes[1] != EVENTIDE_ID || bytes[2] != H9_PRODUCT_ID {
        return Err(CodecError::BadFraming("not an Eventide H9 message"));
    }
    let body = &bytes[1..bytes.len() - 1];
    if !is_7bit_clean(body) {
        return Err(CodecError::BadFraming("status byte inside message"));
    }
    let device_id = bytes[3];
    if device_id > MAX_SYSEX_ID {
        return Err(CodecError::FieldOutOfRange {
            field: "sysex_id",
            value: device_id,
        });
    }
    Ok((device_id, bytes[4], &bytes[HEADER_LEN..bytes.len() - 1]))
}

/// Returns `true` if `bytes` carries the H9 envelope (without validating
/// the payload).
pub fn is_h9_sysex(bytes: &[u8]) -> bool {
    open_frame(bytes).is_ok()
}

fn read_unit(payload: &[u8], offset: usize) -> f32 {
    dequantize_unit(combine_14bit(payload[offset], payload[offset + 1]))
}

fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    let name: String = raw[..end]
        .iter()
        .map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { ' ' })
        .collect();
    name.trim_end().to_string()
}

// =============================================================================
// SysexCodec
// =============================================================================

/// Encoder/decoder bound to a catalog (for bounds checks) and a device id
/// (for outgoing frames).
///
/// # Example
///
/// ```
/// use h9_core::{Catalog, Preset, SysexCodec};
///
/// let codec = SysexCodec::new(Catalog::h9());
/// let mut preset = Preset::new();
/// preset.set_control(3, 0.5).unwrap();
///
/// let bytes = codec.encode(&preset, true);
/// let decoded = codec.decode(&bytes).unwrap();
/// assert!((decoded.controls().get_value(3).unwrap() - 0.5).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SysexCodec {
    catalog: &'static Catalog,
    device_id: u8,
}

impl SysexCodec {
    /// Codec addressing device id 0.
    pub const fn new(catalog: &'static Catalog) -> Self {
        Self {
            catalog,
            device_id: 0,
        }
    }

    /// Address outgoing request frames to a specific device id.
    pub const fn with_device_id(mut self, device_id: u8) -> Self {
        self.device_id = device_id;
        self
    }

    /// Device id used for request frames.
    pub const fn device_id(&self) -> u8 {
        self.device_id
    }

    // =========================================================================
    // Program Dump
    // =========================================================================

    /// Serialize a preset as a program dump.
    ///
    /// The frame is addressed to the preset's own sysex id. With
    /// `include_knob_curves = false` the curve block is omitted and the
    /// receiver keeps identity curves.
    pub fn encode(&self, preset: &Preset, include_knob_curves: bool) -> Vec<u8> {
        let payload_len = CURVES_OFFSET + if include_knob_curves { CURVES_LEN } else { 0 } + 1;
        let mut frame =
            FrameBuilder::new(preset.midi.sysex_id(), command::PROGRAM_DUMP, payload_len);

        let mut name = [b' '; H9_MAX_NAME_LEN];
        for (slot, byte) in name.iter_mut().zip(preset.name.bytes()) {
            *slot = byte & 0x7F;
        }
        frame.extend(&name);
        // Catalog limits keep both indices below 128.
        frame.push(preset.module as u8);
        frame.push(preset.algorithm as u8);
        frame.push(preset.midi.channel().saturating_sub(1) & 0x0F);
        frame.push(if include_knob_curves { FLAG_KNOB_CURVES } else { 0 });

        for value in preset.controls.values() {
            frame.push_unit(*value);
        }
        if include_knob_curves {
            for curve in preset.controls.curves() {
                frame.push_unit(curve.exp_min);
                frame.push_unit(curve.exp_max);
                frame.push_unit(curve.psw);
            }
        }

        let checksum = checksum_7bit(frame.payload());
        frame.push(checksum);
        frame.finish()
    }

    /// Parse a program dump into a clean preset.
    ///
    /// The preset gets the frame's device id, the dumped MIDI channel and
    /// stock CC maps (CC maps are not part of the dump).
    pub fn decode(&self, bytes: &[u8]) -> Result<Preset, CodecError> {
        let (device_id, command, payload) = open_frame(bytes)?;
        if command != command::PROGRAM_DUMP {
            return Err(CodecError::BadFraming("not a program dump"));
        }
        self.decode_program(device_id, payload, bytes.len())
    }

    fn decode_program(
        &self,
        device_id: u8,
        payload: &[u8],
        frame_len: usize,
    ) -> Result<Preset, CodecError> {
        if payload.len() <= FLAGS_OFFSET {
            return Err(CodecError::TooShort {
                len: frame_len,
                min: DUMP_FRAME_LEN,
            });
        }
        let has_curves = payload[FLAGS_OFFSET] & FLAG_KNOB_CURVES != 0;
        let (expected_payload, expected_frame) = if has_curves {
            (CURVES_OFFSET + CURVES_LEN + 1, DUMP_FRAME_LEN_WITH_CURVES)
        } else {
            (CURVES_OFFSET + 1, DUMP_FRAME_LEN)
        };
        if payload.len() < expected_payload {
            return Err(CodecError::TooShort {
                len: frame_len,
                min: expected_frame,
            });
        }
        if payload.len() > expected_payload {
            return Err(CodecError::BadFraming("trailing bytes after checksum"));
        }

        let (body, trailer) = payload.split_at(expected_payload - 1);
        let expected = checksum_7bit(body);
        if trailer[0] != expected {
            return Err(CodecError::BadChecksum {
                expected,
                actual: trailer[0],
            });
        }

        let module = body[MODULE_OFFSET];
        let entry = self
            .catalog
            .module(module as usize)
            .map_err(|_| CodecError::FieldOutOfRange {
                field: "module",
                value: module,
            })?;
        let algorithm = body[ALGORITHM_OFFSET];
        if algorithm as usize >= entry.algorithm_count() {
            return Err(CodecError::FieldOutOfRange {
                field: "algorithm",
                value: algorithm,
            });
        }
        let channel = body[CHANNEL_OFFSET];
        if channel > 15 {
            return Err(CodecError::FieldOutOfRange {
                field: "channel",
                value: channel,
            });
        }

        let values = std::array::from_fn(|id| read_unit(body, VALUES_OFFSET + 2 * id));
        let curves = if has_curves {
            std::array::from_fn(|knob| {
                let base = CURVES_OFFSET + 6 * knob;
                KnobCurve::new(
                    read_unit(body, base),
                    read_unit(body, base + 2),
                    read_unit(body, base + 4),
                )
            })
        } else {
            [KnobCurve::IDENTITY; H9_NUM_KNOBS]
        };
        let controls = ControlStore::from_parts(values, curves);
        let midi = MidiConfig::with_address(device_id, channel + 1);

        Ok(Preset {
            name: decode_name(&body[NAME_OFFSET..MODULE_OFFSET]),
            module: module as usize,
            algorithm: algorithm as usize,
            controls,
            dirty: false,
            midi,
        })
    }

    /// Classify and decode any inbound H9 frame.
    pub fn parse(&self, bytes: &[u8]) -> Result<SysexMessage, CodecError> {
        let (device_id, command, payload) = open_frame(bytes)?;
        match command {
            command::PROGRAM_DUMP => self
                .decode_program(device_id, payload, bytes.len())
                .map(SysexMessage::Program),
            command::VALUE_DUMP => {
                if payload.len() < 6 {
                    return Err(CodecError::TooShort {
                        len: bytes.len(),
                        min: MIN_FRAME_LEN + 6,
                    });
                }
                if payload.len() > 6 {
                    return Err(CodecError::BadFraming("trailing bytes in value dump"));
                }
                Ok(SysexMessage::ValueDump {
                    address: combine_u16([payload[0], payload[1], payload[2]]),
                    value: combine_u16([payload[3], payload[4], payload[5]]),
                })
            }
            command::SYSVARS_DUMP => Ok(SysexMessage::SystemConfig(payload.to_vec())),
            other => Ok(SysexMessage::Other {
                command: other,
                payload: payload.to_vec(),
            }),
        }
    }

    // =========================================================================
    // Requests and Commands
    // =========================================================================

    /// Ask the device for its current program.
    pub fn generate_request_current_preset(&self) -> Vec<u8> {
        FrameBuilder::new(self.device_id, command::PROGRAM_WANT, 0).finish()
    }

    /// Ask the device for its system variable block.
    pub fn generate_request_system_config(&self) -> Vec<u8> {
        FrameBuilder::new(self.device_id, command::SYSVARS_WANT, 0).finish()
    }

    /// Read a single system variable.
    pub fn generate_read_config_var(&self, address: u16) -> Vec<u8> {
        let mut frame = FrameBuilder::new(self.device_id, command::VALUE_WANT, 3);
        frame.extend(&split_u16(address));
        frame.finish()
    }

    /// Write a single system variable.
    pub fn generate_write_config_var(&self, address: u16, value: u16) -> Vec<u8> {
        let mut frame = FrameBuilder::new(self.device_id, command::VALUE_PUT, 6);
        frame.extend(&split_u16(address));
        frame.extend(&split_u16(value));
        frame.finish()
    }

    /// Device reply frame for a value read. Mainly useful for tests and
    /// device emulation.
    pub fn generate_value_dump(&self, address: u16, value: u16) -> Vec<u8> {
        let mut frame = FrameBuilder::new(self.device_id, command::VALUE_DUMP, 6);
        frame.extend(&split_u16(address));
        frame.extend(&split_u16(value));
        frame.finish()
    }
}

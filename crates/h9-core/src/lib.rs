//! # h9-core
//!
//! Device-control engine for the Eventide H9 multi-effects pedal.
//!
//! This crate models the pedal's control surface and speaks its sysex
//! protocol. It performs no I/O: bytes and host calls go in, typed
//! notifications come out. Transport and UI belong to the host.
//!
//! ## Components
//!
//! - [`curve`] - Knob modes and expression/pedal-switch curve math
//! - [`ControlStore`] - Raw values and knob curves for every control
//! - [`Catalog`] - Static module/algorithm table
//! - [`Preset`] - Name, selection, controls, MIDI configuration, dirty flag
//! - [`SysexCodec`] - Program dump encode/decode and request frames
//! - [`midi_cc`] - CC maps and 7-bit translation
//! - [`DeviceController`] - Owns the live preset and emits [`Notification`]s
//!
//! ## Control Layout
//!
//! Controls `0..10` are the knobs, followed by the expression pedal
//! ([`EXPRESSION_CONTROL`]) and the pedal switch ([`PEDAL_SWITCH_CONTROL`]).
//! Only knobs carry curves.
//!
//! ## Data Flow
//!
//! ```text
//! MIDI bytes / host calls
//!        ↓
//! DeviceController ──→ CC translator / SysexCodec
//!        ↓
//! Preset (ControlStore, MidiConfig)
//!        ↓
//! NotificationSink
//! ```

pub mod catalog;
pub mod config;
pub mod control_store;
pub mod controller;
pub mod curve;
pub mod error;
pub mod event;
pub mod midi_cc;
pub mod preset;
pub mod sysex;
pub mod types;

// Re-exports for convenience
pub use catalog::{Algorithm, Catalog, Module, H9_NUM_MODULES};
pub use config::ControllerConfig;
pub use control_store::{ControlStore, ValueChange};
pub use controller::DeviceController;
pub use curve::{DisplayValue, KnobCurve, KnobMode};
pub use error::{CodecError, H9Error, H9Result};
pub use event::{
    CallbackSink, CcOut, MidiConfigChange, Notification, NotificationSink, Notify, NullSink,
};
pub use midi_cc::{
    apply_incoming_cc, cc_to_unit, emit_outgoing_cc, unit_to_cc, CcDirection, CcMap, CcMapping,
};
pub use preset::{validate_name, MidiConfig, Preset};
pub use sysex::{frame_message, is_h9_sysex, SysexCodec, SysexMessage};
pub use types::{
    control_label, is_knob, ControlId, ControlValue, EXPRESSION_CONTROL, H9_MAX_NAME_LEN,
    H9_NUM_KNOBS, MAX_CC_NUMBER, MAX_FRAME_SIZE, MAX_SYSEX_ID, NUM_CONTROLS, PEDAL_SWITCH_CONTROL,
};

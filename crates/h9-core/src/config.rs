//! Controller configuration.
//!
//! [`ControllerConfig`] holds the settings a [`DeviceController`](crate::DeviceController)
//! starts with. It is built with const methods so it can live in a `static`.
//!
//! # Example
//!
//! ```
//! use h9_core::ControllerConfig;
//!
//! pub static CONFIG: ControllerConfig = ControllerConfig::new()
//!     .with_midi_channel(3)
//!     .with_sysex_device_id(1)
//!     .without_knob_curves_in_dump();
//!
//! assert!(CONFIG.validate().is_ok());
//! ```

use crate::error::{H9Error, H9Result};
use crate::types::MAX_SYSEX_ID;

/// Startup settings for a device controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Sysex device id of the unit (0-16).
    pub sysex_device_id: u8,

    /// MIDI channel for CC traffic (1-16).
    pub midi_channel: u8,

    /// Whether outgoing program dumps carry knob curves.
    pub dump_knob_curves: bool,

    /// Whether a loaded preset announces every control afterwards.
    pub sync_controls_on_load: bool,

    /// Whether local control edits are echoed as CC output.
    pub echo_cc_on_set: bool,
}

impl ControllerConfig {
    /// Device id 0, channel 1, curves in dumps, sync on load, CC echo on.
    pub const fn new() -> Self {
        Self {
            sysex_device_id: 0,
            midi_channel: 1,
            dump_knob_curves: true,
            sync_controls_on_load: true,
            echo_cc_on_set: true,
        }
    }

    /// Set the sysex device id.
    pub const fn with_sysex_device_id(mut self, id: u8) -> Self {
        self.sysex_device_id = id;
        self
    }

    /// Set the MIDI channel.
    pub const fn with_midi_channel(mut self, channel: u8) -> Self {
        self.midi_channel = channel;
        self
    }

    /// Leave knob curves out of outgoing dumps.
    pub const fn without_knob_curves_in_dump(mut self) -> Self {
        self.dump_knob_curves = false;
        self
    }

    /// Do not announce every control after a load.
    pub const fn without_sync_on_load(mut self) -> Self {
        self.sync_controls_on_load = false;
        self
    }

    /// Do not echo local edits as CC.
    pub const fn without_cc_echo(mut self) -> Self {
        self.echo_cc_on_set = false;
        self
    }

    /// Check the id and channel ranges.
    pub fn validate(&self) -> H9Result<()> {
        if self.sysex_device_id > MAX_SYSEX_ID {
            return Err(H9Error::InvalidSysexId(self.sysex_device_id));
        }
        if !(1..=16).contains(&self.midi_channel) {
            return Err(H9Error::InvalidMidiChannel(self.midi_channel));
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

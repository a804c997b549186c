//! The preset model.
//!
//! A [`Preset`] aggregates everything the engine knows about the sound on
//! the device: name, module/algorithm selection, control values and knob
//! curves, plus the MIDI configuration used to talk to the unit.
//!
//! # Dirty Flag
//!
//! Any change to a control, a curve or the module/algorithm selection sets
//! `dirty`. Loading from the device yields a clean preset; MIDI
//! configuration changes do not count as edits to the sound.

use crate::catalog::Catalog;
use crate::control_store::{ControlStore, ValueChange};
use crate::curve::KnobMode;
use crate::error::{H9Error, H9Result};
use crate::midi_cc::{CcDirection, CcMap, CcMapping};
use crate::types::{ControlId, ControlValue, H9_MAX_NAME_LEN, MAX_SYSEX_ID};

/// MIDI settings of a preset.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiConfig {
    sysex_id: u8,
    channel: u8,
    cc_rx: CcMap,
    cc_tx: CcMap,
}

impl MidiConfig {
    /// Sysex id 0, channel 1, stock CC maps.
    pub const fn new() -> Self {
        Self {
            sysex_id: 0,
            channel: 1,
            cc_rx: CcMap::h9_default(),
            cc_tx: CcMap::h9_default(),
        }
    }

    /// Stock CC maps with an address read off the wire. Out-of-range
    /// values are clamped to the nearest legal id and channel.
    pub(crate) fn with_address(sysex_id: u8, channel: u8) -> Self {
        Self {
            sysex_id: sysex_id.min(MAX_SYSEX_ID),
            channel: channel.clamp(1, 16),
            ..Self::new()
        }
    }

    /// Sysex device id (0-16).
    #[inline]
    pub fn sysex_id(&self) -> u8 {
        self.sysex_id
    }

    /// MIDI channel (1-16).
    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Receive CC map.
    #[inline]
    pub fn cc_rx(&self) -> &CcMap {
        &self.cc_rx
    }

    /// Transmit CC map.
    #[inline]
    pub fn cc_tx(&self) -> &CcMap {
        &self.cc_tx
    }

    /// Map for a direction.
    pub fn cc_map(&self, direction: CcDirection) -> &CcMap {
        match direction {
            CcDirection::Receive => &self.cc_rx,
            CcDirection::Transmit => &self.cc_tx,
        }
    }

    fn cc_map_mut(&mut self, direction: CcDirection) -> &mut CcMap {
        match direction {
            CcDirection::Receive => &mut self.cc_rx,
            CcDirection::Transmit => &mut self.cc_tx,
        }
    }

    /// Set the MIDI channel. Rejects anything outside 1-16.
    pub fn set_channel(&mut self, channel: u8) -> H9Result<()> {
        if !(1..=16).contains(&channel) {
            return Err(H9Error::InvalidMidiChannel(channel));
        }
        self.channel = channel;
        Ok(())
    }

    /// Set the sysex device id. Rejects anything above 16.
    pub fn set_sysex_id(&mut self, id: u8) -> H9Result<()> {
        if id > MAX_SYSEX_ID {
            return Err(H9Error::InvalidSysexId(id));
        }
        self.sysex_id = id;
        Ok(())
    }

    /// Replace a single control's mapping.
    pub fn set_cc_mapping(
        &mut self,
        direction: CcDirection,
        id: ControlId,
        mapping: CcMapping,
    ) -> H9Result<()> {
        self.cc_map_mut(direction).set(id, mapping)
    }

    /// Replace a whole map.
    pub fn set_cc_map(&mut self, direction: CcDirection, map: CcMap) {
        *self.cc_map_mut(direction) = map;
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a preset name: at most `H9_MAX_NAME_LEN` printable ASCII bytes.
///
/// Trailing whitespace is not significant on the wire and is dropped.
pub fn validate_name(name: &str) -> H9Result<&str> {
    let name = name.trim_end();
    if name.len() > H9_MAX_NAME_LEN {
        return Err(H9Error::InvalidName(format!(
            "'{}' is longer than {} characters",
            name, H9_MAX_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(H9Error::InvalidName(format!(
            "'{}' contains unsupported character {:?}",
            name, c
        )));
    }
    Ok(name)
}

/// A complete preset.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub(crate) name: String,
    pub(crate) module: usize,
    pub(crate) algorithm: usize,
    pub(crate) controls: ControlStore,
    pub(crate) dirty: bool,
    pub(crate) midi: MidiConfig,
}

impl Preset {
    /// Empty preset: all controls zero, first module and algorithm, clean.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            module: 0,
            algorithm: 0,
            controls: ControlStore::new(),
            dirty: false,
            midi: MidiConfig::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Preset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selected module index.
    pub fn module(&self) -> usize {
        self.module
    }

    /// Selected algorithm index within the module.
    pub fn algorithm(&self) -> usize {
        self.algorithm
    }

    /// Control values and curves.
    pub fn controls(&self) -> &ControlStore {
        &self.controls
    }

    /// MIDI configuration.
    pub fn midi(&self) -> &MidiConfig {
        &self.midi
    }

    /// Mutable MIDI configuration. Does not affect the dirty flag.
    pub fn midi_mut(&mut self) -> &mut MidiConfig {
        &mut self.midi
    }

    /// Whether the preset has unsaved edits.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag (after a save or a load).
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Rename the preset. See [`validate_name`].
    pub fn set_name(&mut self, name: &str) -> H9Result<()> {
        let name = validate_name(name)?;
        if self.name != name {
            self.name = name.to_string();
            self.dirty = true;
        }
        Ok(())
    }

    /// Select a module; the algorithm resets to 0.
    pub fn select_module(&mut self, catalog: &Catalog, module: usize) -> H9Result<()> {
        catalog.module(module)?;
        self.module = module;
        self.algorithm = 0;
        self.dirty = true;
        Ok(())
    }

    /// Select an algorithm within the current module.
    pub fn select_algorithm(&mut self, catalog: &Catalog, algorithm: usize) -> H9Result<()> {
        catalog.algorithm(self.module, algorithm)?;
        self.algorithm = algorithm;
        self.dirty = true;
        Ok(())
    }

    /// Set a control's raw value.
    pub fn set_control(&mut self, id: ControlId, value: ControlValue) -> H9Result<ValueChange> {
        let change = self.controls.set_control(id, value)?;
        self.dirty = true;
        Ok(change)
    }

    /// Set the value a knob mode edits (raw value in `Normal`).
    pub fn set_control_in_mode(
        &mut self,
        id: ControlId,
        mode: KnobMode,
        value: ControlValue,
    ) -> H9Result<ValueChange> {
        let change = self.controls.set_in_mode(id, mode, value)?;
        self.dirty = true;
        Ok(change)
    }

    /// Replace a knob's curve parameters.
    pub fn set_knob_map(
        &mut self,
        id: ControlId,
        exp_min: ControlValue,
        exp_max: ControlValue,
        psw: ControlValue,
    ) -> H9Result<()> {
        self.controls.set_knob_map(id, exp_min, exp_max, psw)?;
        self.dirty = true;
        Ok(())
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new()
    }
}

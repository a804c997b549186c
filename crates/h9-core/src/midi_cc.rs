//! MIDI CC mapping between controls and continuous controllers.
//!
//! Every preset carries two maps, one for receiving and one for
//! transmitting. Each entry assigns a control to a CC number (0-99) or
//! disables it.
//!
//! # Translation
//!
//! - [`apply_incoming_cc`] finds the first control whose receive mapping
//!   matches an incoming CC number and scales the 7-bit value to
//!   `[0.0, 1.0]` via `value / 127`.
//! - [`emit_outgoing_cc`] looks up a control's transmit mapping and scales
//!   its raw value to 7 bits via `round(raw * 127)`.
//!
//! Duplicate receive assignments are a configuration error the translator
//! does not prevent; the lowest control id wins.
//!
//! # Example
//!
//! ```
//! use h9_core::midi_cc::{apply_incoming_cc, emit_outgoing_cc, CcMap, CcMapping};
//!
//! let map = CcMap::disabled().with(3, CcMapping::Cc(20)).unwrap();
//! assert_eq!(emit_outgoing_cc(&map, 3, 1.0), Some((20, 127)));
//! assert_eq!(apply_incoming_cc(&map, 20, 127), Some((3, 1.0)));
//! assert_eq!(apply_incoming_cc(&map, 21, 64), None);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{H9Error, H9Result};
use crate::types::{
    ControlId, ControlValue, EXPRESSION_CONTROL, MAX_CC_NUMBER, NUM_CONTROLS,
    PEDAL_SWITCH_CONTROL,
};

// =============================================================================
// Constants
// =============================================================================

/// First CC of the default knob block (knob 0 → CC 22, knob 9 → CC 31).
pub const DEFAULT_KNOB_CC_BASE: u8 = 22;

/// Default CC for the expression pedal.
pub const DEFAULT_EXPRESSION_CC: u8 = 15;

/// Default CC for the pedal switch.
pub const DEFAULT_PEDAL_SWITCH_CC: u8 = 16;

/// Tokens accepted as the disabled sentinel (case-insensitive).
const DISABLED_TOKENS: [&str; 4] = ["disabled", "off", "none", "-"];

// =============================================================================
// CcMapping
// =============================================================================

/// A single control's CC assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CcMapping {
    /// Not mapped.
    #[default]
    Disabled,
    /// Mapped to a CC number, always 0-99.
    Cc(u8),
}

impl CcMapping {
    /// Validated constructor.
    pub fn cc(number: u8) -> H9Result<Self> {
        if number <= MAX_CC_NUMBER {
            Ok(Self::Cc(number))
        } else {
            Err(H9Error::InvalidCc(number.to_string()))
        }
    }

    /// The CC number, if enabled.
    #[inline]
    pub const fn number(&self) -> Option<u8> {
        match self {
            Self::Disabled => None,
            Self::Cc(n) => Some(*n),
        }
    }

    /// Returns `true` if this entry is enabled.
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Cc(_))
    }

    /// Pass through `Disabled` and in-range CCs, reject anything above 99.
    pub fn validate(self) -> H9Result<Self> {
        match self {
            Self::Cc(n) if n > MAX_CC_NUMBER => Err(H9Error::InvalidCc(n.to_string())),
            other => Ok(other),
        }
    }
}

impl TryFrom<i32> for CcMapping {
    type Error = H9Error;

    /// Integers 0-99 map to a CC; anything else is rejected.
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|n| *n <= MAX_CC_NUMBER)
            .map(Self::Cc)
            .ok_or_else(|| H9Error::InvalidCc(value.to_string()))
    }
}

impl FromStr for CcMapping {
    type Err = H9Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if DISABLED_TOKENS.iter().any(|d| token.eq_ignore_ascii_case(d)) {
            return Ok(Self::Disabled);
        }
        let value: i32 = token
            .parse()
            .map_err(|_| H9Error::InvalidCc(token.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for CcMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Cc(n) => write!(f, "{}", n),
        }
    }
}

// =============================================================================
// CcMap
// =============================================================================

/// Which of a preset's two maps to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CcDirection {
    /// Incoming CC → control.
    Receive,
    /// Control → outgoing CC.
    Transmit,
}

/// One CC assignment per control.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CcMap {
    entries: [CcMapping; NUM_CONTROLS],
}

impl CcMap {
    /// Every control disabled.
    pub const fn disabled() -> Self {
        Self {
            entries: [CcMapping::Disabled; NUM_CONTROLS],
        }
    }

    /// Stock assignment: knobs on CC 22-31, expression on 15, switch on 16.
    pub const fn h9_default() -> Self {
        let mut entries = [CcMapping::Disabled; NUM_CONTROLS];
        let mut i = 0;
        while i < EXPRESSION_CONTROL {
            entries[i] = CcMapping::Cc(DEFAULT_KNOB_CC_BASE + i as u8);
            i += 1;
        }
        entries[EXPRESSION_CONTROL] = CcMapping::Cc(DEFAULT_EXPRESSION_CC);
        entries[PEDAL_SWITCH_CONTROL] = CcMapping::Cc(DEFAULT_PEDAL_SWITCH_CC);
        Self { entries }
    }

    /// Build a map from exactly `NUM_CONTROLS` entries, each 0-99 or
    /// disabled.
    pub fn from_entries(entries: &[CcMapping]) -> H9Result<Self> {
        let entries: [CcMapping; NUM_CONTROLS] =
            entries.try_into().map_err(|_| H9Error::WrongLength {
                expected: NUM_CONTROLS,
                actual: entries.len(),
            })?;
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// Parse a whole map from tokens. Fails without a partial result if
    /// the count is wrong or any token is invalid.
    pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> H9Result<Self> {
        let parsed = tokens
            .iter()
            .map(|t| t.as_ref().parse::<CcMapping>())
            .collect::<H9Result<Vec<_>>>()?;
        Self::from_entries(&parsed)
    }

    /// Builder-style single assignment.
    pub fn with(mut self, id: ControlId, mapping: CcMapping) -> H9Result<Self> {
        self.set(id, mapping)?;
        Ok(self)
    }

    /// Get a control's mapping.
    pub fn get(&self, id: ControlId) -> H9Result<CcMapping> {
        self.entries
            .get(id)
            .copied()
            .ok_or(H9Error::InvalidControl(id))
    }

    /// Set a control's mapping. The map is unchanged on error.
    pub fn set(&mut self, id: ControlId, mapping: CcMapping) -> H9Result<()> {
        let mapping = mapping.validate()?;
        let entry = self.entries.get_mut(id).ok_or(H9Error::InvalidControl(id))?;
        *entry = mapping;
        Ok(())
    }

    /// All entries in control order.
    pub fn entries(&self) -> &[CcMapping; NUM_CONTROLS] {
        &self.entries
    }

    /// First control mapped to `cc`, if any.
    pub fn control_for(&self, cc: u8) -> Option<ControlId> {
        self.entries
            .iter()
            .position(|entry| *entry == CcMapping::Cc(cc))
    }
}

impl Default for CcMap {
    fn default() -> Self {
        Self::h9_default()
    }
}

impl fmt::Debug for CcMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.to_string()))
            .finish()
    }
}

// =============================================================================
// Translation
// =============================================================================

/// Scale a 7-bit CC value to `[0.0, 1.0]`. Values above 127 saturate.
#[inline]
pub fn cc_to_unit(value: u8) -> ControlValue {
    value.min(127) as ControlValue / 127.0
}

/// Scale a unit value to 7 bits with rounding.
#[inline]
pub fn unit_to_cc(value: ControlValue) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Map an incoming CC to `(control_id, raw_value)` through a receive map.
pub fn apply_incoming_cc(
    rx_map: &CcMap,
    cc_number: u8,
    cc_value: u8,
) -> Option<(ControlId, ControlValue)> {
    rx_map
        .control_for(cc_number)
        .map(|id| (id, cc_to_unit(cc_value)))
}

/// Map a control's raw value to `(cc_number, cc_value)` through a transmit map.
pub fn emit_outgoing_cc(
    tx_map: &CcMap,
    control_id: ControlId,
    raw_value: ControlValue,
) -> Option<(u8, u8)> {
    let cc = tx_map.get(control_id).ok()?.number()?;
    Some((cc, unit_to_cc(raw_value)))
}

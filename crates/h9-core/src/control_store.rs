//! Per-control value storage.
//!
//! [`ControlStore`] holds the raw value of every control and the curve
//! parameters of every knob. Raw values are the ground truth; display
//! values are always derived through [`curve::display`](crate::curve::display).
//!
//! The store has no notion of a dirty flag or notifications. The owning
//! [`Preset`](crate::Preset) marks itself dirty, and the
//! [`DeviceController`](crate::DeviceController) decides whether a change is
//! announced.

use crate::curve::{self, DisplayValue, KnobCurve, KnobMode};
use crate::error::{H9Error, H9Result};
use crate::types::{is_knob, ControlId, ControlValue, H9_NUM_KNOBS, NUM_CONTROLS};

/// Old and new value of a single stored quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChange {
    pub old: ControlValue,
    pub new: ControlValue,
}

/// Raw values for all controls plus curves for the knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlStore {
    values: [ControlValue; NUM_CONTROLS],
    curves: [KnobCurve; H9_NUM_KNOBS],
}

impl ControlStore {
    /// All controls at zero, every knob on the identity curve.
    pub fn new() -> Self {
        Self {
            values: [0.0; NUM_CONTROLS],
            curves: [KnobCurve::IDENTITY; H9_NUM_KNOBS],
        }
    }

    /// Build a store from complete value and curve tables, clamping each
    /// entry.
    pub(crate) fn from_parts(
        values: [ControlValue; NUM_CONTROLS],
        curves: [KnobCurve; H9_NUM_KNOBS],
    ) -> Self {
        Self {
            values: values.map(curve::unit),
            curves: curves.map(|c| KnobCurve::new(c.exp_min, c.exp_max, c.psw)),
        }
    }

    #[inline]
    fn check_control(id: ControlId) -> H9Result<()> {
        if id < NUM_CONTROLS {
            Ok(())
        } else {
            Err(H9Error::InvalidControl(id))
        }
    }

    #[inline]
    fn check_knob(id: ControlId) -> H9Result<()> {
        Self::check_control(id)?;
        if is_knob(id) {
            Ok(())
        } else {
            Err(H9Error::NotAKnob(id))
        }
    }

    /// Set a control's raw value, clamped to `[0.0, 1.0]`.
    ///
    /// Returns the value before and after. In `Normal` mode the displayed
    /// current value is the raw value, so these are also the old and new
    /// display values.
    pub fn set_control(&mut self, id: ControlId, value: ControlValue) -> H9Result<ValueChange> {
        Self::check_control(id)?;
        let new = curve::unit(value);
        let old = std::mem::replace(&mut self.values[id], new);
        Ok(ValueChange { old, new })
    }

    /// Get a control's raw value.
    pub fn get_value(&self, id: ControlId) -> H9Result<ControlValue> {
        Self::check_control(id)?;
        Ok(self.values[id])
    }

    /// Get the display pair of a control for a knob mode.
    ///
    /// Non-knob controls have no curve and always show their raw value in
    /// both slots.
    pub fn get_display(&self, id: ControlId, mode: KnobMode) -> H9Result<DisplayValue> {
        Self::check_control(id)?;
        let raw = self.values[id];
        if is_knob(id) {
            Ok(curve::display(raw, &self.curves[id], mode))
        } else {
            Ok(DisplayValue::flat(raw))
        }
    }

    /// Replace a knob's curve parameters (each clamped).
    pub fn set_knob_map(
        &mut self,
        id: ControlId,
        exp_min: ControlValue,
        exp_max: ControlValue,
        psw: ControlValue,
    ) -> H9Result<()> {
        Self::check_knob(id)?;
        self.curves[id] = KnobCurve::new(exp_min, exp_max, psw);
        Ok(())
    }

    /// Get a knob's curve parameters.
    pub fn get_knob_map(&self, id: ControlId) -> H9Result<KnobCurve> {
        Self::check_knob(id)?;
        Ok(self.curves[id])
    }

    /// Set the single curve parameter edited in `mode`.
    ///
    /// `Normal` mode has no curve parameter and falls through to the raw
    /// value, so this is the one entry point that honors knob mode.
    pub fn set_in_mode(
        &mut self,
        id: ControlId,
        mode: KnobMode,
        value: ControlValue,
    ) -> H9Result<ValueChange> {
        if mode == KnobMode::Normal || !is_knob(id) {
            return self.set_control(id, value);
        }
        Self::check_knob(id)?;
        let curve = &mut self.curves[id];
        let old = curve.get(mode).unwrap_or_default();
        curve.set(mode, value);
        let new = curve.get(mode).unwrap_or_default();
        Ok(ValueChange { old, new })
    }

    /// All raw values in control order.
    pub fn values(&self) -> &[ControlValue; NUM_CONTROLS] {
        &self.values
    }

    /// All knob curves in knob order.
    pub fn curves(&self) -> &[KnobCurve; H9_NUM_KNOBS] {
        &self.curves
    }

    /// Display pairs for every control in `mode`.
    pub fn displays(&self, mode: KnobMode) -> [DisplayValue; NUM_CONTROLS] {
        std::array::from_fn(|id| {
            if is_knob(id) {
                curve::display(self.values[id], &self.curves[id], mode)
            } else {
                DisplayValue::flat(self.values[id])
            }
        })
    }
}

impl Default for ControlStore {
    fn default() -> Self {
        Self::new()
    }
}

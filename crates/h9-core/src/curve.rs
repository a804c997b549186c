//! Knob transfer curves and the knob display mode.
//!
//! Each H9 knob carries three curve parameters besides its raw position:
//! the expression-pedal endpoints (`exp_min`, `exp_max`) and the value the
//! knob jumps to when the pedal switch engages (`psw`). This module maps
//! between the stored raw value and what a host should show for a knob.
//!
//! # Display Pairs
//!
//! Outgoing control changes carry two values, "current" and "alternate".
//! Which stored quantities fill them depends on the active [`KnobMode`]:
//!
//! | Mode             | current               | alternate             |
//! |------------------|-----------------------|-----------------------|
//! | `Normal`         | raw                   | curve-adjusted raw    |
//! | `ExpressionMin`  | exp_min               | exp_max               |
//! | `ExpressionMax`  | exp_max               | exp_min               |
//! | `ParallelSwitch` | psw                   | raw                   |
//!
//! The curve-adjusted value is a linear interpolation between the endpoints:
//! `exp_min + raw * (exp_max - exp_min)`.
//!
//! # Example
//!
//! ```
//! use h9_core::curve::{display, KnobCurve, KnobMode};
//!
//! let curve = KnobCurve::new(0.2, 0.6, 1.0);
//! let shown = display(0.5, &curve, KnobMode::Normal);
//! assert_eq!(shown.current, 0.5);
//! assert!((shown.alternate - 0.4).abs() < 1e-6);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::types::ControlValue;

#[inline]
pub(crate) fn unit(value: ControlValue) -> ControlValue {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// View selector deciding which stored values a knob exposes.
///
/// Not persisted with a preset. Changing it never alters a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KnobMode {
    /// Raw position, with the curve-adjusted value as alternate.
    #[default]
    Normal,
    /// Edit the expression-pedal heel endpoint.
    ExpressionMin,
    /// Edit the expression-pedal toe endpoint.
    ExpressionMax,
    /// Edit the pedal-switch value.
    ParallelSwitch,
}

impl KnobMode {
    /// All modes in declaration order.
    pub const ALL: [KnobMode; 4] = [
        Self::Normal,
        Self::ExpressionMin,
        Self::ExpressionMax,
        Self::ParallelSwitch,
    ];

    /// Stable lowercase name, also accepted by [`FromStr`].
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::ExpressionMin => "expmin",
            Self::ExpressionMax => "expmax",
            Self::ParallelSwitch => "psw",
        }
    }
}

impl fmt::Display for KnobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KnobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "expmin" | "exp_min" | "min" => Ok(Self::ExpressionMin),
            "expmax" | "exp_max" | "max" => Ok(Self::ExpressionMax),
            "psw" | "parallel" | "switch" => Ok(Self::ParallelSwitch),
            other => Err(format!("unknown knob mode '{}'", other)),
        }
    }
}

/// Curve parameters of a single knob, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobCurve {
    /// Knob value with the expression pedal at heel.
    pub exp_min: ControlValue,
    /// Knob value with the expression pedal at toe.
    pub exp_max: ControlValue,
    /// Knob value while the pedal switch is engaged.
    pub psw: ControlValue,
}

impl KnobCurve {
    /// The identity curve: full expression sweep, switch value zero.
    pub const IDENTITY: Self = Self {
        exp_min: 0.0,
        exp_max: 1.0,
        psw: 0.0,
    };

    /// Create a curve, clamping every parameter to `[0.0, 1.0]`.
    pub fn new(exp_min: ControlValue, exp_max: ControlValue, psw: ControlValue) -> Self {
        Self {
            exp_min: unit(exp_min),
            exp_max: unit(exp_max),
            psw: unit(psw),
        }
    }

    /// Curve-adjusted value for a raw knob position.
    #[inline]
    pub fn adjust(&self, raw: ControlValue) -> ControlValue {
        let raw = unit(raw);
        unit(self.exp_min + raw * (self.exp_max - self.exp_min))
    }

    /// Inverse of [`adjust`](Self::adjust).
    ///
    /// Returns 0.5 when both endpoints coincide, since every raw position
    /// then produces the same output.
    pub fn unadjust(&self, adjusted: ControlValue) -> ControlValue {
        let span = self.exp_max - self.exp_min;
        if span.abs() < f32::EPSILON {
            return 0.5;
        }
        unit((unit(adjusted) - self.exp_min) / span)
    }

    /// Read the parameter a mode edits, or `None` for `Normal` (raw value).
    pub fn get(&self, mode: KnobMode) -> Option<ControlValue> {
        match mode {
            KnobMode::Normal => None,
            KnobMode::ExpressionMin => Some(self.exp_min),
            KnobMode::ExpressionMax => Some(self.exp_max),
            KnobMode::ParallelSwitch => Some(self.psw),
        }
    }

    /// Write the parameter a mode edits. Returns `false` for `Normal`.
    pub fn set(&mut self, mode: KnobMode, value: ControlValue) -> bool {
        let value = unit(value);
        match mode {
            KnobMode::Normal => return false,
            KnobMode::ExpressionMin => self.exp_min = value,
            KnobMode::ExpressionMax => self.exp_max = value,
            KnobMode::ParallelSwitch => self.psw = value,
        }
        true
    }
}

impl Default for KnobCurve {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A `(current, alternate)` pair as shown to a host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayValue {
    pub current: ControlValue,
    pub alternate: ControlValue,
}

impl DisplayValue {
    /// Both values equal, as shown for controls without a curve.
    pub const fn flat(value: ControlValue) -> Self {
        Self {
            current: value,
            alternate: value,
        }
    }
}

/// Compute the display pair of a knob for a mode.
pub fn display(raw: ControlValue, curve: &KnobCurve, mode: KnobMode) -> DisplayValue {
    let raw = unit(raw);
    match mode {
        KnobMode::Normal => DisplayValue {
            current: raw,
            alternate: curve.adjust(raw),
        },
        KnobMode::ExpressionMin => DisplayValue {
            current: curve.exp_min,
            alternate: curve.exp_max,
        },
        KnobMode::ExpressionMax => DisplayValue {
            current: curve.exp_max,
            alternate: curve.exp_min,
        },
        KnobMode::ParallelSwitch => DisplayValue {
            current: curve.psw,
            alternate: raw,
        },
    }
}

/// Recover the raw knob position from the value a host shows for it.
///
/// In `Normal` and `ParallelSwitch` the raw position is shown directly
/// (as current and alternate respectively), so the value passes through.
/// In the expression modes only the curve output is meaningful, so the
/// value is treated as a curve-adjusted output and inverted.
pub fn raw_from(shown: ControlValue, mode: KnobMode, curve: &KnobCurve) -> ControlValue {
    match mode {
        KnobMode::Normal | KnobMode::ParallelSwitch => unit(shown),
        KnobMode::ExpressionMin | KnobMode::ExpressionMax => curve.unadjust(shown),
    }
}

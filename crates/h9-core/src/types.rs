//! Common types and limits used throughout the H9 engine.

// =============================================================================
// Control Layout
// =============================================================================
//
// The H9 exposes ten physical knobs, followed by the expression pedal and the
// pedal switch. All twelve are addressed by a dense index; only the knobs
// carry expression/switch curve parameters.
// =============================================================================

/// Number of physical knobs. Knob ids are `0..H9_NUM_KNOBS`.
pub const H9_NUM_KNOBS: usize = 10;

/// Total number of addressable controls (knobs, expression, pedal switch).
pub const NUM_CONTROLS: usize = 12;

/// Control id of the expression pedal.
pub const EXPRESSION_CONTROL: ControlId = 10;

/// Control id of the pedal switch.
pub const PEDAL_SWITCH_CONTROL: ControlId = 11;

/// Maximum preset name length in bytes (ASCII).
pub const H9_MAX_NAME_LEN: usize = 16;

/// Upper bound on any sysex frame the engine produces or accepts.
pub const MAX_FRAME_SIZE: usize = 1000;

/// Highest assignable CC number.
pub const MAX_CC_NUMBER: u8 = 99;

/// Highest sysex device id.
pub const MAX_SYSEX_ID: u8 = 16;

/// Control identifier (`0..NUM_CONTROLS`).
pub type ControlId = usize;

/// Control value (normalized 0.0 to 1.0).
pub type ControlValue = f32;

/// Returns `true` if `id` addresses a physical knob.
#[inline]
pub const fn is_knob(id: ControlId) -> bool {
    id < H9_NUM_KNOBS
}

/// Short display label for a control, matching the front-panel order.
pub fn control_label(id: ControlId) -> Option<&'static str> {
    const LABELS: [&str; NUM_CONTROLS] = [
        "Knob 1", "Knob 2", "Knob 3", "Knob 4", "Knob 5", "Knob 6", "Knob 7", "Knob 8", "Knob 9",
        "Knob 10", "Expression", "Pedal Switch",
    ];
    LABELS.get(id).copied()
}

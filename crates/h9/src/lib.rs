//! # H9
//!
//! Control engine for the Eventide H9.
//!
//! `h9` drives an H9 pedal over MIDI: it keeps the live preset, translates
//! CC traffic in both directions, reads and writes program dumps, and tells
//! the host about every change through typed notifications.
//!
//! ## Architecture
//!
//! ```text
//! Host adapter (MIDI port, UI)
//!        ↓
//! DeviceController<S> (owns the live Preset)
//!        ↓
//! NotificationSink S
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use h9::prelude::*;
//!
//! let mut controller = DeviceController::new(Vec::<Notification>::new());
//!
//! // Ask the pedal for its current program.
//! controller.request_device_program();
//!
//! // Feed whatever arrives on the MIDI input back in.
//! let reply = controller.dump();
//! controller.receive_midi(&reply).unwrap();
//!
//! for notification in controller.sink_mut().drain(..) {
//!     match notification {
//!         Notification::SysexOut(bytes) => { /* write to MIDI out */ let _ = bytes; }
//!         Notification::CcOut(cc) => { let _ = cc.to_bytes(); }
//!         _ => {}
//!     }
//! }
//! ```

// Re-export sub-crates
pub use h9_core as core;

/// Prelude module for convenient imports.
///
/// ```
/// use h9::prelude::*;
/// ```
pub mod prelude {
    pub use h9_core::{
        // Controller and configuration
        ControllerConfig, DeviceController,
        // Notifications
        CallbackSink, CcOut, MidiConfigChange, Notification, NotificationSink, Notify, NullSink,
        // Preset model
        Catalog, ControlStore, MidiConfig, Preset,
        // Curves
        DisplayValue, KnobCurve, KnobMode,
        // MIDI CC
        CcDirection, CcMap, CcMapping,
        // Sysex
        SysexCodec, SysexMessage,
        // Error types
        CodecError, H9Error, H9Result,
        // Control layout
        ControlId, ControlValue, EXPRESSION_CONTROL, H9_NUM_KNOBS, NUM_CONTROLS,
        PEDAL_SWITCH_CONTROL,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_drives_controller() {
        let mut controller = DeviceController::new(Vec::<Notification>::new());
        controller.select_module(3).unwrap();
        controller.set_control(EXPRESSION_CONTROL, 1.0, Notify::Trigger).unwrap();

        let bytes = controller.dump();
        let preset = SysexCodec::new(Catalog::h9()).decode(&bytes).unwrap();
        assert_eq!(preset.module(), 3);
        assert_eq!(preset.controls().get_value(EXPRESSION_CONTROL).unwrap(), 1.0);
    }

    #[test]
    fn test_callback_sink_via_prelude() {
        let mut seen = Vec::new();
        let mut controller =
            DeviceController::new(CallbackSink(|n: Notification| seen.push(n)));
        controller.set_knobmode(KnobMode::ExpressionMax);
        drop(controller);
        assert_eq!(seen.len(), H9_NUM_KNOBS);
    }
}

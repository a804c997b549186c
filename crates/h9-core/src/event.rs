//! Outbound notifications.
//!
//! The [`DeviceController`](crate::DeviceController) reports every state
//! change as a [`Notification`] pushed synchronously into a
//! [`NotificationSink`] it owns. A host renders these to its own outputs
//! (UI updates, MIDI bytes, persistence).
//!
//! ```
//! use h9_core::{DeviceController, Notification, Notify};
//!
//! let mut controller = DeviceController::new(Vec::<Notification>::new());
//! controller.set_control(3, 0.5, Notify::Trigger).unwrap();
//!
//! assert!(controller.sink().contains(&Notification::ControlChanged {
//!     id: 3,
//!     current: 0.5,
//!     alternate: 0.5,
//! }));
//! ```

use crate::error::H9Error;
use crate::midi_cc::{CcDirection, CcMap, CcMapping};
use crate::types::{ControlId, ControlValue};

/// Whether a control edit announces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    /// Emit control-changed (and CC echo, if configured).
    #[default]
    Trigger,
    /// Apply silently. Dirty-flag transitions are still reported.
    Suppress,
}

/// An outgoing MIDI control change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcOut {
    /// MIDI channel (1-16).
    pub channel: u8,
    /// Controller number (0-99).
    pub cc: u8,
    /// 7-bit value.
    pub value: u8,
}

impl CcOut {
    /// Render as a 3-byte MIDI message.
    pub const fn to_bytes(&self) -> [u8; 3] {
        [
            0xB0 | (self.channel.saturating_sub(1) & 0x0F),
            self.cc & 0x7F,
            self.value & 0x7F,
        ]
    }
}

/// What changed in the MIDI configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum MidiConfigChange {
    Channel(u8),
    SysexId(u8),
    CcMapping {
        direction: CcDirection,
        id: ControlId,
        mapping: CcMapping,
    },
    CcMap {
        direction: CcDirection,
        map: CcMap,
    },
}

/// A single state change reported by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A control's display pair, per the active knob mode.
    ControlChanged {
        id: ControlId,
        current: ControlValue,
        alternate: ControlValue,
    },
    /// MIDI CC to send to the device.
    CcOut(CcOut),
    /// Sysex frame to send to the device.
    SysexOut(Vec<u8>),
    /// The unsaved-edits flag flipped.
    DirtyChanged(bool),
    /// Preset name.
    PresetNameChanged(String),
    /// Selected module.
    ModuleChanged { index: usize, name: &'static str },
    /// Selected algorithm.
    AlgorithmChanged { index: usize, name: &'static str },
    /// Algorithms of the selected module.
    AlgorithmListChanged(Vec<&'static str>),
    /// MIDI configuration.
    MidiConfigChanged(MidiConfigChange),
    /// A program dump replaced the live preset. Always first in its batch.
    PresetLoaded,
    /// Device reply to a config variable read.
    ConfigValue { address: u16, value: u16 },
    /// Device system variable block.
    SystemConfig(Vec<u8>),
    /// Inbound data was rejected.
    Error(H9Error),
}

/// Receiver of controller notifications.
///
/// Called in-line with the operation that caused the change, before that
/// operation returns. A sink must not call back into the controller that
/// owns it.
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for &mut S {
    fn notify(&mut self, notification: Notification) {
        (**self).notify(notification);
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for Box<S> {
    fn notify(&mut self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Adapts a closure into a sink.
///
/// ```
/// use h9_core::{CallbackSink, DeviceController, Notification};
///
/// let mut sent = 0;
/// let mut controller = DeviceController::new(CallbackSink(|n: Notification| {
///     if let Notification::SysexOut(_) = n {
///         sent += 1;
///     }
/// }));
/// controller.request_device_program();
/// drop(controller);
/// assert_eq!(sent, 1);
/// ```
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(Notification)> NotificationSink for CallbackSink<F> {
    fn notify(&mut self, notification: Notification) {
        (self.0)(notification);
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _notification: Notification) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cc_out_bytes() {
        let out = CcOut { channel: 1, cc: 22, value: 64 };
        assert_eq!(out.to_bytes(), [0xB0, 22, 64]);
        let out = CcOut { channel: 16, cc: 99, value: 127 };
        assert_eq!(out.to_bytes(), [0xBF, 99, 127]);
    }

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<Notification> = Vec::new();
        sink.notify(Notification::PresetLoaded);
        sink.notify(Notification::DirtyChanged(false));
        assert_eq!(
            sink,
            vec![Notification::PresetLoaded, Notification::DirtyChanged(false)]
        );
    }

    #[test]
    fn test_callback_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = CallbackSink(|n: Notification| seen.push(n));
            sink.notify(Notification::DirtyChanged(true));
        }
        assert_eq!(seen, vec![Notification::DirtyChanged(true)]);
    }

    #[test]
    fn test_borrowed_sink() {
        let mut inner: Vec<Notification> = Vec::new();
        {
            let mut sink: &mut Vec<Notification> = &mut inner;
            NotificationSink::notify(&mut sink, Notification::PresetLoaded);
        }
        assert_eq!(inner.len(), 1);
    }
}

//! The device controller.
//!
//! [`DeviceController`] owns the live [`Preset`] and the active
//! [`KnobMode`], applies inbound MIDI and host calls to them, and reports
//! every change to its [`NotificationSink`].
//!
//! # Notification Order
//!
//! A successful program dump produces one batch, in this order:
//!
//! 1. `PresetLoaded`
//! 2. `ModuleChanged`
//! 3. `AlgorithmListChanged`
//! 4. `AlgorithmChanged`
//! 5. `PresetNameChanged`
//! 6. `DirtyChanged(false)`, only if the previous preset was dirty
//! 7. `MidiConfigChanged`, for a channel or device id that differs
//! 8. one `ControlChanged` per control, if `sync_controls_on_load` is set
//!
//! A dump that fails to decode leaves everything untouched and produces a
//! single `Error` notification.
//!
//! # Reentrancy
//!
//! All operations take `&mut self` and deliver notifications before they
//! return, while the operation is still in progress. The controller never
//! calls itself from a sink. A sink that holds shared access to its own
//! controller (for example through `Rc<RefCell<..>>`) must not call back
//! into it: the borrow is still held, so `borrow_mut` panics and
//! `try_borrow_mut` fails. Queue follow-up work and run it after the
//! operation returns.
//!
//! # Example
//!
//! ```
//! use h9_core::{DeviceController, KnobMode, Notification, Notify};
//!
//! let mut controller = DeviceController::new(Vec::<Notification>::new());
//!
//! controller.set_knobmode(KnobMode::ExpressionMin);
//! controller.set_control(0, 0.2, Notify::Trigger).unwrap();
//!
//! let knob = controller.preset().controls().get_knob_map(0).unwrap();
//! assert_eq!(knob.exp_min, 0.2);
//! assert_eq!(controller.preset().controls().get_value(0).unwrap(), 0.0);
//! ```

use log::{debug, trace, warn};

use crate::catalog::Catalog;
use crate::config::ControllerConfig;
use crate::curve::{DisplayValue, KnobMode};
use crate::error::{H9Error, H9Result};
use crate::event::{CcOut, MidiConfigChange, Notification, NotificationSink, Notify};
use crate::midi_cc::{apply_incoming_cc, emit_outgoing_cc, CcDirection, CcMap, CcMapping};
use crate::preset::Preset;
use crate::sysex::{SysexCodec, SysexMessage, SYSEX_START};
use crate::types::{is_knob, ControlId, ControlValue, H9_NUM_KNOBS, NUM_CONTROLS};

/// Status nibble of a MIDI control change.
const CONTROL_CHANGE: u8 = 0xB0;

/// Owner of the live preset and source of all notifications.
pub struct DeviceController<S: NotificationSink> {
    catalog: &'static Catalog,
    config: ControllerConfig,
    preset: Preset,
    knob_mode: KnobMode,
    sink: S,
}

impl<S: NotificationSink> DeviceController<S> {
    /// Controller with the default configuration and the stock catalog.
    pub fn new(sink: S) -> Self {
        Self {
            catalog: Catalog::h9(),
            config: ControllerConfig::new(),
            preset: Preset::new(),
            knob_mode: KnobMode::Normal,
            sink,
        }
    }

    /// Controller with a custom configuration.
    pub fn with_config(config: ControllerConfig, sink: S) -> H9Result<Self> {
        Self::with_catalog(Catalog::h9(), config, sink)
    }

    /// Controller over a custom catalog.
    pub fn with_catalog(
        catalog: &'static Catalog,
        config: ControllerConfig,
        sink: S,
    ) -> H9Result<Self> {
        config.validate()?;
        catalog.algorithm(0, 0)?;

        let mut preset = Preset::new();
        preset.midi_mut().set_channel(config.midi_channel)?;
        preset.midi_mut().set_sysex_id(config.sysex_device_id)?;

        Ok(Self {
            catalog,
            config,
            preset,
            knob_mode: KnobMode::Normal,
            sink,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The live preset.
    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    /// The active knob mode.
    pub fn knob_mode(&self) -> KnobMode {
        self.knob_mode
    }

    /// Startup configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The module/algorithm catalog.
    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    /// Whether the live preset has unsaved edits.
    pub fn is_dirty(&self) -> bool {
        self.preset.is_dirty()
    }

    /// The notification sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The notification sink, mutably (e.g. to drain a `Vec`).
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the controller, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Display pair of every control in the active knob mode.
    pub fn control_values(&self) -> [DisplayValue; NUM_CONTROLS] {
        self.preset.controls().displays(self.knob_mode)
    }

    fn codec(&self) -> SysexCodec {
        SysexCodec::new(self.catalog).with_device_id(self.preset.midi().sysex_id())
    }

    // =========================================================================
    // Notification Helpers
    // =========================================================================

    #[inline]
    fn emit(&mut self, notification: Notification) {
        self.sink.notify(notification);
    }

    fn emit_control(&mut self, id: ControlId) {
        if let Ok(shown) = self.preset.controls().get_display(id, self.knob_mode) {
            self.emit(Notification::ControlChanged {
                id,
                current: shown.current,
                alternate: shown.alternate,
            });
        }
    }

    fn emit_dirty_transition(&mut self, was_dirty: bool) {
        let dirty = self.preset.is_dirty();
        if dirty != was_dirty {
            self.emit(Notification::DirtyChanged(dirty));
        }
    }

    fn emit_module(&mut self) {
        let index = self.preset.module();
        if let Ok(module) = self.catalog.module(index) {
            self.emit(Notification::ModuleChanged {
                index,
                name: module.name,
            });
            self.emit(Notification::AlgorithmListChanged(module.algorithm_names()));
        }
    }

    fn emit_algorithm(&mut self) {
        let index = self.preset.algorithm();
        if let Ok(algorithm) = self.catalog.algorithm(self.preset.module(), index) {
            self.emit(Notification::AlgorithmChanged {
                index,
                name: algorithm.name,
            });
        }
    }

    fn emit_cc_echo(&mut self, id: ControlId) {
        let Ok(raw) = self.preset.controls().get_value(id) else {
            return;
        };
        if let Some((cc, value)) = emit_outgoing_cc(self.preset.midi().cc_tx(), id, raw) {
            let channel = self.preset.midi().channel();
            self.emit(Notification::CcOut(CcOut { channel, cc, value }));
        }
    }

    /// Announce every control's display pair in the active knob mode.
    pub fn sync_controls(&mut self) {
        for id in 0..NUM_CONTROLS {
            self.emit_control(id);
        }
    }

    // =========================================================================
    // Inbound MIDI
    // =========================================================================

    /// Handle an inbound sysex frame.
    ///
    /// A program dump replaces the live preset wholesale. Config variable
    /// replies and system variable blocks are forwarded as notifications.
    /// Anything that fails to decode is reported through an `Error`
    /// notification and returned; the live state is untouched.
    pub fn receive_sysex_bytes(&mut self, bytes: &[u8]) -> H9Result<()> {
        match self.codec().parse(bytes) {
            Ok(SysexMessage::Program(preset)) => {
                self.load(preset);
                Ok(())
            }
            Ok(SysexMessage::ValueDump { address, value }) => {
                debug!("Config value {} = {}", address, value);
                self.emit(Notification::ConfigValue { address, value });
                Ok(())
            }
            Ok(SysexMessage::SystemConfig(payload)) => {
                debug!("System config received ({} bytes)", payload.len());
                self.emit(Notification::SystemConfig(payload));
                Ok(())
            }
            Ok(SysexMessage::Other { command, .. }) => {
                debug!("Ignoring H9 sysex command 0x{:02X}", command);
                Ok(())
            }
            Err(err) => {
                warn!("Rejected sysex ({} bytes): {}", bytes.len(), err);
                let err = H9Error::from(err);
                self.emit(Notification::Error(err.clone()));
                Err(err)
            }
        }
    }

    fn load(&mut self, mut incoming: Preset) {
        let was_dirty = self.preset.is_dirty();
        let old_channel = self.preset.midi().channel();
        let old_sysex_id = self.preset.midi().sysex_id();

        // CC maps are local configuration, not part of the dump.
        let cc_rx = *self.preset.midi().cc_rx();
        let cc_tx = *self.preset.midi().cc_tx();
        incoming.midi_mut().set_cc_map(CcDirection::Receive, cc_rx);
        incoming.midi_mut().set_cc_map(CcDirection::Transmit, cc_tx);
        incoming.mark_clean();
        self.preset = incoming;

        debug!(
            "Loaded preset '{}' (module {}, algorithm {})",
            self.preset.name(),
            self.preset.module(),
            self.preset.algorithm()
        );

        self.emit(Notification::PresetLoaded);
        self.emit_module();
        self.emit_algorithm();
        self.emit(Notification::PresetNameChanged(self.preset.name().to_string()));
        self.emit_dirty_transition(was_dirty);

        let channel = self.preset.midi().channel();
        if channel != old_channel {
            self.emit(Notification::MidiConfigChanged(MidiConfigChange::Channel(channel)));
        }
        let sysex_id = self.preset.midi().sysex_id();
        if sysex_id != old_sysex_id {
            self.emit(Notification::MidiConfigChanged(MidiConfigChange::SysexId(sysex_id)));
        }

        if self.config.sync_controls_on_load {
            self.sync_controls();
        }
    }

    /// Handle an inbound CC through the receive map.
    ///
    /// The mapped control's raw value is set (knob mode does not apply to
    /// device-originated changes) and announced. No CC is echoed back.
    /// Returns the control that changed, if any mapping matched.
    pub fn receive_cc(&mut self, cc_number: u8, value: u8) -> Option<ControlId> {
        let Some((id, raw)) = apply_incoming_cc(self.preset.midi().cc_rx(), cc_number, value)
        else {
            trace!("Unmapped CC {}", cc_number);
            return None;
        };

        let was_dirty = self.preset.is_dirty();
        if self.preset.set_control(id, raw).is_err() {
            return None;
        }
        self.emit_control(id);
        self.emit_dirty_transition(was_dirty);
        Some(id)
    }

    /// Handle raw MIDI bytes.
    ///
    /// Sysex frames go to [`receive_sysex_bytes`](Self::receive_sysex_bytes),
    /// control changes on the configured channel to
    /// [`receive_cc`](Self::receive_cc). Everything else is ignored.
    pub fn receive_midi(&mut self, bytes: &[u8]) -> H9Result<()> {
        match bytes {
            [SYSEX_START, ..] => self.receive_sysex_bytes(bytes),
            [status, cc, value, ..] if status & 0xF0 == CONTROL_CHANGE => {
                let channel = (status & 0x0F) + 1;
                if channel == self.preset.midi().channel() {
                    self.receive_cc(*cc, *value);
                } else {
                    trace!("Ignoring CC {} on channel {}", cc, channel);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Controls
    // =========================================================================

    /// Set a control from the host.
    ///
    /// For knobs the stored quantity depends on the knob mode: `Normal`
    /// edits the raw value, the other modes edit the matching curve
    /// parameter. Values are clamped to `[0.0, 1.0]`. Returns the display
    /// pair before and after.
    ///
    /// With [`Notify::Trigger`] a control-changed follows, and in `Normal`
    /// mode a CC echo if the control has a transmit mapping and CC echo is
    /// enabled.
    pub fn set_control(
        &mut self,
        id: ControlId,
        value: ControlValue,
        notify: Notify,
    ) -> H9Result<(DisplayValue, DisplayValue)> {
        let mode = self.knob_mode;
        let old = self.preset.controls().get_display(id, mode)?;
        let was_dirty = self.preset.is_dirty();

        self.preset.set_control_in_mode(id, mode, value)?;
        let new = self.preset.controls().get_display(id, mode)?;

        if notify == Notify::Trigger {
            self.emit_control(id);
            let edits_raw = mode == KnobMode::Normal || !is_knob(id);
            if edits_raw && self.config.echo_cc_on_set {
                self.emit_cc_echo(id);
            }
        }
        self.emit_dirty_transition(was_dirty);
        Ok((old, new))
    }

    /// Set every control at once.
    ///
    /// `values` must hold exactly one value per control, each within
    /// `[0.0, 1.0]`; otherwise nothing is applied.
    pub fn set_controls(&mut self, values: &[ControlValue], notify: Notify) -> H9Result<()> {
        if values.len() != NUM_CONTROLS {
            return Err(H9Error::WrongLength {
                expected: NUM_CONTROLS,
                actual: values.len(),
            });
        }
        if let Some((id, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(H9Error::ValueOutOfRange { id, value: *value });
        }
        for (id, value) in values.iter().enumerate() {
            self.set_control(id, *value, notify)?;
        }
        Ok(())
    }

    /// Replace a knob's curve parameters.
    pub fn set_knob_map(
        &mut self,
        id: ControlId,
        exp_min: ControlValue,
        exp_max: ControlValue,
        psw: ControlValue,
    ) -> H9Result<()> {
        let was_dirty = self.preset.is_dirty();
        self.preset.set_knob_map(id, exp_min, exp_max, psw)?;
        self.emit_control(id);
        self.emit_dirty_transition(was_dirty);
        Ok(())
    }

    /// Switch the knob view and re-announce every knob.
    pub fn set_knobmode(&mut self, mode: KnobMode) {
        debug!("Knob mode {} -> {}", self.knob_mode, mode);
        self.knob_mode = mode;
        for id in 0..H9_NUM_KNOBS {
            self.emit_control(id);
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a module. The algorithm resets to the first of the module.
    pub fn select_module(&mut self, index: usize) -> H9Result<()> {
        let was_dirty = self.preset.is_dirty();
        self.preset.select_module(self.catalog, index)?;
        debug!("Selected module {}", index);
        self.emit_module();
        self.emit_algorithm();
        self.emit_dirty_transition(was_dirty);
        Ok(())
    }

    /// Select an algorithm within the current module.
    pub fn select_algorithm(&mut self, index: usize) -> H9Result<()> {
        let was_dirty = self.preset.is_dirty();
        self.preset.select_algorithm(self.catalog, index)?;
        debug!("Selected algorithm {}", index);
        self.emit_algorithm();
        self.emit_dirty_transition(was_dirty);
        Ok(())
    }

    /// Rename the live preset.
    pub fn set_preset_name(&mut self, name: &str) -> H9Result<()> {
        let was_dirty = self.preset.is_dirty();
        let old = self.preset.name().to_string();
        self.preset.set_name(name)?;
        if old != self.preset.name() {
            self.emit(Notification::PresetNameChanged(self.preset.name().to_string()));
        }
        self.emit_dirty_transition(was_dirty);
        Ok(())
    }

    // =========================================================================
    // MIDI Configuration
    // =========================================================================

    /// Replace one control's CC mapping.
    pub fn set_cc_mapping(
        &mut self,
        direction: CcDirection,
        id: ControlId,
        mapping: CcMapping,
    ) -> H9Result<()> {
        self.preset.midi_mut().set_cc_mapping(direction, id, mapping)?;
        self.emit(Notification::MidiConfigChanged(MidiConfigChange::CcMapping {
            direction,
            id,
            mapping,
        }));
        Ok(())
    }

    /// Replace a whole CC map.
    pub fn set_cc_map(&mut self, direction: CcDirection, map: CcMap) {
        self.preset.midi_mut().set_cc_map(direction, map);
        self.emit(Notification::MidiConfigChanged(MidiConfigChange::CcMap {
            direction,
            map,
        }));
    }

    /// Replace a whole CC map from text tokens, one per control.
    ///
    /// Every token is parsed before anything is applied.
    pub fn set_cc_map_tokens<T: AsRef<str>>(
        &mut self,
        direction: CcDirection,
        tokens: &[T],
    ) -> H9Result<()> {
        let map = CcMap::parse_tokens(tokens)?;
        self.set_cc_map(direction, map);
        Ok(())
    }

    /// Set the MIDI channel (1-16).
    pub fn set_midi_channel(&mut self, channel: u8) -> H9Result<()> {
        self.preset.midi_mut().set_channel(channel)?;
        self.emit(Notification::MidiConfigChanged(MidiConfigChange::Channel(channel)));
        Ok(())
    }

    /// Set the sysex device id (0-16).
    pub fn set_sysex_device_id(&mut self, id: u8) -> H9Result<()> {
        self.preset.midi_mut().set_sysex_id(id)?;
        self.emit(Notification::MidiConfigChanged(MidiConfigChange::SysexId(id)));
        Ok(())
    }

    // =========================================================================
    // Device Requests
    // =========================================================================

    /// Encode the live preset. Does not affect the dirty flag.
    pub fn dump(&self) -> Vec<u8> {
        self.codec().encode(&self.preset, self.config.dump_knob_curves)
    }

    /// Send the live preset to the device.
    pub fn request_dump(&mut self) {
        let bytes = self.dump();
        self.emit(Notification::SysexOut(bytes));
    }

    /// Ask the device for its system variables.
    pub fn request_device_config(&mut self) {
        let bytes = self.codec().generate_request_system_config();
        self.emit(Notification::SysexOut(bytes));
    }

    /// Ask the device for its current program.
    pub fn request_device_program(&mut self) {
        let bytes = self.codec().generate_request_current_preset();
        self.emit(Notification::SysexOut(bytes));
    }

    /// Read one system variable. The reply arrives as `ConfigValue`.
    pub fn read_config_var(&mut self, address: u16) {
        let bytes = self.codec().generate_read_config_var(address);
        self.emit(Notification::SysexOut(bytes));
    }

    /// Write one system variable.
    pub fn write_config_var(&mut self, address: u16, value: u16) {
        let bytes = self.codec().generate_write_config_var(address, value);
        self.emit(Notification::SysexOut(bytes));
    }

    /// Acknowledge a save: clear the dirty flag.
    pub fn mark_clean(&mut self) {
        let was_dirty = self.preset.is_dirty();
        self.preset.mark_clean();
        self.emit_dirty_transition(was_dirty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::KnobCurve;
    use crate::error::CodecError;
    use crate::types::{EXPRESSION_CONTROL, PEDAL_SWITCH_CONTROL};

    fn controller() -> DeviceController<Vec<Notification>> {
        DeviceController::new(Vec::new())
    }

    fn drain(controller: &mut DeviceController<Vec<Notification>>) -> Vec<Notification> {
        std::mem::take(controller.sink_mut())
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{a} vs {b}");
    }

    fn device_dump(build: impl FnOnce(&mut Preset)) -> Vec<u8> {
        let mut preset = Preset::new();
        build(&mut preset);
        SysexCodec::new(Catalog::h9()).encode(&preset, true)
    }

    #[test]
    fn test_set_control_scenario() {
        let mut ctl = controller();
        assert!(!ctl.is_dirty());

        let (old, new) = ctl.set_control(3, 0.5, Notify::Trigger).unwrap();
        assert_eq!(old, DisplayValue::flat(0.0));
        assert_eq!(new, DisplayValue::flat(0.5));
        assert!(ctl.is_dirty());
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::ControlChanged { id: 3, current: 0.5, alternate: 0.5 },
                Notification::CcOut(CcOut { channel: 1, cc: 25, value: 64 }),
                Notification::DirtyChanged(true),
            ]
        );

        let bytes = ctl.dump();
        assert!(ctl.is_dirty());
        assert!(drain(&mut ctl).is_empty());
        let decoded = SysexCodec::new(Catalog::h9()).decode(&bytes).unwrap();
        assert_close(decoded.controls().get_value(3).unwrap(), 0.5);
    }

    #[test]
    fn test_dirty_changed_only_on_transition() {
        let mut ctl = controller();
        ctl.set_control(0, 0.1, Notify::Trigger).unwrap();
        ctl.set_control(1, 0.2, Notify::Trigger).unwrap();
        let dirty_events = drain(&mut ctl)
            .into_iter()
            .filter(|n| matches!(n, Notification::DirtyChanged(_)))
            .count();
        assert_eq!(dirty_events, 1);
    }

    #[test]
    fn test_suppress_keeps_dirty_notification() {
        let mut ctl = controller();
        ctl.set_control(2, 0.7, Notify::Suppress).unwrap();
        assert_eq!(drain(&mut ctl), vec![Notification::DirtyChanged(true)]);
        assert_eq!(ctl.preset().controls().get_value(2).unwrap(), 0.7);
    }

    #[test]
    fn test_invalid_control_no_mutation() {
        let mut ctl = controller();
        assert_eq!(
            ctl.set_control(NUM_CONTROLS, 0.5, Notify::Trigger),
            Err(H9Error::InvalidControl(NUM_CONTROLS))
        );
        assert!(!ctl.is_dirty());
        assert!(drain(&mut ctl).is_empty());
    }

    #[test]
    fn test_expression_min_scenario() {
        let mut ctl = controller();
        ctl.set_control(0, 0.6, Notify::Trigger).unwrap();
        ctl.set_knobmode(KnobMode::ExpressionMin);
        drain(&mut ctl);

        ctl.set_control(0, 0.2, Notify::Trigger).unwrap();
        let events = drain(&mut ctl);
        assert_eq!(
            events,
            vec![Notification::ControlChanged { id: 0, current: 0.2, alternate: 1.0 }]
        );
        assert_eq!(ctl.preset().controls().get_knob_map(0).unwrap().exp_min, 0.2);

        ctl.set_knobmode(KnobMode::Normal);
        assert_eq!(ctl.preset().controls().get_value(0).unwrap(), 0.6);
        let shown = ctl.control_values()[0];
        assert_eq!(shown.current, 0.6);
        assert_close(shown.alternate, 0.2 + 0.6 * 0.8);
    }

    #[test]
    fn test_set_knobmode_announces_every_knob() {
        let mut ctl = controller();
        ctl.set_knob_map(4, 0.0, 1.0, 0.9).unwrap();
        drain(&mut ctl);

        ctl.set_knobmode(KnobMode::ParallelSwitch);
        let events = drain(&mut ctl);
        assert_eq!(events.len(), H9_NUM_KNOBS);
        assert_eq!(
            events[4],
            Notification::ControlChanged { id: 4, current: 0.9, alternate: 0.0 }
        );
        assert_eq!(ctl.knob_mode(), KnobMode::ParallelSwitch);
    }

    #[test]
    fn test_set_knob_map_rejects_non_knob() {
        let mut ctl = controller();
        assert_eq!(
            ctl.set_knob_map(EXPRESSION_CONTROL, 0.0, 1.0, 0.0),
            Err(H9Error::NotAKnob(EXPRESSION_CONTROL))
        );
        assert!(drain(&mut ctl).is_empty());
    }

    #[test]
    fn test_set_controls_all_or_nothing() {
        let mut ctl = controller();
        assert_eq!(
            ctl.set_controls(&[0.5; 3], Notify::Trigger),
            Err(H9Error::WrongLength { expected: NUM_CONTROLS, actual: 3 })
        );
        let mut values = [0.25; NUM_CONTROLS];
        values[7] = 1.5;
        assert_eq!(
            ctl.set_controls(&values, Notify::Trigger),
            Err(H9Error::ValueOutOfRange { id: 7, value: 1.5 })
        );
        assert!(ctl.preset().controls().values().iter().all(|v| *v == 0.0));

        values[7] = 1.0;
        ctl.set_controls(&values, Notify::Suppress).unwrap();
        assert_eq!(ctl.preset().controls().get_value(7).unwrap(), 1.0);
        assert_eq!(ctl.preset().controls().get_value(PEDAL_SWITCH_CONTROL).unwrap(), 0.25);
    }

    #[test]
    fn test_receive_cc() {
        let mut ctl = controller();
        assert_eq!(ctl.receive_cc(31, 127), Some(9));
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::ControlChanged { id: 9, current: 1.0, alternate: 1.0 },
                Notification::DirtyChanged(true),
            ]
        );
        assert_eq!(ctl.receive_cc(99, 10), None);
        assert!(drain(&mut ctl).is_empty());
    }

    #[test]
    fn test_receive_cc_ignores_knob_mode() {
        let mut ctl = controller();
        ctl.set_knobmode(KnobMode::ExpressionMax);
        ctl.receive_cc(22, 127).unwrap();
        assert_eq!(ctl.preset().controls().get_value(0).unwrap(), 1.0);
        assert_eq!(ctl.preset().controls().get_knob_map(0).unwrap(), KnobCurve::IDENTITY);
    }

    #[test]
    fn test_cc_round_trip_through_controller() {
        let mut ctl = controller();
        ctl.set_control(5, 0.33, Notify::Trigger).unwrap();
        let cc = drain(&mut ctl)
            .into_iter()
            .find_map(|n| match n {
                Notification::CcOut(out) => Some(out),
                _ => None,
            })
            .unwrap();
        assert_eq!(cc.cc, 27);

        let mut other = controller();
        other.receive_midi(&cc.to_bytes()).unwrap();
        let v = other.preset().controls().get_value(5).unwrap();
        assert!((v - 0.33).abs() <= 1.0 / 127.0);
    }

    #[test]
    fn test_receive_midi_channel_filter() {
        let mut ctl = controller();
        ctl.set_midi_channel(2).unwrap();
        drain(&mut ctl);

        ctl.receive_midi(&[0xB0, 22, 127]).unwrap();
        assert!(drain(&mut ctl).is_empty());

        ctl.receive_midi(&[0xB1, 22, 127]).unwrap();
        assert_eq!(drain(&mut ctl).len(), 2);

        ctl.receive_midi(&[0x91, 60, 100]).unwrap();
        assert!(drain(&mut ctl).is_empty());
    }

    #[test]
    fn test_load_batch_order() {
        let mut ctl = DeviceController::with_config(
            ControllerConfig::new().without_sync_on_load(),
            Vec::new(),
        )
        .unwrap();
        ctl.set_control(0, 0.9, Notify::Suppress).unwrap();
        drain(&mut ctl);

        let bytes = device_dump(|p| {
            p.set_name("Hall Pad").unwrap();
            p.select_module(Catalog::h9(), 3).unwrap();
            p.select_algorithm(Catalog::h9(), 7).unwrap();
            p.set_control(1, 0.5).unwrap();
        });
        ctl.receive_sysex_bytes(&bytes).unwrap();

        let space = Catalog::h9().module(3).unwrap();
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::PresetLoaded,
                Notification::ModuleChanged { index: 3, name: "Space" },
                Notification::AlgorithmListChanged(space.algorithm_names()),
                Notification::AlgorithmChanged { index: 7, name: "BlackHole" },
                Notification::PresetNameChanged("Hall Pad".to_string()),
                Notification::DirtyChanged(false),
            ]
        );
        assert!(!ctl.is_dirty());
        assert_eq!(ctl.preset().controls().get_value(0).unwrap(), 0.0);
    }

    #[test]
    fn test_load_syncs_controls() {
        let mut ctl = controller();
        let bytes = device_dump(|p| {
            p.set_control(2, 1.0).unwrap();
        });
        ctl.receive_sysex_bytes(&bytes).unwrap();
        let events = drain(&mut ctl);
        let controls: Vec<_> = events
            .iter()
            .filter(|n| matches!(n, Notification::ControlChanged { .. }))
            .collect();
        assert_eq!(controls.len(), NUM_CONTROLS);
        assert_eq!(
            *controls[2],
            Notification::ControlChanged { id: 2, current: 1.0, alternate: 1.0 }
        );
        assert!(!events.contains(&Notification::DirtyChanged(false)));
    }

    #[test]
    fn test_load_keeps_cc_maps() {
        let mut ctl = controller();
        ctl.set_cc_mapping(CcDirection::Receive, 0, CcMapping::Cc(70)).unwrap();
        ctl.receive_sysex_bytes(&device_dump(|_| {})).unwrap();
        assert_eq!(ctl.preset().midi().cc_rx().get(0).unwrap(), CcMapping::Cc(70));
    }

    #[test]
    fn test_bad_sysex_is_atomic() {
        let mut ctl = controller();
        ctl.set_control(1, 0.4, Notify::Suppress).unwrap();
        drain(&mut ctl);
        let before = ctl.preset().clone();

        let mut bytes = device_dump(|p| {
            p.set_control(1, 0.8).unwrap();
        });
        let n = bytes.len();
        bytes[n - 2] ^= 0x01;

        let err = ctl.receive_sysex_bytes(&bytes).unwrap_err();
        assert!(matches!(err, H9Error::Codec(CodecError::BadChecksum { .. })));
        assert_eq!(drain(&mut ctl), vec![Notification::Error(err)]);
        assert_eq!(*ctl.preset(), before);
    }

    #[test]
    fn test_value_dump_and_system_config() {
        let mut ctl = controller();
        let codec = SysexCodec::new(Catalog::h9());
        ctl.receive_midi(&codec.generate_value_dump(12, 345)).unwrap();
        let sysvars = crate::sysex::frame_message(0, crate::sysex::command::SYSVARS_DUMP, &[9, 8])
            .unwrap();
        ctl.receive_sysex_bytes(&sysvars).unwrap();
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::ConfigValue { address: 12, value: 345 },
                Notification::SystemConfig(vec![9, 8]),
            ]
        );
    }

    #[test]
    fn test_select_module() {
        let mut ctl = controller();
        ctl.select_algorithm(4).unwrap();
        drain(&mut ctl);

        ctl.select_module(2).unwrap();
        let pitch = Catalog::h9().module(2).unwrap();
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::ModuleChanged { index: 2, name: "PitchFactor" },
                Notification::AlgorithmListChanged(pitch.algorithm_names()),
                Notification::AlgorithmChanged { index: 0, name: "Diatonic" },
            ]
        );
        assert_eq!(ctl.preset().algorithm(), 0);
    }

    #[test]
    fn test_select_module_out_of_range() {
        let mut ctl = controller();
        let before = ctl.preset().clone();
        assert!(matches!(
            ctl.select_module(5),
            Err(H9Error::IndexOutOfRange { what: "Module", .. })
        ));
        assert_eq!(*ctl.preset(), before);
        assert!(drain(&mut ctl).is_empty());
    }

    #[test]
    fn test_select_algorithm_out_of_range() {
        let mut ctl = controller();
        assert!(ctl.select_algorithm(10).is_err());
        assert!(ctl.select_algorithm(9).is_ok());
        assert_eq!(ctl.preset().algorithm(), 9);
    }

    #[test]
    fn test_set_preset_name() {
        let mut ctl = controller();
        ctl.set_preset_name("Vox").unwrap();
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::PresetNameChanged("Vox".to_string()),
                Notification::DirtyChanged(true),
            ]
        );
        ctl.set_preset_name("Vox").unwrap();
        assert!(drain(&mut ctl).is_empty());
        assert!(ctl.set_preset_name("a name well over sixteen").is_err());
        assert_eq!(ctl.preset().name(), "Vox");
    }

    #[test]
    fn test_midi_config_changes() {
        let mut ctl = controller();
        ctl.set_midi_channel(10).unwrap();
        ctl.set_sysex_device_id(4).unwrap();
        assert!(ctl.set_midi_channel(17).is_err());
        assert!(ctl.set_sysex_device_id(17).is_err());
        assert_eq!(
            drain(&mut ctl),
            vec![
                Notification::MidiConfigChanged(MidiConfigChange::Channel(10)),
                Notification::MidiConfigChanged(MidiConfigChange::SysexId(4)),
            ]
        );
        assert!(!ctl.is_dirty());

        ctl.request_device_program();
        assert_eq!(
            drain(&mut ctl),
            vec![Notification::SysexOut(vec![0xF0, 0x1C, 0x70, 0x04, 0x4E, 0xF7])]
        );
    }

    #[test]
    fn test_cc_map_tokens_all_or_nothing() {
        let mut ctl = controller();
        let bad = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "100"];
        assert!(matches!(
            ctl.set_cc_map_tokens(CcDirection::Transmit, &bad),
            Err(H9Error::InvalidCc(_))
        ));
        assert_eq!(*ctl.preset().midi().cc_tx(), CcMap::h9_default());
        assert!(drain(&mut ctl).is_empty());

        let good = ["off", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];
        ctl.set_cc_map_tokens(CcDirection::Transmit, &good).unwrap();
        assert_eq!(ctl.preset().midi().cc_tx().get(0).unwrap(), CcMapping::Disabled);

        drain(&mut ctl);
        ctl.set_control(0, 1.0, Notify::Trigger).unwrap();
        assert!(!drain(&mut ctl).iter().any(|n| matches!(n, Notification::CcOut(_))));
    }

    #[test]
    fn test_set_cc_mapping_rejects_out_of_range_cc() {
        let mut ctl = controller();
        assert_eq!(
            ctl.set_cc_mapping(CcDirection::Transmit, 0, CcMapping::Cc(120)),
            Err(H9Error::InvalidCc("120".to_string()))
        );
        assert_eq!(*ctl.preset().midi().cc_tx(), CcMap::h9_default());
        assert!(drain(&mut ctl).is_empty());

        ctl.set_control(0, 1.0, Notify::Trigger).unwrap();
        let sent: Vec<u8> = drain(&mut ctl)
            .into_iter()
            .filter_map(|n| match n {
                Notification::CcOut(cc) => Some(cc.cc),
                _ => None,
            })
            .collect();
        assert_eq!(sent, vec![22]);
    }

    #[test]
    fn test_shared_sink_cannot_reenter() {
        use std::cell::{Cell, RefCell};
        use std::rc::{Rc, Weak};

        struct SharedSink {
            owner: Weak<RefCell<DeviceController<SharedSink>>>,
            blocked: Rc<Cell<usize>>,
        }

        impl NotificationSink for SharedSink {
            fn notify(&mut self, _notification: Notification) {
                if let Some(owner) = self.owner.upgrade() {
                    assert!(owner.try_borrow_mut().is_err());
                    self.blocked.set(self.blocked.get() + 1);
                }
            }
        }

        let blocked = Rc::new(Cell::new(0));
        let ctl = Rc::new_cyclic(|owner| {
            RefCell::new(DeviceController::new(SharedSink {
                owner: owner.clone(),
                blocked: Rc::clone(&blocked),
            }))
        });

        ctl.borrow_mut().set_control(0, 0.5, Notify::Trigger).unwrap();
        assert!(blocked.get() > 0);
        assert_eq!(ctl.borrow().preset().controls().get_value(0).unwrap(), 0.5);
    }

    #[test]
    fn test_cc_echo_disabled_by_config() {
        let mut ctl =
            DeviceController::with_config(ControllerConfig::new().without_cc_echo(), Vec::new())
                .unwrap();
        ctl.set_control(0, 1.0, Notify::Trigger).unwrap();
        assert!(!drain(&mut ctl).iter().any(|n| matches!(n, Notification::CcOut(_))));
    }

    #[test]
    fn test_with_config_validates() {
        assert!(matches!(
            DeviceController::with_config(
                ControllerConfig::new().with_midi_channel(0),
                Vec::<Notification>::new()
            ),
            Err(H9Error::InvalidMidiChannel(0))
        ));
        let ctl = DeviceController::with_config(
            ControllerConfig::new().with_midi_channel(7).with_sysex_device_id(3),
            Vec::<Notification>::new(),
        )
        .unwrap();
        assert_eq!(ctl.preset().midi().channel(), 7);
        assert_eq!(ctl.preset().midi().sysex_id(), 3);
    }

    #[test]
    fn test_device_requests() {
        let mut ctl = controller();
        ctl.request_device_config();
        ctl.read_config_var(5);
        ctl.write_config_var(5, 1);
        ctl.request_dump();
        let frames: Vec<Vec<u8>> = drain(&mut ctl)
            .into_iter()
            .filter_map(|n| match n {
                Notification::SysexOut(bytes) => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0][4], crate::sysex::command::SYSVARS_WANT);
        assert_eq!(frames[1][4], crate::sysex::command::VALUE_WANT);
        assert_eq!(frames[2][4], crate::sysex::command::VALUE_PUT);
        assert_eq!(frames[3], ctl.dump());
    }

    #[test]
    fn test_mark_clean() {
        let mut ctl = controller();
        ctl.set_control(0, 0.5, Notify::Suppress).unwrap();
        drain(&mut ctl);
        ctl.mark_clean();
        assert!(!ctl.is_dirty());
        assert_eq!(drain(&mut ctl), vec![Notification::DirtyChanged(false)]);
        ctl.mark_clean();
        assert!(drain(&mut ctl).is_empty());
    }

    #[test]
    fn test_dump_round_trip_into_second_controller() {
        let mut source = controller();
        source.select_module(4).unwrap();
        source.select_algorithm(3).unwrap();
        source.set_preset_name("Crush").unwrap();
        source.set_knob_map(1, 0.2, 0.7, 0.4).unwrap();
        source.set_control(1, 0.75, Notify::Trigger).unwrap();

        let mut target = controller();
        target.receive_sysex_bytes(&source.dump()).unwrap();
        let loaded = target.preset();
        assert_eq!(loaded.module(), 4);
        assert_eq!(loaded.algorithm(), 3);
        assert_eq!(loaded.name(), "Crush");
        let curve = loaded.controls().get_knob_map(1).unwrap();
        assert_close(curve.exp_min, 0.2);
        assert_close(curve.exp_max, 0.7);
        assert_close(curve.psw, 0.4);
        assert_close(loaded.controls().get_value(1).unwrap(), 0.75);
    }
}

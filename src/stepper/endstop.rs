//! Endstop sampling, debouncing, and block truncation.

use embedded_hal::digital::InputPin;
use serde::Deserialize;

use crate::config::EndstopConfig;
use crate::motion::{Axis, MotionBlock, NUM_AXIS};

/// Endstop switches, in status bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Endstop {
    /// X minimum.
    XMin = 0,
    /// Y minimum.
    YMin = 1,
    /// Z minimum.
    ZMin = 2,
    /// Z probe.
    ZProbe = 3,
    /// X maximum.
    XMax = 4,
    /// Y maximum.
    YMax = 5,
    /// Z maximum.
    ZMax = 6,
    /// Second Z minimum.
    Z2Min = 7,
    /// Second Z maximum.
    Z2Max = 8,
}

impl Endstop {
    /// All endstops in bit order.
    pub const ALL: [Endstop; 9] = [
        Endstop::XMin,
        Endstop::YMin,
        Endstop::ZMin,
        Endstop::ZProbe,
        Endstop::XMax,
        Endstop::YMax,
        Endstop::ZMax,
        Endstop::Z2Min,
        Endstop::Z2Max,
    ];

    #[inline]
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Endstop guarding `axis` in the given direction of travel.
    pub const fn for_axis(axis: Axis, negative: bool) -> Option<Endstop> {
        match (axis, negative) {
            (Axis::X, true) => Some(Endstop::XMin),
            (Axis::X, false) => Some(Endstop::XMax),
            (Axis::Y, true) => Some(Endstop::YMin),
            (Axis::Y, false) => Some(Endstop::YMax),
            (Axis::Z, true) => Some(Endstop::ZMin),
            (Axis::Z, false) => Some(Endstop::ZMax),
            (Axis::E, _) => None,
        }
    }
}

/// Reads endstop switches.
pub trait EndstopSource {
    /// Switch is installed.
    fn is_fitted(&self, endstop: Endstop) -> bool;

    /// Switch is currently triggered (polarity already applied).
    fn read(&mut self, endstop: Endstop) -> bool;
}

/// No switches fitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEndstops;

impl EndstopSource for NoEndstops {
    fn is_fitted(&self, _endstop: Endstop) -> bool {
        false
    }

    fn read(&mut self, _endstop: Endstop) -> bool {
        false
    }
}

/// Endstop switches on embedded-hal input pins.
pub struct PinEndstops<P: InputPin> {
    pins: [Option<(P, bool)>; 9],
    inverting: [bool; 9],
}

impl<P: InputPin> PinEndstops<P> {
    /// Switch set with polarity taken from the configuration; attach pins next.
    pub fn new(config: &EndstopConfig) -> Self {
        let mut inverting = [false; 9];
        for switch in config.switches.iter() {
            inverting[switch.endstop as usize] = switch.inverting;
        }
        Self {
            pins: core::array::from_fn(|_| None),
            inverting,
        }
    }

    /// Attach the pin for one switch.
    pub fn attach(mut self, endstop: Endstop, pin: P) -> Self {
        let index = endstop as usize;
        self.pins[index] = Some((pin, self.inverting[index]));
        self
    }
}

impl<P: InputPin> EndstopSource for PinEndstops<P> {
    fn is_fitted(&self, endstop: Endstop) -> bool {
        self.pins[endstop as usize].is_some()
    }

    fn read(&mut self, endstop: Endstop) -> bool {
        match self.pins[endstop as usize].as_mut() {
            // An unreadable switch counts as open.
            Some((pin, inverting)) => pin.is_high().map(|high| high != *inverting).unwrap_or(false),
            None => false,
        }
    }
}

/// Axes whose endstops fired, as latched for the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndstopHits(u8);

impl EndstopHits {
    /// X endstop.
    pub const X: Self = Self(1 << 0);
    /// Y endstop.
    pub const Y: Self = Self(1 << 1);
    /// Z endstop (either Z switch).
    pub const Z: Self = Self(1 << 2);
    /// Z probe.
    pub const PROBE: Self = Self(1 << 3);

    /// No hits.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when nothing fired.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when all bits of `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    fn for_axis(axis: Axis) -> Self {
        match axis {
            Axis::X => Self::X,
            Axis::Y => Self::Y,
            _ => Self::Z,
        }
    }
}

/// Latched endstop report, consumed by [`EndstopMonitor::take_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndstopReport {
    /// Which endstops fired.
    pub hits: EndstopHits,
    /// Step position of X, Y, Z when their endstop fired.
    pub trigsteps: [i32; 3],
}

impl EndstopReport {
    /// Trigger position of an axis, if its endstop fired.
    pub fn trigger_steps(&self, axis: Axis) -> Option<i32> {
        let hit = match axis {
            Axis::X => self.hits.contains(EndstopHits::X),
            Axis::Y => self.hits.contains(EndstopHits::Y),
            Axis::Z => {
                self.hits.contains(EndstopHits::Z) || self.hits.contains(EndstopHits::PROBE)
            }
            Axis::E => false,
        };
        hit.then(|| self.trigsteps[axis.index()])
    }
}

/// Outcome of one endstop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndstopCheck {
    /// Terminate the current block.
    pub truncate: bool,
    /// Do not pulse the first Z motor this interrupt.
    pub hold_z: bool,
    /// Do not pulse the second Z motor this interrupt.
    pub hold_z2: bool,
}

/// Debounced endstop state machine.
///
/// A switch triggers only when it reads active on two consecutive interrupts while
/// its axis moves toward it. Only the switch in the direction of travel is sampled.
pub struct EndstopMonitor<E: EndstopSource> {
    source: E,
    enabled: bool,
    probe_enabled: bool,
    dual_z: bool,
    homing: bool,
    z_locked: bool,
    z2_locked: bool,
    old_bits: u16,
    current_bits: u16,
    hits: EndstopHits,
    trigsteps: [i32; 3],
}

impl<E: EndstopSource> EndstopMonitor<E> {
    /// Monitor reading `source`.
    pub fn new(source: E, config: &EndstopConfig) -> Self {
        Self {
            source,
            enabled: config.check_on_start,
            probe_enabled: false,
            dual_z: config.dual_z,
            homing: false,
            z_locked: false,
            z2_locked: false,
            old_bits: 0,
            current_bits: 0,
            hits: EndstopHits::empty(),
            trigsteps: [0; 3],
        }
    }

    /// Checking is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn endstop checking on or off. Re-enabling forgets stale samples.
    pub fn enable(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.old_bits = 0;
        }
        self.enabled = enabled;
    }

    /// Turn the Z probe on or off.
    pub fn enable_probe(&mut self, enabled: bool) {
        self.probe_enabled = enabled;
    }

    /// Homing changes dual-Z handling: each motor stops on its own switch.
    pub fn set_homing(&mut self, homing: bool) {
        self.homing = homing;
    }

    /// Hold the first Z motor during homing.
    pub fn lock_z(&mut self, locked: bool) {
        self.z_locked = locked;
    }

    /// Hold the second Z motor during homing.
    pub fn lock_z2(&mut self, locked: bool) {
        self.z2_locked = locked;
    }

    /// Latched hits, without consuming them.
    pub fn hits(&self) -> EndstopHits {
        self.hits
    }

    /// Return and clear the latched report.
    pub fn take_report(&mut self) -> Option<EndstopReport> {
        if self.hits.is_empty() {
            return None;
        }
        let report = EndstopReport {
            hits: self.hits,
            trigsteps: self.trigsteps,
        };
        self.hits = EndstopHits::empty();
        Some(report)
    }

    /// Clear the latched report after an intentional hit.
    pub fn clear_hits(&mut self) {
        self.hits = EndstopHits::empty();
    }

    /// The wrapped source.
    pub fn source_mut(&mut self) -> &mut E {
        &mut self.source
    }

    fn sample(&mut self, endstop: Endstop) -> bool {
        if !self.source.is_fitted(endstop) {
            return false;
        }
        let active = self.source.read(endstop);
        if active {
            self.current_bits |= endstop.bit();
        }
        active
    }

    #[inline]
    fn confirmed(&self, endstop: Endstop) -> bool {
        self.current_bits & self.old_bits & endstop.bit() != 0
    }

    fn latch(&mut self, axis: Axis, hit: EndstopHits, position: &[i32; NUM_AXIS]) {
        self.trigsteps[axis.index()] = position[axis.index()];
        self.hits.insert(hit);
        log::debug!("endstop hit on {:?} at {}", axis, position[axis.index()]);
    }

    /// Sample the switches relevant to `block` and apply the trigger policy.
    pub fn update(&mut self, block: &MotionBlock, position: &[i32; NUM_AXIS]) -> EndstopCheck {
        let mut check = EndstopCheck::default();
        self.current_bits = 0;

        for axis in [Axis::X, Axis::Y] {
            let negative = block.direction_bits.is_negative(axis);
            if let Some(endstop) = Endstop::for_axis(axis, negative) {
                self.sample(endstop);
                if self.confirmed(endstop) && block.steps(axis) > 0 {
                    self.latch(axis, EndstopHits::for_axis(axis), position);
                    check.truncate = true;
                }
            }
        }

        let z_negative = block.direction_bits.is_negative(Axis::Z);
        self.update_z(block, position, z_negative, &mut check);

        if z_negative && self.probe_enabled {
            self.sample(Endstop::ZProbe);
            if self.confirmed(Endstop::ZProbe) && block.steps(Axis::Z) > 0 {
                self.latch(Axis::Z, EndstopHits::PROBE, position);
                check.truncate = true;
            }
        }

        self.old_bits = self.current_bits;
        check
    }

    fn update_z(
        &mut self,
        block: &MotionBlock,
        position: &[i32; NUM_AXIS],
        negative: bool,
        check: &mut EndstopCheck,
    ) {
        let (z, z2) = if negative {
            (Endstop::ZMin, Endstop::Z2Min)
        } else {
            (Endstop::ZMax, Endstop::Z2Max)
        };

        if !self.dual_z {
            self.sample(z);
            if self.confirmed(z) && block.steps(Axis::Z) > 0 {
                self.latch(Axis::Z, EndstopHits::Z, position);
                check.truncate = true;
            }
            return;
        }

        let z_active = self.sample(z);
        if !self.source.is_fitted(z2) && z_active {
            self.current_bits |= z2.bit();
        } else {
            self.sample(z2);
        }

        // bit 0: first switch, bit 1: second switch
        let z_test = u8::from(self.confirmed(z)) | (u8::from(self.confirmed(z2)) << 1);

        if z_test != 0 && block.steps(Axis::Z) > 0 {
            self.latch(Axis::Z, EndstopHits::Z, position);
            if !self.homing || z_test == 0b11 {
                check.truncate = true;
            }
        }

        if self.homing {
            check.hold_z = self.current_bits & z.bit() != 0 || self.z_locked;
            check.hold_z2 = self.current_bits & z2.bit() != 0 || self.z2_locked;
        }
    }
}

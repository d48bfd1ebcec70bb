//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Declared value domains and per-field step sizes."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
//! Declared domains and step sizes for every simulated field.
//!
//! A [`FieldProfile`] couples the inclusive bounds of a field with the spread
//! of its random-walk offset and the decrement applied per ramp tick.

use std::ops::RangeInclusive;

use crate::machine::MachineKind;

/// Inclusive value domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: Copy + PartialOrd> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldProfile<T> {
    pub bounds: Bounds<T>,
    /// Symmetric random-walk offset: each tick moves by at most `±walk_spread`.
    pub walk_spread: T,
    /// Decrement per ramp tick during an emergency stop.
    pub ramp_step: T,
}

impl<T> FieldProfile<T> {
    pub const fn new(bounds: Bounds<T>, walk_spread: T, ramp_step: T) -> Self {
        Self {
            bounds,
            walk_spread,
            ramp_step,
        }
    }
}

/// Profiles for the fields every machine carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreProfile {
    pub temperature: FieldProfile<i32>,
    /// RPM for conveyors, fuel flow (L/h) for boilers.
    pub rate: FieldProfile<i32>,
}

pub const CONVEYOR_CORE: CoreProfile = CoreProfile {
    temperature: FieldProfile::new(Bounds::new(0, 120), 2, 2),
    rate: FieldProfile::new(Bounds::new(0, 2000), 10, 50),
};

pub const BOILER_CORE: CoreProfile = CoreProfile {
    temperature: FieldProfile::new(Bounds::new(0, 200), 2, 2),
    rate: FieldProfile::new(Bounds::new(0, 50), 1, 1),
};

impl MachineKind {
    pub fn core_profile(self) -> &'static CoreProfile {
        match self {
            MachineKind::Conveyor => &CONVEYOR_CORE,
            MachineKind::Boiler => &BOILER_CORE,
        }
    }
}

pub mod conveyor {
    use super::{Bounds, FieldProfile};

    pub const LOAD_CAPACITY: FieldProfile<i32> = FieldProfile::new(Bounds::new(0, 100), 5, 5);
    pub const BELT_TENSION: FieldProfile<i32> = FieldProfile::new(Bounds::new(0, 400), 20, 20);
    pub const VIBRATION: FieldProfile<f64> = FieldProfile::new(Bounds::new(0.0, 3.0), 0.5, 0.5);
    /// Hours added to the operating-time counter per random-walk tick.
    pub const OPERATING_TIME_STEP: u32 = 2;
}

pub mod boiler {
    use super::{Bounds, FieldProfile, RangeInclusive};

    pub const PRESSURE: FieldProfile<i32> = FieldProfile::new(Bounds::new(0, 20), 1, 1);
    pub const WATER_LEVEL: FieldProfile<i32> = FieldProfile::new(Bounds::new(0, 100), 2, 2);
    pub const HEAT_OUTPUT: FieldProfile<i32> = FieldProfile::new(Bounds::new(0, 1000), 10, 10);
    pub const CO2_EMISSION: FieldProfile<i32> = FieldProfile::new(Bounds::new(0, 500), 10, 10);
    /// Elapsed hours reported by a rerolled maintenance note.
    pub const MAINTENANCE_HOURS: RangeInclusive<u32> = 10..=30;

    pub fn maintenance_note(hours: u32) -> String {
        format!("Last done {} hours ago", hours)
    }
}

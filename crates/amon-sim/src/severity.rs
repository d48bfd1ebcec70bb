//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Operator-facing severity bands for live readings."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use serde::Serialize;

use crate::machine::{MachineKind, MachineRecord};

pub const SAFE_TEMPERATURE: i32 = 100;
pub const SAFE_SPEED: i32 = 1500;
/// Width of the band above the safe limit that is still only elevated.
pub const ELEVATED_MARGIN: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Elevated,
    Critical,
    /// The machine is off; readings are informational only.
    Inactive,
}

impl Severity {
    pub fn classify(value: i32, safe_limit: i32) -> Self {
        if value < safe_limit {
            Severity::Normal
        } else if value <= safe_limit + ELEVATED_MARGIN {
            Severity::Elevated
        } else {
            Severity::Critical
        }
    }

    pub fn temperature(record: &MachineRecord) -> Self {
        if !record.is_on() {
            return Severity::Inactive;
        }
        Self::classify(record.temperature, SAFE_TEMPERATURE)
    }

    /// Conveyor speed is banded; boiler fuel flow has no advisory limit.
    pub fn rate(record: &MachineRecord) -> Self {
        if !record.is_on() {
            return Severity::Inactive;
        }
        match record.kind() {
            MachineKind::Conveyor => Self::classify(record.rate, SAFE_SPEED),
            MachineKind::Boiler => Severity::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineStatus;
    use crate::seed::default_fleet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn bands_follow_safe_limit_and_margin() {
        assert_eq!(Severity::classify(99, 100), Severity::Normal);
        assert_eq!(Severity::classify(100, 100), Severity::Elevated);
        assert_eq!(Severity::classify(115, 100), Severity::Elevated);
        assert_eq!(Severity::classify(116, 100), Severity::Critical);
    }

    #[test]
    fn off_machines_are_inactive() {
        let mut rng = StdRng::seed_from_u64(5);
        let fleet = default_fleet(&mut rng);
        assert_eq!(fleet[1].status, MachineStatus::Off);
        assert_eq!(Severity::temperature(&fleet[1]), Severity::Inactive);
        assert_eq!(Severity::rate(&fleet[1]), Severity::Inactive);
        assert_eq!(Severity::temperature(&fleet[0]), Severity::Normal);
        assert_eq!(Severity::temperature(&fleet[2]), Severity::Elevated);
        assert_eq!(Severity::rate(&fleet[2]), Severity::Normal);
    }
}

//! Measurement units and unit families.
//!
//! A `Measure` type carries one unit. Two measures are compatible when their
//! units belong to the same family; the family's base unit is what a
//! unified measure is expressed in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of interconvertible units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    Temperature,
    Mass,
    Length,
    Time,
    Speed,
    Pressure,
    Energy,
    ByteSize,
    Power,
    Volume,
}

/// Unit table: (unit, family). The first unit listed for a family is its base.
const UNITS: &[(&str, UnitFamily)] = &[
    ("C", UnitFamily::Temperature),
    ("F", UnitFamily::Temperature),
    ("K", UnitFamily::Temperature),
    ("kg", UnitFamily::Mass),
    ("g", UnitFamily::Mass),
    ("lb", UnitFamily::Mass),
    ("oz", UnitFamily::Mass),
    ("m", UnitFamily::Length),
    ("km", UnitFamily::Length),
    ("mm", UnitFamily::Length),
    ("cm", UnitFamily::Length),
    ("mi", UnitFamily::Length),
    ("in", UnitFamily::Length),
    ("ft", UnitFamily::Length),
    ("ms", UnitFamily::Time),
    ("s", UnitFamily::Time),
    ("min", UnitFamily::Time),
    ("h", UnitFamily::Time),
    ("day", UnitFamily::Time),
    ("week", UnitFamily::Time),
    ("mon", UnitFamily::Time),
    ("year", UnitFamily::Time),
    ("mps", UnitFamily::Speed),
    ("kmph", UnitFamily::Speed),
    ("mph", UnitFamily::Speed),
    ("Pa", UnitFamily::Pressure),
    ("bar", UnitFamily::Pressure),
    ("psi", UnitFamily::Pressure),
    ("mmHg", UnitFamily::Pressure),
    ("inHg", UnitFamily::Pressure),
    ("atm", UnitFamily::Pressure),
    ("kcal", UnitFamily::Energy),
    ("kJ", UnitFamily::Energy),
    ("byte", UnitFamily::ByteSize),
    ("KB", UnitFamily::ByteSize),
    ("KiB", UnitFamily::ByteSize),
    ("MB", UnitFamily::ByteSize),
    ("MiB", UnitFamily::ByteSize),
    ("GB", UnitFamily::ByteSize),
    ("GiB", UnitFamily::ByteSize),
    ("TB", UnitFamily::ByteSize),
    ("TiB", UnitFamily::ByteSize),
    ("W", UnitFamily::Power),
    ("kW", UnitFamily::Power),
    ("m3", UnitFamily::Volume),
    ("l", UnitFamily::Volume),
    ("dl", UnitFamily::Volume),
    ("ml", UnitFamily::Volume),
    ("floz", UnitFamily::Volume),
    ("gal", UnitFamily::Volume),
];

/// Look up the family of a unit. Unit names are case-sensitive (`mm` vs `Mm`).
pub fn unit_family(unit: &str) -> Option<UnitFamily> {
    UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, family)| *family)
}

/// Base unit of the family `unit` belongs to.
pub fn base_unit(unit: &str) -> Option<&'static str> {
    unit_family(unit).map(UnitFamily::base_unit)
}

/// Check whether a string names a known unit.
pub fn is_unit(unit: &str) -> bool {
    unit_family(unit).is_some()
}

impl UnitFamily {
    /// The unit measures of this family are unified to.
    pub fn base_unit(self) -> &'static str {
        UNITS
            .iter()
            .find(|(_, family)| *family == self)
            .map(|(name, _)| *name)
            .unwrap_or("")
    }
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitFamily::Temperature => "temperature",
            UnitFamily::Mass => "mass",
            UnitFamily::Length => "length",
            UnitFamily::Time => "time",
            UnitFamily::Speed => "speed",
            UnitFamily::Pressure => "pressure",
            UnitFamily::Energy => "energy",
            UnitFamily::ByteSize => "byte size",
            UnitFamily::Power => "power",
            UnitFamily::Volume => "volume",
        };
        f.write_str(name)
    }
}

//! Millimeter, dot and point conversions.
//!
//! Every function takes the resolution explicitly. Results are clamped at
//! zero rather than rejected, so a slightly negative position produced by a
//! drag past the label edge still lands on the first dot.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{MM_PER_INCH, POINTS_PER_INCH};

/// Convert millimeters to printer dots.
pub fn mm_to_dots(mm: f64, dpi: u32) -> i32 {
    to_dots(mm, MM_PER_INCH, dpi)
}

/// Convert printer dots to millimeters.
pub fn dots_to_mm(dots: i32, dpi: u32) -> f64 {
    from_dots(dots, MM_PER_INCH, dpi)
}

/// Convert typographic points (1/72 inch) to printer dots.
pub fn points_to_dots(points: f64, dpi: u32) -> i32 {
    to_dots(points, POINTS_PER_INCH, dpi)
}

pub fn dots_to_points(dots: i32, dpi: u32) -> f64 {
    from_dots(dots, POINTS_PER_INCH, dpi)
}

fn to_dots(value: f64, per_inch: f64, dpi: u32) -> i32 {
    let dots = (value * f64::from(dpi) / per_inch).round_ties_even();
    if dots.is_nan() || dots <= 0.0 {
        0
    } else if dots >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        dots as i32
    }
}

fn from_dots(dots: i32, per_inch: f64, dpi: u32) -> f64 {
    if dpi == 0 {
        return 0.0;
    }
    (f64::from(dots) * per_inch / f64::from(dpi)).max(0.0)
}

/// Unit the editor displays measurements in.
///
/// Stored in templates as `display_unit`; the generator always works in
/// millimeters and dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DisplayUnit {
    #[default]
    Millimeters,
    Inches,
    Dots,
}

impl DisplayUnit {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Some(Self::Millimeters),
            "in" | "inch" | "inches" => Some(Self::Inches),
            "dots" | "dot" | "px" => Some(Self::Dots),
            _ => None,
        }
    }

    /// Parse a unit name, falling back to millimeters for unknown names.
    pub fn parse_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown display unit {:?}, using millimeters", name);
            Self::Millimeters
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Millimeters => "mm",
            Self::Inches => "in",
            Self::Dots => "dots",
        }
    }

    /// Convert a value expressed in this unit to millimeters.
    pub fn to_mm(&self, value: f64, dpi: u32) -> f64 {
        match self {
            Self::Millimeters => value,
            Self::Inches => value * MM_PER_INCH,
            Self::Dots => {
                if dpi == 0 {
                    0.0
                } else {
                    value * MM_PER_INCH / f64::from(dpi)
                }
            }
        }
    }

    /// Convert millimeters to a value in this unit.
    pub fn from_mm(&self, mm: f64, dpi: u32) -> f64 {
        match self {
            Self::Millimeters => mm,
            Self::Inches => mm / MM_PER_INCH,
            Self::Dots => mm * f64::from(dpi) / MM_PER_INCH,
        }
    }
}

impl From<String> for DisplayUnit {
    fn from(name: String) -> Self {
        Self::parse_or_default(&name)
    }
}

impl From<DisplayUnit> for String {
    fn from(unit: DisplayUnit) -> Self {
        unit.name().to_string()
    }
}

//! Compiled-in constants for the supported stage hardware.
//!
//! The DDS100 is a 100 mm direct-drive stage sold with the KBD101 K-Cube
//! controller. The driver refuses to talk to anything else, so the
//! calibration table has exactly one row.

/// Model number of the supported controller, NUL padded to the 8-byte
/// field width of the hardware info reply.
pub const SUPPORTED_MODEL: [u8; 8] = *b"KBD101\0\0";

/// Firmware version this driver was validated against.
pub const SUPPORTED_FIRMWARE: u32 = 131_080;

/// Conversion and travel constants of one stage model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Encoder counts per millimeter of travel.
    pub counts_per_mm: i32,
    /// Bias added to absolute targets so that position 0 mm does not sit
    /// at encoder count 0. Relative moves are not biased.
    pub zero_offset_mm: f64,
    /// Lower end of the travel in millimeters.
    pub position_min_mm: f64,
    /// Upper end of the travel in millimeters.
    pub position_max_mm: f64,
    /// Slack beyond the travel ends absorbing conversion rounding.
    pub range_tol_mm: f64,
}

/// Calibration of the DDS100 stage.
pub const DDS100: Calibration = Calibration {
    counts_per_mm: 2000,
    zero_offset_mm: 0.05,
    position_min_mm: 0.0,
    position_max_mm: 100.0,
    range_tol_mm: 0.1,
};

impl Calibration {
    /// Nearest encoder count for a millimeter value.
    pub fn mm_to_counts(&self, mm: f64) -> i32 {
        (mm * self.counts_per_mm as f64).round() as i32
    }

    /// Millimeter value of an encoder count.
    pub fn counts_to_mm(&self, counts: i32) -> f64 {
        counts as f64 / self.counts_per_mm as f64
    }

    /// Snap a millimeter value to the nearest one the encoder can address.
    pub fn legalize_mm(&self, mm: f64) -> f64 {
        self.counts_to_mm(self.mm_to_counts(mm))
    }

    /// The zero offset expressed in encoder counts.
    pub fn offset_counts(&self) -> i32 {
        self.mm_to_counts(self.zero_offset_mm)
    }

    /// Whether a target lies inside the travel, rounding tolerance included.
    pub fn within_travel(&self, mm: f64) -> bool {
        mm >= self.position_min_mm - self.range_tol_mm
            && mm <= self.position_max_mm + self.range_tol_mm
    }
}

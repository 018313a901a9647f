//! Device identifiers and the logical-to-platform translation.
//!
//! The host names endpoints with [`LogicalDevice`] values; the platform backend
//! only understands [`PlatformDevice`] values. [`DeviceIdTranslator`] sits in
//! between and applies the digital-output and USB headset policies.

mod logical;
mod platform;
mod translator;

pub use logical::LogicalDevice;
pub use platform::PlatformDevice;
pub use translator::DeviceIdTranslator;

use std::collections::BTreeSet;

/// A set of logical devices a stream is routed to.
///
/// Iteration order is the enum order, which keeps translation deterministic.
pub type DeviceSet = BTreeSet<LogicalDevice>;

/// Whether a device produces or consumes audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Playback towards the device.
    Output,
    /// Capture from the device.
    Input,
}

/// Controller and stream index of the connected digital (HDMI / DP) output.
///
/// Set by digital device-connect notifications and read whenever a digital
/// output is translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitalOutputSelection {
    /// Display controller index (`-1` when the host did not say).
    pub controller: i32,
    /// Stream index on that controller (`-1` when the host did not say).
    pub stream: i32,
}

impl DigitalOutputSelection {
    /// Creates a selection from a controller/stream pair.
    pub fn new(controller: i32, stream: i32) -> Self {
        Self { controller, stream }
    }

    /// Returns `true` when the alternate digital device must be used.
    pub fn selects_alternate(&self, max_streams_per_controller: i32) -> bool {
        self.controller
            .wrapping_mul(max_streams_per_controller)
            .wrapping_add(self.stream)
            != 0
    }
}

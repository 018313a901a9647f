//! Configuration for the routing core.

/// Largest number of source or sink ports in one patch.
pub const DEFAULT_MAX_PATCH_PORTS: usize = 16;

/// Tunables for a [`HalModule`](crate::HalModule).
///
/// Use [`HalConfig::default()`] for the platform defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use hal_route::HalConfig;
///
/// let config = HalConfig {
///     max_streams_per_controller: 4,
///     ..Default::default()
/// };
/// assert_eq!(config.max_patch_ports, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalConfig {
    /// Maximum number of sources and of sinks accepted in one patch.
    ///
    /// Default: 16
    pub max_patch_ports: usize,

    /// Streams per display controller, used to pick the alternate digital
    /// output device.
    ///
    /// Default: 2
    pub max_streams_per_controller: i32,

    /// Highest capture sample rate suggested back to the host when an input
    /// format is refused.
    ///
    /// Default: 48000
    pub max_capture_sample_rate: u32,

    /// Capture buffer size reported to the host, in bytes.
    ///
    /// Default: 960 frames of 16-bit stereo (3840)
    pub input_buffer_size: usize,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            max_patch_ports: DEFAULT_MAX_PATCH_PORTS,
            max_streams_per_controller: 2,
            max_capture_sample_rate: 48000,
            input_buffer_size: 960 * 4,
        }
    }
}

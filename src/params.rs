//! Typed host parameters.
//!
//! Hosts that speak `key=value;...` strings parse them before calling
//! [`HalDevice::set_parameters()`](crate::HalDevice::set_parameters); replies
//! can be rendered back with [`ParameterReply::to_kv_string()`].

use crate::backend::{DeviceAddress, TwsChannelMode};
use crate::device::LogicalDevice;

/// Reply key for [`ParameterQuery::A2dpReconfigSupported`].
pub const KEY_A2DP_RECONFIG_SUPPORTED: &str = "isReconfigA2dpSupported";

/// One parameter the host sets.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterUpdate {
    /// Display on/off.
    ScreenState {
        /// `true` when the screen is on.
        on: bool,
    },
    /// A device was plugged in.
    DeviceConnect {
        /// The logical device.
        device: LogicalDevice,
        /// USB card/device or digital controller/stream.
        address: DeviceAddress,
    },
    /// A device was unplugged.
    DeviceDisconnect {
        /// The logical device.
        device: LogicalDevice,
        /// USB card/device or digital controller/stream.
        address: DeviceAddress,
    },
    /// Physical orientation in degrees.
    Rotation {
        /// 0, 90, 180 or 270.
        degrees: i32,
    },
    /// Bluetooth SCO on/off.
    BtSco {
        /// `true` when SCO is up.
        on: bool,
    },
    /// Bluetooth SCO wideband speech.
    BtScoWideband {
        /// `true` when wideband is enabled.
        on: bool,
    },
    /// Bluetooth SCO super-wideband speech mode.
    BtScoSuperWideband {
        /// Codec mode.
        mode: i32,
    },
    /// Reconfigure A2DP.
    A2dpReconfigure,
    /// A2DP suspended or resumed.
    A2dpSuspended {
        /// `true` when suspended.
        suspended: bool,
    },
    /// TWS channel layout.
    TwsChannelMode(TwsChannelMode),
}

impl ParameterUpdate {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScreenState { .. } => "screen_state",
            Self::DeviceConnect { .. } => "connect",
            Self::DeviceDisconnect { .. } => "disconnect",
            Self::Rotation { .. } => "rotation",
            Self::BtSco { .. } => "BT_SCO",
            Self::BtScoWideband { .. } => "bt_wbs",
            Self::BtScoSuperWideband { .. } => "bt_swb",
            Self::A2dpReconfigure => "reconfigA2dp",
            Self::A2dpSuspended { .. } => "A2dpSuspended",
            Self::TwsChannelMode(_) => "TwsChannelConfig",
        }
    }
}

/// A value the host asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterQuery {
    /// Whether the A2DP sink supports reconfiguration.
    A2dpReconfigSupported,
}

/// Answers to a set of [`ParameterQuery`] values.
///
/// Queries the backend could not answer are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterReply {
    entries: Vec<(String, String)>,
}

impl ParameterReply {
    /// Creates an empty reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an integer entry, replacing an existing one with the same key.
    pub fn insert_int(&mut self, key: &str, value: i64) {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Looks up an entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if nothing was answered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the reply as `key=value;key=value`.
    pub fn to_kv_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_rendering() {
        let mut reply = ParameterReply::new();
        assert_eq!(reply.to_kv_string(), "");

        reply.insert_int(KEY_A2DP_RECONFIG_SUPPORTED, 1);
        reply.insert_int("other", 7);
        assert_eq!(reply.to_kv_string(), "isReconfigA2dpSupported=1;other=7");
    }

    #[test]
    fn test_reply_insert_replaces() {
        let mut reply = ParameterReply::new();
        reply.insert_int(KEY_A2DP_RECONFIG_SUPPORTED, 1);
        reply.insert_int(KEY_A2DP_RECONFIG_SUPPORTED, 0);
        assert_eq!(reply.get(KEY_A2DP_RECONFIG_SUPPORTED), Some("0"));
        assert_eq!(reply.to_kv_string(), "isReconfigA2dpSupported=0");
    }

    #[test]
    fn test_update_names() {
        assert_eq!(ParameterUpdate::Rotation { degrees: 90 }.name(), "rotation");
        assert_eq!(ParameterUpdate::A2dpReconfigure.name(), "reconfigA2dp");
    }
}

//! Device-side state shared by the command handlers.

use crate::settings::{DeviceConfig, SettingsStore};
use crate::stack::ControllerStack;
use crate::types::{ResetReason, SharedNodeIdWidth};

/// The controller behind the serial link.
///
/// Owns the radio stack and settings collaborators together with the
/// configuration loaded at boot and the runtime flags the host can change.
pub struct Device {
    /// Configuration loaded at boot.
    pub config: DeviceConfig,
    /// Radio protocol stack.
    pub stack: Box<dyn ControllerStack>,
    /// Persisted settings.
    pub settings: Box<dyn SettingsStore>,
    /// Node-ID width used by every builder.
    pub node_id_width: SharedNodeIdWidth,
    /// Append tx status reports to send-data callbacks.
    pub tx_status_report: bool,
    /// Why the chip last reset.
    pub reset_reason: ResetReason,
    /// Watchdog is running.
    pub watchdog_started: bool,
}

impl Device {
    /// Boots the device: loads the configuration from `settings` and
    /// publishes its node-ID width.
    #[must_use]
    pub fn boot(
        stack: Box<dyn ControllerStack>,
        mut settings: Box<dyn SettingsStore>,
        defaults: DeviceConfig,
    ) -> Self {
        let config = DeviceConfig::load(settings.as_mut(), defaults, stack.manufacturing_region());
        tracing::info!(
            "device configured: region={:?} node_id_width={:?}",
            config.radio.region,
            config.node_id_width
        );
        let node_id_width = SharedNodeIdWidth::new(config.node_id_width);
        Self {
            config,
            stack,
            settings,
            node_id_width,
            tx_status_report: false,
            reset_reason: ResetReason::default(),
            watchdog_started: false,
        }
    }

    /// Sets the reported reset reason.
    #[must_use]
    pub const fn with_reset_reason(mut self, reason: ResetReason) -> Self {
        self.reset_reason = reason;
        self
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("node_id_width", &self.node_id_width.get())
            .field("tx_status_report", &self.tx_status_report)
            .field("reset_reason", &self.reset_reason)
            .field("watchdog_started", &self.watchdog_started)
            .finish_non_exhaustive()
    }
}

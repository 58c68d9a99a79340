//! Persisted device configuration.
//!
//! The bridge does not own a storage format. It reads and writes individual
//! settings through [`SettingsStore`]; every read may fail and callers fall
//! back to defaults. [`MemorySettings`] keeps everything in memory.

use crate::error::SettingsError;
use crate::types::{
    ApplicationSettings, CommandClassLists, NodeIdWidth, RadioConfig, RfRegion, TxPower,
};

/// Key-value access to persisted settings.
pub trait SettingsStore: Send {
    /// True when the store has been written before this boot.
    fn is_initialized(&self) -> bool;

    /// Reads the application node information.
    fn read_application_settings(&self) -> Result<ApplicationSettings, SettingsError>;
    /// Saves the application node information.
    fn save_application_settings(
        &mut self,
        settings: &ApplicationSettings,
    ) -> Result<(), SettingsError>;

    /// Reads the advertised command class lists.
    fn read_command_classes(&self) -> Result<CommandClassLists, SettingsError>;

    /// Reads the RF region.
    fn read_rf_region(&self) -> Result<RfRegion, SettingsError>;
    /// Saves the RF region.
    fn save_rf_region(&mut self, region: RfRegion) -> Result<(), SettingsError>;

    /// Reads the normal tx power level and the measured 0 dBm output.
    fn read_tx_power(&self) -> Result<(TxPower, TxPower), SettingsError>;
    /// Saves the normal tx power level and the measured 0 dBm output.
    fn save_tx_power(&mut self, level: TxPower, adjust: TxPower) -> Result<(), SettingsError>;

    /// Reads the maximum Long Range tx power.
    fn read_max_lr_tx_power(&self) -> Result<TxPower, SettingsError>;
    /// Saves the maximum Long Range tx power.
    fn save_max_lr_tx_power(&mut self, power: TxPower) -> Result<(), SettingsError>;

    /// Reads whether the packet trace interface is enabled.
    fn read_pti_enabled(&self) -> Result<bool, SettingsError>;
    /// Saves whether the packet trace interface is enabled.
    fn save_pti_enabled(&mut self, enabled: bool) -> Result<(), SettingsError>;

    /// Reads the node-ID base type.
    fn read_node_id_width(&self) -> Result<NodeIdWidth, SettingsError>;
    /// Saves the node-ID base type.
    fn save_node_id_width(&mut self, width: NodeIdWidth) -> Result<(), SettingsError>;
}

/// Device configuration in effect for this boot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Application node information.
    pub application: ApplicationSettings,
    /// Advertised command classes.
    pub command_classes: CommandClassLists,
    /// Radio configuration.
    pub radio: RadioConfig,
    /// Node-ID width used on the wire.
    pub node_id_width: NodeIdWidth,
}

fn or_default<T>(key: &'static str, value: Result<T, SettingsError>, default: T) -> T {
    value.unwrap_or_else(|e| {
        tracing::warn!("failed to read {}: {}, using default", key, e);
        default
    })
}

fn log_save(key: &'static str, result: Result<(), SettingsError>) {
    if let Err(e) = result {
        tracing::warn!("failed to save {}: {}", key, e);
    }
}

impl DeviceConfig {
    /// Loads the configuration for this boot.
    ///
    /// On an initialised store every key is read, keeping the value from
    /// `defaults` for keys that cannot be read. On first boot the defaults are
    /// written out instead, with the region replaced by `mfg_region` when that
    /// is a valid region.
    pub fn load(
        store: &mut dyn SettingsStore,
        defaults: Self,
        mfg_region: Option<RfRegion>,
    ) -> Self {
        if store.is_initialized() {
            let d = defaults;
            let (tx_power_max, tx_power_adjust) = or_default(
                "tx power",
                store.read_tx_power(),
                (d.radio.tx_power_max, d.radio.tx_power_adjust),
            );
            return Self {
                application: or_default(
                    "application settings",
                    store.read_application_settings(),
                    d.application,
                ),
                command_classes: or_default(
                    "command classes",
                    store.read_command_classes(),
                    d.command_classes,
                ),
                radio: RadioConfig {
                    region: or_default("rf region", store.read_rf_region(), d.radio.region),
                    tx_power_max,
                    tx_power_adjust,
                    tx_power_max_lr: or_default(
                        "max lr tx power",
                        store.read_max_lr_tx_power(),
                        d.radio.tx_power_max_lr,
                    ),
                    pti_enabled: or_default(
                        "pti enable",
                        store.read_pti_enabled(),
                        d.radio.pti_enabled,
                    ),
                },
                node_id_width: or_default(
                    "node id base type",
                    store.read_node_id_width(),
                    d.node_id_width,
                ),
            };
        }

        tracing::info!("settings store is empty, writing defaults");
        let mut config = defaults;
        if let Some(region) = mfg_region.filter(|r| r.is_valid()) {
            tracing::debug!("using manufacturing region {:?}", region);
            config.radio.region = region;
        }
        config.node_id_width = NodeIdWidth::default();

        log_save("rf region", store.save_rf_region(config.radio.region));
        log_save(
            "tx power",
            store.save_tx_power(config.radio.tx_power_max, config.radio.tx_power_adjust),
        );
        log_save(
            "application settings",
            store.save_application_settings(&config.application),
        );
        log_save(
            "max lr tx power",
            store.save_max_lr_tx_power(config.radio.tx_power_max_lr),
        );
        log_save("pti enable", store.save_pti_enabled(config.radio.pti_enabled));
        log_save(
            "node id base type",
            store.save_node_id_width(config.node_id_width),
        );
        config
    }
}

/// In-memory settings store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    application: Option<ApplicationSettings>,
    command_classes: Option<CommandClassLists>,
    region: Option<RfRegion>,
    tx_power: Option<(TxPower, TxPower)>,
    max_lr_tx_power: Option<TxPower>,
    pti_enabled: Option<bool>,
    node_id_width: Option<NodeIdWidth>,
}

impl MemorySettings {
    /// Creates an empty store, as on first boot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `config`.
    #[must_use]
    pub fn with_config(config: &DeviceConfig) -> Self {
        Self {
            application: Some(config.application),
            command_classes: Some(config.command_classes.clone()),
            region: Some(config.radio.region),
            tx_power: Some((config.radio.tx_power_max, config.radio.tx_power_adjust)),
            max_lr_tx_power: Some(config.radio.tx_power_max_lr),
            pti_enabled: Some(config.radio.pti_enabled),
            node_id_width: Some(config.node_id_width),
        }
    }

    /// Forgets the stored region.
    pub fn clear_rf_region(&mut self) {
        self.region = None;
    }
}

fn found<T: Clone>(key: &'static str, value: Option<&T>) -> Result<T, SettingsError> {
    value.cloned().ok_or(SettingsError::NotFound(key))
}

impl SettingsStore for MemorySettings {
    fn is_initialized(&self) -> bool {
        self.application.is_some() || self.region.is_some()
    }

    fn read_application_settings(&self) -> Result<ApplicationSettings, SettingsError> {
        found("application settings", self.application.as_ref())
    }

    fn save_application_settings(
        &mut self,
        settings: &ApplicationSettings,
    ) -> Result<(), SettingsError> {
        self.application = Some(*settings);
        Ok(())
    }

    fn read_command_classes(&self) -> Result<CommandClassLists, SettingsError> {
        found("command classes", self.command_classes.as_ref())
    }

    fn read_rf_region(&self) -> Result<RfRegion, SettingsError> {
        found("rf region", self.region.as_ref())
    }

    fn save_rf_region(&mut self, region: RfRegion) -> Result<(), SettingsError> {
        if !region.is_valid() {
            return Err(SettingsError::InvalidValue {
                key: "rf region",
                reason: format!("0x{:02x} is not a configurable region", region as u8),
            });
        }
        self.region = Some(region);
        Ok(())
    }

    fn read_tx_power(&self) -> Result<(TxPower, TxPower), SettingsError> {
        found("tx power", self.tx_power.as_ref())
    }

    fn save_tx_power(&mut self, level: TxPower, adjust: TxPower) -> Result<(), SettingsError> {
        self.tx_power = Some((level, adjust));
        Ok(())
    }

    fn read_max_lr_tx_power(&self) -> Result<TxPower, SettingsError> {
        found("max lr tx power", self.max_lr_tx_power.as_ref())
    }

    fn save_max_lr_tx_power(&mut self, power: TxPower) -> Result<(), SettingsError> {
        self.max_lr_tx_power = Some(power);
        Ok(())
    }

    fn read_pti_enabled(&self) -> Result<bool, SettingsError> {
        found("pti enable", self.pti_enabled.as_ref())
    }

    fn save_pti_enabled(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.pti_enabled = Some(enabled);
        Ok(())
    }

    fn read_node_id_width(&self) -> Result<NodeIdWidth, SettingsError> {
        found("node id base type", self.node_id_width.as_ref())
    }

    fn save_node_id_width(&mut self, width: NodeIdWidth) -> Result<(), SettingsError> {
        self.node_id_width = Some(width);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::radio::TX_POWER_20_DBM;

    fn defaults() -> DeviceConfig {
        DeviceConfig {
            application: ApplicationSettings {
                device_options: 0x01,
                generic_type: 0x02,
                specific_type: 0x07,
            },
            ..DeviceConfig::default()
        }
    }

    #[test]
    fn test_first_boot_writes_defaults() {
        let mut store = MemorySettings::new();
        assert!(!store.is_initialized());

        let config = DeviceConfig::load(&mut store, defaults(), None);
        assert_eq!(config, defaults());
        assert!(store.is_initialized());
        assert_eq!(store.read_rf_region(), Ok(RfRegion::Eu));
        assert_eq!(store.read_node_id_width(), Ok(NodeIdWidth::Bits8));
        assert_eq!(
            store.read_application_settings(),
            Ok(defaults().application)
        );
    }

    #[test]
    fn test_first_boot_uses_valid_manufacturing_region() {
        let mut store = MemorySettings::new();
        let config = DeviceConfig::load(&mut store, defaults(), Some(RfRegion::UsLr));
        assert_eq!(config.radio.region, RfRegion::UsLr);
        assert_eq!(store.read_rf_region(), Ok(RfRegion::UsLr));

        let mut store = MemorySettings::new();
        let config = DeviceConfig::load(&mut store, defaults(), Some(RfRegion::Undefined));
        assert_eq!(config.radio.region, RfRegion::Eu);
    }

    #[test]
    fn test_initialized_store_is_read() {
        let mut stored = defaults();
        stored.radio.region = RfRegion::Jp;
        stored.radio.tx_power_max_lr = TX_POWER_20_DBM;
        stored.node_id_width = NodeIdWidth::Bits16;
        let mut store = MemorySettings::with_config(&stored);

        let config = DeviceConfig::load(&mut store, defaults(), Some(RfRegion::Us));
        assert_eq!(config, stored);
    }

    #[test]
    fn test_missing_key_falls_back_to_default() {
        let mut stored = defaults();
        stored.radio.region = RfRegion::Kr;
        let mut store = MemorySettings::with_config(&stored);
        store.clear_rf_region();

        let config = DeviceConfig::load(&mut store, defaults(), None);
        assert_eq!(config.radio.region, RfRegion::Eu);
        // Nothing written back on a normal boot
        assert_eq!(
            store.read_rf_region(),
            Err(SettingsError::NotFound("rf region"))
        );
    }
}

//! Device information types.

/// Application node information, persisted across reboots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationSettings {
    /// Device option flags (listening, optional functionality, ...).
    pub device_options: u8,
    /// Generic device type.
    pub generic_type: u8,
    /// Specific device type.
    pub specific_type: u8,
}

/// Command classes advertised in the node information frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandClassLists {
    /// Advertised when not included securely.
    pub unsecure_included: Vec<u8>,
    /// Advertised in clear when included securely.
    pub secure_included_unsecure: Vec<u8>,
    /// Advertised only over a secure channel.
    pub secure_included_secure: Vec<u8>,
}

/// Why the chip last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ResetReason {
    /// Reset pin.
    Pin = 0,
    /// Timer wake-up from deep sleep.
    DeepSleepTimer = 1,
    /// Watchdog.
    Watchdog = 2,
    /// External interrupt in deep sleep.
    DeepSleepExternal = 3,
    /// Power on.
    #[default]
    PowerOn = 4,
    /// Software request.
    Software = 5,
    /// Brown-out.
    Brownout = 6,
    /// Tamper detection.
    Tamper = 7,
    /// Anything else.
    Other = 0xFF,
}

/// Protocol identification reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// Protocol type.
    pub protocol_type: u8,
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Revision.
    pub revision: u8,
    /// Application build number.
    pub build: u16,
    /// Protocol source revision hash.
    pub git_hash: [u8; 16],
}

/// Flags of the get-init-data response.
pub mod init_flags {
    /// Device runs the end-device API.
    pub const SLAVE_API: u8 = 0x01;
    /// Device supports timer functions.
    pub const TIMER_SUPPORT: u8 = 0x02;
    /// Controller is a secondary controller.
    pub const SECONDARY_CTRL: u8 = 0x04;
    /// Controller is the static update controller.
    pub const IS_SUC: u8 = 0x08;
}

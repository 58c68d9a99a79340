//! Fake collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::device::Device;
use crate::error::StackError;
use crate::protocol::{AckStatus, Frame, FrameLink};
use crate::queue::CallbackQueue;
use crate::settings::{DeviceConfig, MemorySettings, SettingsStore};
use crate::stack::{ControllerStack, MfgToken, NodeListPage, PowerLock};
use crate::types::radio::TX_POWER_14_DBM;
use crate::types::{
    ApplicationSettings, CommandClassLists, LR_NODE_MASK_LENGTH, NODE_MASK_LENGTH, ProtocolInfo,
    RfRegion, TxPower,
};

pub const CHIP_TYPE: u8 = 0x08;
pub const CHIP_REVISION: u8 = 0x01;

/// Side effects the fake stack records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    ReceiveMode(bool),
    PowerLock(PowerLock, u32),
    PowerCancel(PowerLock),
    WakeupTimer(u32),
}

#[derive(Debug, Clone)]
pub struct FakeStack {
    pub reset_info: Option<u32>,
    pub primary: bool,
    pub suc: bool,
    pub max_tx_power: Option<TxPower>,
    pub mfg_region: Option<RfRegion>,
    pub calls: Arc<Mutex<Vec<StackCall>>>,
}

impl FakeStack {
    pub fn new() -> Self {
        Self {
            reset_info: Some(0x0000_0001),
            primary: true,
            suc: false,
            max_tx_power: Some(TX_POWER_14_DBM),
            mfg_region: None,
            calls: Arc::default(),
        }
    }

    fn record(&self, call: StackCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn take_calls(calls: &Arc<Mutex<Vec<StackCall>>>) -> Vec<StackCall> {
    std::mem::take(&mut *calls.lock().unwrap())
}

impl ControllerStack for FakeStack {
    fn set_rf_receive_mode(&mut self, enabled: bool) -> Result<(), StackError> {
        self.record(StackCall::ReceiveMode(enabled));
        Ok(())
    }

    fn read_reset_info(&mut self) -> Result<u32, StackError> {
        self.reset_info.ok_or(StackError::RetentionRead)
    }

    fn is_primary_controller(&self) -> bool {
        self.primary
    }

    fn is_suc(&self) -> bool {
        self.suc
    }

    fn included_nodes(&self) -> [u8; NODE_MASK_LENGTH] {
        let mut mask = [0; NODE_MASK_LENGTH];
        mask[0] = 0x01;
        mask
    }

    fn included_lr_nodes(&self) -> [u8; LR_NODE_MASK_LENGTH] {
        let mut mask = [0; LR_NODE_MASK_LENGTH];
        mask[0] = 0x03;
        mask
    }

    fn included_nls_nodes(&self, page: u8) -> NodeListPage {
        NodeListPage {
            more: page == 0,
            mask: vec![0x01; 16],
        }
    }

    fn chip_type(&self) -> u8 {
        CHIP_TYPE
    }

    fn chip_revision(&self) -> u8 {
        CHIP_REVISION
    }

    fn max_supported_tx_power(&mut self) -> Result<TxPower, StackError> {
        self.max_tx_power
            .ok_or_else(|| StackError::Command("max tx power".into()))
    }

    fn max_payload_size(&self) -> u8 {
        46
    }

    fn max_lr_payload_size(&self) -> u8 {
        150
    }

    fn protocol_info(&self) -> ProtocolInfo {
        ProtocolInfo {
            protocol_type: 0,
            major: 7,
            minor: 23,
            revision: 2,
            build: 0x0102,
            git_hash: [0xAB; 16],
        }
    }

    fn manufacturing_region(&self) -> Option<RfRegion> {
        self.mfg_region
    }

    fn read_mfg_token(&self, token: MfgToken, len: usize) -> Vec<u8> {
        let fill = match token {
            MfgToken::PublicKey => 0x11,
            MfgToken::PrivateKey => 0x22,
        };
        vec![fill; len.min(MfgToken::SIZE)]
    }

    fn power_lock(&mut self, lock: PowerLock, timeout_ms: u32) {
        self.record(StackCall::PowerLock(lock, timeout_ms));
    }

    fn power_cancel(&mut self, lock: PowerLock) {
        self.record(StackCall::PowerCancel(lock));
    }

    fn start_wakeup_timer(&mut self, timeout_ms: u32) {
        self.record(StackCall::WakeupTimer(timeout_ms));
    }
}

pub fn config() -> DeviceConfig {
    DeviceConfig {
        application: ApplicationSettings {
            device_options: 0x01,
            generic_type: 0x02,
            specific_type: 0x07,
        },
        command_classes: CommandClassLists {
            unsecure_included: vec![0x5E, 0x86],
            ..CommandClassLists::default()
        },
        ..DeviceConfig::default()
    }
}

pub fn device_with_stack(stack: FakeStack) -> Device {
    let settings = MemorySettings::with_config(&config());
    Device::boot(Box::new(stack), Box::new(settings), config())
}

pub fn device() -> Device {
    device_with_stack(FakeStack::new())
}

/// A booted device whose settings store is then replaced.
pub fn device_with_settings(settings: impl SettingsStore + 'static) -> Device {
    let mut device = device();
    device.settings = Box::new(settings);
    device
}

pub fn callback_queue() -> CallbackQueue {
    CallbackQueue::new(Arc::new(Notify::new()))
}

/// Link with scripted acknowledgements.
#[derive(Debug, Default)]
pub struct FakeLink {
    pub sent: Vec<Frame>,
    pub inbox: VecDeque<Frame>,
    pub acks: VecDeque<AckStatus>,
}

impl FrameLink for FakeLink {
    fn send_frame(&mut self, frame: &Frame) {
        self.sent.push(frame.clone());
    }

    fn recv_frame(&mut self) -> Option<Frame> {
        self.inbox.pop_front()
    }

    fn poll_ack(&mut self) -> AckStatus {
        self.acks.pop_front().unwrap_or(AckStatus::Pending)
    }
}

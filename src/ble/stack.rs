//! BLE Stack Interface
//!
//! The vendor stack is an external collaborator. The dispatcher reaches it
//! only through this trait, handed in per call, so the same dispatch logic
//! runs against the SoftDevice adapter on target and against mocks in tests.

use defmt::Format;

use crate::ble::events::{ConnectionHandle, ConnectionState, DeviceAddress, StackEvent, TimeoutReason};

/// Advertising profile requested from the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum AdvertisingMode {
    Fast,
    Slow,
}

impl AdvertisingMode {
    /// Advertising interval in 0.625ms units
    pub const fn interval(&self) -> u32 {
        match self {
            AdvertisingMode::Fast => crate::config::FAST_ADV_INTERVAL,
            AdvertisingMode::Slow => crate::config::SLOW_ADV_INTERVAL,
        }
    }

    /// Advertising timeout in 10ms units
    pub const fn timeout(&self) -> u16 {
        match self {
            AdvertisingMode::Fast => crate::config::FAST_ADV_TIMEOUT,
            AdvertisingMode::Slow => crate::config::SLOW_ADV_TIMEOUT,
        }
    }

    /// Profile to fall back to when this one times out
    pub const fn next(&self) -> Option<AdvertisingMode> {
        match self {
            AdvertisingMode::Fast => Some(AdvertisingMode::Slow),
            AdvertisingMode::Slow => None,
        }
    }

    /// Event to report when this profile times out, and the profile to continue with
    pub fn timed_out(&self) -> (StackEvent, Option<AdvertisingMode>) {
        (StackEvent::Timeout(TimeoutReason::Advertising), self.next())
    }
}

/// Stack command errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum StackError {
    /// Command not allowed in the current stack state
    InvalidState,
    /// The referenced connection does not exist
    NoConnection,
    /// Stack queues are full, try later
    Busy,
}

/// Commands and queries the application issues into the BLE stack
pub trait BleStack {
    /// Local Bluetooth device address
    fn device_address(&self) -> DeviceAddress;

    /// Current GAP state as tracked by the stack
    fn connection_state(&self) -> ConnectionState;

    /// Negotiated ATT MTU of the current link
    fn mtu_size(&self) -> u16;

    /// Begin advertising so a central can discover and connect
    fn start_advertising(&mut self, mode: AdvertisingMode) -> Result<(), StackError>;

    /// Acknowledge a GATT write request on `conn`
    fn send_write_response(&mut self, conn: ConnectionHandle) -> Result<(), StackError>;
}

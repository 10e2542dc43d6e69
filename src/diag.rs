//! Diagnostic Output
//!
//! The dispatcher reports what it observes as typed `Diagnostic` records.
//! Where they go is decided once, when the firmware is composed: `DefmtSink`
//! prints them over RTT, `NoopSink` drops them.

use crate::ble::events::{
    AuthError, AuthInfo, ConnectionHandle, ConnectionState, DeviceAddress, StackBusyState, TimeoutReason,
};
use crate::ble::stack::StackError;

/// One diagnostic line emitted by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic<'a> {
    AdvertisingStartFailed(StackError),
    StackOn { address: DeviceAddress },
    Timeout(TimeoutReason),
    HardwareError,
    StackBusyStatus(StackBusyState),
    HciStatus(u8),
    AuthRequest(AuthInfo),
    PasskeyEntryRequest,
    PasskeyDisplay(u32),
    KeyInfoExchangeComplete,
    AuthComplete(AuthInfo),
    AuthFailed(AuthError),
    AdvertisingState(ConnectionState),
    Hibernate,
    DeviceConnected,
    DeviceDisconnected,
    MtuExchanged(u16),
    WriteRequest { attr_handle: u16, value: &'a [u8] },
    WriteResponseFailed(StackError),
    EncryptionChange(u8),
    ConnectionUpdateComplete(u8),
    GattConnected(ConnectionHandle),
    GattDisconnected(ConnectionHandle),
    UnknownEvent(u32),
}

impl Diagnostic<'_> {
    /// Whether this record reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Diagnostic::AdvertisingStartFailed(_)
                | Diagnostic::WriteResponseFailed(_)
                | Diagnostic::HardwareError
                | Diagnostic::AuthFailed(_)
        )
    }
}

/// Destination for dispatcher diagnostics
pub trait DiagnosticSink {
    fn emit(&mut self, diag: Diagnostic<'_>);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diag: Diagnostic<'_>) {
        (**self).emit(diag)
    }
}

/// Sink used when debug logging is compiled out
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    #[inline(always)]
    fn emit(&mut self, _diag: Diagnostic<'_>) {}
}

/// Sink that prints every record through defmt
#[cfg(feature = "firmware")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefmtSink;

#[cfg(feature = "firmware")]
impl DiagnosticSink for DefmtSink {
    fn emit(&mut self, diag: Diagnostic<'_>) {
        use defmt::{error, info, warn};

        match diag {
            Diagnostic::AdvertisingStartFailed(e) => error!("StartAdvertisement API Error: {}", e),
            Diagnostic::StackOn { address } => {
                info!(
                    "Bluetooth On, StartAdvertisement with addr: {=[u8]:02x}",
                    &address.display_order()[..]
                )
            }
            Diagnostic::Timeout(reason) => info!("EVT_TIMEOUT: {}", reason),
            Diagnostic::HardwareError => warn!("EVT_HARDWARE_ERROR"),
            Diagnostic::StackBusyStatus(state) => info!("EVT_STACK_BUSY_STATUS: {}", state),
            Diagnostic::HciStatus(status) => info!("EVT_HCI_STATUS: {=u8:#x}", status),
            Diagnostic::AuthRequest(auth) => info!(
                "EVT_AUTH_REQ: security={=u8:#x}, bonding={}, ekeySize={}, err={=u8:#x}",
                auth.security,
                auth.bonding,
                auth.key_size,
                auth.error.0
            ),
            Diagnostic::PasskeyEntryRequest => info!("EVT_PASSKEY_ENTRY_REQUEST"),
            Diagnostic::PasskeyDisplay(passkey) => info!("EVT_PASSKEY_DISPLAY_REQUEST {=u32:06}", passkey),
            Diagnostic::KeyInfoExchangeComplete => info!("EVT_GAP_KEYINFO_EXCHNGE_CMPLT"),
            Diagnostic::AuthComplete(auth) => info!(
                "AUTH_COMPLETE: security={=u8:#x}, bonding={}, ekeySize={}, authErr={=u8:#x}",
                auth.security,
                auth.bonding,
                auth.key_size,
                auth.error.0
            ),
            Diagnostic::AuthFailed(reason) => warn!("EVT_AUTH_FAILED: {=u8:#x}", reason.0),
            Diagnostic::AdvertisingState(state) => info!("EVT_ADVERTISING, state: {}", state),
            Diagnostic::Hibernate => warn!("Hibernate"),
            Diagnostic::DeviceConnected => info!("EVT_GAP_DEVICE_CONNECTED"),
            Diagnostic::DeviceDisconnected => info!("EVT_GAP_DEVICE_DISCONNECTED"),
            Diagnostic::MtuExchanged(mtu) => info!("EVT_GATTS_XCNHG_MTU_REQ, final mtu= {=u16}", mtu),
            Diagnostic::WriteRequest { attr_handle, value } => {
                info!("EVT_GATT_WRITE_REQ: {=u16:#x} = {=[u8]:02x}", attr_handle, value)
            }
            Diagnostic::WriteResponseFailed(e) => error!("GattsWriteRsp API Error: {}", e),
            Diagnostic::EncryptionChange(state) => info!("EVT_GAP_ENCRYPT_CHANGE: {=u8:#x}", state),
            Diagnostic::ConnectionUpdateComplete(status) => {
                info!("EVT_CONNECTION_UPDATE_COMPLETE: {=u8:#x}", status)
            }
            Diagnostic::GattConnected(conn) => {
                info!("EVT_GATT_CONNECT_IND: {=u8:#x}, {=u16:#x}", conn.att_id, conn.bd_handle)
            }
            Diagnostic::GattDisconnected(conn) => info!("EVT_GATT_DISCONNECT_IND: {=u16:#x}", conn.bd_handle),
            Diagnostic::UnknownEvent(code) => info!("OTHER event: {=u32:#x}", code),
        }
    }
}

/// Sink compiled into the firmware
#[cfg(all(feature = "firmware", feature = "debug-log"))]
pub type ActiveSink = DefmtSink;

/// Sink compiled into the firmware
#[cfg(not(all(feature = "firmware", feature = "debug-log")))]
pub type ActiveSink = NoopSink;

//! S140 SoftDevice Adapter
//!
//! Implements `BleStack` on top of nrf-softdevice and turns what the
//! SoftDevice reports into `StackEvent`s. Events go through a bounded
//! channel that the main loop drains, so the dispatcher always runs on the
//! main loop and never inside a SoftDevice callback.
//!
//! Based on nrf-softdevice patterns, events originate from:
//! - the advertising task (advertising start/stop, connect, disconnect)
//! - `gatt_server::Server::on_write` (write requests)
//! - the `SecurityHandler` callbacks (passkey, bonding, encryption)

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

use defmt::{debug, error, info, warn, Format};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::signal::Signal;
use nrf_softdevice::ble::advertisement_builder::{Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, WriteOp};
use nrf_softdevice::ble::peripheral::{self, AdvertiseError, ConnectableAdvertisement};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode, Uuid};
use nrf_softdevice::Softdevice;

use crate::ble::events::{
    passkey_from_ascii, AuthInfo, ConnectionHandle, ConnectionState, DeviceAddress, GattsWriteRequest,
    StackEvent, MAX_WRITE_LEN,
};
use crate::ble::stack::{AdvertisingMode, BleStack, StackError};
use crate::config::{ATT_MTU_DEFAULT, DEVICE_NAME, EVENT_QUEUE_DEPTH};

/// BLE_GATTS_EVT_WRITE, reported for write operations the application does not handle
const GATTS_EVT_WRITE: u32 = 0x50;

/// Invalid connection handle = disconnected
const CONN_HANDLE_INVALID: u16 = 0xFFFF;

/// Fade service and its write characteristic
const FADE_SERVICE_UUID: [u8; 16] = [
    0x9e, 0x73, 0x12, 0xe0, 0x23, 0x54, 0x11, 0xeb, 0x9f, 0x10, 0xfb, 0xc3, 0x0a, 0x62, 0xcf, 0x38,
];
const FADE_CONTROL_UUID: [u8; 16] = [
    0x9e, 0x73, 0x12, 0xe0, 0x23, 0x54, 0x11, 0xeb, 0x9f, 0x10, 0xfb, 0xc3, 0x0a, 0x63, 0xcf, 0x38,
];

/// Pending stack events, drained by the main loop
static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, StackEvent, EVENT_QUEUE_DEPTH> = Channel::new();

/// Events lost because the queue was full
static DROPPED_EVENTS: AtomicU32 = AtomicU32::new(0);

/// Advertising requests from the dispatcher to the advertising task
static ADV_REQUEST: Signal<CriticalSectionRawMutex, AdvertisingMode> = Signal::new();

static CONN_STATE: AtomicU8 = AtomicU8::new(ConnectionState::Stopped as u8);
static CONN_HANDLE: AtomicU16 = AtomicU16::new(CONN_HANDLE_INVALID);

/// Firmware bring-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum SetupError {
    GattRegister,
}

impl From<RegisterError> for SetupError {
    fn from(_: RegisterError) -> Self {
        SetupError::GattRegister
    }
}

/// Queue an event for the main loop. Never blocks; a full queue drops the event.
pub fn post_event(event: StackEvent) {
    if let Err(e) = EVENT_CHANNEL.try_send(event) {
        let dropped = DROPPED_EVENTS.fetch_add(1, Ordering::Relaxed) + 1;
        // the dropped event is handed back inside the error
        let embassy_sync::channel::TrySendError::Full(lost) = e;
        error!("EVENTS: queue full, dropped {} ({} total)", lost, dropped);
    }
}

/// Receiver side of the event queue
pub fn event_receiver() -> Receiver<'static, CriticalSectionRawMutex, StackEvent, EVENT_QUEUE_DEPTH> {
    EVENT_CHANNEL.receiver()
}

/// Number of events dropped since boot
pub fn dropped_events() -> u32 {
    DROPPED_EVENTS.load(Ordering::Relaxed)
}

fn set_state(state: ConnectionState) {
    CONN_STATE.store(state as u8, Ordering::Release);
}

fn state() -> ConnectionState {
    ConnectionState::from_u8(CONN_STATE.load(Ordering::Acquire))
}

/// `BleStack` backed by the S140
pub struct SoftdeviceStack {
    sd: &'static Softdevice,
}

impl SoftdeviceStack {
    pub fn new(sd: &'static Softdevice) -> Self {
        set_state(ConnectionState::Initializing);
        Self { sd }
    }

    /// Report the stack as started. The SoftDevice has no such event of its own.
    pub fn announce(&self) {
        set_state(ConnectionState::Disconnected);
        post_event(StackEvent::StackOn);
    }
}

impl BleStack for SoftdeviceStack {
    fn device_address(&self) -> DeviceAddress {
        let addr = nrf_softdevice::ble::get_address(self.sd);
        DeviceAddress::new(addr.address_type() as u8, addr.bytes())
    }

    fn connection_state(&self) -> ConnectionState {
        state()
    }

    /// nrf-softdevice answers MTU exchanges internally and does not report the
    /// result, so the only MTU known here is the one every link starts with.
    fn mtu_size(&self) -> u16 {
        ATT_MTU_DEFAULT
    }

    fn start_advertising(&mut self, mode: AdvertisingMode) -> Result<(), StackError> {
        match state() {
            ConnectionState::Advertising | ConnectionState::Connected => Err(StackError::InvalidState),
            ConnectionState::Stopped | ConnectionState::Initializing => Err(StackError::InvalidState),
            ConnectionState::Disconnected => {
                ADV_REQUEST.signal(mode);
                Ok(())
            }
        }
    }

    fn send_write_response(&mut self, conn: ConnectionHandle) -> Result<(), StackError> {
        // The S140 answers ATT Write Requests itself; all that is left is to
        // make sure the request belongs to the live link.
        if CONN_HANDLE.load(Ordering::Acquire) != conn.bd_handle {
            return Err(StackError::NoConnection);
        }
        debug!("GATT: write response on {=u16}", conn.bd_handle);
        Ok(())
    }
}

/// GATT server with a single writable fade control characteristic
pub struct FadeServer {
    control_handle: u16,
}

impl FadeServer {
    pub fn new(sd: &mut Softdevice) -> Result<Self, SetupError> {
        let mut sb = ServiceBuilder::new(sd, Uuid::new_128(&FADE_SERVICE_UUID))?;

        let attr = Attribute::new(&[0u8; 1]).variable_len(MAX_WRITE_LEN as u16);
        let metadata = Metadata::new(Properties::new().read().write());
        let handles = sb.add_characteristic(Uuid::new_128(&FADE_CONTROL_UUID), attr, metadata)?.build();
        let _service = sb.build();

        info!("GATT: fade control at handle {=u16}", handles.value_handle);
        Ok(Self {
            control_handle: handles.value_handle,
        })
    }
}

impl gatt_server::Server for FadeServer {
    type Event = ();

    fn on_write(&self, conn: &Connection, handle: u16, op: WriteOp, offset: usize, data: &[u8]) -> Option<()> {
        let bd_handle = conn.handle().unwrap_or(CONN_HANDLE_INVALID);

        match op {
            WriteOp::Request if handle == self.control_handle => {
                match GattsWriteRequest::new(ConnectionHandle::new(bd_handle), handle, data) {
                    Ok(request) => post_event(StackEvent::GattsWriteRequest(request)),
                    Err(e) => warn!("GATT: write on {=u16} rejected: {}", handle, e),
                }
            }
            _ => {
                debug!(
                    "GATT: write op {:?} on {=u16}, offset {}, len {}",
                    defmt::Debug2Format(&op),
                    handle,
                    offset,
                    data.len()
                );
                post_event(StackEvent::Unknown { code: GATTS_EVT_WRITE });
            }
        }
        None
    }
}

/// Pairing callbacks, forwarded as stack events
pub struct FadeSecurity;

impl FadeSecurity {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for FadeSecurity {
    fn default() -> Self {
        Self::new()
    }
}

fn security_level(mode: SecurityMode) -> u8 {
    match mode {
        SecurityMode::NoAccess => 0x00,
        SecurityMode::Open => 0x01,
        SecurityMode::JustWorks => 0x02,
        SecurityMode::Mitm => 0x03,
        SecurityMode::LescMitm => 0x04,
        _ => 0x10,
    }
}

impl SecurityHandler for FadeSecurity {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::DisplayOnly
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        post_event(StackEvent::PasskeyDisplayRequest(passkey_from_ascii(passkey)));
    }

    fn on_security_update(&self, _conn: &Connection, security_mode: SecurityMode) {
        let encrypted = !matches!(security_mode, SecurityMode::NoAccess | SecurityMode::Open);
        post_event(StackEvent::EncryptionChange(encrypted as u8));
    }

    fn on_bonded(&self, conn: &Connection, _master_id: MasterId, key: EncryptionInfo, _peer_id: IdentityKey) {
        post_event(StackEvent::KeyInfoExchangeComplete);
        let security = security_level(conn.security_mode());
        post_event(StackEvent::AuthComplete(AuthInfo::bonded(security, key.flags)));
    }
}

/// Runs the SoftDevice event loop (CRITICAL!)
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Serves advertising requests and the connections they produce
#[embassy_executor::task]
pub async fn advertising_task(
    sd: &'static Softdevice,
    server: &'static FadeServer,
    security: &'static FadeSecurity,
) -> ! {
    static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .full_name(DEVICE_NAME)
        .build();

    static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new().build();

    loop {
        let mut mode = ADV_REQUEST.wait().await;

        let conn = loop {
            let config = peripheral::Config {
                interval: mode.interval(),
                timeout: Some(mode.timeout()),
                ..Default::default()
            };
            let adv = ConnectableAdvertisement::ScannableUndirected {
                adv_data: &ADV_DATA,
                scan_data: &SCAN_DATA,
            };

            set_state(ConnectionState::Advertising);
            post_event(StackEvent::AdvertisingStartStop);
            info!("ADV: {} advertising started", mode);

            match peripheral::advertise_pairable(sd, adv, &config, security).await {
                Ok(conn) => break Some(conn),
                Err(AdvertiseError::Timeout) => {
                    let (timeout, next) = mode.timed_out();
                    post_event(timeout);
                    match next {
                        Some(next) => {
                            debug!("ADV: {} advertising timed out, falling back to {}", mode, next);
                            mode = next;
                        }
                        None => break None,
                    }
                }
                Err(e) => {
                    error!("ADV: advertising failed: {:?}", defmt::Debug2Format(&e));
                    break None;
                }
            }
        };

        let Some(conn) = conn else {
            set_state(ConnectionState::Disconnected);
            post_event(StackEvent::AdvertisingStartStop);
            continue;
        };

        let handle = ConnectionHandle::new(conn.handle().unwrap_or(CONN_HANDLE_INVALID));
        CONN_HANDLE.store(handle.bd_handle, Ordering::Release);
        set_state(ConnectionState::Connected);
        post_event(StackEvent::AdvertisingStartStop);
        post_event(StackEvent::GapDeviceConnected);
        post_event(StackEvent::GattConnectInd(handle));

        // Returns when the connection gets disconnected
        let e = gatt_server::run(&conn, server, |_| {}).await;
        debug!("GATT: server exited: {:?}", defmt::Debug2Format(&e));

        CONN_HANDLE.store(CONN_HANDLE_INVALID, Ordering::Release);
        set_state(ConnectionState::Disconnected);
        drop(conn);
        // S140 reports one disconnect per link
        post_event(StackEvent::GapDeviceDisconnected);
    }
}

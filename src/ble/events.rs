//! BLE Stack Events
//!
//! Every event the stack can hand to the application, one variant per event
//! kind, each carrying its own typed payload. The stack adapter builds these;
//! the dispatcher consumes them.

use defmt::Format;
use heapless::Vec;

/// Size of a Bluetooth device address
pub const BD_ADDR_SIZE: usize = 6;

/// Largest attribute value carried by a write request
pub const MAX_WRITE_LEN: usize = 64;

/// Bluetooth device address as stored by the stack (least significant byte first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct DeviceAddress {
    /// 0=Public, 1=Random
    pub addr_type: u8,
    pub bytes: [u8; BD_ADDR_SIZE],
}

impl DeviceAddress {
    pub const fn new(addr_type: u8, bytes: [u8; BD_ADDR_SIZE]) -> Self {
        Self { addr_type, bytes }
    }

    /// Address bytes in display order (most significant byte first)
    pub fn display_order(&self) -> [u8; BD_ADDR_SIZE] {
        let mut out = self.bytes;
        out.reverse();
        out
    }
}

/// Pairing information reported with authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct AuthInfo {
    /// Security mode/level bits
    pub security: u8,
    /// Whether the peer requested bonding
    pub bonding: bool,
    /// Encryption key size in bytes (7..=16), when the stack reports it
    pub key_size: Option<u8>,
    /// Pairing failure reason, `AuthError::NONE` on success
    pub error: AuthError,
}

/// SMP pairing failure reason code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct AuthError(pub u8);

impl AuthError {
    pub const NONE: AuthError = AuthError(0x00);
    pub const CONFIRM_VALUE_FAILED: AuthError = AuthError(0x04);
    pub const TIMEOUT: AuthError = AuthError(0x15);
}

impl AuthInfo {
    /// Result of a pairing that ended with a key exchange.
    ///
    /// `enc_flags` is the flags byte of the exchanged encryption info
    /// (bit 0 LESC, bit 1 authenticated, bits 2..8 LTK length).
    pub fn bonded(security: u8, enc_flags: u8) -> Self {
        Self {
            security,
            bonding: true,
            key_size: ltk_len(enc_flags),
            error: AuthError::NONE,
        }
    }
}

/// LTK length in bytes from an encryption info flags byte, `None` if unset
pub fn ltk_len(enc_flags: u8) -> Option<u8> {
    match enc_flags >> 2 {
        0 => None,
        len => Some(len),
    }
}

/// Busy state reported by the stack while it drains its queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
#[repr(u8)]
pub enum StackBusyState {
    Free = 0,
    Busy = 1,
}

/// Connection handle as reported by the GATT layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct ConnectionHandle {
    /// ATT instance
    pub att_id: u8,
    /// Link layer connection handle
    pub bd_handle: u16,
}

impl ConnectionHandle {
    pub const fn new(bd_handle: u16) -> Self {
        Self { att_id: 0, bd_handle }
    }
}

/// GATT write request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattsWriteRequest {
    pub conn: ConnectionHandle,
    pub attr_handle: u16,
    pub value: Vec<u8, MAX_WRITE_LEN>,
}

impl GattsWriteRequest {
    /// Build a write request, failing if the value does not fit
    pub fn new(conn: ConnectionHandle, attr_handle: u16, data: &[u8]) -> Result<Self, EventError> {
        let value = Vec::from_slice(data).map_err(|_| EventError::ValueTooLong)?;
        Ok(Self {
            conn,
            attr_handle,
            value,
        })
    }
}

impl Format for GattsWriteRequest {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "GattsWriteRequest {{ conn: {}, attr_handle: {=u16:#06x}, value: {=[u8]:02x} }}",
            self.conn,
            self.attr_handle,
            &self.value[..]
        )
    }
}

/// Overall stack state, owned by the stack and only observed here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
#[repr(u8)]
pub enum ConnectionState {
    Stopped = 0,
    Initializing = 1,
    Connected = 2,
    Advertising = 3,
    Disconnected = 4,
}

impl ConnectionState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Stopped,
            1 => ConnectionState::Initializing,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Advertising,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Source of a stack timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum TimeoutReason {
    Advertising,
    Gatt,
    Other(u8),
}

/// Event construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum EventError {
    ValueTooLong,
}

/// Events delivered by the BLE stack
#[derive(Debug, Clone, PartialEq, Eq, Format)]
pub enum StackEvent {
    // General
    StackOn,
    Timeout(TimeoutReason),
    HardwareError,
    StackBusyStatus(StackBusyState),
    HciStatus(u8),

    // GAP
    AuthRequest(AuthInfo),
    PasskeyEntryRequest,
    /// Passkey to show to the user, 0..=999_999
    PasskeyDisplayRequest(u32),
    KeyInfoExchangeComplete,
    AuthComplete(AuthInfo),
    AuthFailed(AuthError),
    AdvertisingStartStop,
    GapDeviceConnected,
    GapDeviceDisconnected,
    /// Link encryption changed; payload is 1 when encrypted
    EncryptionChange(u8),
    /// Connection parameter update finished with this HCI status
    ConnectionUpdateComplete(u8),

    // GATT
    GattConnectInd(ConnectionHandle),
    GattDisconnectInd(ConnectionHandle),
    GattsExchangeMtuRequest { conn: ConnectionHandle, client_rx_mtu: u16 },
    GattsWriteRequest(GattsWriteRequest),

    /// Anything the application does not recognise
    Unknown { code: u32 },
}

/// Numeric value of a six digit ASCII passkey as handed out by the stack
pub fn passkey_from_ascii(digits: &[u8; 6]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, digit| acc * 10 + u32::from(digit.wrapping_sub(b'0') % 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_order_reverses_bytes() {
        let addr = DeviceAddress::new(0, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(addr.display_order(), [0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        // stored order is untouched
        assert_eq!(addr.bytes[0], 0x01);
    }

    #[test]
    fn test_write_request_value_limit() {
        let conn = ConnectionHandle::new(1);
        let ok = GattsWriteRequest::new(conn, 0x0010, &[0xAA; MAX_WRITE_LEN]);
        assert!(ok.is_ok());

        let too_long = GattsWriteRequest::new(conn, 0x0010, &[0xAA; MAX_WRITE_LEN + 1]);
        assert_eq!(too_long, Err(EventError::ValueTooLong));
    }

    #[test]
    fn test_connection_state_from_u8() {
        assert_eq!(ConnectionState::from_u8(2), ConnectionState::Connected);
        assert_eq!(ConnectionState::from_u8(3), ConnectionState::Advertising);
        assert_eq!(ConnectionState::from_u8(0xFF), ConnectionState::Disconnected);
    }

    #[test]
    fn test_passkey_from_ascii() {
        assert_eq!(passkey_from_ascii(b"123456"), 123456);
        assert_eq!(passkey_from_ascii(b"000042"), 42);
        assert_eq!(passkey_from_ascii(b"999999"), 999_999);
    }

    #[test]
    fn test_bonded_key_size_from_flags() {
        // LESC + authenticated, 16 byte LTK
        let auth = AuthInfo::bonded(0x04, (16 << 2) | 0x03);
        assert!(auth.bonding);
        assert_eq!(auth.key_size, Some(16));
        assert_eq!(auth.security, 0x04);
        assert_eq!(auth.error, AuthError::NONE);

        assert_eq!(ltk_len((7 << 2) | 0x01), Some(7));
    }

    #[test]
    fn test_missing_ltk_length_is_not_reported() {
        assert_eq!(ltk_len(0x03), None);
        assert_eq!(AuthInfo::bonded(0x02, 0).key_size, None);
    }
}

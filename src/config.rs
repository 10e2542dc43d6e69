//! Firmware Configuration
//!
//! Compile-time settings. Logging is selected with the `debug-log` feature,
//! hardware support with the `firmware` feature.

/// Advertised device name
pub const DEVICE_NAME: &str = "PWM-Fade";

/// Fast advertising interval (0.625ms units): 20ms
pub const FAST_ADV_INTERVAL: u32 = 32;

/// Fast advertising timeout (10ms units): 30s
pub const FAST_ADV_TIMEOUT: u16 = 3000;

/// Slow advertising interval (0.625ms units): 1s
pub const SLOW_ADV_INTERVAL: u32 = 1600;

/// Slow advertising timeout (10ms units): 150s
pub const SLOW_ADV_TIMEOUT: u16 = 15000;

/// Default ATT MTU before any exchange
pub const ATT_MTU_DEFAULT: u16 = 23;

/// Largest ATT MTU the stack is configured to accept
pub const ATT_MTU_MAX: u16 = 247;

/// PWM period written at start-up
pub const MAX_PERIOD_VALUE: u16 = 65300;

/// Compare step applied on every terminal count
pub const BRIGHTNESS_DECREASE: u16 = 500;

/// How long the user button must be held to enter the bootloader
pub const BOOTLOADER_HOLD_MS: u64 = 2000;

/// Time the stack is given to come up before the banner is printed
pub const STARTUP_DELAY_MS: u64 = 100;

/// Pending stack events buffered for the main loop
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Main loop wake-up period when no stack event is pending
pub const IDLE_POLL_MS: u64 = 10;

#[cfg(feature = "firmware")]
pub use self::softdevice::softdevice_config;

#[cfg(feature = "firmware")]
mod softdevice {
    use nrf_softdevice::raw;

    use super::{ATT_MTU_MAX, DEVICE_NAME};

    /// SoftDevice configuration: one peripheral link, RC low frequency clock
    pub fn softdevice_config() -> nrf_softdevice::Config {
        nrf_softdevice::Config {
            clock: Some(raw::nrf_clock_lf_cfg_t {
                source: raw::NRF_CLOCK_LF_SRC_RC as u8,
                rc_ctiv: 16,
                rc_temp_ctiv: 2,
                accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
            }),
            conn_gap: Some(raw::ble_gap_conn_cfg_t {
                conn_count: 1,
                event_length: 24,
            }),
            conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: ATT_MTU_MAX }),
            gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
                attr_tab_size: 1408,
            }),
            gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
                adv_set_count: 1,
                periph_role_count: 1,
                central_role_count: 0,
                central_sec_count: 0,
                _bitfield_1: Default::default(),
            }),
            gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
                p_value: DEVICE_NAME.as_ptr() as _,
                current_len: DEVICE_NAME.len() as u16,
                max_len: DEVICE_NAME.len() as u16,
                write_perm: unsafe { core::mem::zeroed() },
                _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(raw::BLE_GATTS_VLOC_STACK as u8),
            }),
            ..Default::default()
        }
    }
}

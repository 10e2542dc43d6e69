//! Bootloader Switch
//!
//! Holding the user button for `BOOTLOADER_HOLD_MS` hands control to the DFU
//! bootloader. The hold detection is plain logic fed with the button level and
//! a millisecond clock; the handoff itself is target code.

use defmt::Format;

use crate::config::BOOTLOADER_HOLD_MS;

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum SwitchDecision {
    Stay,
    Enter,
}

/// Tracks how long the button has been held
#[derive(Debug, Clone, Copy)]
pub struct BootloaderSwitch {
    hold_ms: u64,
    pressed_since: Option<u64>,
}

impl BootloaderSwitch {
    pub const fn new() -> Self {
        Self::with_hold_time(BOOTLOADER_HOLD_MS)
    }

    pub const fn with_hold_time(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            pressed_since: None,
        }
    }

    /// Feed the current button level. `Enter` once it has been held long enough.
    pub fn poll(&mut self, pressed: bool, now_ms: u64) -> SwitchDecision {
        if !pressed {
            self.pressed_since = None;
            return SwitchDecision::Stay;
        }

        let since = *self.pressed_since.get_or_insert(now_ms);
        if now_ms.saturating_sub(since) >= self.hold_ms {
            SwitchDecision::Enter
        } else {
            SwitchDecision::Stay
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pressed_since.is_some()
    }
}

impl Default for BootloaderSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// GPREGRET value the Nordic DFU bootloader checks on reset
pub const DFU_MAGIC: u32 = 0xB0 | 0x01;

/// Ask the bootloader to stay in DFU mode, then reset. Never returns.
#[cfg(feature = "firmware")]
pub fn enter_dfu() -> ! {
    use nrf_softdevice::raw;

    defmt::warn!("Switching to bootloader");
    unsafe {
        raw::sd_power_gpregret_clr(0, 0xFFFF_FFFF);
        raw::sd_power_gpregret_set(0, DFU_MAGIC);
    }
    cortex_m::peripheral::SCB::sys_reset()
}

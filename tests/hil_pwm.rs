//! On-target checks of the TIMER1 PWM output
//!
//! Run with `cargo test --features hil --test hil_pwm --target thumbv7em-none-eabi`
//! on an nRF52820 with the S140 flashed.

#![no_std]
#![no_main]

use defmt_rtt as _;
use embassy_nrf::bind_interrupts;
use nrf52820_pwm_fade::pwm::nrf::{led_pin, FadePwm, TerminalCountHandler};
use nrf_softdevice as _;
use panic_probe as _;

bind_interrupts!(struct Irqs {
    TIMER1 => TerminalCountHandler;
});

/// Core clock of the nRF52820
const CPU_HZ: u32 = 64_000_000;

/// One period at 1MHz with the test period below
const PERIOD_US: u32 = 10_000;

fn delay_periods(periods: u32) {
    cortex_m::asm::delay(CPU_HZ / 1_000_000 * PERIOD_US * periods);
}

#[defmt_test::tests]
mod tests {
    use defmt::{assert, assert_eq, info};

    use super::*;

    const STEP: u16 = 500;

    #[init]
    fn init() -> FadePwm {
        let p = embassy_nrf::init(Default::default());
        FadePwm::new(
            p.TIMER1,
            p.GPIOTE_CH0,
            p.PPI_CH0,
            p.PPI_CH1,
            led_pin(p.P0_15),
            Irqs,
            STEP,
        )
    }

    #[test]
    fn test_compare_idle_before_start(pwm: &mut FadePwm) {
        delay_periods(3);
        assert_eq!(pwm.compare(), Some(0));
    }

    #[test]
    fn test_compare_steps_after_start(pwm: &mut FadePwm) {
        pwm.start(PERIOD_US as u16);
        delay_periods(10);

        let compare = defmt::unwrap!(pwm.compare());
        info!("compare after ~10 periods: {=u16}", compare);

        // at most 10 steps, so no wrap yet
        assert!(compare > 0);
        assert_eq!(compare % STEP, 0);
        assert!(compare <= 12 * STEP);
    }

    #[test]
    fn test_compare_keeps_moving(pwm: &mut FadePwm) {
        let before = defmt::unwrap!(pwm.compare());
        delay_periods(5);
        let after = defmt::unwrap!(pwm.compare());
        assert!(after != before);
    }
}

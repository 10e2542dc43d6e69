//! nRF52820 PWM Output
//!
//! The nRF52820 has no PWM block, so the counter is built from TIMER1, one
//! GPIOTE channel and two PPI channels:
//! - CC[0] is the compare register: COMPARE0 drives the LED pin high
//! - CC[1] is the period: COMPARE1 clears the pin and the counter (terminal count)
//!
//! The TIMER1 interrupt fires on COMPARE1 and runs the compare stepper.

use core::cell::RefCell;

use defmt::{debug, info};
use embassy_nrf::gpio::{AnyPin, Level, OutputDrive, Pin};
use embassy_nrf::gpiote::{OutputChannel, OutputChannelPolarity};
use embassy_nrf::interrupt::typelevel::{self as irq, Binding, Handler, Interrupt as _};
use embassy_nrf::interrupt::Priority;
use embassy_nrf::peripherals::{GPIOTE_CH0, PPI_CH0, PPI_CH1, TIMER1};
use embassy_nrf::ppi::Ppi;
use embassy_nrf::timer::{Frequency, Timer};
use embassy_nrf::{pac, Peri};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::{CompareStepper, CompareTimer, InterruptMask};

/// Compare channel
const CC_COMPARE: usize = 0;
/// Period channel, its compare event is the terminal count
const CC_PERIOD: usize = 1;

/// Must avoid the levels reserved by the SoftDevice (0, 1, 4)
const TC_INTERRUPT_PRIORITY: Priority = Priority::P3;

/// Stepper shared with the TIMER1 interrupt
static STEPPER: Mutex<CriticalSectionRawMutex, RefCell<Option<CompareStepper<Timer1Compare>>>> =
    Mutex::new(RefCell::new(None));

/// Register-level access to TIMER1 for the interrupt context
#[derive(Clone, Copy)]
pub struct Timer1Compare {
    regs: pac::timer::Timer,
}

impl Timer1Compare {
    fn new(regs: pac::timer::Timer) -> Self {
        Self { regs }
    }
}

impl CompareTimer for Timer1Compare {
    fn start(&mut self) {
        self.regs.tasks_start().write_value(1);
    }

    fn write_period(&mut self, period: u16) {
        self.regs.cc(CC_PERIOD).write_value(u32::from(period));
    }

    fn read_compare(&self) -> u16 {
        // 16-bit compare register
        self.regs.cc(CC_COMPARE).read() as u16
    }

    fn write_compare(&mut self, compare: u16) {
        self.regs.cc(CC_COMPARE).write_value(u32::from(compare));
    }

    fn clear_interrupt(&mut self, mask: InterruptMask) {
        if mask.contains(InterruptMask::TC) {
            self.regs.events_compare(CC_PERIOD).write_value(0);
        }
        if mask.contains(InterruptMask::CC_MATCH) {
            self.regs.events_compare(CC_COMPARE).write_value(0);
        }
    }
}

/// TIMER1 terminal count handler
pub struct TerminalCountHandler;

impl Handler<irq::TIMER1> for TerminalCountHandler {
    unsafe fn on_interrupt() {
        STEPPER.lock(|cell| {
            if let Some(stepper) = cell.borrow_mut().as_mut() {
                stepper.on_terminal_count();
            }
        });
    }
}

/// Hardware resources of the PWM output, kept alive for the life of the firmware
pub struct FadePwm {
    _timer: Timer<'static>,
    _out: OutputChannel<'static>,
    _on_compare: Ppi<'static, PPI_CH0, 1, 1>,
    _on_period: Ppi<'static, PPI_CH1, 1, 1>,
}

impl FadePwm {
    /// Wire TIMER1 to the LED pin and register the stepper with the interrupt.
    ///
    /// The counter is not started here; call `start` once the rest of the
    /// system is up.
    pub fn new(
        timer: Peri<'static, TIMER1>,
        gpiote_ch: Peri<'static, GPIOTE_CH0>,
        ppi_compare: Peri<'static, PPI_CH0>,
        ppi_period: Peri<'static, PPI_CH1>,
        led: Peri<'static, AnyPin>,
        _irq: impl Binding<irq::TIMER1, TerminalCountHandler> + 'static,
        step: u16,
    ) -> Self {
        let mut timer = Timer::new(timer);
        timer.set_frequency(Frequency::F1MHz);
        timer.cc(CC_PERIOD).short_compare_clear();

        // LED is off until the first compare match
        let out = OutputChannel::new(gpiote_ch, led, Level::Low, OutputDrive::Standard, OutputChannelPolarity::Toggle);

        let mut on_compare = Ppi::new_one_to_one(ppi_compare, timer.cc(CC_COMPARE).event_compare(), out.task_set());
        let mut on_period = Ppi::new_one_to_one(ppi_period, timer.cc(CC_PERIOD).event_compare(), out.task_clr());
        on_compare.enable();
        on_period.enable();

        let regs = Timer1Compare::new(timer.regs());
        regs.regs.events_compare(CC_PERIOD).write_value(0);
        regs.regs.intenset().write(|w| w.0 = 1u32 << (16 + CC_PERIOD));

        STEPPER.lock(|cell| cell.replace(Some(CompareStepper::new(regs, step))));

        irq::TIMER1::unpend();
        irq::TIMER1::set_priority(TC_INTERRUPT_PRIORITY);
        unsafe { irq::TIMER1::enable() };

        debug!("PWM: TIMER1 wired, step {=u16}", step);

        Self {
            _timer: timer,
            _out: out,
            _on_compare: on_compare,
            _on_period: on_period,
        }
    }

    /// Start counting, then program the period
    pub fn start(&mut self, period: u16) {
        STEPPER.lock(|cell| {
            if let Some(stepper) = cell.borrow_mut().as_mut() {
                stepper.start(period);
            }
        });
        info!("PWM: started, period {=u16}", period);
    }

    /// Current compare value, read under the interrupt lock
    pub fn compare(&self) -> Option<u16> {
        STEPPER.lock(|cell| cell.borrow().as_ref().map(|s| s.timer().read_compare()))
    }
}

/// LED pin for the fade
pub fn led_pin(pin: Peri<'static, impl Pin>) -> Peri<'static, AnyPin> {
    pin.into()
}

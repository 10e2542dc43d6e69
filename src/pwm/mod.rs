//! PWM Compare Stepper
//!
//! On every terminal count the compare value moves by a fixed step, which
//! fades the LED driven by the PWM output. The handler acknowledges the
//! interrupt before it touches the compare register.

use defmt::Format;

#[cfg(feature = "firmware")]
pub mod nrf;

/// Interrupt sources of the PWM counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct InterruptMask(pub u8);

impl InterruptMask {
    /// Terminal count (end of period)
    pub const TC: InterruptMask = InterruptMask(0x01);
    /// Compare match
    pub const CC_MATCH: InterruptMask = InterruptMask(0x02);

    pub fn contains(&self, other: InterruptMask) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Hardware PWM counter with a single compare channel
pub trait CompareTimer {
    fn start(&mut self);
    fn write_period(&mut self, period: u16);
    fn read_compare(&self) -> u16;
    fn write_compare(&mut self, compare: u16);
    fn clear_interrupt(&mut self, mask: InterruptMask);
}

/// Terminal-count handler that steps the compare value
pub struct CompareStepper<T: CompareTimer> {
    timer: T,
    step: u16,
}

impl<T: CompareTimer> CompareStepper<T> {
    pub const fn new(timer: T, step: u16) -> Self {
        Self { timer, step }
    }

    /// Start the counter and program its period
    pub fn start(&mut self, period: u16) {
        self.timer.start();
        self.timer.write_period(period);
    }

    /// Interrupt body: acknowledge, then compare += step.
    ///
    /// The compare register is 16 bits wide; the sum wraps like the register does.
    pub fn on_terminal_count(&mut self) {
        self.timer.clear_interrupt(InterruptMask::TC);

        let compare = self.timer.read_compare();
        self.timer.write_compare(compare.wrapping_add(self.step));
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn into_inner(self) -> T {
        self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RegisterTimer {
        period: u16,
        compare: u16,
        pending: bool,
        running: bool,
    }

    impl CompareTimer for RegisterTimer {
        fn start(&mut self) {
            self.running = true;
        }

        fn write_period(&mut self, period: u16) {
            self.period = period;
        }

        fn read_compare(&self) -> u16 {
            assert!(!self.pending, "compare read with TC still pending");
            self.compare
        }

        fn write_compare(&mut self, compare: u16) {
            self.compare = compare;
        }

        fn clear_interrupt(&mut self, mask: InterruptMask) {
            if mask.contains(InterruptMask::TC) {
                self.pending = false;
            }
        }
    }

    #[test]
    fn test_three_steps_of_500() {
        let mut stepper = CompareStepper::new(RegisterTimer::default(), 500);
        for _ in 0..3 {
            stepper.timer.pending = true;
            stepper.on_terminal_count();
        }
        assert_eq!(stepper.timer().compare, 1500);
        assert!(!stepper.timer().pending);
    }

    #[test]
    fn test_start_programs_period() {
        let mut stepper = CompareStepper::new(RegisterTimer::default(), 500);
        stepper.start(65300);
        assert!(stepper.timer().running);
        assert_eq!(stepper.timer().period, 65300);
        // compare is left alone
        assert_eq!(stepper.timer().compare, 0);
    }

    #[test]
    fn test_compare_wraps_at_register_width() {
        let timer = RegisterTimer {
            compare: 65300,
            ..Default::default()
        };
        let mut stepper = CompareStepper::new(timer, 500);
        stepper.on_terminal_count();
        assert_eq!(stepper.into_inner().compare, 264);
    }

    #[test]
    fn test_mask_contains() {
        assert!(InterruptMask(0x03).contains(InterruptMask::TC));
        assert!(!InterruptMask::CC_MATCH.contains(InterruptMask::TC));
    }
}

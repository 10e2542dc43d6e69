//! Common test utilities for the host tests
//!
//! - `MockStack`: records every command the dispatcher issues
//! - `RecordingSink`: keeps every diagnostic as an owned record
//! - `RegisterTimer`: register model of the PWM counter

#![allow(dead_code)]

use core::cell::RefCell;

use nrf52820_pwm_fade::ble::events::{ConnectionHandle, ConnectionState, DeviceAddress};
use nrf52820_pwm_fade::ble::stack::{AdvertisingMode, BleStack, StackError};
use nrf52820_pwm_fade::diag::{Diagnostic, DiagnosticSink};
use nrf52820_pwm_fade::pwm::{CompareTimer, InterruptMask};

pub const TEST_ADDRESS: [u8; 6] = [0x66, 0x55, 0x44, 0x33, 0x22, 0x11];

/// Commands seen by the mock stack, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartAdvertising(AdvertisingMode),
    WriteResponse(ConnectionHandle),
}

pub struct MockStack {
    pub state: ConnectionState,
    pub mtu: u16,
    pub commands: Vec<Command>,
    pub advertising_result: Result<(), StackError>,
    pub write_response_result: Result<(), StackError>,
}

impl MockStack {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            mtu: 23,
            commands: Vec::new(),
            advertising_result: Ok(()),
            write_response_result: Ok(()),
        }
    }

    pub fn advertising_starts(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::StartAdvertising(_)))
            .count()
    }

    pub fn write_responses(&self) -> Vec<ConnectionHandle> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::WriteResponse(conn) => Some(*conn),
                _ => None,
            })
            .collect()
    }
}

impl BleStack for MockStack {
    fn device_address(&self) -> DeviceAddress {
        DeviceAddress::new(0, TEST_ADDRESS)
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn mtu_size(&self) -> u16 {
        self.mtu
    }

    fn start_advertising(&mut self, mode: AdvertisingMode) -> Result<(), StackError> {
        self.commands.push(Command::StartAdvertising(mode));
        self.advertising_result
    }

    fn send_write_response(&mut self, conn: ConnectionHandle) -> Result<(), StackError> {
        self.commands.push(Command::WriteResponse(conn));
        self.write_response_result
    }
}

/// Owned copy of a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub text: String,
    pub failure: bool,
}

#[derive(Default)]
pub struct RecordingSink {
    pub records: Vec<Record>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| r.failure).count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, diag: Diagnostic<'_>) {
        self.records.push(Record {
            failure: diag.is_failure(),
            text: format!("{:?}", diag),
        });
    }
}

/// Register access as seen by the stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOp {
    Start,
    WritePeriod(u16),
    ReadCompare(u16),
    WriteCompare(u16),
    Clear(u8),
}

#[derive(Default)]
pub struct RegisterTimer {
    pub period: u16,
    pub compare: u16,
    ops: RefCell<Vec<RegisterOp>>,
}

impl RegisterTimer {
    pub fn with_compare(compare: u16) -> Self {
        Self {
            compare,
            ..Default::default()
        }
    }

    pub fn ops(&self) -> Vec<RegisterOp> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }
}

impl CompareTimer for RegisterTimer {
    fn start(&mut self) {
        self.ops.get_mut().push(RegisterOp::Start);
    }

    fn write_period(&mut self, period: u16) {
        self.period = period;
        self.ops.get_mut().push(RegisterOp::WritePeriod(period));
    }

    fn read_compare(&self) -> u16 {
        self.ops.borrow_mut().push(RegisterOp::ReadCompare(self.compare));
        self.compare
    }

    fn write_compare(&mut self, compare: u16) {
        self.compare = compare;
        self.ops.get_mut().push(RegisterOp::WriteCompare(compare));
    }

    fn clear_interrupt(&mut self, mask: InterruptMask) {
        self.ops.get_mut().push(RegisterOp::Clear(mask.0));
    }
}

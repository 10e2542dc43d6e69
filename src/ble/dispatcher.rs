//! BLE Event Dispatcher
//!
//! Maps each stack event to a diagnostic and, for a handful of events, a
//! follow-up command into the stack:
//! - stack on: start fast advertising
//! - disconnect (GAP or GATT): restart fast advertising
//! - GATT write request: acknowledge the write
//!
//! The dispatcher keeps no state between events. The stack handle is passed
//! in on every call; failed commands are reported and never retried.

use crate::ble::events::{ConnectionState, GattsWriteRequest, StackEvent};
use crate::ble::stack::{AdvertisingMode, BleStack};
use crate::diag::{Diagnostic, DiagnosticSink};

/// Routes stack events to diagnostics and stack commands
pub struct EventDispatcher<D: DiagnosticSink> {
    sink: D,
}

impl<D: DiagnosticSink> EventDispatcher<D> {
    pub const fn new(sink: D) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Handle one event. Runs on the main loop, never blocks.
    pub fn dispatch<S: BleStack + ?Sized>(&mut self, stack: &mut S, event: &StackEvent) {
        match event {
            // General
            StackEvent::StackOn => {
                // Enter discoverable mode so a central can find us
                self.start_advertising(stack);
                let address = stack.device_address();
                self.sink.emit(Diagnostic::StackOn { address });
            }
            StackEvent::Timeout(reason) => self.sink.emit(Diagnostic::Timeout(*reason)),
            StackEvent::HardwareError => self.sink.emit(Diagnostic::HardwareError),
            StackEvent::StackBusyStatus(state) => self.sink.emit(Diagnostic::StackBusyStatus(*state)),
            StackEvent::HciStatus(status) => self.sink.emit(Diagnostic::HciStatus(*status)),

            // GAP
            StackEvent::AuthRequest(auth) => self.sink.emit(Diagnostic::AuthRequest(*auth)),
            StackEvent::PasskeyEntryRequest => self.sink.emit(Diagnostic::PasskeyEntryRequest),
            StackEvent::PasskeyDisplayRequest(passkey) => self.sink.emit(Diagnostic::PasskeyDisplay(*passkey)),
            StackEvent::KeyInfoExchangeComplete => self.sink.emit(Diagnostic::KeyInfoExchangeComplete),
            StackEvent::AuthComplete(auth) => self.sink.emit(Diagnostic::AuthComplete(*auth)),
            StackEvent::AuthFailed(reason) => self.sink.emit(Diagnostic::AuthFailed(*reason)),
            StackEvent::AdvertisingStartStop => {
                let state = stack.connection_state();
                self.sink.emit(Diagnostic::AdvertisingState(state));
                if state == ConnectionState::Disconnected {
                    // Fast and slow advertising both ran out
                    self.sink.emit(Diagnostic::Hibernate);
                }
            }
            StackEvent::GapDeviceConnected => self.sink.emit(Diagnostic::DeviceConnected),
            StackEvent::GapDeviceDisconnected => {
                self.sink.emit(Diagnostic::DeviceDisconnected);
                self.start_advertising(stack);
            }
            StackEvent::EncryptionChange(state) => self.sink.emit(Diagnostic::EncryptionChange(*state)),
            StackEvent::ConnectionUpdateComplete(status) => {
                self.sink.emit(Diagnostic::ConnectionUpdateComplete(*status))
            }

            // GATT
            StackEvent::GattConnectInd(conn) => self.sink.emit(Diagnostic::GattConnected(*conn)),
            StackEvent::GattDisconnectInd(conn) => {
                self.sink.emit(Diagnostic::GattDisconnected(*conn));
                self.start_advertising(stack);
            }
            StackEvent::GattsExchangeMtuRequest { .. } => {
                let mtu = stack.mtu_size();
                self.sink.emit(Diagnostic::MtuExchanged(mtu));
            }
            StackEvent::GattsWriteRequest(request) => self.on_write_request(stack, request),

            StackEvent::Unknown { code } => self.sink.emit(Diagnostic::UnknownEvent(*code)),
        }
    }

    fn start_advertising<S: BleStack + ?Sized>(&mut self, stack: &mut S) {
        if let Err(e) = stack.start_advertising(AdvertisingMode::Fast) {
            self.sink.emit(Diagnostic::AdvertisingStartFailed(e));
        }
    }

    fn on_write_request<S: BleStack + ?Sized>(&mut self, stack: &mut S, request: &GattsWriteRequest) {
        self.sink.emit(Diagnostic::WriteRequest {
            attr_handle: request.attr_handle,
            value: &request.value,
        });

        if let Err(e) = stack.send_write_response(request.conn) {
            self.sink.emit(Diagnostic::WriteResponseFailed(e));
        }
    }
}

#![cfg_attr(not(test), no_std)]

//! nRF52820 S140 PWM Fade Firmware Library
//!
//! The firmware does two things on an nRF52820 running the S140 SoftDevice:
//! it keeps a BLE peripheral discoverable and it fades an LED by stepping the
//! compare value of a hardware counter on every terminal count.
//!
//! - `ble`: stack events, the stack interface and the event dispatcher
//! - `pwm`: the compare stepper and its TIMER1 backed output
//! - `diag`: diagnostic records and their sinks
//! - `bootloader`: button hold detection and DFU handoff
//! - `config`: compile-time settings
//!
//! Everything outside the `firmware` feature builds and tests on the host.

pub mod ble;
pub mod bootloader;
pub mod config;
pub mod diag;
pub mod pwm;

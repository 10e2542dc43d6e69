//! BLE Protocol Implementation
//!
//! Event types and the stack interface are plain data and traits; the S140
//! adapter that implements them is only built for the target.

pub mod dispatcher;
pub mod events;
pub mod stack;

#[cfg(feature = "firmware")]
pub mod softdevice;

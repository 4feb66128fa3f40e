// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A minimal, blocking [Modbus TCP](https://en.wikipedia.org/wiki/Modbus)
//! client for register telemetry.
//!
//! A [`Session`] owns a single TCP connection to a device and performs
//! one request/response exchange at a time. Only the function codes
//! needed for polling registers are supported:
//!
//! - Read Holding Registers (0x03)
//! - Read Input Registers (0x04)
//! - Write Single Coil (0x05)
//! - Write Multiple Registers (0x10)
//!
//! ## Installation
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! blocking-modbus = "*"
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use blocking_modbus::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = tcp::connect_host("192.168.0.222", 502, Duration::from_secs(10))?;
//!     let data = session.read_registers(Unit(1), RegisterKind::Holding, 300, 2)?;
//!     println!("Registers: {:?}", client::util::words_from_bytes(&data));
//!     session.disconnect()?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod prelude;
pub mod session;

mod codec;
mod error;
mod frame;
mod unit;

pub use self::{
    codec::{
        tcp::{decode_header, encode},
        MAX_READ_QUANTITY, MAX_WRITE_QUANTITY,
    },
    config::{DeviceConfig, RegisterBlock, SessionConfig},
    error::{Error, Result},
    frame::{
        map_exception,
        tcp::{HEADER_SIZE, MAX_ADU_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_ID},
        Address, Coil, Exception, ExceptionResponse, Frame, FunctionCode, Header, Quantity,
        RegisterKind, Request, TransactionId, UnitId, Word,
    },
    session::{Session, SessionState, Transport},
    unit::{Unit, UnitContext},
};

// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unit identifiers

use std::{fmt, str::FromStr};

use crate::frame::UnitId;

/// A single byte for addressing a logical device, usually behind a
/// Modbus TCP gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Unit(pub UnitId);

impl Unit {
    /// The reserved address for a directly connected Modbus TCP device,
    /// i.e. if not forwarded through a TCP/RTU gateway.
    ///
    /// [MODBUS Messaging on TCP/IP Implementation Guide](http://www.modbus.org/docs/Modbus_Messaging_Implementation_Guide_V1_0b.pdf), page 23
    /// "On TCP/IP, the MODBUS server is addressed using its IP address; therefore,
    /// the MODBUS Unit Identifier is useless. The value 0xFF has to be used."
    #[must_use]
    pub const fn tcp_device() -> Self {
        Unit(255)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::tcp_device()
    }
}

impl From<UnitId> for Unit {
    fn from(from: UnitId) -> Self {
        Unit(from)
    }
}

impl From<Unit> for UnitId {
    fn from(from: Unit) -> Self {
        from.0
    }
}

impl FromStr for Unit {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit_id = match s.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Unit(unit_id))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:0>2X})", self.0, self.0)
    }
}

/// Selects the unit addressed by subsequent requests.
pub trait UnitContext {
    /// Select a unit for all subsequent outgoing requests.
    fn set_unit(&mut self, unit: Unit);
}

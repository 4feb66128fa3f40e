// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

pub(crate) mod tcp;

use std::{
    borrow::Cow,
    error,
    fmt::{self, Display},
};

pub use self::tcp::{Frame, Header, TransactionId, UnitId};

/// A Modbus function code.
///
/// Only the function codes needed for register telemetry have
/// named variants. Everything else is carried as [`FunctionCode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 03 (0x03) Read Holding Registers
    ReadHoldingRegisters,

    /// 04 (0x04) Read Input Registers
    ReadInputRegisters,

    /// 05 (0x05) Write Single Coil
    WriteSingleCoil,

    /// 16 (0x10) Write Multiple Registers
    WriteMultipleRegisters,

    /// Any other function code.
    Custom(u8),
}

impl FunctionCode {
    /// Create a new [`FunctionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        match value {
            0x03 => Self::ReadHoldingRegisters,
            0x04 => Self::ReadInputRegisters,
            0x05 => Self::WriteSingleCoil,
            0x10 => Self::WriteMultipleRegisters,
            code => Self::Custom(code),
        }
    }

    /// Gets the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteMultipleRegisters => 0x10,
            Self::Custom(code) => code,
        }
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

/// Bit that marks an exception in the function code of a response.
pub(crate) const EXCEPTION_FLAG: u8 = 0x80;

/// A Modbus protocol address is represented by 16 bit from `0` to `65535`.
///
/// This *protocol address* uses 0-based indexing, while the register
/// address in device manuals is often specified with 1-based indexing.
pub type Address = u16;

/// A Coil represents a single bit.
///
/// - `true` is equivalent to `ON`, `1` and `0xFF00`.
/// - `false` is equivalent to `OFF`, `0` and `0x0000`.
pub type Coil = bool;

/// Modbus uses 16 bit for its data items.
///
/// Transmitted using a big-endian representation.
pub type Word = u16;

/// Number of items to process.
pub type Quantity = u16;

/// The two register address spaces that can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RegisterKind {
    /// Read-only registers, function code 0x04.
    Input,
    /// Read/write registers, function code 0x03.
    Holding,
}

impl RegisterKind {
    /// The function code used for reading registers of this kind.
    #[must_use]
    pub const fn function_code(self) -> FunctionCode {
        match self {
            Self::Input => FunctionCode::ReadInputRegisters,
            Self::Holding => FunctionCode::ReadHoldingRegisters,
        }
    }
}

/// A request represents a message from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// A request to read multiple input registers.
    /// The first parameter is the address of the first input register to read.
    /// The second parameter is the number of input registers to read.
    ReadInputRegisters(Address, Quantity),

    /// A request to read multiple holding registers.
    /// The first parameter is the address of the first holding register to read.
    /// The second parameter is the number of holding registers to read.
    ReadHoldingRegisters(Address, Quantity),

    /// A request to write a single coil.
    /// The first parameter is the address of the coil.
    /// The second parameter is the value to write to the coil.
    WriteSingleCoil(Address, Coil),

    /// A request to write to multiple registers.
    /// The first parameter is the address of the first register to write.
    /// The second parameter is the vector of values to write to the registers.
    WriteMultipleRegisters(Address, Cow<'a, [Word]>),
}

impl Request<'_> {
    /// Create a register read request for the given address space.
    #[must_use]
    pub const fn read_registers(kind: RegisterKind, addr: Address, cnt: Quantity) -> Self {
        match kind {
            RegisterKind::Input => Self::ReadInputRegisters(addr, cnt),
            RegisterKind::Holding => Self::ReadHoldingRegisters(addr, cnt),
        }
    }

    /// Get the [`FunctionCode`] of the [`Request`].
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        use Request::*;

        match self {
            ReadInputRegisters(_, _) => FunctionCode::ReadInputRegisters,
            ReadHoldingRegisters(_, _) => FunctionCode::ReadHoldingRegisters,
            WriteSingleCoil(_, _) => FunctionCode::WriteSingleCoil,
            WriteMultipleRegisters(_, _) => FunctionCode::WriteMultipleRegisters,
        }
    }
}

/// A server exception.
///
/// Unknown codes are kept as [`Exception::Unknown`], so that every
/// byte value maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exception {
    /// 0x01
    IllegalFunction,
    /// 0x02
    IllegalDataAddress,
    /// 0x03
    IllegalDataValue,
    /// 0x04
    ServerFailure,
    /// 0x05
    Acknowledge,
    /// 0x06
    ServerBusy,
    /// 0x07
    NegativeAcknowledge,
    /// 0x08
    MemoryParityError,
    /// 0x0A
    GatewayPathUnavailable,
    /// 0x0B
    GatewayTargetFailedToRespond,
    /// None of the above.
    Unknown(u8),
}

impl Exception {
    /// Map a raw exception code onto an [`Exception`].
    ///
    /// This never fails: unrecognized codes become [`Exception::Unknown`].
    #[must_use]
    pub const fn new(code: u8) -> Self {
        use Exception::*;
        match code {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => ServerFailure,
            0x05 => Acknowledge,
            0x06 => ServerBusy,
            0x07 => NegativeAcknowledge,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetFailedToRespond,
            other => Unknown(other),
        }
    }

    /// The raw exception code as transmitted by the server.
    #[must_use]
    pub const fn code(self) -> u8 {
        use Exception::*;
        match self {
            IllegalFunction => 0x01,
            IllegalDataAddress => 0x02,
            IllegalDataValue => 0x03,
            ServerFailure => 0x04,
            Acknowledge => 0x05,
            ServerBusy => 0x06,
            NegativeAcknowledge => 0x07,
            MemoryParityError => 0x08,
            GatewayPathUnavailable => 0x0A,
            GatewayTargetFailedToRespond => 0x0B,
            Unknown(code) => code,
        }
    }

    fn description(self) -> &'static str {
        use Exception::*;
        match self {
            IllegalFunction => "Illegal function",
            IllegalDataAddress => "Illegal data address",
            IllegalDataValue => "Illegal data value",
            ServerFailure => "Server device failure",
            Acknowledge => "Acknowledge",
            ServerBusy => "Server device busy",
            NegativeAcknowledge => "Negative acknowledge",
            MemoryParityError => "Memory parity error",
            GatewayPathUnavailable => "Gateway path unavailable",
            GatewayTargetFailedToRespond => "Gateway target device failed to respond",
            Unknown(_) => "Unknown exception",
        }
    }
}

/// Shorthand for [`Exception::new`].
#[must_use]
pub const fn map_exception(code: u8) -> Exception {
    Exception::new(code)
}

impl From<Exception> for u8 {
    fn from(from: Exception) -> Self {
        from.code()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "{} (0x{code:02X})", self.description()),
            _ => f.write_str(self.description()),
        }
    }
}

impl error::Error for Exception {}

/// A server exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    /// Function code of the failed request, without the exception flag.
    pub function: FunctionCode,
    pub exception: Exception,
}

impl fmt::Display for ExceptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Modbus function {}: {} (code {})",
            self.function,
            self.exception,
            self.exception.code()
        )
    }
}

impl error::Error for ExceptionResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_code_values() {
        assert_eq!(FunctionCode::new(0x03), FunctionCode::ReadHoldingRegisters);
        assert_eq!(FunctionCode::new(0x04), FunctionCode::ReadInputRegisters);
        assert_eq!(FunctionCode::new(0x05), FunctionCode::WriteSingleCoil);
        assert_eq!(FunctionCode::new(0x10), FunctionCode::WriteMultipleRegisters);
        assert_eq!(FunctionCode::new(0x2B), FunctionCode::Custom(0x2B));
        for code in 0..=u8::MAX {
            assert_eq!(FunctionCode::new(code).value(), code);
        }
    }

    #[test]
    fn register_kind_function_codes() {
        assert_eq!(RegisterKind::Input.function_code().value(), 4);
        assert_eq!(RegisterKind::Holding.function_code().value(), 3);
        assert_eq!(
            Request::read_registers(RegisterKind::Holding, 300, 1),
            Request::ReadHoldingRegisters(300, 1)
        );
    }

    #[test]
    fn exception_mapping_is_total() {
        let named = [1, 2, 3, 4, 5, 6, 7, 8, 10, 11];
        for code in 0..=u8::MAX {
            let exception = map_exception(code);
            assert_eq!(exception.code(), code);
            assert_eq!(
                matches!(exception, Exception::Unknown(_)),
                !named.contains(&code),
                "code {code}"
            );
        }
    }

    #[test]
    fn named_exceptions() {
        assert_eq!(Exception::new(0x01), Exception::IllegalFunction);
        assert_eq!(Exception::new(0x02), Exception::IllegalDataAddress);
        assert_eq!(Exception::new(0x03), Exception::IllegalDataValue);
        assert_eq!(Exception::new(0x04), Exception::ServerFailure);
        assert_eq!(Exception::new(0x05), Exception::Acknowledge);
        assert_eq!(Exception::new(0x06), Exception::ServerBusy);
        assert_eq!(Exception::new(0x07), Exception::NegativeAcknowledge);
        assert_eq!(Exception::new(0x08), Exception::MemoryParityError);
        assert_eq!(Exception::new(0x0A), Exception::GatewayPathUnavailable);
        assert_eq!(Exception::new(0x0B), Exception::GatewayTargetFailedToRespond);
        assert_eq!(Exception::new(0x09), Exception::Unknown(0x09));
    }

    #[test]
    fn exception_display() {
        assert_eq!(
            Exception::IllegalDataAddress.to_string(),
            "Illegal data address"
        );
        assert_eq!(Exception::Unknown(0x42).to_string(), "Unknown exception (0x42)");
        let rsp = ExceptionResponse {
            function: FunctionCode::ReadHoldingRegisters,
            exception: Exception::IllegalDataAddress,
        };
        assert_eq!(
            rsp.to_string(),
            "Modbus function 3: Illegal data address (code 2)"
        );
    }
}

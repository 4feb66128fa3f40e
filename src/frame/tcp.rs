// SPDX-FileCopyrightText: Copyright (c) 2017-2023 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use bytes::Bytes;

use super::FunctionCode;

pub type TransactionId = u16;
pub type UnitId = u8;

/// Size of the MBAP header including the function code.
pub const HEADER_SIZE: usize = 8;

/// Maximum size of a Modbus TCP application data unit.
pub const MAX_ADU_SIZE: usize = 260;

/// Maximum payload that fits behind the header.
pub const MAX_PAYLOAD_SIZE: usize = MAX_ADU_SIZE - HEADER_SIZE;

/// The protocol identifier of Modbus.
pub const PROTOCOL_ID: u16 = 0x0000;

/// The fixed-size header of a Modbus TCP frame.
///
/// `length` counts the bytes following the unit identifier,
/// i.e. the function code plus the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub transaction_id: TransactionId,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: UnitId,
    pub function_code: u8,
}

impl Header {
    /// Whether the function code marks an exception response.
    #[must_use]
    pub const fn is_exception(&self) -> bool {
        self.function_code & super::EXCEPTION_FLAG != 0
    }

    /// The function code with the exception flag masked out.
    #[must_use]
    pub const fn function(&self) -> FunctionCode {
        FunctionCode::new(self.function_code & !super::EXCEPTION_FLAG)
    }

    /// Number of payload bytes that follow the header.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(1)
    }
}

/// A complete Modbus TCP application data unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub transaction_id: TransactionId,
    pub unit_id: UnitId,
    pub function_code: u8,
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame with a zero transaction id.
    ///
    /// The session assigns the actual id when the frame is sent.
    #[must_use]
    pub fn new(unit_id: UnitId, function: FunctionCode, payload: impl Into<Bytes>) -> Self {
        Self {
            transaction_id: 0,
            unit_id,
            function_code: function.value(),
            payload: payload.into(),
        }
    }

    /// Total number of bytes of the encoded frame.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// The header that precedes the payload on the wire.
    ///
    /// The caller is responsible for checking the frame size before,
    /// a payload that exceeds [`MAX_PAYLOAD_SIZE`] yields a truncated length.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn header(&self) -> Header {
        debug_assert!(self.payload.len() < usize::from(u16::MAX));
        Header {
            transaction_id: self.transaction_id,
            protocol_id: PROTOCOL_ID,
            length: (self.payload.len() + 1) as u16,
            unit_id: self.unit_id,
            function_code: self.function_code,
        }
    }
}

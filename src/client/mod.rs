// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Register operations

pub mod util;

use std::borrow::Cow;

use bytes::Bytes;

use crate::{
    codec,
    frame::{tcp::Header, Address, Coil, Quantity, RegisterKind, Request, Word},
    session::{Session, Transport},
    unit::Unit,
    Error, Result,
};

/// Synchronous _Modbus_ reader
pub trait Reader {
    /// Read multiple holding registers (0x03)
    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple input registers (0x04)
    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;
}

/// Synchronous _Modbus_ writer
pub trait Writer {
    /// Write a single coil (0x05)
    fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()>;

    /// Write multiple holding registers (0x10)
    fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()>;
}

impl<T: Transport> Session<T> {
    /// Invokes a _Modbus_ function on `unit`.
    ///
    /// Returns the response header and all bytes after the function code.
    pub fn call(&mut self, unit: Unit, request: &Request<'_>) -> Result<(Header, Bytes)> {
        log::debug!("Call {:?} on unit {}", request, unit);
        let frame = codec::request_frame(unit.into(), request)?;
        self.exchange(frame)
    }

    /// Read `count` registers starting at `base_address`.
    ///
    /// Returns the raw register bytes, two bytes per register in
    /// big-endian order. Interpreting them is up to the caller, see
    /// [`util`] for common conversions.
    pub fn read_registers(
        &mut self,
        unit: Unit,
        kind: RegisterKind,
        base_address: Address,
        count: Quantity,
    ) -> Result<Bytes> {
        let request = Request::read_registers(kind, base_address, count);
        let (_, mut payload) = self.call(unit, &request)?;
        if payload.is_empty() {
            return Err(Error::UnexpectedResponse("missing byte count".into()));
        }
        let data = payload.split_off(1);
        let byte_count = payload[0];
        if usize::from(byte_count) != usize::from(count) * 2 {
            return Err(Error::UnexpectedResponse(format!(
                "received {byte_count} bytes for {count} registers"
            )));
        }
        Ok(data)
    }

    /// Write `values` to consecutive holding registers starting at `base_address`.
    pub fn write_holding_registers(
        &mut self,
        unit: Unit,
        base_address: Address,
        values: &[Word],
    ) -> Result<()> {
        let request = Request::WriteMultipleRegisters(base_address, Cow::Borrowed(values));
        let (_, payload) = self.call(unit, &request)?;
        let (rsp_address, rsp_quantity) = codec::decode_write_echo(&payload)?;
        verify_echo(
            (base_address, values.len()),
            (rsp_address, usize::from(rsp_quantity)),
        )
    }

    /// Switch the coil at `address` on or off.
    pub fn write_coil(&mut self, unit: Unit, address: Address, value: Coil) -> Result<()> {
        let request = Request::WriteSingleCoil(address, value);
        let (_, payload) = self.call(unit, &request)?;
        let (rsp_address, rsp_word) = codec::decode_write_echo(&payload)?;
        let rsp_value = codec::coil_to_bool(rsp_word)?;
        verify_echo((address, value), (rsp_address, rsp_value))
    }
}

fn verify_echo<V>(request: (Address, V), response: (Address, V)) -> Result<()>
where
    V: PartialEq + std::fmt::Debug,
{
    if request != response {
        return Err(Error::UnexpectedResponse(format!(
            "echo mismatch: expected/request = {request:?}, actual/response = {response:?}"
        )));
    }
    Ok(())
}

impl<T: Transport> Reader for Session<T> {
    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.read_registers(self.unit(), RegisterKind::Holding, addr, cnt)
            .map(|bytes| util::words_from_bytes(&bytes))
    }

    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.read_registers(self.unit(), RegisterKind::Input, addr, cnt)
            .map(|bytes| util::words_from_bytes(&bytes))
    }
}

impl<T: Transport> Writer for Session<T> {
    fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()> {
        self.write_coil(self.unit(), addr, coil)
    }

    fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()> {
        self.write_holding_registers(self.unit(), addr, words)
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoding and decoding of Modbus TCP frames.
//!
//! The decoded [`Header::length`] counts the function code and the payload.
//! On the wire the length field additionally counts the unit identifier,
//! as required by the Modbus TCP standard.

use byteorder::{BigEndian, ByteOrder as _};
use bytes::{BufMut as _, Bytes, BytesMut};

use crate::{
    frame::tcp::{Frame, Header, HEADER_SIZE, MAX_ADU_SIZE},
    Error, Result,
};

/// Number of bytes covered by the wire length but not by [`Header::length`].
const UNIT_ID_SIZE: u16 = 1;

/// Serialize a frame into a contiguous buffer.
///
/// Fails if the encoded frame would exceed [`MAX_ADU_SIZE`].
pub fn encode(frame: &Frame) -> Result<Bytes> {
    let size = frame.encoded_len();
    if size > MAX_ADU_SIZE {
        return Err(Error::InvalidArgument(format!(
            "frame of {size} bytes exceeds {MAX_ADU_SIZE} bytes"
        )));
    }
    let hdr = frame.header();
    let mut buf = BytesMut::with_capacity(size);
    buf.put_u16(hdr.transaction_id);
    buf.put_u16(hdr.protocol_id);
    buf.put_u16(hdr.length + UNIT_ID_SIZE);
    buf.put_u8(hdr.unit_id);
    buf.put_u8(hdr.function_code);
    buf.put_slice(&frame.payload);
    Ok(buf.freeze())
}

/// Parse the fixed-size header from the start of `buf`.
///
/// Bytes beyond the header are ignored.
pub fn decode_header(buf: &[u8]) -> Result<Header> {
    if buf.len() < HEADER_SIZE {
        return Err(Error::TruncatedFrame {
            expected: HEADER_SIZE,
            received: buf.len(),
        });
    }
    let wire_len = BigEndian::read_u16(&buf[4..6]);
    Ok(Header {
        transaction_id: BigEndian::read_u16(&buf[0..2]),
        protocol_id: BigEndian::read_u16(&buf[2..4]),
        length: wire_len.saturating_sub(UNIT_ID_SIZE),
        unit_id: buf[6],
        function_code: buf[7],
    })
}

#[cfg(test)]
mod tests {
    use crate::frame::{tcp::MAX_PAYLOAD_SIZE, FunctionCode};

    use super::*;

    #[test]
    fn encode_read_request() {
        let mut frame = Frame::new(
            0x01,
            FunctionCode::ReadHoldingRegisters,
            vec![0x01, 0x2C, 0x00, 0x01],
        );
        frame.transaction_id = 0x1234;
        let buf = encode(&frame).unwrap();
        assert_eq!(
            &buf[..],
            &[
                0x12, // transaction id HI
                0x34, // transaction id LO
                0x00, // protocol id HI
                0x00, // protocol id LO
                0x00, // length HI
                0x06, // length LO
                0x01, // unit id
                0x03, // function code
                0x01, 0x2C, 0x00, 0x01,
            ]
        );
    }

    #[test]
    fn decode_header_fragment() {
        let buf = [0x00, 0x11, 0x00, 0x00, 0x00];
        let err = decode_header(&buf).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedFrame {
                expected: 8,
                received: 5
            }
        ));
    }

    #[test]
    fn decode_exception_header() {
        let buf = [
            0x00, 0x2A, // transaction id
            0x00, 0x00, // protocol id
            0x00, 0x03, // length
            0x66, // unit id
            0x83, // exception = 0x80 + 0x03
            0x02, // trailing byte is not part of the header
        ];
        let hdr = decode_header(&buf).unwrap();
        assert_eq!(hdr.transaction_id, 42);
        assert_eq!(hdr.protocol_id, 0);
        assert_eq!(hdr.length, 2);
        assert_eq!(hdr.unit_id, 0x66);
        assert!(hdr.is_exception());
        assert_eq!(hdr.function(), FunctionCode::ReadHoldingRegisters);
    }

    #[test]
    fn decode_header_with_zero_length() {
        let hdr = decode_header(&[0, 0, 0, 0, 0, 0, 1, 3]).unwrap();
        assert_eq!(hdr.length, 0);
        assert_eq!(hdr.payload_len(), 0);
    }

    #[test]
    fn encode_oversized_frame() {
        let frame = Frame::new(
            1,
            FunctionCode::WriteMultipleRegisters,
            vec![0; MAX_PAYLOAD_SIZE + 1],
        );
        assert!(matches!(encode(&frame), Err(Error::InvalidArgument(_))));

        let frame = Frame::new(
            1,
            FunctionCode::WriteMultipleRegisters,
            vec![0; MAX_PAYLOAD_SIZE],
        );
        assert_eq!(encode(&frame).unwrap().len(), MAX_ADU_SIZE);
    }

    #[test]
    fn header_round_trip() {
        let samples = [
            (0u16, 0u8, 0u8),
            (1, 1, 0x03),
            (0x7FFF, 0x7F, 0x04),
            (0xFFFF, 0xFF, 0xFF),
        ];
        for (transaction_id, unit_id, function_code) in samples {
            let frame = Frame {
                transaction_id,
                unit_id,
                function_code,
                payload: Bytes::from_static(&[0xAB, 0xCD]),
            };
            let hdr = decode_header(&encode(&frame).unwrap()).unwrap();
            assert_eq!(hdr, frame.header());
        }
    }

    #[test]
    fn length_counts_payload_and_function_code() {
        for n in 0..=MAX_ADU_SIZE - 9 {
            let frame = Frame::new(1, FunctionCode::Custom(0x41), vec![0x55; n]);
            let buf = encode(&frame).unwrap();
            assert_eq!(buf.len(), HEADER_SIZE + n);
            let hdr = decode_header(&buf[..HEADER_SIZE]).unwrap();
            assert_eq!(usize::from(hdr.length), n + 1);
            assert_eq!(hdr.payload_len(), n);
        }
    }
}

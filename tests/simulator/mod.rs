// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A scripted Modbus TCP device that serves a single connection.

#![allow(dead_code)]

use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread::{self, JoinHandle},
};

use byteorder::{BigEndian, ReadBytesExt as _, WriteBytesExt as _};

/// A request as received by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub transaction_id: u16,
    pub unit_id: u8,
    pub function_code: u8,
    pub data: Vec<u8>,
}

impl RequestFrame {
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.data[0], self.data[1]])
    }

    pub fn quantity(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    /// A complete response frame that answers this request.
    pub fn respond(&self, function_code: u8, data: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(8 + data.len());
        frame.write_u16::<BigEndian>(self.transaction_id).unwrap();
        frame.write_u16::<BigEndian>(0).unwrap();
        frame
            .write_u16::<BigEndian>(u16::try_from(data.len() + 2).unwrap())
            .unwrap();
        frame.push(self.unit_id);
        frame.push(function_code);
        frame.extend_from_slice(data);
        frame
    }

    /// An exception response for this request.
    pub fn exception(&self, code: u8) -> Vec<u8> {
        self.respond(self.function_code | 0x80, &[code])
    }
}

/// What the device does after receiving a request.
pub enum Reply {
    /// Send the bytes and wait for the next request.
    Send(Vec<u8>),
    /// Send the bytes and close the connection.
    SendAndClose(Vec<u8>),
}

pub struct Simulator {
    socket_addr: SocketAddr,
    handle: JoinHandle<anyhow::Result<Vec<RequestFrame>>>,
}

impl Simulator {
    /// Listen on an ephemeral local port and answer each request with `handler`.
    pub fn start<F>(mut handler: F) -> anyhow::Result<Self>
    where
        F: FnMut(&RequestFrame) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let socket_addr = listener.local_addr()?;
        let handle = thread::spawn(move || {
            let (stream, peer_addr) = listener.accept()?;
            log::debug!("Accepted connection from {peer_addr}");
            serve(stream, &mut handler)
        });
        Ok(Self {
            socket_addr,
            handle,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.socket_addr
    }

    /// Wait until the connection has been closed and return all requests.
    pub fn join(self) -> anyhow::Result<Vec<RequestFrame>> {
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("simulator thread panicked"))?
    }
}

fn serve(
    mut stream: TcpStream,
    handler: &mut dyn FnMut(&RequestFrame) -> Reply,
) -> anyhow::Result<Vec<RequestFrame>> {
    let mut requests = Vec::new();
    loop {
        let request = match read_request(&mut stream) {
            Ok(request) => request,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset
                ) =>
            {
                break
            }
            Err(err) => return Err(err.into()),
        };
        log::debug!("Received {request:?}");
        let reply = handler(&request);
        requests.push(request);
        match reply {
            Reply::Send(bytes) => {
                stream.write_all(&bytes)?;
            }
            Reply::SendAndClose(bytes) => {
                stream.write_all(&bytes)?;
                break;
            }
        }
    }
    Ok(requests)
}

fn read_request(stream: &mut TcpStream) -> io::Result<RequestFrame> {
    let transaction_id = stream.read_u16::<BigEndian>()?;
    let protocol_id = stream.read_u16::<BigEndian>()?;
    assert_eq!(protocol_id, 0);
    let length = stream.read_u16::<BigEndian>()?;
    let unit_id = stream.read_u8()?;
    let function_code = stream.read_u8()?;
    let mut data = vec![0; usize::from(length).saturating_sub(2)];
    stream.read_exact(&mut data)?;
    Ok(RequestFrame {
        transaction_id,
        unit_id,
        function_code,
        data,
    })
}

/// A device with holding and input registers.
///
/// Requests outside of the register ranges are answered with an
/// Illegal Data Address exception, unknown functions with Illegal Function.
pub fn register_bank(
    mut holding: Vec<u16>,
    input: Vec<u16>,
) -> impl FnMut(&RequestFrame) -> Reply + Send + 'static {
    move |req| {
        let reply = match req.function_code {
            0x03 | 0x04 => {
                let registers = if req.function_code == 0x03 {
                    &holding
                } else {
                    &input
                };
                let start = usize::from(req.address());
                let end = start + usize::from(req.quantity());
                match registers.get(start..end) {
                    Some(words) => {
                        let mut data = vec![u8::try_from(words.len() * 2).unwrap()];
                        for word in words {
                            data.extend_from_slice(&word.to_be_bytes());
                        }
                        req.respond(req.function_code, &data)
                    }
                    None => req.exception(0x02),
                }
            }
            0x05 => req.respond(0x05, &req.data),
            0x10 => {
                let start = usize::from(req.address());
                let end = start + usize::from(req.quantity());
                match holding.get_mut(start..end) {
                    Some(words) => {
                        for (word, bytes) in words.iter_mut().zip(req.data[5..].chunks_exact(2)) {
                            *word = u16::from_be_bytes([bytes[0], bytes[1]]);
                        }
                        req.respond(0x10, &req.data[..4])
                    }
                    None => req.exception(0x02),
                }
            }
            _ => req.exception(0x01),
        };
        Reply::Send(reply)
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::io;

use thiserror::Error;

use crate::frame::{Exception, ExceptionResponse};

/// Error type for _Modbus_ sessions and register operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be established or failed at the socket level.
    #[error("connection error: {0}")]
    ConnectionError(#[source] io::Error),

    /// No response arrived within the configured window.
    #[error("timeout while waiting for the response")]
    Timeout,

    /// The stream was closed or timed out in the middle of a frame.
    #[error("truncated frame: expected {expected} bytes, received {received}")]
    TruncatedFrame { expected: usize, received: usize },

    /// The server responded with a _Modbus_ exception.
    #[error("exception: {0}")]
    ProtocolException(ExceptionResponse),

    /// The received response doesn't match the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The request would violate protocol limits, nothing has been sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The session has been disconnected.
    #[error("session closed")]
    SessionClosed,
}

impl Error {
    /// The _Modbus_ exception, if the server responded with one.
    #[must_use]
    pub fn exception(&self) -> Option<Exception> {
        match self {
            Self::ProtocolException(rsp) => Some(rsp.exception),
            _ => None,
        }
    }
}

impl From<ExceptionResponse> for Error {
    fn from(from: ExceptionResponse) -> Self {
        Self::ProtocolException(from)
    }
}

/// Specialized [`std::result::Result`] type.
pub type Result<T> = std::result::Result<T, Error>;

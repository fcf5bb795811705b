// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The errors raised by CIPR.
//!
//! (De)serialization failures are [`ReadError`] and [`WriteError`] from
//! `cipkit`; this module holds the errors of the layers above them: the
//! transport and session state machines, the EtherNet/IP response status
//! check, and request builders.

use std::io;

use cipkit::{ReadError, WriteError};
use thiserror::Error;

use crate::enip::EnipHeader;

/// Any error raised by CIPR.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Read(#[from] ReadError),

	#[error(transparent)]
	Write(#[from] WriteError),

	#[error(transparent)]
	Connection(#[from] ConnectionError),

	#[error(transparent)]
	Response(#[from] Box<ResponseError>),

	#[error(transparent)]
	Request(#[from] RequestError),
}

impl From<ResponseError> for Error {
	fn from(error: ResponseError) -> Self {
		Self::Response(Box::new(error))
	}
}

/// A failure of the transport or of the session/connection state machines.
///
/// Raising one of these from a send or receive path means the connection has
/// been torn down: the socket is closed and the session handle cleared.
/// State-machine misuse variants ([`ConnectionError::NotConnected`] and
/// friends) leave the connection as it was.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("failed to connect to {host}")]
	Connect {
		host: String,
		#[source]
		source: io::Error,
	},

	#[error("failed to register session with {host}")]
	Register {
		host: String,
		#[source]
		source: Box<Error>,
	},

	#[error("i/o failure on the connection")]
	Io(#[from] io::Error),

	/// A receive got a zero-length read: the peer closed the socket.
	#[error("the peer closed the connection")]
	PeerClosed,

	#[error("not connected")]
	NotConnected,

	#[error("already connected")]
	AlreadyConnected,

	#[error("session not registered")]
	SessionNotRegistered,

	#[error("session already registered")]
	SessionAlreadyRegistered,

	#[error("not cip connected")]
	NotCipConnected,

	#[error("already cip connected")]
	AlreadyCipConnected,

	/// The target rejected a Forward Open at the CIP layer. The EtherNet/IP
	/// session is still registered.
	#[error("forward open failed: {0}")]
	ForwardOpenFailed(String),

	/// The target rejected a Forward Close at the CIP layer. The connection
	/// ids are left as they were.
	#[error("forward close failed: {0}")]
	ForwardCloseFailed(String),
}

/// An EtherNet/IP response whose encapsulation header carried a nonzero
/// status.
///
/// The decoded header is kept for inspection.
#[derive(Debug, Error)]
#[error("EtherNet/IP response error ({status:#06x}): {message}")]
pub struct ResponseError {
	/// The status from the encapsulation header.
	pub status: u32,
	/// The status message, or a placeholder for an unknown status code.
	pub message: String,
	/// The response header as decoded.
	pub header: EnipHeader,
}

impl ResponseError {
	pub(crate) fn from_header(header: EnipHeader) -> Self {
		Self {
			status: header.status,
			message: header.status_message(),
			header,
		}
	}
}

/// Caller-side misuse of a request builder.
#[derive(Debug, Error)]
pub enum RequestError {
	#[error("attributes must all belong to the same object")]
	MixedObjects,

	#[error("too many attributes in one request: {0}")]
	TooManyAttributes(usize),

	#[error("{object}.{attribute} is a class attribute, not an instance attribute")]
	ClassAttribute {
		object: &'static str,
		attribute: &'static str,
	},

	#[error("{object}.{attribute} is an instance attribute, not a class attribute")]
	InstanceAttribute {
		object: &'static str,
		attribute: &'static str,
	},

	#[error("route must be pairs of port and link, got an odd number of segments: {0:?}")]
	UnpairedRoute(Vec<String>),

	#[error("invalid route segment {segment:?}: {reason}")]
	InvalidRoute { segment: String, reason: String },
}

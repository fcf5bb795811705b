// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The blocking TCP transport under an EtherNet/IP session.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, trace};

use crate::error::ConnectionError;

/// One blocking TCP socket.
///
/// The configured timeout applies to connecting, reading, and writing alike,
/// and is the only cancellation mechanism: a request that outlives it fails
/// and tears the connection down.
#[derive(Debug, Default)]
pub struct TcpTransport {
	stream: Option<TcpStream>,
}

impl TcpTransport {
	#[must_use]
	pub const fn new() -> Self {
		Self { stream: None }
	}

	#[must_use]
	pub const fn connected(&self) -> bool {
		self.stream.is_some()
	}

	/// Opens the socket.
	///
	/// # Errors
	///
	/// [`ConnectionError::Connect`] if resolution or the connect itself
	/// fails or times out.
	pub fn connect(
		&mut self, host: &str, port: u16, timeout: Duration,
	) -> Result<(), ConnectionError> {
		let connect_error = |source| ConnectionError::Connect {
			host: format!("{host}:{port}"),
			source,
		};

		let address: SocketAddr = (host, port)
			.to_socket_addrs()
			.map_err(connect_error)?
			.next()
			.ok_or_else(|| {
				connect_error(ErrorKind::AddrNotAvailable.into())
			})?;

		let stream = TcpStream::connect_timeout(&address, timeout).map_err(connect_error)?;
		stream.set_read_timeout(Some(timeout)).map_err(connect_error)?;
		stream.set_write_timeout(Some(timeout)).map_err(connect_error)?;
		stream.set_nodelay(true).map_err(connect_error)?;

		debug!("connected to {address}");
		self.stream = Some(stream);

		Ok(())
	}

	fn stream(&mut self) -> Result<&mut TcpStream, ConnectionError> {
		self.stream.as_mut().ok_or(ConnectionError::NotConnected)
	}

	/// Writes the whole message.
	///
	/// # Errors
	///
	/// [`ConnectionError`] on any socket error; the socket is closed first.
	pub fn send(&mut self, message: &[u8]) -> Result<(), ConnectionError> {
		trace!(">> sent >> {message:02x?}");

		let result = self.stream()?.write_all(message);
		result.map_err(|error| self.fail(error.into()))
	}

	/// Reads exactly `count` bytes.
	///
	/// A zero-length read means the peer closed the socket, which fails the
	/// call with [`ConnectionError::PeerClosed`].
	///
	/// # Errors
	///
	/// [`ConnectionError`] on any socket error; the socket is closed first.
	pub fn receive(&mut self, count: usize) -> Result<Vec<u8>, ConnectionError> {
		let mut bytes = vec![0; count];

		let result = self.stream()?.read_exact(&mut bytes);
		if let Err(error) = result {
			let error = if error.kind() == ErrorKind::UnexpectedEof {
				ConnectionError::PeerClosed
			} else {
				error.into()
			};

			return Err(self.fail(error));
		}

		trace!("<< received << {bytes:02x?}");

		Ok(bytes)
	}

	/// Closes the socket and reports `error`.
	fn fail(&mut self, error: ConnectionError) -> ConnectionError {
		debug!("socket failure, closing: {error}");
		self.close();

		error
	}

	/// Shuts the socket down, ignoring errors from an already-dead peer.
	pub fn close(&mut self) {
		if let Some(stream) = self.stream.take() {
			let _ = stream.shutdown(Shutdown::Both);
		}
	}
}

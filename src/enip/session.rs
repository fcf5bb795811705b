// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The EtherNet/IP session state machine.

use std::time::Duration;

use cipkit::{Readable, Writable};
use log::{debug, error, info};

use crate::error::{ConnectionError, Error, ResponseError};

use super::cpf::{CommonPacketFormat, CpfItem, IdentityItem, ServiceItem};
use super::data::{CpfItemList, RegisterSessionData, SendDataPayload};
use super::header::{EncapsCommand, EnipHeader};
use super::transport::TcpTransport;
use super::ETHERNET_IP_PORT;

/// How long to wait for a connect, a send, or a receive before giving up.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The transport-level configuration of a session.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EnipConfig {
	pub host: String,
	pub port: u16,
	pub timeout: Duration,
	/// Echoed back by the target in every response header.
	pub sender_context: [u8; 8],
}

impl EnipConfig {
	/// A configuration for `host` with the standard port, a five second
	/// timeout, and a zero sender context.
	pub fn new(host: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			port: ETHERNET_IP_PORT,
			timeout: DEFAULT_TIMEOUT,
			sender_context: [0; 8],
		}
	}
}

/// A decoded EtherNet/IP response: the header and the typed payload.
#[derive(Clone, Debug)]
pub struct EnipResponse<T> {
	pub header: EnipHeader,
	pub data: T,
}

impl<T> EnipResponse<T> {
	/// Whether the encapsulation status reports success.
	#[must_use]
	pub fn is_ok(&self) -> bool {
		self.header.status == super::header::status::SUCCESS
	}

	/// The response, or a [`ResponseError`] carrying the header if its
	/// status is nonzero.
	///
	/// # Errors
	///
	/// [`ResponseError`] for a nonzero encapsulation status.
	pub fn ok(self) -> Result<Self, ResponseError> {
		if self.is_ok() {
			Ok(self)
		} else {
			Err(ResponseError::from_header(self.header))
		}
	}
}

/// An EtherNet/IP session over one TCP connection.
///
/// `connect` opens the socket and immediately registers the session; every
/// other command requires the registered session handle. Transport failures
/// close the socket and clear the handle, reverting the session to closed.
#[derive(Debug)]
pub struct EnipSession {
	config: EnipConfig,
	transport: TcpTransport,
	session_id: u32,
}

impl EnipSession {
	#[must_use]
	pub const fn new(config: EnipConfig) -> Self {
		Self {
			config,
			transport: TcpTransport::new(),
			session_id: 0,
		}
	}

	#[must_use]
	pub const fn config(&self) -> &EnipConfig {
		&self.config
	}

	/// Whether the socket is open and the session registered.
	#[must_use]
	pub const fn connected(&self) -> bool {
		self.transport.connected() && self.session_id != 0
	}

	/// The session handle granted by the target, zero when unregistered.
	#[must_use]
	pub const fn session_id(&self) -> u32 {
		self.session_id
	}

	/// Opens the socket and registers the session.
	///
	/// On any failure the state reverts to closed and the session id is
	/// cleared.
	///
	/// # Errors
	///
	/// [`ConnectionError::AlreadyConnected`] when called on a live session;
	/// [`ConnectionError::Connect`] and [`ConnectionError::Register`] for
	/// the two setup stages.
	pub fn connect(&mut self) -> Result<(), ConnectionError> {
		if self.connected() {
			return Err(ConnectionError::AlreadyConnected);
		}

		self.transport
			.connect(&self.config.host, self.config.port, self.config.timeout)?;

		self.session_id = 0;
		if let Err(error) = self.register_session() {
			self.session_id = 0;
			self.transport.close();

			return Err(ConnectionError::Register {
				host: format!("{}:{}", self.config.host, self.config.port),
				source: Box::new(error),
			});
		}

		Ok(())
	}

	/// Registers the session and stores the granted handle.
	///
	/// # Errors
	///
	/// [`ConnectionError::SessionAlreadyRegistered`] when one is live, and
	/// any transport or response failure.
	pub fn register_session(&mut self) -> Result<(), Error> {
		if self.session_id != 0 {
			return Err(ConnectionError::SessionAlreadyRegistered.into());
		}

		let payload = RegisterSessionData::default().to_bytes()?;
		let response: EnipResponse<crate::types::Blob> =
			self.exchange(EncapsCommand::RegisterSession, &payload)?;
		let response = response.ok()?;

		self.session_id = response.header.session;
		info!(
			"registered session {:#010x} with {}",
			self.session_id, self.config.host
		);

		Ok(())
	}

	/// Unregisters the session. The command has no reply.
	///
	/// # Errors
	///
	/// [`ConnectionError::SessionNotRegistered`] without a session, and any
	/// transport failure.
	pub fn unregister_session(&mut self) -> Result<(), Error> {
		if self.session_id == 0 {
			return Err(ConnectionError::SessionNotRegistered.into());
		}

		let result = self.send_frame(EncapsCommand::UnregisterSession, &[]);
		self.session_id = 0;

		result?;
		debug!("unregistered session with {}", self.config.host);

		Ok(())
	}

	/// Best-effort teardown: unregister if registered, then close the
	/// socket. Errors are logged and suppressed so every step runs.
	pub fn disconnect(&mut self) {
		if self.session_id != 0 && self.transport.connected() {
			if let Err(err) = self.unregister_session() {
				debug!("failed to unregister session: {err}");
			}
		}

		self.session_id = 0;
		self.transport.close();
		debug!("disconnected from {}", self.config.host);
	}

	/// Sends an encapsulated no-op.
	///
	/// # Errors
	///
	/// Any transport failure.
	pub fn nop(&mut self) -> Result<(), Error> {
		self.send_frame(EncapsCommand::Nop, &[])
	}

	/// Asks the target to identify itself.
	///
	/// # Errors
	///
	/// Any transport, response, or decode failure.
	pub fn list_identity(&mut self) -> Result<Option<IdentityItem>, Error> {
		let response: EnipResponse<CpfItemList> =
			self.exchange(EncapsCommand::ListIdentity, &[])?;

		Ok(response
			.ok()?
			.data
			.items
			.into_iter()
			.find_map(|item| match item {
				CpfItem::Identity(identity) => Some(identity),
				_ => None,
			}))
	}

	/// Lists the communication services the target supports.
	///
	/// # Errors
	///
	/// Any transport, response, or decode failure.
	pub fn list_services(&mut self) -> Result<Vec<ServiceItem>, Error> {
		let response: EnipResponse<CpfItemList> =
			self.exchange(EncapsCommand::ListServices, &[])?;

		Ok(response
			.ok()?
			.data
			.items
			.into_iter()
			.filter_map(|item| match item {
				CpfItem::Services(services) => Some(services),
				_ => None,
			})
			.collect())
	}

	/// Lists the target's configurable interfaces.
	///
	/// # Errors
	///
	/// Any transport, response, or decode failure.
	pub fn list_interfaces(&mut self) -> Result<CpfItemList, Error> {
		let response: EnipResponse<CpfItemList> =
			self.exchange(EncapsCommand::ListInterfaces, &[])?;

		Ok(response.ok()?.data)
	}

	/// Sends an unconnected CIP message in a SendRRData frame and returns
	/// the peer's payload.
	///
	/// # Errors
	///
	/// [`ConnectionError::NotConnected`] without a session, and any
	/// transport, response, or decode failure.
	pub fn send_rr_data(&mut self, message: Vec<u8>) -> Result<EnipResponse<SendDataPayload>, Error> {
		if !self.connected() {
			return Err(ConnectionError::NotConnected.into());
		}

		let payload = SendDataPayload::new(CommonPacketFormat::unconnected(message)).to_bytes()?;

		self.exchange(EncapsCommand::SendRRData, &payload)
	}

	/// Sends a connected CIP message in a SendUnitData frame and returns the
	/// peer's payload.
	///
	/// # Errors
	///
	/// [`ConnectionError::NotConnected`] without a session, and any
	/// transport, response, or decode failure.
	pub fn send_unit_data(
		&mut self, connection_id: u32, message: Vec<u8>,
	) -> Result<EnipResponse<SendDataPayload>, Error> {
		if !self.connected() {
			return Err(ConnectionError::NotConnected.into());
		}

		let payload =
			SendDataPayload::new(CommonPacketFormat::connected(connection_id, message)).to_bytes()?;

		self.exchange(EncapsCommand::SendUnitData, &payload)
	}

	/// Runs a transport call, clearing the session handle if it fails: the
	/// transport closes its socket on failure, reverting the session to
	/// closed.
	fn transport_call<T>(
		&mut self, call: impl FnOnce(&mut TcpTransport) -> Result<T, ConnectionError>,
	) -> Result<T, ConnectionError> {
		call(&mut self.transport).map_err(|error| {
			self.session_id = 0;

			error
		})
	}

	/// Writes one frame without waiting for a reply.
	fn send_frame(&mut self, command: EncapsCommand, payload: &[u8]) -> Result<(), Error> {
		let message = self.encode_frame(command, payload)?;
		self.transport_call(|transport| transport.send(&message))?;

		Ok(())
	}

	/// Writes one frame and reads and decodes the matching reply.
	fn exchange<T: Readable>(
		&mut self, command: EncapsCommand, payload: &[u8],
	) -> Result<EnipResponse<T>, Error> {
		let message = self.encode_frame(command, payload)?;
		self.transport_call(|transport| transport.send(&message))?;

		let header_bytes = self.transport_call(|transport| transport.receive(24))?;
		let header = match EnipHeader::read_from(&mut &header_bytes[..]) {
			Ok(header) => header,
			Err(err) => {
				error!("failed to decode response header: {err}");
				self.fail();

				return Err(err.into());
			},
		};
		debug!("received {header}");

		let body = self.transport_call(|transport| transport.receive(usize::from(header.length)))?;
		let data = match T::read_from(&mut &body[..]) {
			Ok(data) => data,
			Err(err) if header.status != super::header::status::SUCCESS => {
				// A failed response need not carry a decodable payload; the
				// caller surfaces the header status instead.
				debug!("undecodable payload on failed response: {err}");

				return Err(ResponseError::from_header(header).into());
			},
			Err(err) => return Err(err.into()),
		};

		Ok(EnipResponse { header, data })
	}

	fn encode_frame(&mut self, command: EncapsCommand, payload: &[u8]) -> Result<Vec<u8>, Error> {
		if !self.transport.connected() {
			return Err(ConnectionError::NotConnected.into());
		}
		if command != EncapsCommand::RegisterSession && self.session_id == 0 {
			return Err(ConnectionError::SessionNotRegistered.into());
		}

		let length = u16::try_from(payload.len()).map_err(|_| {
			cipkit::WriteError::LengthOverflow {
				length: payload.len(),
				prefix: "u16",
			}
		})?;

		let header = EnipHeader::request(
			command,
			self.session_id,
			length,
			self.config.sender_context,
		);

		let mut message = header.to_bytes()?;
		message.extend_from_slice(payload);

		Ok(message)
	}

	/// Tears the connection down after a protocol-level failure.
	fn fail(&mut self) {
		self.session_id = 0;
		self.transport.close();
	}
}

impl Drop for EnipSession {
	fn drop(&mut self) {
		if self.transport.connected() {
			self.disconnect();
		}
	}
}

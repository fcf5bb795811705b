// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP connection state machine.

use std::fmt;

use cipkit::{ReadError, Readable, Writable};
use log::{debug, error, info};
use rand::Rng;

use crate::enip::{EnipConfig, EnipSession};
use crate::error::{ConnectionError, Error};
use crate::epath::{LogicalSegment, PaddedEpathLen, PaddedEpathPadLen};
use crate::types::{Blob, Dword, Word};

use super::object::{
	self,
	AttributeDescriptor,
	AttributeType,
	CipAttribute,
	CipObject,
	GetAttributeListResponse,
	StandardClassAttrs,
};
use super::objects::{
	ConnectionManager,
	ConnectionPriority,
	ConnectionType,
	ForwardCloseRequest,
	ForwardOpenRequest,
	ForwardOpenResponse,
	LargeForwardOpenRequest,
	MessageRouter,
	ProductionTrigger,
	TickTime,
	TimeoutMultiplier,
	TransportClass,
	UnconnectedSendFailedResponse,
};
use super::request::{CipRequest, CipResponse, ResponseData};
use super::route::CipRoute;

/// The largest connection size a standard Forward Open can carry; anything
/// bigger selects the Large Forward Open.
pub const STANDARD_CONNECTION_SIZE: u16 = 511;
/// The connection size commonly used with Large Forward Open.
pub const LARGE_CONNECTION_SIZE: u16 = 4000;

/// The vendor id this library identifies itself with in Forward Open
/// requests when the configuration does not supply one.
pub const DEFAULT_VENDOR_ID: u16 = 0xA455;

/// The default RPI, in microseconds.
const DEFAULT_RPI: u32 = 2_113_537;

/// Parameters of unconnected requests: how long the target may take.
///
/// The request timeout is `tick_time * num_ticks`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct UnconnectedConfig {
	pub tick_time: TickTime,
	pub num_ticks: u8,
}

impl Default for UnconnectedConfig {
	fn default() -> Self {
		Self {
			tick_time: TickTime::Ms1024,
			num_ticks: 1,
		}
	}
}

/// Parameters of the CIP connection negotiated by Forward Open.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ConnectedConfig {
	pub connection_type: ConnectionType,
	pub priority: ConnectionPriority,
	/// Variable (true) or fixed (false) connection sizing.
	pub variable_size: bool,
	/// The connection size in bytes; sizes above
	/// [`STANDARD_CONNECTION_SIZE`] select the Large Forward Open.
	pub size: u16,
	pub redundant_owner: bool,
	/// The originator-to-target connection id; zero lets the target assign
	/// one.
	pub o2t_connection_id: u32,
	/// The target-to-originator connection id; zero generates a random one.
	pub t2o_connection_id: u32,
	/// The connection serial number; zero generates a random one.
	pub connection_serial: u16,
	pub vendor_id: u16,
	/// The originator serial number; zero generates a random one.
	pub originator_serial: u32,
	pub timeout_multiplier: TimeoutMultiplier,
	/// The originator-to-target requested packet interval, microseconds.
	pub o2t_rpi: u32,
	/// The target-to-originator requested packet interval, microseconds.
	pub t2o_rpi: u32,
	/// Whether the target is the server of the connection.
	pub server: bool,
	pub production_trigger: ProductionTrigger,
	pub transport_class: TransportClass,
}

impl Default for ConnectedConfig {
	fn default() -> Self {
		Self {
			connection_type: ConnectionType::PointToPoint,
			priority: ConnectionPriority::High,
			variable_size: true,
			size: STANDARD_CONNECTION_SIZE,
			redundant_owner: false,
			o2t_connection_id: 0,
			t2o_connection_id: 0,
			connection_serial: 0,
			vendor_id: DEFAULT_VENDOR_ID,
			originator_serial: 0,
			timeout_multiplier: TimeoutMultiplier::X512,
			o2t_rpi: DEFAULT_RPI,
			t2o_rpi: DEFAULT_RPI,
			server: true,
			production_trigger: ProductionTrigger::ApplicationObject,
			transport_class: TransportClass::Class3,
		}
	}
}

/// The full configuration of a [`CipConnection`].
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct CipConfig {
	/// The route to the target; empty to address the directly-connected
	/// device.
	pub route: CipRoute,
	pub unconnected: UnconnectedConfig,
	pub connected: ConnectedConfig,
}

/// A CIP connection over an EtherNet/IP session.
///
/// The lifecycle runs from closed to connected (TCP plus a registered
/// session) to CIP-connected (after a Forward Open), and back down the same
/// way. One request runs at
/// a time; a connection is not meant to be shared across threads, so
/// callers that need parallelism open more connections.
#[derive(Debug)]
pub struct CipConnection {
	config: CipConfig,
	session: EnipSession,
	/// The connected-messaging sequence count most recently used.
	sequence: u16,
}

impl CipConnection {
	#[must_use]
	pub const fn new(enip: EnipConfig, config: CipConfig) -> Self {
		Self {
			config,
			session: EnipSession::new(enip),
			sequence: 0,
		}
	}

	#[must_use]
	pub const fn config(&self) -> &CipConfig {
		&self.config
	}

	#[must_use]
	pub const fn route(&self) -> &CipRoute {
		&self.config.route
	}

	/// Whether the EtherNet/IP session is registered.
	#[must_use]
	pub const fn connected(&self) -> bool {
		self.session.connected()
	}

	/// The EtherNet/IP session handle, zero when unregistered.
	#[must_use]
	pub const fn session_id(&self) -> u32 {
		self.session.session_id()
	}

	/// Whether a Forward Open has established a connection with the
	/// target's Message Router.
	#[must_use]
	pub const fn cip_connected(&self) -> bool {
		self.connected() && self.config.connected.o2t_connection_id != 0
	}

	/// The host, extended with the route when one is configured.
	#[must_use]
	pub fn connection_path(&self) -> String {
		if self.config.route.is_empty() {
			self.session.config().host.clone()
		} else {
			format!("{}/{}", self.session.config().host, self.config.route)
		}
	}

	/// Opens the TCP connection and registers the EtherNet/IP session.
	///
	/// # Errors
	///
	/// [`ConnectionError::AlreadyConnected`] on a live connection, or
	/// whatever the session setup fails with.
	pub fn connect(&mut self) -> Result<(), ConnectionError> {
		if self.connected() {
			return Err(ConnectionError::AlreadyConnected);
		}

		self.session.connect()
	}

	/// Tears the connection down: Forward Close if CIP-connected, then
	/// session unregistration, then socket close. The later steps run even
	/// when an earlier one fails; failures are logged and suppressed.
	///
	/// # Errors
	///
	/// [`ConnectionError::NotConnected`] when there is nothing to tear
	/// down.
	pub fn disconnect(&mut self) -> Result<(), ConnectionError> {
		if !self.connected() {
			return Err(ConnectionError::NotConnected);
		}

		if self.cip_connected() {
			if let Err(err) = self.forward_close() {
				debug!("failed to forward close during disconnect: {err}");
			}
		}
		self.session.disconnect();

		Ok(())
	}

	/// Establishes a CIP connection with the target's Message Router.
	///
	/// Picks the Large Forward Open when the configured size is above
	/// [`STANDARD_CONNECTION_SIZE`]; fills zero-configured connection ids
	/// and serials with random values; on success records the granted ids
	/// and resets the sequence count. A CIP-level rejection leaves the
	/// EtherNet/IP session registered.
	///
	/// # Errors
	///
	/// [`ConnectionError::AlreadyCipConnected`] when already connected;
	/// [`ConnectionError::ForwardOpenFailed`] on a CIP-level rejection; and
	/// any transport or response failure.
	pub fn forward_open(&mut self) -> Result<(), Error> {
		if !self.connected() {
			return Err(ConnectionError::NotConnected.into());
		}
		if self.cip_connected() {
			return Err(ConnectionError::AlreadyCipConnected.into());
		}

		info!("beginning forward open to {}", self.connection_path());
		let request = self.build_forward_open_request()?;
		let response = self.exchange_rr(&request)?;

		if !response.is_ok() {
			error!("forward open failed: {}", response.status_message);

			return Err(ConnectionError::ForwardOpenFailed(response.status_message).into());
		}

		if let ResponseData::Success(granted) = response.data {
			self.record_forward_open(&granted);
			info!(
				"forward open succeeded, o->t connection id: {}",
				granted.o2t_connection_id
			);
		}

		Ok(())
	}

	fn record_forward_open(&mut self, granted: &ForwardOpenResponse) {
		let connected = &mut self.config.connected;
		connected.o2t_connection_id = granted.o2t_connection_id;
		connected.t2o_connection_id = granted.t2o_connection_id;
		connected.connection_serial = granted.connection_serial;
		connected.originator_serial = granted.originator_serial;

		self.sequence = 0;
	}

	fn build_forward_open_request(
		&mut self,
	) -> Result<CipRequest<ForwardOpenResponse, super::objects::ForwardOpenFailedResponse>, Error>
	{
		debug!("building forward open request for {}", self.connection_path());

		let unconnected = self.config.unconnected;
		let cfg = &mut self.config.connected;

		let mut rng = rand::thread_rng();
		if cfg.t2o_connection_id == 0 {
			cfg.t2o_connection_id = rng.gen_range(1..=u32::MAX);
		}
		if cfg.connection_serial == 0 {
			cfg.connection_serial = rng.gen_range(1..=u16::MAX);
		}
		if cfg.originator_serial == 0 {
			cfg.originator_serial = rng.gen_range(1..=u32::MAX);
		}

		let mut transport_class_trigger =
			cfg.transport_class as u8 | cfg.production_trigger as u8;
		if cfg.server {
			transport_class_trigger |= 0b_1000_0000;
		}

		let mut params = cfg.connection_type as u16 | cfg.priority as u16;
		if cfg.redundant_owner {
			params |= 1 << 15;
		}
		if cfg.variable_size {
			params |= 1 << 9;
		}

		let connection_path = PaddedEpathLen(
			self.config.route.epath()
				/ LogicalSegment::class_id(MessageRouter::CLASS_CODE)
				/ LogicalSegment::instance_id(0x01),
		);

		let request = if cfg.size > STANDARD_CONNECTION_SIZE {
			let net_params = Dword(u32::from(params) << 16 | u32::from(cfg.size));

			ConnectionManager::large_forward_open(&LargeForwardOpenRequest {
				priority_tick_time: unconnected.tick_time as u8,
				timeout_ticks: unconnected.num_ticks,
				o2t_connection_id: 0,
				t2o_connection_id: cfg.t2o_connection_id,
				connection_serial: cfg.connection_serial,
				originator_vendor_id: cfg.vendor_id,
				originator_serial: cfg.originator_serial,
				timeout_multiplier: cfg.timeout_multiplier as u8,
				o2t_rpi: cfg.o2t_rpi,
				o2t_connection_params: net_params,
				t2o_rpi: cfg.t2o_rpi,
				t2o_connection_params: net_params,
				transport_class_trigger,
				connection_path,
			})?
		} else {
			let net_params = Word(params | cfg.size);

			ConnectionManager::forward_open(&ForwardOpenRequest {
				priority_tick_time: unconnected.tick_time as u8,
				timeout_ticks: unconnected.num_ticks,
				o2t_connection_id: 0,
				t2o_connection_id: cfg.t2o_connection_id,
				connection_serial: cfg.connection_serial,
				originator_vendor_id: cfg.vendor_id,
				originator_serial: cfg.originator_serial,
				timeout_multiplier: cfg.timeout_multiplier as u8,
				o2t_rpi: cfg.o2t_rpi,
				o2t_connection_params: net_params,
				t2o_rpi: cfg.t2o_rpi,
				t2o_connection_params: net_params,
				transport_class_trigger,
				connection_path,
			})?
		};

		Ok(request)
	}

	/// Closes the CIP connection with the serials negotiated at Forward
	/// Open. Success clears the connection ids and serials; the
	/// EtherNet/IP session stays registered.
	///
	/// # Errors
	///
	/// [`ConnectionError::NotCipConnected`] without a CIP connection;
	/// [`ConnectionError::ForwardCloseFailed`] on a CIP-level rejection;
	/// and any transport or response failure.
	pub fn forward_close(&mut self) -> Result<(), Error> {
		if !self.cip_connected() {
			return Err(ConnectionError::NotCipConnected.into());
		}

		let connection_path = PaddedEpathPadLen(
			self.config.route.epath()
				/ LogicalSegment::class_id(MessageRouter::CLASS_CODE)
				/ LogicalSegment::instance_id(0x01),
		);

		let request = ConnectionManager::forward_close(&ForwardCloseRequest {
			priority_tick_time: self.config.unconnected.tick_time as u8,
			timeout_ticks: self.config.unconnected.num_ticks,
			connection_serial: self.config.connected.connection_serial,
			originator_vendor_id: self.config.connected.vendor_id,
			originator_serial: self.config.connected.originator_serial,
			connection_path,
		})?;

		let response = self.exchange_rr(&request)?;
		if !response.is_ok() {
			error!("forward close failed: {}", response.status_message);

			return Err(ConnectionError::ForwardCloseFailed(response.status_message).into());
		}

		let connected = &mut self.config.connected;
		connected.o2t_connection_id = 0;
		connected.t2o_connection_id = 0;
		connected.connection_serial = 0;
		connected.originator_serial = 0;
		info!("forward close succeeded");

		Ok(())
	}

	/// Sends a request the way the connection state suggests: connected
	/// when CIP-connected, unconnected otherwise. Pass `Some(true)` or
	/// `Some(false)` to force one or the other.
	///
	/// # Errors
	///
	/// Any transport, response, or decode failure; state-machine misuse
	/// when forcing a mode the connection is not in.
	pub fn send<T: 'static>(
		&mut self, request: CipRequest<T>, cip_connected: Option<bool>,
	) -> Result<CipResponse<T>, Error> {
		if cip_connected.unwrap_or_else(|| self.cip_connected()) {
			self.connected_send(request)
		} else {
			self.unconnected_send(request, None, None)
		}
	}

	/// Sends a request unconnected. A nonempty route (the override, or the
	/// configured one) wraps the request in an Unconnected Send against the
	/// Connection Manager; an empty route sends it as-is.
	///
	/// # Errors
	///
	/// Any transport, response, or decode failure.
	pub fn unconnected_send<T: 'static>(
		&mut self, request: CipRequest<T>, config: Option<UnconnectedConfig>,
		route: Option<&CipRoute>,
	) -> Result<CipResponse<T>, Error> {
		if !self.connected() {
			return Err(ConnectionError::NotConnected.into());
		}

		let route = route.unwrap_or(&self.config.route).clone();
		debug!("sending unconnected request: {request:?}");

		if route.is_empty() {
			return self.exchange_rr(&request);
		}

		let unconnected = config.unwrap_or(self.config.unconnected);
		let wrapped = ConnectionManager::unconnected_send(
			request,
			&route,
			unconnected.tick_time,
			unconnected.num_ticks,
		)?;

		let response = self.exchange_rr(&wrapped)?;

		// Convenience senders carry raw-byte failure bodies; the route-level
		// detail survives in the status message and the raw reply data.
		Ok(response.map_failure(|_: UnconnectedSendFailedResponse, message| {
			Blob(message.data.clone())
		}))
	}

	/// Sends a request over the CIP connection, sequenced for transport
	/// classes 1 through 3.
	///
	/// # Errors
	///
	/// [`ConnectionError::NotCipConnected`] without a CIP connection, and
	/// any transport, response, or decode failure.
	pub fn connected_send<T: 'static>(
		&mut self, request: CipRequest<T>,
	) -> Result<CipResponse<T>, Error> {
		if !self.cip_connected() {
			return Err(ConnectionError::NotCipConnected.into());
		}

		debug!("sending connected request: {request:?}");

		let sequenced = self.config.connected.transport_class.sequenced();
		let mut message = Vec::new();
		if sequenced {
			self.next_sequence().write_to(&mut message)?;
		}
		request.message.write_to(&mut message)?;

		let response = self
			.session
			.send_unit_data(self.config.connected.o2t_connection_id, message)?
			.ok()?;

		let mut data = response.data.packet.data_bytes().ok_or_else(|| {
			ReadError::invalid("SendDataPayload", "response carries no data item")
		})?;

		if sequenced {
			// peel the echoed sequence count before the reply proper
			let reply_sequence = u16::read_from(&mut data)?;
			debug!("response sequence number: {reply_sequence}");
		}

		Ok(request.parse_response(data)?)
	}

	/// The next connected-messaging sequence count: 1 through 65535,
	/// wrapping back to 1.
	fn next_sequence(&mut self) -> u16 {
		self.sequence = match self.sequence {
			u16::MAX => 1,
			current => current + 1,
		};

		self.sequence
	}

	/// Sends one unconnected frame and parses the reply with the request's
	/// parser.
	fn exchange_rr<T, F: fmt::Display>(
		&mut self, request: &CipRequest<T, F>,
	) -> Result<CipResponse<T, F>, Error> {
		let message = request.message.to_bytes()?;
		let response = self.session.send_rr_data(message)?.ok()?;

		let data = response.data.packet.data_bytes().ok_or_else(|| {
			ReadError::invalid("SendDataPayload", "response carries no data item")
		})?;

		Ok(request.parse_response(data)?)
	}

	// --- Convenience services ---

	/// Reads every get-all instance attribute of `O` at once.
	///
	/// # Errors
	///
	/// As [`CipConnection::send`].
	pub fn get_attributes_all<O: CipObject>(
		&mut self, instance: u32, cip_connected: Option<bool>,
	) -> Result<CipResponse<O::InstanceAttrs>, Error> {
		info!("sending get_attributes_all request for {}", O::NAME);
		let response = self.send(object::get_attributes_all::<O>(instance), cip_connected)?;

		if response.is_ok() {
			debug!("get_attributes_all succeeded: {:?}", response.data);
		} else {
			error!(
				"get_attributes_all for {} failed: {}",
				O::NAME,
				response.status_message
			);
		}

		Ok(response)
	}

	/// Reads the standard class attributes of `O`.
	///
	/// # Errors
	///
	/// As [`CipConnection::send`].
	pub fn get_class_attributes_all<O: CipObject>(
		&mut self, cip_connected: Option<bool>,
	) -> Result<CipResponse<StandardClassAttrs>, Error> {
		info!("sending class get_attributes_all request for {}", O::NAME);

		self.send(object::get_class_attributes_all::<O>(), cip_connected)
	}

	/// Reads a single attribute.
	///
	/// # Errors
	///
	/// As [`CipConnection::send`].
	pub fn get_attribute_single<T: AttributeType>(
		&mut self, attribute: &CipAttribute<T>, instance: u32, cip_connected: Option<bool>,
	) -> Result<CipResponse<T>, Error> {
		info!("sending get_attribute_single request for {attribute}");
		let response = self.send(
			object::get_attribute_single(attribute, instance)?,
			cip_connected,
		)?;

		if !response.is_ok() {
			error!(
				"get_attribute_single for {attribute} failed: {}",
				response.status_message
			);
		}

		Ok(response)
	}

	/// Reads several attributes of one object in a single request.
	///
	/// # Errors
	///
	/// [`crate::RequestError`] if the attributes span objects, then as
	/// [`CipConnection::send`].
	pub fn get_attribute_list(
		&mut self, attributes: &[&dyn AttributeDescriptor], instance: u32,
		cip_connected: Option<bool>,
	) -> Result<CipResponse<GetAttributeListResponse>, Error> {
		info!("sending get_attribute_list request for {} attributes", attributes.len());

		let request = object::get_attribute_list(attributes, instance)?;
		self.send(request, cip_connected)
	}
}

impl Drop for CipConnection {
	/// Best-effort teardown; the session closes its socket on its own drop.
	fn drop(&mut self) {
		if self.connected() {
			let _ = self.disconnect();
		}
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Connection Manager object: Forward Open, Forward Close, and
//! Unconnected Send.

use std::fmt;

use cipkit::{
	read_bytes,
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	LengthPrefix,
	ReadResult,
	Readable,
	Writable,
	WriteError,
	WriteResult,
};

use crate::cip::message_router::{MessageRouterRequest, MessageRouterResponse};
use crate::cip::object::{CipAttribute, CipObject, StatusEntry};
use crate::cip::request::{CipRequest, ResponseParser};
use crate::cip::route::CipRoute;
use crate::epath::{PaddedEpathLen, PaddedEpathPadLen};
use crate::types::{Dword, Word};

use super::general_status;

/// The Connection Manager object: manages the device's resources for both
/// I/O and explicit-messaging connections.
#[derive(Debug)]
pub struct ConnectionManager;

impl CipObject for ConnectionManager {
	const CLASS_CODE: u16 = 0x06;
	const NAME: &'static str = "ConnectionManager";

	type InstanceAttrs = crate::types::Blob;

	fn status_codes() -> &'static [StatusEntry] {
		&[
			StatusEntry {
				service: None,
				general: Some(general_status::CONNECTION_FAILURE),
				extended: CONNECTION_FAILURE_STATUSES,
				fallback: None,
			},
			StatusEntry {
				service: None,
				general: Some(general_status::INVALID_ATTRIBUTE),
				extended: &[],
				// the extended status is the index of the erroring element
				// in the data segment
				fallback: Some("Error in data segment for forward open request"),
			},
		]
	}

	fn customize_extended_status(
		general_status: u8, ext_status: u16, ext_extra: &[u16],
	) -> Option<String> {
		if ext_status == ext_status_code::INVALID_CONNECTION_SIZE {
			if let Some(max_supported_size) = ext_extra.first() {
				return Some(format!("max_supported_size={max_supported_size}"));
			}
		}
		if general_status == general_status::INVALID_ATTRIBUTE {
			return Some(format!("DataSegment error at index {ext_status}"));
		}
		if general_status == general_status::OBJECT_STATE_CONFLICT {
			return Some(format!("state={ext_status:#06x}"));
		}

		None
	}
}

/// Service codes of the Connection Manager.
pub mod service_code {
	pub const FORWARD_CLOSE: u8 = 0x4E;
	pub const UNCONNECTED_SEND: u8 = 0x52;
	pub const FORWARD_OPEN: u8 = 0x54;
	pub const LARGE_FORWARD_OPEN: u8 = 0x5B;
}

/// The extended status codes the Connection Manager attaches to general
/// status 0x01, connection failure.
pub mod ext_status_code {
	pub const CONNECTION_IN_USE: u16 = 0x0100;
	pub const INVALID_CONNECTION_SIZE: u16 = 0x0109;
	pub const CONNECTION_TIMEOUT: u16 = 0x0203;
	pub const UNCONNECTED_SEND_TIMEOUT: u16 = 0x0204;
	pub const PORT_UNAVAILABLE: u16 = 0x0311;
	pub const INVALID_LINK_ADDRESS: u16 = 0x0312;
	pub const INVALID_SEGMENT: u16 = 0x0315;
}

/// The connection-failure extended status messages.
const CONNECTION_FAILURE_STATUSES: &[(u16, &str)] = &[
	(0x0100, "Connection in use or duplicate forward_open"),
	(0x0103, "Transport class and trigger combination not supported"),
	(0x0106, "Connection cannot be established due to another having exclusive ownership of a required resource"),
	(0x0107, "Target connection not found"),
	(0x0108, "A network connection parameter not supported by target/router"),
	(0x0109, "Requested connection size not supported by target/router"),
	(0x0110, "Requested connection has not configured"),
	(0x0111, "Requested rpi or timeout value not supported by device"),
	(0x0113, "Connection Manager out of connections"),
	(0x0114, "Electronic key mismatch for vendor ID or product code"),
	(0x0115, "Electronic key mismatch for product type"),
	(0x0116, "Electronic key mismatch for revision"),
	(0x0117, "Invalid produced or consumed application path"),
	(0x0118, "Invalid or inconsistent configuration application path"),
	(0x0119, "Non-listen only connection not opened"),
	(0x011A, "Instance of target object is out of connections"),
	(0x011B, "Target to originator RPI is smaller than the target to originator production inhibit time"),
	(0x0203, "Target attempted to send message on a connection that has timed out"),
	(0x0204, "Unconnected request timed out, UCMM did not receive a reply within timeout"),
	(0x0205, "Unconnected send request parameter invalid"),
	(0x0206, "Message too large for unconnected_send service"),
	(0x0207, "Unconnected message received only acknowledgement, but no data response"),
	(0x0301, "Target or router connection buffer out of memory"),
	(0x0302, "Producer node cannot allocate sufficient bandwidth for scheduled connection"),
	(0x0303, "Link consumer has no connection ID filter available"),
	(0x0304, "Scheduled priority in connection request cannot be met by network"),
	(0x0305, "Connection schedule signature from originator inconsistent with target"),
	(0x0306, "Connection schedule signature from originator cannot be validated by target"),
	(0x0311, "Port segment contains port that is unavailable or does not exist"),
	(0x0312, "Port segment contains an invalid link address for target network"),
	(0x0315, "Connection path contains an invalid segment type or value"),
	(0x0316, "Forward close request path does not match connection that was closed"),
	(0x0317, "Schedule network segment missing or value is invalid"),
	(0x0318, "Port segment contains a loopback link address which is unsupported by device"),
	(0x0319, "Secondary in redundant chassis system is unable to duplicate connection request in primary"),
	(0x031A, "Request for rack connection refused, one is already established"),
	(0x031C, "Miscellaneous"),
	(0x031D, "Redundant connection request parameters mismatch"),
	(0x031E, "No more user configurable link consumer resources available in the producing module"),
	(0x031F, "Target has no consumers configured for producing application"),
	(0x0800, "Network link in path to module is offline"),
	(0x0810, "Target application has no valid data to produce for requested connection"),
	(0x0811, "Originator application has no valid data to produce for requested connection"),
	(0x0812, "Node address has changed since the network was scheduled"),
	(0x0813, "Producer for connection request is not configured for off-subset multicast"),
];

impl ConnectionManager {
	/// The instance every connection service is addressed to.
	pub const OPEN_REQUEST_INSTANCE: u32 = 0x01;

	/// Number of received Forward Open requests
	pub const OPEN_REQUESTS: CipAttribute<u16> =
		CipAttribute::instance(1, Self::CLASS_CODE, Self::NAME, "open_requests");
	/// Number of Forward Open requests rejected because of bad formatting
	pub const OPEN_FORMAT_REJECTS: CipAttribute<u16> =
		CipAttribute::instance(2, Self::CLASS_CODE, Self::NAME, "open_format_rejects");
	/// Number of Forward Open requests rejected for lack of resources
	pub const OPEN_RESOURCE_REJECTS: CipAttribute<u16> =
		CipAttribute::instance(3, Self::CLASS_CODE, Self::NAME, "open_resource_rejects");
	/// Number of Forward Open requests rejected for other reasons
	pub const OPEN_OTHER_REJECTS: CipAttribute<u16> =
		CipAttribute::instance(4, Self::CLASS_CODE, Self::NAME, "open_other_rejects");
	/// Number of received Forward Close requests
	pub const CLOSE_REQUESTS: CipAttribute<u16> =
		CipAttribute::instance(5, Self::CLASS_CODE, Self::NAME, "close_requests");
	/// Number of Forward Close requests rejected because of bad formatting
	pub const CLOSE_FORMAT_REJECTS: CipAttribute<u16> =
		CipAttribute::instance(6, Self::CLASS_CODE, Self::NAME, "close_format_rejects");
	/// Number of Forward Close requests rejected for other reasons
	pub const CLOSE_OTHER_REJECTS: CipAttribute<u16> =
		CipAttribute::instance(7, Self::CLASS_CODE, Self::NAME, "close_other_rejects");
	/// Number of connection timeouts in connections managed by this instance
	pub const CONNECTION_TIMEOUTS: CipAttribute<u16> =
		CipAttribute::instance(8, Self::CLASS_CODE, Self::NAME, "connection_timeouts");
	/// CPU utilization as tenths of a percent
	pub const CPU_UTILIZATION: CipAttribute<u16> =
		CipAttribute::instance(11, Self::CLASS_CODE, Self::NAME, "cpu_utilization");
	/// Total size in bytes of the buffer
	pub const MAX_BUFFER_SIZE: CipAttribute<u32> =
		CipAttribute::instance(12, Self::CLASS_CODE, Self::NAME, "max_buffer_size");
	/// Currently available size in bytes of the buffer
	pub const BUFFER_SIZE_REMAINING: CipAttribute<u32> =
		CipAttribute::instance(13, Self::CLASS_CODE, Self::NAME, "buffer_size_remaining");

	/// Builds a Forward Open request: opens a connection with a maximum
	/// data size of 511 bytes.
	///
	/// # Errors
	///
	/// [`WriteError`] if the request body does not encode.
	pub fn forward_open(
		params: &ForwardOpenRequest,
	) -> Result<CipRequest<ForwardOpenResponse, ForwardOpenFailedResponse>, WriteError> {
		Self::connection_service(service_code::FORWARD_OPEN, params)
	}

	/// Builds a Large Forward Open request: opens a connection with a
	/// maximum data size of 65535 bytes.
	///
	/// # Errors
	///
	/// [`WriteError`] if the request body does not encode.
	pub fn large_forward_open(
		params: &LargeForwardOpenRequest,
	) -> Result<CipRequest<ForwardOpenResponse, ForwardOpenFailedResponse>, WriteError> {
		Self::connection_service(service_code::LARGE_FORWARD_OPEN, params)
	}

	/// Builds a Forward Close request: closes a connection.
	///
	/// # Errors
	///
	/// [`WriteError`] if the request body does not encode.
	pub fn forward_close(
		params: &ForwardCloseRequest,
	) -> Result<CipRequest<ForwardCloseResponse, ForwardCloseFailedResponse>, WriteError> {
		Self::connection_service(service_code::FORWARD_CLOSE, params)
	}

	fn connection_service<T, F, P>(service: u8, params: &P) -> Result<CipRequest<T, F>, WriteError>
	where
		T: Readable + 'static,
		F: Readable + fmt::Display + 'static,
		P: Writable,
	{
		let data = params.to_bytes()?;

		Ok(CipRequest {
			message: MessageRouterRequest::build(
				service,
				Self::CLASS_CODE,
				Self::OPEN_REQUEST_INSTANCE,
				None,
				data,
			),
			parser: ResponseParser::new(
				crate::cip::request::decode_readable::<T>(),
				crate::cip::request::failure_readable::<F>(),
			),
		})
	}

	/// Wraps a request in an Unconnected Send carrying an explicit route to
	/// the target.
	///
	/// The reply to the embedded request travels back unwrapped on success;
	/// a failure of the Unconnected Send itself decodes to
	/// [`UnconnectedSendFailedResponse`].
	///
	/// # Errors
	///
	/// [`WriteError`] if the embedded request or route does not encode.
	pub fn unconnected_send<T, F>(
		request: CipRequest<T, F>, route: &CipRoute, tick_time: TickTime, num_ticks: u8,
	) -> Result<CipRequest<T, UnconnectedSendFailedResponse>, WriteError>
	where
		T: 'static,
		F: fmt::Display,
	{
		let wrapped = UnconnectedSendRequest {
			tick_time,
			num_ticks,
			priority: false,
			message_request: request.message,
			route_path: PaddedEpathPadLen(route.epath()),
		};
		let data = wrapped.to_bytes()?;

		let (decode_success, success_statuses) = request.parser.into_success_parts();

		Ok(CipRequest {
			message: MessageRouterRequest::build(
				service_code::UNCONNECTED_SEND,
				Self::CLASS_CODE,
				Self::OPEN_REQUEST_INSTANCE,
				None,
				data,
			),
			parser: ResponseParser::new(
				decode_success,
				Box::new(UnconnectedSendFailedResponse::from_response),
			)
			.with_success_statuses(success_statuses),
		})
	}
}

/// The time-per-tick values of a priority/tick-time byte. Each tick value
/// doubles the previous one, from 1 ms up to 32768 ms.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum TickTime {
	Ms1 = 0b_0000,
	Ms2 = 0b_0001,
	Ms4 = 0b_0010,
	Ms8 = 0b_0011,
	Ms16 = 0b_0100,
	Ms32 = 0b_0101,
	Ms64 = 0b_0110,
	Ms128 = 0b_0111,
	Ms256 = 0b_1000,
	Ms512 = 0b_1001,
	#[default]
	Ms1024 = 0b_1010,
	Ms2048 = 0b_1011,
	Ms4096 = 0b_1100,
	Ms8192 = 0b_1101,
	Ms16384 = 0b_1110,
	Ms32768 = 0b_1111,
}

impl TickTime {
	/// The bit marking a priority request in the priority/tick-time byte.
	const PRIORITY: u8 = 0b_0001_0000;

	/// The tick duration in milliseconds.
	#[must_use]
	pub const fn milliseconds(self) -> u32 {
		1 << (self as u32)
	}

	/// The low nibble of a priority/tick-time byte.
	const fn from_bits(bits: u8) -> Self {
		match bits & 0b_1111 {
			0b_0000 => Self::Ms1,
			0b_0001 => Self::Ms2,
			0b_0010 => Self::Ms4,
			0b_0011 => Self::Ms8,
			0b_0100 => Self::Ms16,
			0b_0101 => Self::Ms32,
			0b_0110 => Self::Ms64,
			0b_0111 => Self::Ms128,
			0b_1000 => Self::Ms256,
			0b_1001 => Self::Ms512,
			0b_1010 => Self::Ms1024,
			0b_1011 => Self::Ms2048,
			0b_1100 => Self::Ms4096,
			0b_1101 => Self::Ms8192,
			0b_1110 => Self::Ms16384,
			_ => Self::Ms32768,
		}
	}
}

/// The priority of a connection, bits 10 and 11 of the 16-bit network
/// connection parameters.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u16)]
pub enum ConnectionPriority {
	Low = 0b_0000_0000_0000_0000,
	#[default]
	High = 0b_0000_0100_0000_0000,
	Scheduled = 0b_0000_1000_0000_0000,
	Urgent = 0b_0000_1100_0000_0000,
}

/// The kind of a connection, bits 13 and 14 of the 16-bit network
/// connection parameters.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u16)]
pub enum ConnectionType {
	Null = 0b_0000_0000_0000_0000,
	Multicast = 0b_0010_0000_0000_0000,
	#[default]
	PointToPoint = 0b_0100_0000_0000_0000,
}

/// The connection timeout as a multiple of the RPI.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum TimeoutMultiplier {
	X4 = 0,
	X8 = 1,
	X16 = 2,
	X32 = 3,
	X64 = 4,
	X128 = 5,
	X256 = 6,
	#[default]
	X512 = 7,
}

/// When the target produces data on the connection, bits 4 through 6 of the
/// transport class/trigger byte.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum ProductionTrigger {
	Cyclic = 0b_0000_0000,
	ChangeOfState = 0b_0001_0000,
	#[default]
	ApplicationObject = 0b_0010_0000,
}

/// The transport class of a connection, bits 0 through 3 of the transport
/// class/trigger byte. Classes 1 through 3 sequence their messages.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum TransportClass {
	Class0 = 0,
	Class1 = 1,
	Class2 = 2,
	#[default]
	Class3 = 3,
}

impl TransportClass {
	/// Whether messages on this transport class carry a sequence count.
	#[must_use]
	pub const fn sequenced(self) -> bool {
		!matches!(self, Self::Class0)
	}
}

macro_rules! forward_open_request {
	($(
		$(#[$meta:meta])*
		$Type:ident: $params:ty
	),*$(,)?) => {
		$(
			$(#[$meta])*
			#[derive(Clone, Eq, PartialEq, Hash, Debug)]
			pub struct $Type {
				pub priority_tick_time: u8,
				pub timeout_ticks: u8,
				pub o2t_connection_id: u32,
				pub t2o_connection_id: u32,
				pub connection_serial: u16,
				pub originator_vendor_id: u16,
				pub originator_serial: u32,
				pub timeout_multiplier: u8,
				pub o2t_rpi: u32,
				pub o2t_connection_params: $params,
				pub t2o_rpi: u32,
				pub t2o_connection_params: $params,
				/// The transport class/trigger byte: class in bits 0-3,
				/// production trigger in bits 4-6, direction in bit 7.
				pub transport_class_trigger: u8,
				pub connection_path: PaddedEpathLen,
			}

			impl CipSize for $Type {
				fn cip_size(&self) -> usize {
					2 + 4 + 4 + 2 + 2 + 4 + 1 + 3
						+ 4 + <$params>::CIP_SIZE
						+ 4 + <$params>::CIP_SIZE
						+ 1 + self.connection_path.cip_size()
				}
			}

			impl Readable for $Type {
				fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
					let priority_tick_time = u8::read_from(reader)?;
					let timeout_ticks = u8::read_from(reader)?;
					let o2t_connection_id = u32::read_from(reader)?;
					let t2o_connection_id = u32::read_from(reader)?;
					let connection_serial = u16::read_from(reader)?;
					let originator_vendor_id = u16::read_from(reader)?;
					let originator_serial = u32::read_from(reader)?;
					let timeout_multiplier = u8::read_from(reader)?;
					let _reserved = read_bytes(reader, 3)?;

					Ok(Self {
						priority_tick_time,
						timeout_ticks,
						o2t_connection_id,
						t2o_connection_id,
						connection_serial,
						originator_vendor_id,
						originator_serial,
						timeout_multiplier,
						o2t_rpi: u32::read_from(reader)?,
						o2t_connection_params: <$params>::read_from(reader)?,
						t2o_rpi: u32::read_from(reader)?,
						t2o_connection_params: <$params>::read_from(reader)?,
						transport_class_trigger: u8::read_from(reader)?,
						connection_path: PaddedEpathLen::read_from(reader)?,
					})
				}
			}

			impl Writable for $Type {
				fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
					self.priority_tick_time.write_to(writer)?;
					self.timeout_ticks.write_to(writer)?;
					self.o2t_connection_id.write_to(writer)?;
					self.t2o_connection_id.write_to(writer)?;
					self.connection_serial.write_to(writer)?;
					self.originator_vendor_id.write_to(writer)?;
					self.originator_serial.write_to(writer)?;
					self.timeout_multiplier.write_to(writer)?;
					[0_u8; 3].write_to(writer)?;
					self.o2t_rpi.write_to(writer)?;
					self.o2t_connection_params.write_to(writer)?;
					self.t2o_rpi.write_to(writer)?;
					self.t2o_connection_params.write_to(writer)?;
					self.transport_class_trigger.write_to(writer)?;
					self.connection_path.write_to(writer)?;

					Ok(())
				}
			}
		)*
	};
}

forward_open_request! {
	/// A Forward Open request body. The network connection parameters are
	/// 16-bit words.
	ForwardOpenRequest: Word,
	/// A Large Forward Open request body: the same layout with 32-bit
	/// network connection parameters, the flags shifted into the upper
	/// half.
	LargeForwardOpenRequest: Dword,
}

/// A successful Forward Open reply.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ForwardOpenResponse {
	pub o2t_connection_id: u32,
	pub t2o_connection_id: u32,
	pub connection_serial: u16,
	pub originator_vendor_id: u16,
	pub originator_serial: u32,
	/// The actual originator-to-target packet interval, in microseconds.
	pub o2t_api: u32,
	/// The actual target-to-originator packet interval, in microseconds.
	pub t2o_api: u32,
	pub application_reply: Vec<u8>,
}

impl CipSize for ForwardOpenResponse {
	fn cip_size(&self) -> usize {
		4 + 4 + 2 + 2 + 4 + 4 + 4 + 1 + 1 + self.application_reply.len()
	}
}

impl Readable for ForwardOpenResponse {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let o2t_connection_id = u32::read_from(reader)?;
		let t2o_connection_id = u32::read_from(reader)?;
		let connection_serial = u16::read_from(reader)?;
		let originator_vendor_id = u16::read_from(reader)?;
		let originator_serial = u32::read_from(reader)?;
		let o2t_api = u32::read_from(reader)?;
		let t2o_api = u32::read_from(reader)?;
		let application_reply_size = usize::from(u8::read_from(reader)?);
		let _reserved = u8::read_from(reader)?;

		Ok(Self {
			o2t_connection_id,
			t2o_connection_id,
			connection_serial,
			originator_vendor_id,
			originator_serial,
			o2t_api,
			t2o_api,
			application_reply: read_bytes(reader, application_reply_size)?,
		})
	}
}

impl Writable for ForwardOpenResponse {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.o2t_connection_id.write_to(writer)?;
		self.t2o_connection_id.write_to(writer)?;
		self.connection_serial.write_to(writer)?;
		self.originator_vendor_id.write_to(writer)?;
		self.originator_serial.write_to(writer)?;
		self.o2t_api.write_to(writer)?;
		self.t2o_api.write_to(writer)?;
		u8::from_length(self.application_reply.len())?.write_to(writer)?;
		0x00_u8.write_to(writer)?;
		writer.put_slice(&self.application_reply);

		Ok(())
	}
}

macro_rules! connection_service_failure {
	($(
		$(#[$meta:meta])*
		$Type:ident
	),*$(,)?) => {
		$(
			$(#[$meta])*
			#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
			pub struct $Type {
				pub connection_serial: u16,
				pub originator_vendor_id: u16,
				pub originator_serial: u32,
				/// How many words of the connection path were left to
				/// process when the request failed.
				pub remaining_path_size: u8,
			}

			impl ConstantCipSize for $Type {
				const CIP_SIZE: usize = 2 + 2 + 4 + 1 + 1;
			}

			impl CipSize for $Type {
				fn cip_size(&self) -> usize {
					Self::CIP_SIZE
				}
			}

			impl Readable for $Type {
				fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
					let connection_serial = u16::read_from(reader)?;
					let originator_vendor_id = u16::read_from(reader)?;
					let originator_serial = u32::read_from(reader)?;
					let remaining_path_size = u8::read_from(reader)?;
					let _reserved = u8::read_from(reader)?;

					Ok(Self {
						connection_serial,
						originator_vendor_id,
						originator_serial,
						remaining_path_size,
					})
				}
			}

			impl Writable for $Type {
				fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
					self.connection_serial.write_to(writer)?;
					self.originator_vendor_id.write_to(writer)?;
					self.originator_serial.write_to(writer)?;
					self.remaining_path_size.write_to(writer)?;
					0x00_u8.write_to(writer)?;

					Ok(())
				}
			}

			impl fmt::Display for $Type {
				fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
					write!(
						f,
						concat!(
							stringify!($Type),
							"(connection_serial={}, originator_vendor_id={}, \
							 originator_serial={}, remaining_path_size={}, reserved=0)",
						),
						self.connection_serial,
						self.originator_vendor_id,
						self.originator_serial,
						self.remaining_path_size,
					)
				}
			}
		)*
	};
}

connection_service_failure! {
	/// A failed Forward Open reply.
	ForwardOpenFailedResponse,
	/// A failed Forward Close reply.
	ForwardCloseFailedResponse,
}

/// A Forward Close request body.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ForwardCloseRequest {
	pub priority_tick_time: u8,
	pub timeout_ticks: u8,
	pub connection_serial: u16,
	pub originator_vendor_id: u16,
	pub originator_serial: u32,
	pub connection_path: PaddedEpathPadLen,
}

impl CipSize for ForwardCloseRequest {
	fn cip_size(&self) -> usize {
		2 + 2 + 2 + 4 + self.connection_path.cip_size()
	}
}

impl Readable for ForwardCloseRequest {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			priority_tick_time: u8::read_from(reader)?,
			timeout_ticks: u8::read_from(reader)?,
			connection_serial: u16::read_from(reader)?,
			originator_vendor_id: u16::read_from(reader)?,
			originator_serial: u32::read_from(reader)?,
			connection_path: PaddedEpathPadLen::read_from(reader)?,
		})
	}
}

impl Writable for ForwardCloseRequest {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.priority_tick_time.write_to(writer)?;
		self.timeout_ticks.write_to(writer)?;
		self.connection_serial.write_to(writer)?;
		self.originator_vendor_id.write_to(writer)?;
		self.originator_serial.write_to(writer)?;
		self.connection_path.write_to(writer)?;

		Ok(())
	}
}

/// A successful Forward Close reply.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ForwardCloseResponse {
	pub connection_serial: u16,
	pub originator_vendor_id: u16,
	pub originator_serial: u32,
	pub application_reply: Vec<u8>,
}

impl CipSize for ForwardCloseResponse {
	fn cip_size(&self) -> usize {
		2 + 2 + 4 + 1 + 1 + self.application_reply.len()
	}
}

impl Readable for ForwardCloseResponse {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let connection_serial = u16::read_from(reader)?;
		let originator_vendor_id = u16::read_from(reader)?;
		let originator_serial = u32::read_from(reader)?;
		let application_reply_size = usize::from(u8::read_from(reader)?);
		let _reserved = u8::read_from(reader)?;

		Ok(Self {
			connection_serial,
			originator_vendor_id,
			originator_serial,
			application_reply: read_bytes(reader, application_reply_size)?,
		})
	}
}

/// An Unconnected Send request body: the embedded request, the timeout it
/// is allowed, and the route to carry it over.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct UnconnectedSendRequest {
	pub tick_time: TickTime,
	pub num_ticks: u8,
	pub priority: bool,
	pub message_request: MessageRouterRequest,
	pub route_path: PaddedEpathPadLen,
}

impl UnconnectedSendRequest {
	/// The request timeout this body asks for: tick time times tick count.
	#[must_use]
	pub const fn timeout_ms(&self) -> u32 {
		self.tick_time.milliseconds() * self.num_ticks as u32
	}
}

impl CipSize for UnconnectedSendRequest {
	fn cip_size(&self) -> usize {
		let message_size = self.message_request.cip_size();

		2 + 2 + message_size + message_size % 2 + self.route_path.cip_size()
	}
}

impl Readable for UnconnectedSendRequest {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let priority_tick_time = u8::read_from(reader)?;
		let num_ticks = u8::read_from(reader)?;
		let message_size = usize::from(u16::read_from(reader)?);

		let message_bytes = read_bytes(reader, message_size)?;
		let message_request = MessageRouterRequest::read_from(&mut &message_bytes[..])?;
		if message_size % 2 != 0 {
			let _pad = u8::read_from(reader)?;
		}

		Ok(Self {
			tick_time: TickTime::from_bits(priority_tick_time),
			num_ticks,
			priority: priority_tick_time & TickTime::PRIORITY != 0,
			message_request,
			route_path: PaddedEpathPadLen::read_from(reader)?,
		})
	}
}

impl Writable for UnconnectedSendRequest {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		let mut priority_tick_time = self.tick_time as u8;
		if self.priority {
			priority_tick_time |= TickTime::PRIORITY;
		}

		priority_tick_time.write_to(writer)?;
		self.num_ticks.write_to(writer)?;

		let message = self.message_request.to_bytes()?;
		u16::from_length(message.len())?.write_to(writer)?;
		writer.put_slice(&message);
		if message.len() % 2 != 0 {
			0x00_u8.write_to(writer)?;
		}

		self.route_path.write_to(writer)?;

		Ok(())
	}
}

/// A failed Unconnected Send reply.
///
/// The additional status words live in the reply header; the service data
/// carries the remaining path size only for failures that implicate the
/// route.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct UnconnectedSendFailedResponse {
	pub additional_status: Vec<u16>,
	pub remaining_path_size: u8,
}

impl UnconnectedSendFailedResponse {
	/// Whether a failure with this status carries a remaining-path-size
	/// byte: route failures do, target failures do not.
	fn has_remaining_path_size(general_status: u8, additional_status: &[u16]) -> bool {
		match general_status {
			general_status::RESOURCE_UNAVAILABLE | general_status::PATH_ERROR => true,

			general_status::CONNECTION_FAILURE => matches!(
				additional_status.first(),
				Some(
					&ext_status_code::UNCONNECTED_SEND_TIMEOUT
						| &ext_status_code::PORT_UNAVAILABLE
						| &ext_status_code::INVALID_LINK_ADDRESS
						| &ext_status_code::INVALID_SEGMENT,
				)
			),

			_ => false,
		}
	}

	pub(crate) fn from_response(response: &MessageRouterResponse) -> ReadResult<Self> {
		let remaining_path_size =
			if Self::has_remaining_path_size(response.general_status, &response.additional_status) {
				u8::read_from(&mut response.data.as_slice())?
			} else {
				0
			};

		Ok(Self {
			additional_status: response.additional_status.clone(),
			remaining_path_size,
		})
	}
}

impl fmt::Display for UnconnectedSendFailedResponse {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let words = self
			.additional_status
			.iter()
			.map(|word| format!("UINT({word})"))
			.collect::<Vec<_>>()
			.join(", ");

		write!(
			f,
			"UnconnectedSendFailedResponse(additional_status=[{words}], remaining_path_size={})",
			self.remaining_path_size,
		)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::epath::{Epath, LogicalSegment, PortSegment};

	fn connection_path() -> PaddedEpathLen {
		PaddedEpathLen(
			Epath::default()
				/ PortSegment::new(1_u16, 0_u32).unwrap()
				/ LogicalSegment::class_id(0x02)
				/ LogicalSegment::instance_id(1),
		)
	}

	#[test]
	fn test_forward_open_layout() {
		let request = ForwardOpenRequest {
			priority_tick_time: TickTime::Ms1024 as u8,
			timeout_ticks: 1,
			o2t_connection_id: 0,
			t2o_connection_id: 0x1111_2222,
			connection_serial: 0x3333,
			originator_vendor_id: 0xA455,
			originator_serial: 0x4444_5555,
			timeout_multiplier: TimeoutMultiplier::X512 as u8,
			o2t_rpi: 0x0020_4001,
			o2t_connection_params: Word(0x43FF),
			t2o_rpi: 0x0020_4001,
			t2o_connection_params: Word(0x43FF),
			transport_class_trigger: 0xA3,
			connection_path: connection_path(),
		};

		let bytes = request.to_bytes().unwrap();
		assert_eq!(bytes.len(), request.cip_size());

		// priority/tick, ticks, then the two connection ids
		assert_eq!(&bytes[..2], [0x0A, 0x01]);
		assert_eq!(&bytes[2..6], [0x00; 4]);
		assert_eq!(&bytes[6..10], [0x22, 0x22, 0x11, 0x11]);
		// the reserved bytes follow the timeout multiplier
		assert_eq!(&bytes[18..22], [0x07, 0x00, 0x00, 0x00]);
		// path: 3 words, port 1/0, class 2, instance 1
		assert_eq!(
			&bytes[bytes.len() - 7..],
			[0x03, 0x01, 0x00, 0x20, 0x02, 0x24, 0x01]
		);

		assert_eq!(
			ForwardOpenRequest::read_from(&mut &bytes[..]).unwrap(),
			request
		);
	}

	#[test]
	fn test_large_forward_open_round_trip() {
		let request = LargeForwardOpenRequest {
			priority_tick_time: TickTime::Ms1024 as u8,
			timeout_ticks: 1,
			o2t_connection_id: 0,
			t2o_connection_id: 1,
			connection_serial: 2,
			originator_vendor_id: 3,
			originator_serial: 4,
			timeout_multiplier: 7,
			o2t_rpi: 0x0020_4001,
			o2t_connection_params: Dword(0x4200_0FA0),
			t2o_rpi: 0x0020_4001,
			t2o_connection_params: Dword(0x4200_0FA0),
			transport_class_trigger: 0xA3,
			connection_path: connection_path(),
		};

		let bytes = request.to_bytes().unwrap();
		assert_eq!(
			LargeForwardOpenRequest::read_from(&mut &bytes[..]).unwrap(),
			request
		);
	}

	#[test]
	fn test_forward_open_response_round_trip() {
		let response = ForwardOpenResponse {
			o2t_connection_id: 0xDEAD_BEEF,
			t2o_connection_id: 0x1111_2222,
			connection_serial: 0x3333,
			originator_vendor_id: 0xA455,
			originator_serial: 0x4444_5555,
			o2t_api: 0x0020_4001,
			t2o_api: 0x0020_4001,
			application_reply: vec![0x01, 0x02],
		};

		let bytes = response.to_bytes().unwrap();
		assert_eq!(bytes.len(), response.cip_size());
		assert_eq!(
			ForwardOpenResponse::read_from(&mut &bytes[..]).unwrap(),
			response
		);
	}

	#[test]
	fn test_failed_response_decode_and_display() {
		// connection serial 0, vendor 9, originator serial 1761615876,
		// remaining path size 255
		let bytes = [
			0x00, 0x00, 0x09, 0x00, 0x04, 0x20, 0x00, 0x69, 0xFF, 0x00,
		];
		let failed = ForwardOpenFailedResponse::read_from(&mut &bytes[..]).unwrap();

		assert_eq!(failed.originator_vendor_id, 9);
		assert_eq!(failed.originator_serial, 1_761_615_876);
		assert_eq!(failed.remaining_path_size, 255);
		assert_eq!(
			failed.to_string(),
			"ForwardOpenFailedResponse(connection_serial=0, originator_vendor_id=9, \
			 originator_serial=1761615876, remaining_path_size=255, reserved=0)"
		);
	}

	#[test]
	fn test_unconnected_send_pads_odd_requests() {
		let inner = MessageRouterRequest::build(0x0E, 0x01, 1, Some(6), Vec::new());
		// an 8-byte inner request: no pad
		assert_eq!(inner.cip_size() % 2, 0);

		let odd_inner = MessageRouterRequest::build(0x01, 0x01, 1, None, vec![0xAB]);
		let request = UnconnectedSendRequest {
			tick_time: TickTime::Ms1024,
			num_ticks: 1,
			priority: false,
			message_request: odd_inner.clone(),
			route_path: PaddedEpathPadLen(
				Epath::default() / PortSegment::new(1_u16, 0_u32).unwrap(),
			),
		};

		let bytes = request.to_bytes().unwrap();
		assert_eq!(bytes.len(), request.cip_size());

		// priority/tick, ticks, u16 size
		assert_eq!(&bytes[..4], [0x0A, 0x01, 0x07, 0x00]);
		// the pad byte sits between the message and the route
		assert_eq!(bytes[4 + 7], 0x00);

		assert_eq!(
			UnconnectedSendRequest::read_from(&mut &bytes[..]).unwrap(),
			request
		);
	}

	#[test]
	fn test_tick_time_values() {
		assert_eq!(TickTime::Ms1.milliseconds(), 1);
		assert_eq!(TickTime::Ms1024.milliseconds(), 1024);
		assert_eq!(TickTime::Ms32768.milliseconds(), 32768);
	}
}

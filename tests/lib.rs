// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios, driven against a fake EtherNet/IP target on a
//! loopback socket where a live exchange is involved.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;

use cipkit::{read_until_empty, Readable, Writable};

use cipr::cip::objects::{
	ConnectionManager,
	ForwardOpenRequest,
	ForwardOpenResponse,
	Identity,
	Port,
	TickTime,
	TimeoutMultiplier,
};
use cipr::cip::{
	get_attribute_single,
	CipConfig,
	CipConnection,
	CipRoute,
	MessageRouterRequest,
	MessageRouterResponse,
	ResponseData,
};
use cipr::enip::{
	CommonPacketFormat,
	CpfItem,
	EncapsCommand,
	EnipConfig,
	EnipHeader,
	SendDataPayload,
};
use cipr::epath::{Epath, LogicalSegment, PaddedEpathLen, PortSegment};
use cipr::types::Word;
use cipr::{ConnectionError, Error};

fn forward_open_params() -> ForwardOpenRequest {
	ForwardOpenRequest {
		priority_tick_time: TickTime::Ms1024 as u8,
		timeout_ticks: 1,
		o2t_connection_id: 0,
		t2o_connection_id: 0x2222_3333,
		connection_serial: 0x4455,
		originator_vendor_id: 9,
		originator_serial: 0x0102_0304,
		timeout_multiplier: TimeoutMultiplier::X512 as u8,
		o2t_rpi: 2_113_537,
		o2t_connection_params: Word(0x43FF),
		t2o_rpi: 2_113_537,
		t2o_connection_params: Word(0x43FF),
		transport_class_trigger: 0xA3,
		connection_path: PaddedEpathLen(
			Epath::default()
				/ LogicalSegment::class_id(0x02)
				/ LogicalSegment::instance_id(1),
		),
	}
}

// --- Scenario S1: Get_Attribute_Single(Identity.serial_number) ---

#[test]
fn get_attribute_single_identity_serial_number() {
	let request = get_attribute_single(&Identity::SERIAL_NUMBER, 1).unwrap();

	assert_eq!(
		request.message.to_bytes().unwrap(),
		[0x0E, 0x03, 0x20, 0x01, 0x24, 0x01, 0x30, 0x06]
	);

	let response = request
		.parse_response(&[0x8E, 0x00, 0x00, 0x00, 0xEF, 0xBE, 0xAD, 0xDE])
		.unwrap();

	assert!(response.is_ok());
	assert_eq!(response.message.request_service(), 0x0E);
	assert_eq!(response.into_success(), Some(0xDEAD_BEEF));
}

// --- Scenario S2: Get_Attribute_Single(Port.port_name) ---

#[test]
fn get_attribute_single_port_name() {
	let request = get_attribute_single(&Port::PORT_NAME, 2).unwrap();

	assert_eq!(
		request.message.to_bytes().unwrap(),
		[0x0E, 0x03, 0x20, 0xF4, 0x24, 0x02, 0x30, 0x04]
	);

	let response = request.parse_response(&[0x8E, 0x00, 0x00, 0x00, 0x01, 0x41]).unwrap();

	assert!(response.is_ok());
	assert_eq!(
		response.into_success().map(|name| name.into_string()),
		Some("A".to_owned())
	);
}

// --- Scenario S3: Forward Open failure ---

#[test]
fn forward_open_failure_decodes_and_describes() {
	let request = ConnectionManager::forward_open(&forward_open_params()).unwrap();

	let response = request
		.parse_response(&[
			0xD4, 0x00, 0x01, 0x02, // reply, reserved, status, 2 words
			0x09, 0x01, 0x4F, 0x01, // 0x0109, 0x014F = 335
			0x00, 0x00, 0x09, 0x00, 0x04, 0x20, 0x00, 0x69, 0xFF, 0x00,
		])
		.unwrap();

	assert!(!response.is_ok());
	assert_eq!(response.message.additional_status, [0x0109, 0x014F]);
	assert_eq!(
		response.status_message,
		"Connection failure(0x01): (0x0109) Requested connection size not supported by \
		 target/router: max_supported_size=335"
	);

	let failed = match response.data {
		ResponseData::Failure(failed) => failed,
		ResponseData::Success(_) => panic!("response parsed as success"),
	};
	assert_eq!(failed.connection_serial, 0);
	assert_eq!(failed.originator_vendor_id, 9);
	assert_eq!(failed.originator_serial, 1_761_615_876);
	assert_eq!(failed.remaining_path_size, 255);
}

// --- Scenario S6: decode until the buffer runs dry ---

#[test]
fn dynamic_array_decodes_until_empty() {
	let buffer = [
		0x01, 0x00, 0x00, 0x00, //
		0x02, 0x00, 0x00, 0x00, //
		0x03, 0x00, 0x00, 0x00,
	];
	let mut reader = &buffer[..];

	let values: Vec<u32> = read_until_empty(&mut reader).unwrap();

	assert_eq!(values, [1, 2, 3]);
	assert!(reader.is_empty());
}

// --- The fake target for the live scenarios ---

/// The session handle the fake target grants.
const TARGET_SESSION: u32 = 0x00C0_FFEE;
/// The originator-to-target connection id the fake target assigns.
const TARGET_O2T_ID: u32 = 0x0AFE_0001;

struct FakeTarget {
	port: u16,
	handle: JoinHandle<()>,
}

impl FakeTarget {
	fn spawn() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();

		let handle = std::thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			serve(&mut stream);
		});

		Self { port, handle }
	}

	fn join(self) {
		self.handle.join().unwrap();
	}
}

fn frame(command: EncapsCommand, session: u32, context: [u8; 8], payload: &[u8]) -> Vec<u8> {
	let header = EnipHeader {
		command,
		length: u16::try_from(payload.len()).unwrap(),
		session,
		status: 0,
		sender_context: context,
		options: 0,
	};

	let mut bytes = header.to_bytes().unwrap();
	bytes.extend_from_slice(payload);

	bytes
}

fn serve(stream: &mut TcpStream) {
	let mut unit_data_count = 0_u16;

	loop {
		let mut header_bytes = [0_u8; 24];
		if stream.read_exact(&mut header_bytes).is_err() {
			return;
		}
		let header = EnipHeader::read_from(&mut &header_bytes[..]).unwrap();

		let mut body = vec![0; usize::from(header.length)];
		stream.read_exact(&mut body).unwrap();

		match header.command {
			EncapsCommand::RegisterSession => {
				let reply = frame(
					EncapsCommand::RegisterSession,
					TARGET_SESSION,
					header.sender_context,
					&body,
				);
				stream.write_all(&reply).unwrap();
			},

			EncapsCommand::UnregisterSession => return,

			EncapsCommand::SendRRData => {
				assert_eq!(header.session, TARGET_SESSION);

				let payload = SendDataPayload::read_from(&mut &body[..]).unwrap();
				let request =
					MessageRouterRequest::read_from(&mut payload.packet.data_bytes().unwrap())
						.unwrap();

				let reply_payload =
					SendDataPayload::new(CommonPacketFormat::unconnected(respond(&request)))
						.to_bytes()
						.unwrap();
				let reply = frame(
					EncapsCommand::SendRRData,
					TARGET_SESSION,
					header.sender_context,
					&reply_payload,
				);
				stream.write_all(&reply).unwrap();
			},

			EncapsCommand::SendUnitData => {
				let payload = SendDataPayload::read_from(&mut &body[..]).unwrap();
				assert!(matches!(
					payload.packet.address(),
					Some(CpfItem::ConnectedAddress {
						connection_id: TARGET_O2T_ID,
					})
				));

				let mut data = payload.packet.data_bytes().unwrap();
				let sequence = u16::read_from(&mut data).unwrap();
				unit_data_count += 1;
				assert_eq!(sequence, unit_data_count);

				let request = MessageRouterRequest::read_from(&mut data).unwrap();

				let mut reply_data = sequence.to_bytes().unwrap();
				reply_data.extend(respond(&request));

				let reply_payload = SendDataPayload::new(CommonPacketFormat::connected(
					TARGET_O2T_ID,
					reply_data,
				))
				.to_bytes()
				.unwrap();
				let reply = frame(
					EncapsCommand::SendUnitData,
					TARGET_SESSION,
					header.sender_context,
					&reply_payload,
				);
				stream.write_all(&reply).unwrap();
			},

			_ => panic!("unexpected command: {:?}", header.command),
		}
	}
}

/// The fake target's Message Router: canned replies per service.
fn respond(request: &MessageRouterRequest) -> Vec<u8> {
	let reply = |service: u8, data: Vec<u8>| {
		MessageRouterResponse {
			service: service | 0x80,
			general_status: 0,
			additional_status: Vec::new(),
			data,
		}
		.to_bytes()
		.unwrap()
	};

	match request.service {
		// Forward Open: grant the connection, echoing the originator's
		// serials back.
		0x54 => {
			let params = ForwardOpenRequest::read_from(&mut &request.data[..]).unwrap();
			let granted = ForwardOpenResponse {
				o2t_connection_id: TARGET_O2T_ID,
				t2o_connection_id: params.t2o_connection_id,
				connection_serial: params.connection_serial,
				originator_vendor_id: params.originator_vendor_id,
				originator_serial: params.originator_serial,
				o2t_api: params.o2t_rpi,
				t2o_api: params.t2o_rpi,
				application_reply: Vec::new(),
			};

			reply(0x54, granted.to_bytes().unwrap())
		},

		// Forward Close: acknowledge with the negotiated serials.
		0x4E => {
			let mut data = request.data.clone();
			// serial, vendor, originator serial from the request, then a
			// zero-length application reply
			data.drain(..2);
			data.truncate(8);
			data.extend([0x00, 0x00]);

			reply(0x4E, data)
		},

		// Unconnected Send: unwrap and answer the embedded request.
		0x52 => {
			let wrapped =
				cipr::cip::objects::UnconnectedSendRequest::read_from(&mut &request.data[..])
					.unwrap();

			respond(&wrapped.message_request)
		},

		// Get_Attribute_Single: the Identity serial number.
		0x0E => reply(0x0E, vec![0xEF, 0xBE, 0xAD, 0xDE]),

		other => panic!("unexpected service: {other:#04x}"),
	}
}

fn loopback_connection(target: &FakeTarget, route: Option<&str>) -> CipConnection {
	let enip = EnipConfig {
		port: target.port,
		..EnipConfig::new("127.0.0.1")
	};

	let config = CipConfig {
		route: route.map_or_else(CipRoute::default, |route| route.parse().unwrap()),
		..CipConfig::default()
	};

	CipConnection::new(enip, config)
}

// --- Scenario S5: register / unregister round-trip ---

#[test]
fn session_register_unregister_round_trip() {
	let target = FakeTarget::spawn();
	let mut connection = loopback_connection(&target, None);

	connection.connect().unwrap();
	assert!(connection.connected());
	assert_ne!(connection.session_id(), 0);

	connection.disconnect().unwrap();
	assert!(!connection.connected());
	assert_eq!(connection.session_id(), 0);

	let request = get_attribute_single(&Identity::SERIAL_NUMBER, 1).unwrap();
	assert!(matches!(
		connection.send(request, None),
		Err(Error::Connection(ConnectionError::NotConnected))
	));

	target.join();
}

// --- Scenario S4: sequenced connected exchange ---

#[test]
fn connected_send_sequences_and_peels() {
	let target = FakeTarget::spawn();
	let mut connection = loopback_connection(&target, None);

	connection.connect().unwrap();
	connection.forward_open().unwrap();
	assert!(connection.cip_connected());

	// The fake target asserts the first sequence number is 1 and the
	// second is 2; the decoded bodies show the peeled replies.
	for _ in 0..2 {
		let response = connection
			.get_attribute_single(&Identity::SERIAL_NUMBER, 1, None)
			.unwrap();

		assert!(response.is_ok());
		assert_eq!(response.into_success(), Some(0xDEAD_BEEF));
	}

	connection.disconnect().unwrap();
	target.join();
}

// --- Unconnected Send wrapping over a configured route ---

#[test]
fn unconnected_send_wraps_routed_requests() {
	let target = FakeTarget::spawn();
	let mut connection = loopback_connection(&target, Some("1/0"));

	connection.connect().unwrap();

	let response = connection
		.get_attribute_single(&Identity::SERIAL_NUMBER, 1, None)
		.unwrap();

	assert!(response.is_ok());
	assert_eq!(response.into_success(), Some(0xDEAD_BEEF));

	connection.disconnect().unwrap();
	target.join();
}

// --- Forward Open / Forward Close lifecycle over the wire ---

#[test]
fn forward_open_close_lifecycle() {
	let target = FakeTarget::spawn();
	let mut connection = loopback_connection(&target, None);

	connection.connect().unwrap();
	assert!(!connection.cip_connected());

	connection.forward_open().unwrap();
	assert!(connection.cip_connected());

	// a second forward open on a live connection is misuse
	assert!(matches!(
		connection.forward_open(),
		Err(Error::Connection(ConnectionError::AlreadyCipConnected))
	));

	connection.forward_close().unwrap();
	assert!(!connection.cip_connected());
	assert!(connection.connected());

	connection.disconnect().unwrap();
	target.join();
}

// --- The port-segment equality property over a parsed route ---

#[test]
fn route_segments_compare_canonically() {
	let route: CipRoute = "backplane/0".parse().unwrap();

	assert_eq!(
		route[..],
		[PortSegment::new(1_u16, 0_u32).unwrap()][..]
	);
}

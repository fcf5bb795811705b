// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP object library, and the resolution of failure messages against
//! it.

mod connection_manager;
mod identity;
mod message_router;
mod port;

pub use connection_manager::{
	ext_status_code,
	service_code,
	ConnectionManager,
	ConnectionPriority,
	ConnectionType,
	ForwardCloseFailedResponse,
	ForwardCloseRequest,
	ForwardCloseResponse,
	ForwardOpenFailedResponse,
	ForwardOpenRequest,
	ForwardOpenResponse,
	LargeForwardOpenRequest,
	ProductionTrigger,
	TickTime,
	TimeoutMultiplier,
	TransportClass,
	UnconnectedSendFailedResponse,
	UnconnectedSendRequest,
};
pub use identity::{DeviceState, Identity, IdentityInstanceAttrs, IdentityStatus};
pub use message_router::{MessageRouter, MessageRouterInstanceAttrs};
pub use port::{Port, PortType};

use super::object::{CipObject, StatusEntry};

/// The general status codes and their messages.
pub mod general_status {
	pub const SUCCESS: u8 = 0x00;
	pub const CONNECTION_FAILURE: u8 = 0x01;
	pub const RESOURCE_UNAVAILABLE: u8 = 0x02;
	pub const INVALID_PARAMETER_VALUE: u8 = 0x03;
	pub const PATH_ERROR: u8 = 0x04;
	pub const DESTINATION_UNKNOWN: u8 = 0x05;
	pub const PARTIAL_TRANSFER: u8 = 0x06;
	pub const CONNECTION_LOST: u8 = 0x07;
	pub const SERVICE_NOT_SUPPORTED: u8 = 0x08;
	pub const INVALID_ATTRIBUTE: u8 = 0x09;
	pub const ATTRIBUTE_LIST_ERROR: u8 = 0x0A;
	pub const ALREADY_IN_STATE: u8 = 0x0B;
	pub const OBJECT_STATE_CONFLICT: u8 = 0x0C;
	pub const OBJECT_ALREADY_EXISTS: u8 = 0x0D;
	pub const ATTRIBUTE_NOT_SETTABLE: u8 = 0x0E;
	pub const PRIVILEGE_VIOLATION: u8 = 0x0F;
	pub const DEVICE_STATE_CONFLICT: u8 = 0x10;
	pub const REPLY_TOO_LARGE: u8 = 0x11;
	pub const FRAGMENTATION_OF_PRIMITIVE: u8 = 0x12;
	pub const NOT_ENOUGH_DATA: u8 = 0x13;
	pub const ATTRIBUTE_NOT_SUPPORTED: u8 = 0x14;
	pub const TOO_MUCH_DATA: u8 = 0x15;
	pub const OBJECT_NOT_EXIST: u8 = 0x16;
	pub const FRAGMENTATION_INACTIVE: u8 = 0x17;
	pub const NO_STORED_ATTRIBUTE_DATA: u8 = 0x18;
	pub const ATTRIBUTE_STORE_FAILED: u8 = 0x19;
	pub const REQUEST_TOO_LARGE: u8 = 0x1A;
	pub const RESPONSE_TOO_LARGE: u8 = 0x1B;
	pub const MISSING_ATTRIBUTE_LIST: u8 = 0x1C;
	pub const INVALID_ATTRIBUTE_LIST: u8 = 0x1D;
	pub const EMBED_SERVICE_ERROR: u8 = 0x1E;
	pub const VENDOR_SPECIFIC_ERROR: u8 = 0x1F;
	pub const INVALID_PARAMETER: u8 = 0x20;
	pub const MEDIA_WRITE_ERROR: u8 = 0x21;
	pub const INVALID_REPLY_SERVICE: u8 = 0x22;
	pub const BUFFER_OVERFLOW: u8 = 0x23;
	pub const FORMAT_ERROR: u8 = 0x24;
	pub const PATH_KEY_FAILURE: u8 = 0x25;
	pub const PATH_SIZE_INVALID: u8 = 0x26;
	pub const UNEXPECTED_ATTRIBUTE: u8 = 0x27;
	pub const INVALID_MEMBER_ID: u8 = 0x28;
	pub const MEMBER_NOT_SETTABLE: u8 = 0x29;
	pub const DNET_GRP2_SERVER_FAILURE: u8 = 0x2A;
	pub const UNKNOWN_MODBUS_ERROR: u8 = 0x2B;

	/// The message for a general status code, `"UNKNOWN"` otherwise.
	#[must_use]
	pub const fn message(status: u8) -> &'static str {
		match status {
			SUCCESS => "Success",
			CONNECTION_FAILURE => "Connection failure",
			RESOURCE_UNAVAILABLE => "Insufficient resources for object to perform request",
			INVALID_PARAMETER_VALUE => "Invalid value for request parameter",
			PATH_ERROR => "A syntax error was detected decoding the Request Path",
			DESTINATION_UNKNOWN => "Destination unknown, class unsupported, instance undefined or structure element undefined",
			PARTIAL_TRANSFER => "Only a partial amount of the expected data was transferred",
			CONNECTION_LOST => "Connection lost",
			SERVICE_NOT_SUPPORTED => "Service not supported",
			INVALID_ATTRIBUTE => "Invalid attribute value",
			ATTRIBUTE_LIST_ERROR => "An attribute in get/set_attribute_list response has an error status",
			ALREADY_IN_STATE => "Object is already in the state/mode being requested",
			OBJECT_STATE_CONFLICT => "Object cannot perform request in its current state/mode",
			OBJECT_ALREADY_EXISTS => "Instance requesting to be created already exists",
			ATTRIBUTE_NOT_SETTABLE => "Request was to modify an attribute that is not writable",
			PRIVILEGE_VIOLATION => "Permission/privilege check failed",
			DEVICE_STATE_CONFLICT => "Device prohibited from executing request due to current state/mode",
			REPLY_TOO_LARGE => "Reply data too large to send",
			FRAGMENTATION_OF_PRIMITIVE => "Request would result in fragmentation of a primitive value",
			NOT_ENOUGH_DATA => "Request contained insufficient command data",
			ATTRIBUTE_NOT_SUPPORTED => "Attribute in request is not supported",
			TOO_MUCH_DATA => "Request contained more data than expected",
			OBJECT_NOT_EXIST => "Object requested does not exist",
			FRAGMENTATION_INACTIVE => "Fragmentation sequence for request is not currently active",
			NO_STORED_ATTRIBUTE_DATA => "Attribute data of the request object was not save prior to this request",
			ATTRIBUTE_STORE_FAILED => "Attribute data failed to save due to an error",
			REQUEST_TOO_LARGE => "Request was too large to send to destination",
			RESPONSE_TOO_LARGE => "Response was too large to send from destination",
			MISSING_ATTRIBUTE_LIST => "Request was missing an attribute required by the service",
			INVALID_ATTRIBUTE_LIST => "Request contained an invalid attribute in list of attributes",
			EMBED_SERVICE_ERROR => "Embedded service errored",
			VENDOR_SPECIFIC_ERROR => "Vendor specific error",
			INVALID_PARAMETER => "A parameter in request was invalid",
			MEDIA_WRITE_ERROR => "Attempted to write or modify data already written in a write-once medium",
			INVALID_REPLY_SERVICE => "Invalid reply received, reply service code does not match request",
			BUFFER_OVERFLOW => "Message received was too large for buffer and was discarded",
			FORMAT_ERROR => "Format of message is not supported",
			PATH_KEY_FAILURE => "Key segment in request path does not match destination",
			PATH_SIZE_INVALID => "Request path size too large or too small",
			UNEXPECTED_ATTRIBUTE => "Unexpected attribute in request attribute list",
			INVALID_MEMBER_ID => "Member ID in request does not exist for class/instance/attribute",
			MEMBER_NOT_SETTABLE => "Request was to modify a non-modifiable member",
			DNET_GRP2_SERVER_FAILURE => "DeviceNet Group 2 only server general failure",
			UNKNOWN_MODBUS_ERROR => "A Modbus to CIP translator received an unknown Modbus error",

			_ => "UNKNOWN",
		}
	}
}

/// How one object resolves failure messages.
struct StatusResolver {
	entries: fn() -> &'static [StatusEntry],
	customize: fn(u8, u16, &[u16]) -> Option<String>,
}

impl StatusResolver {
	const GENERIC: Self = Self {
		entries: || &[],
		customize: |_, _, _| None,
	};

	fn of<O: CipObject>() -> Self {
		Self {
			entries: O::status_codes,
			customize: O::customize_extended_status,
		}
	}

	/// The resolver of the object with the given class code, or the generic
	/// one for objects this library does not declare.
	fn for_class(class_code: Option<u16>) -> Self {
		match class_code {
			Some(Identity::CLASS_CODE) => Self::of::<Identity>(),
			Some(MessageRouter::CLASS_CODE) => Self::of::<MessageRouter>(),
			Some(ConnectionManager::CLASS_CODE) => Self::of::<ConnectionManager>(),
			Some(Port::CLASS_CODE) => Self::of::<Port>(),

			_ => Self::GENERIC,
		}
	}

	/// The status entry for a service and general status: entries for the
	/// exact service shadow the wildcard ones, and within the chosen set an
	/// exact general status shadows the wildcard.
	fn entry(&self, service: u8, general: u8) -> Option<&'static StatusEntry> {
		let entries = (self.entries)();
		let service_specific = entries
			.iter()
			.any(|entry| entry.service == Some(service));

		let mut candidates = entries.iter().filter(|entry| {
			if service_specific {
				entry.service == Some(service)
			} else {
				entry.service.is_none()
			}
		});

		candidates
			.clone()
			.find(|entry| entry.general == Some(general))
			.or_else(|| candidates.find(|entry| entry.general.is_none()))
	}
}

/// Resolves the human-readable description of a failed response: the
/// general status message and, when extended status words are present, the
/// extended message.
///
/// The extended message starts with the first word as `(0x....)`, appends
/// the object's description of that code if it has one, then either the
/// object's customization (e.g. `max_supported_size=N`) or, when the
/// failure carries more context than the tables explain, the remaining
/// words and the decoded failure body.
pub(crate) fn status_messages(
	class_code: Option<u16>, service: u8, general: u8, ext_status: &[u16], extra: Option<&str>,
) -> (String, Option<String>) {
	let resolver = StatusResolver::for_class(class_code);
	let general_message = general_status::message(general).to_owned();

	let Some((&ext_code, ext_extra)) = ext_status.split_first() else {
		return (general_message, None);
	};

	let description = resolver.entry(service, general).and_then(|entry| {
		entry
			.extended
			.iter()
			.find_map(|&(code, message)| (code == ext_code).then_some(message))
			.or(entry.fallback)
	});

	let mut message = format!("({ext_code:#06x})");
	if let Some(description) = description {
		message = format!("{message} {description}");
	}

	if let Some(custom) = (resolver.customize)(general, ext_code, ext_extra) {
		message = format!("{message}: {custom}");
	} else if !ext_extra.is_empty() || extra.is_some() {
		let words = ext_extra
			.iter()
			.map(|word| format!("UINT({word})"))
			.collect::<Vec<_>>()
			.join(", ");

		message = format!(
			"{message}: ext_status_words=[{words}], extra_data={}",
			extra.unwrap_or("None"),
		);
	}

	(general_message, Some(message))
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_general_only() {
		let (general, extended) =
			status_messages(Some(0xF4), 0x01, general_status::SERVICE_NOT_SUPPORTED, &[], None);

		assert_eq!(general, "Service not supported");
		assert_eq!(extended, None);
	}

	#[test]
	fn test_unknown_general() {
		let (general, _) = status_messages(None, 0x0E, 0xD3, &[], None);

		assert_eq!(general, "UNKNOWN");
	}

	#[test]
	fn test_connection_manager_extended_lookup() {
		let (general, extended) = status_messages(
			Some(0x06),
			0x54,
			general_status::CONNECTION_FAILURE,
			&[0x0107],
			None,
		);

		assert_eq!(general, "Connection failure");
		assert_eq!(
			extended.as_deref(),
			Some("(0x0107) Target connection not found")
		);
	}

	#[test]
	fn test_connection_size_customization() {
		let (_, extended) = status_messages(
			Some(0x06),
			0x54,
			general_status::CONNECTION_FAILURE,
			&[0x0109, 500],
			None,
		);

		assert_eq!(
			extended.as_deref(),
			Some("(0x0109) Requested connection size not supported by target/router: max_supported_size=500")
		);
	}

	#[test]
	fn test_state_conflict_customization() {
		let (general, extended) = status_messages(
			Some(0x06),
			0x54,
			general_status::OBJECT_STATE_CONFLICT,
			&[1],
			None,
		);

		assert_eq!(general, "Object cannot perform request in its current state/mode");
		assert_eq!(extended.as_deref(), Some("(0x0001): state=0x0001"));
	}

	#[test]
	fn test_generic_extra_words() {
		let (_, extended) = status_messages(
			Some(0x06),
			0x54,
			general_status::CONNECTION_FAILURE,
			&[0x0107, 7],
			Some("Failure(code=1)"),
		);

		assert_eq!(
			extended.as_deref(),
			Some(
				"(0x0107) Target connection not found: ext_status_words=[UINT(7)], extra_data=Failure(code=1)"
			)
		);
	}
}

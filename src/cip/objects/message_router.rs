// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Message Router object.

use cipkit::{Buf, CipSize, ReadResult, Readable, ReadableWithContext};

use crate::cip::message_router::MessageRouterRequest;
use crate::cip::object::{CipAttribute, CipObject, StatusEntry};
use crate::cip::request::{decode_readable, failure_readable, CipRequest, ResponseParser};
use crate::epath::{Epath, EpathFormat, PackedEpath, SymbolicSegment};
use crate::types::UintList;

/// The Message Router object: routes explicit messages to the objects
/// within the device.
#[derive(Debug)]
pub struct MessageRouter;

impl CipObject for MessageRouter {
	const CLASS_CODE: u16 = 0x02;
	const NAME: &'static str = "MessageRouter";

	type InstanceAttrs = MessageRouterInstanceAttrs;

	fn status_codes() -> &'static [StatusEntry] {
		&[StatusEntry {
			service: Some(Self::SYMBOLIC_TRANSLATION),
			general: Some(super::general_status::INVALID_PARAMETER),
			extended: &[
				(0x0000, "Symbolic Path unknown"),
				(0x0001, "Symbolic Path destination not assigned"),
				(0x0002, "Symbolic Path segment error"),
			],
			fallback: None,
		}]
	}
}

impl MessageRouter {
	/// The vendor-specific Symbolic_Translation service code.
	pub const SYMBOLIC_TRANSLATION: u8 = 0x4B;

	/// List of supported objects (class codes)
	pub const OBJECT_LIST: CipAttribute<UintList> =
		CipAttribute::instance(1, Self::CLASS_CODE, Self::NAME, "object_list");
	/// Max number of supported connections
	pub const NUM_AVAILABLE: CipAttribute<u16> =
		CipAttribute::instance(2, Self::CLASS_CODE, Self::NAME, "num_available");
	/// Number of currently active connections
	pub const NUM_ACTIVE: CipAttribute<u16> =
		CipAttribute::instance(3, Self::CLASS_CODE, Self::NAME, "num_active");

	/// Translates a symbolic-segment `EPATH` to the equivalent
	/// logical-segment `EPATH`, if one exists.
	#[must_use]
	pub fn symbolic_translation(symbol: SymbolicSegment) -> CipRequest<PackedEpath> {
		let path = Epath::default() / symbol;
		let mut data = Vec::with_capacity(path.size_with(EpathFormat::PACKED));
		// a packed path of one segment cannot fail to encode
		let _ = path.write_with(&mut data, EpathFormat::PACKED);

		CipRequest {
			message: MessageRouterRequest::build(
				Self::SYMBOLIC_TRANSLATION,
				Self::CLASS_CODE,
				0,
				None,
				data,
			),
			parser: ResponseParser::new(decode_readable::<PackedEpath>(), failure_readable()),
		}
	}
}

/// The instance attributes returned by Get_Attributes_All on the Message
/// Router.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MessageRouterInstanceAttrs {
	pub object_list: UintList,
	pub num_available: u16,
	pub num_active: u16,
	/// Connection ids of the active connections; `num_active` entries.
	pub active_connections: Vec<u16>,
}

impl CipSize for MessageRouterInstanceAttrs {
	fn cip_size(&self) -> usize {
		self.object_list.cip_size() + 2 * 2 + self.active_connections.cip_size()
	}
}

impl Readable for MessageRouterInstanceAttrs {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let object_list = UintList::read_from(reader)?;
		let num_available = u16::read_from(reader)?;
		let num_active = u16::read_from(reader)?;

		Ok(Self {
			object_list,
			num_available,
			num_active,
			active_connections: Vec::read_with(reader, &usize::from(num_active))?,
		})
	}
}

#[cfg(test)]
mod test {
	use cipkit::Writable;

	use super::*;

	#[test]
	fn test_symbolic_translation_request() {
		let request =
			MessageRouter::symbolic_translation(SymbolicSegment::ascii("her?").unwrap());
		let bytes = request.message.to_bytes().unwrap();

		assert_eq!(
			bytes,
			[0x4B, 0x02, 0x20, 0x02, 0x24, 0x00, 0x64, 0x68, 0x65, 0x72, 0x3F]
		);
	}

	#[test]
	fn test_instance_attrs_track_active_count() {
		let bytes = [
			0x02, 0x00, 0x01, 0x00, 0x06, 0x00, // object list [1, 6]
			0x10, 0x00, // 16 available
			0x02, 0x00, // 2 active
			0xAA, 0x00, 0xBB, 0x00, // their connection ids
		];

		let attrs = MessageRouterInstanceAttrs::read_from(&mut &bytes[..]).unwrap();

		assert_eq!(attrs.object_list.0, [1, 6]);
		assert_eq!(attrs.active_connections, [0xAA, 0xBB]);
		assert_eq!(attrs.cip_size(), bytes.len());
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Message Router request and response layouts.

use cipkit::{
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	ReadResult,
	Readable,
	ReadableWithContext,
	Writable,
	WriteResult,
};

use crate::epath::{Epath, EpathFormat, LogicalSegment, LogicalType, Segment};
use crate::types::read_remaining;

/// The bit set in a reply's service code to mark it as a reply.
pub const REPLY_SERVICE_FLAG: u8 = 0b_1000_0000;

/// An explicit-messaging request to the Message Router: a service code, the
/// `EPATH` of the target, and the service data.
///
/// On the wire: `u8` service, the path in padded layout with a `u8` word
/// count, then the data.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MessageRouterRequest {
	pub service: u8,
	pub path: Epath,
	pub data: Vec<u8>,
}

impl MessageRouterRequest {
	/// Builds a request against a class/instance (and optionally attribute)
	/// logical path.
	#[must_use]
	pub fn build(
		service: u8, class_code: u16, instance: u32, attribute: Option<u16>, data: Vec<u8>,
	) -> Self {
		let mut path = Epath::default()
			/ LogicalSegment::class_id(class_code)
			/ LogicalSegment::instance_id(instance);
		if let Some(attribute) = attribute {
			path = path / LogicalSegment::attribute_id(attribute);
		}

		Self {
			service,
			path,
			data,
		}
	}

	/// The value of the first class-id logical segment of the path, if any.
	///
	/// Failed responses are described by the status tables of the object
	/// this names.
	#[must_use]
	pub fn class_code(&self) -> Option<u16> {
		self.path.segments.iter().find_map(|segment| match segment {
			Segment::Logical(logical) if logical.kind() == LogicalType::ClassId => logical
				.value()
				.get()
				.and_then(|value| u16::try_from(value).ok()),
			_ => None,
		})
	}
}

impl CipSize for MessageRouterRequest {
	fn cip_size(&self) -> usize {
		u8::CIP_SIZE + self.path.size_with(EpathFormat::PADDED_LEN) + self.data.len()
	}
}

impl Readable for MessageRouterRequest {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			service: u8::read_from(reader)?,
			path: Epath::read_with(reader, EpathFormat::PADDED_LEN, None)?,
			data: read_remaining(reader),
		})
	}
}

impl Writable for MessageRouterRequest {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.service.write_to(writer)?;
		self.path.write_with(writer, EpathFormat::PADDED_LEN)?;
		writer.put_slice(&self.data);

		Ok(())
	}
}

/// An explicit-messaging response from the Message Router.
///
/// On the wire: `u8` reply service (the request service with
/// [`REPLY_SERVICE_FLAG`] set), a reserved byte, `u8` general status, `u8`
/// count of additional `u16` status words, the words, then the service
/// data.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct MessageRouterResponse {
	pub service: u8,
	pub general_status: u8,
	pub additional_status: Vec<u16>,
	pub data: Vec<u8>,
}

impl MessageRouterResponse {
	/// The service code of the request this replies to.
	#[must_use]
	pub const fn request_service(&self) -> u8 {
		self.service ^ REPLY_SERVICE_FLAG
	}
}

impl CipSize for MessageRouterResponse {
	fn cip_size(&self) -> usize {
		4 * u8::CIP_SIZE + self.additional_status.cip_size() + self.data.len()
	}
}

impl Readable for MessageRouterResponse {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let service = u8::read_from(reader)?;
		let _reserved = u8::read_from(reader)?;
		let general_status = u8::read_from(reader)?;
		let additional_count = usize::from(u8::read_from(reader)?);

		Ok(Self {
			service,
			general_status,
			additional_status: Vec::read_with(reader, &additional_count)?,
			data: read_remaining(reader),
		})
	}
}

impl Writable for MessageRouterResponse {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.service.write_to(writer)?;
		0x00_u8.write_to(writer)?;
		self.general_status.write_to(writer)?;
		u8::try_from(self.additional_status.len())
			.map_err(|_| cipkit::WriteError::LengthOverflow {
				length: self.additional_status.len(),
				prefix: "u8",
			})?
			.write_to(writer)?;
		self.additional_status.write_to(writer)?;
		writer.put_slice(&self.data);

		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_request_layout() {
		let request = MessageRouterRequest::build(0x0E, 0x01, 1, Some(6), Vec::new());

		assert_eq!(
			request.to_bytes().unwrap(),
			[0x0E, 0x03, 0x20, 0x01, 0x24, 0x01, 0x30, 0x06]
		);
		assert_eq!(request.class_code(), Some(0x01));
	}

	#[test]
	fn test_request_round_trip() {
		let request = MessageRouterRequest::build(0x4C, 0x6B, 0, None, vec![0x01, 0x00]);
		let bytes = request.to_bytes().unwrap();

		assert_eq!(
			MessageRouterRequest::read_from(&mut &bytes[..]).unwrap(),
			request
		);
	}

	#[test]
	fn test_response_decode() {
		let bytes = [
			0x8E, 0x00, // reply service, reserved
			0x01, 0x02, // general status, two additional words
			0x09, 0x01, 0x4F, 0x01, // 0x0109, 0x014F
			0xAB, // data
		];
		let response = MessageRouterResponse::read_from(&mut &bytes[..]).unwrap();

		assert_eq!(response.request_service(), 0x0E);
		assert_eq!(response.general_status, 0x01);
		assert_eq!(response.additional_status, [0x0109, 0x014F]);
		assert_eq!(response.data, [0xAB]);

		assert_eq!(response.to_bytes().unwrap(), bytes);
	}
}

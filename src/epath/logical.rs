// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical segments: class, instance, member, connection point, attribute,
//! and service addresses.

use cipkit::{
	read_bytes,
	Buf,
	BufMut,
	ReadError,
	ReadResult,
	Readable,
	Writable,
	WriteError,
	WriteResult,
};

use super::class;

const TYPE_MASK: u8 = 0b_000_111_00;
const FORMAT_MASK: u8 = 0b_000_000_11;

const FORMAT_8BIT: u8 = 0b_00;
const FORMAT_16BIT: u8 = 0b_01;
const FORMAT_32BIT: u8 = 0b_10;
const FORMAT_RESERVED: u8 = 0b_11;

/// The logical type subfield of a [`LogicalSegment`] header.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum LogicalType {
	ClassId = 0b_000_000_00,
	InstanceId = 0b_000_001_00,
	MemberId = 0b_000_010_00,
	ConnectionPoint = 0b_000_011_00,
	AttributeId = 0b_000_100_00,
	/// Reserved for electronic keys; decoding consumes the six key bytes but
	/// segments of this type cannot be constructed.
	Special = 0b_000_101_00,
	ServiceId = 0b_000_110_00,
}

impl LogicalType {
	fn from_bits(bits: u8) -> ReadResult<Self> {
		match bits {
			0b_000_000_00 => Ok(Self::ClassId),
			0b_000_001_00 => Ok(Self::InstanceId),
			0b_000_010_00 => Ok(Self::MemberId),
			0b_000_011_00 => Ok(Self::ConnectionPoint),
			0b_000_100_00 => Ok(Self::AttributeId),
			0b_000_101_00 => Ok(Self::Special),
			0b_000_110_00 => Ok(Self::ServiceId),

			_ => Err(ReadError::invalid(
				"LogicalSegment",
				"unsupported logical type: reserved",
			)),
		}
	}

	/// Whether the 32-bit logical format is allowed for this type.
	const fn allows_32bit(self) -> bool {
		matches!(self, Self::InstanceId | Self::ConnectionPoint)
	}
}

/// The value of a [`LogicalSegment`], carrying its wire width.
///
/// The width doubles as the header's logical format subfield, so two
/// segments are equal exactly when their canonical encodings are.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LogicalValue {
	U8(u8),
	U16(u16),
	U32(u32),
	/// The six raw bytes of an electronic key. Only produced by decoding a
	/// [`LogicalType::Special`] segment.
	Key([u8; 6]),
}

impl LogicalValue {
	/// The minimal-width representation of `value`.
	#[must_use]
	pub fn fit(value: u32) -> Self {
		if let Ok(value) = u8::try_from(value) {
			Self::U8(value)
		} else if let Ok(value) = u16::try_from(value) {
			Self::U16(value)
		} else {
			Self::U32(value)
		}
	}

	/// The numeric value, unless this is an electronic key.
	#[must_use]
	pub const fn get(self) -> Option<u32> {
		match self {
			Self::U8(value) => Some(value as u32),
			Self::U16(value) => Some(value as u32),
			Self::U32(value) => Some(value),
			Self::Key(_) => None,
		}
	}

	const fn width(self) -> usize {
		match self {
			Self::U8(_) => 1,
			Self::U16(_) => 2,
			Self::U32(_) => 4,
			Self::Key(_) => 6,
		}
	}

	const fn format_bits(self) -> u8 {
		match self {
			Self::U8(_) | Self::Key(_) => FORMAT_8BIT,
			Self::U16(_) => FORMAT_16BIT,
			Self::U32(_) => FORMAT_32BIT,
		}
	}
}

/// A logical segment of a CIP path.
///
/// ```no_rust
/// +----+----+----+----+----+----+-------+--------+
/// | Segment Type | Logical Type | Logical Format |
/// +====+====+====+====+====+====+=======+========+
/// |  7 |  6 |  5 | 4  |  3 |  2 |   1   |    0   |
/// +----+----+----+----+----+----+-------+--------+
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LogicalSegment {
	kind: LogicalType,
	value: LogicalValue,
}

impl LogicalSegment {
	/// Builds a logical segment with the minimal-width format for `value`.
	///
	/// # Errors
	///
	/// [`WriteError::Invalid`] for 32-bit values on types other than
	/// instance id and connection point, for service ids above `u8`, and for
	/// the unsupported special type.
	pub fn new(kind: LogicalType, value: u32) -> Result<Self, WriteError> {
		let value = match kind {
			LogicalType::Special => {
				return Err(WriteError::invalid(
					"LogicalSegment",
					"logical segments with the special type are not supported",
				));
			},

			LogicalType::ServiceId => {
				let value = u8::try_from(value).map_err(|_| {
					WriteError::invalid(
						"LogicalSegment",
						format!("invalid logical value for service id type: {value}"),
					)
				})?;

				LogicalValue::U8(value)
			},

			_ => {
				let value = LogicalValue::fit(value);
				if matches!(value, LogicalValue::U32(_)) && !kind.allows_32bit() {
					return Err(WriteError::invalid(
						"LogicalSegment",
						"32-bit logical value only valid for instance id and connection point types",
					));
				}

				value
			},
		};

		Ok(Self { kind, value })
	}

	/// A class id segment.
	#[must_use]
	pub fn class_id(class_code: u16) -> Self {
		Self {
			kind: LogicalType::ClassId,
			value: LogicalValue::fit(u32::from(class_code)),
		}
	}

	/// An instance id segment.
	#[must_use]
	pub fn instance_id(instance: u32) -> Self {
		Self {
			kind: LogicalType::InstanceId,
			value: LogicalValue::fit(instance),
		}
	}

	/// A member id segment.
	#[must_use]
	pub fn member_id(member: u16) -> Self {
		Self {
			kind: LogicalType::MemberId,
			value: LogicalValue::fit(u32::from(member)),
		}
	}

	/// A connection point segment.
	#[must_use]
	pub fn connection_point(point: u32) -> Self {
		Self {
			kind: LogicalType::ConnectionPoint,
			value: LogicalValue::fit(point),
		}
	}

	/// An attribute id segment.
	#[must_use]
	pub fn attribute_id(attribute: u16) -> Self {
		Self {
			kind: LogicalType::AttributeId,
			value: LogicalValue::fit(u32::from(attribute)),
		}
	}

	/// A service id segment.
	#[must_use]
	pub const fn service_id(service: u8) -> Self {
		Self {
			kind: LogicalType::ServiceId,
			value: LogicalValue::U8(service),
		}
	}

	#[must_use]
	pub const fn kind(&self) -> LogicalType {
		self.kind
	}

	#[must_use]
	pub const fn value(&self) -> LogicalValue {
		self.value
	}

	pub(crate) fn segment_size(&self, padded: bool) -> usize {
		let pad = usize::from(padded && self.value.width() > 1 && !matches!(self.value, LogicalValue::Key(_)));

		1 + pad + self.value.width()
	}

	pub(crate) fn write_segment(&self, writer: &mut impl BufMut, padded: bool) -> WriteResult {
		let header = class::LOGICAL | self.kind as u8 | self.value.format_bits();
		header.write_to(writer)?;

		match self.value {
			LogicalValue::U8(value) => value.write_to(writer)?,
			LogicalValue::Key(key) => key.write_to(writer)?,

			LogicalValue::U16(value) => {
				if padded {
					0x00_u8.write_to(writer)?;
				}
				value.write_to(writer)?;
			},
			LogicalValue::U32(value) => {
				if padded {
					0x00_u8.write_to(writer)?;
				}
				value.write_to(writer)?;
			},
		}

		Ok(())
	}

	pub(crate) fn read_segment(reader: &mut impl Buf, padded: bool) -> ReadResult<Self> {
		let invalid = |reason: String| ReadError::invalid("LogicalSegment", reason);

		let header = u8::read_from(reader)?;
		if header & class::MASK != class::LOGICAL {
			return Err(invalid(format!(
				"segment class invalid (001): {:03b}",
				header >> 5
			)));
		}

		let kind = LogicalType::from_bits(header & TYPE_MASK)?;
		let format = header & FORMAT_MASK;

		if format == FORMAT_RESERVED {
			return Err(invalid("unsupported logical format: reserved".to_owned()));
		}

		let value = match kind {
			LogicalType::Special => {
				if format != FORMAT_8BIT {
					return Err(invalid(format!(
						"unsupported logical format for special type (00): {format:02b}"
					)));
				}

				let key = read_bytes(reader, 6)
					.map_err(|_| invalid("error decoding electronic key".to_owned()))?;

				LogicalValue::Key(key.try_into().expect("read_bytes returned 6 bytes"))
			},

			LogicalType::ServiceId => {
				if format != FORMAT_8BIT {
					return Err(invalid(format!(
						"unsupported logical format for service id type (00): {format:02b}"
					)));
				}

				let value = u8::read_from(reader)
					.map_err(|_| invalid("error decoding service id logical value".to_owned()))?;

				LogicalValue::U8(value)
			},

			_ => {
				if format == FORMAT_32BIT && !kind.allows_32bit() {
					return Err(invalid(format!(
						"32-bit logical format on unsupported logical type: {:03b}",
						(kind as u8) >> 2
					)));
				}

				let decode_error = || invalid("error decoding logical value".to_owned());

				if format == FORMAT_8BIT {
					LogicalValue::U8(u8::read_from(reader).map_err(|_| decode_error())?)
				} else {
					if padded {
						let _pad = u8::read_from(reader).map_err(|_| decode_error())?;
					}

					if format == FORMAT_16BIT {
						LogicalValue::U16(u16::read_from(reader).map_err(|_| decode_error())?)
					} else {
						LogicalValue::U32(u32::read_from(reader).map_err(|_| decode_error())?)
					}
				}
			},
		};

		Ok(Self { kind, value })
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn round_trip(segment: LogicalSegment, encoded: &[u8], padded: bool) {
		let mut bytes = Vec::new();
		segment.write_segment(&mut bytes, padded).unwrap();

		assert_eq!(bytes, encoded);
		assert_eq!(
			LogicalSegment::read_segment(&mut &bytes[..], padded).unwrap(),
			segment
		);
	}

	#[test]
	fn test_8bit_and_16bit_formats() {
		let kinds = [
			(LogicalType::ClassId, 0b_001_000_00_u8),
			(LogicalType::InstanceId, 0b_001_001_00),
			(LogicalType::MemberId, 0b_001_010_00),
			(LogicalType::ConnectionPoint, 0b_001_011_00),
			(LogicalType::AttributeId, 0b_001_100_00),
		];

		for (kind, header) in kinds {
			round_trip(
				LogicalSegment::new(kind, 1).unwrap(),
				&[header, 0x01],
				false,
			);
			round_trip(
				LogicalSegment::new(kind, 257).unwrap(),
				&[header | 0b_01, 0x01, 0x01],
				false,
			);
		}
	}

	#[test]
	fn test_32bit_formats() {
		round_trip(
			LogicalSegment::instance_id(65_536),
			&[0b_001_001_10, 0x00, 0x00, 0x01, 0x00],
			false,
		);
		round_trip(
			LogicalSegment::connection_point(65_536),
			&[0b_001_011_10, 0x00, 0x00, 0x01, 0x00],
			false,
		);
	}

	#[test]
	fn test_service_id() {
		round_trip(LogicalSegment::service_id(1), &[0b_001_110_00, 0x01], false);
	}

	#[test]
	fn test_padded_formats() {
		round_trip(LogicalSegment::instance_id(1), &[0x24, 0x01], true);
		round_trip(
			LogicalSegment::instance_id(300),
			&[0x25, 0x00, 0x2C, 0x01],
			true,
		);
		round_trip(
			LogicalSegment::instance_id(100_000),
			&[0x26, 0x00, 0xA0, 0x86, 0x01, 0x00],
			true,
		);
	}

	#[test]
	fn test_unpadded_16bit_instance() {
		round_trip(
			LogicalSegment::instance_id(300),
			&[0x25, 0x2C, 0x01],
			false,
		);
	}

	#[test]
	fn test_bad_constructions() {
		assert!(LogicalSegment::new(LogicalType::ServiceId, 256).is_err());
		assert!(LogicalSegment::new(LogicalType::Special, 1).is_err());
		assert!(LogicalSegment::new(LogicalType::ClassId, 65_536).is_err());
		assert!(LogicalSegment::new(LogicalType::MemberId, 65_536).is_err());
		assert!(LogicalSegment::new(LogicalType::AttributeId, 65_536).is_err());
	}

	#[test]
	fn test_bad_decodes() {
		let cases: &[&[u8]] = &[
			&[0b_001_110_01],       // service id with a non-8-bit format
			&[0b_001_101_01],       // special with a non-key format
			&[0b_001_111_00],       // reserved type
			&[0b_001_000_11],       // reserved format
			&[0b_001_000_00],       // 8-bit value missing
			&[0b_001_000_01, 0x01], // 16-bit value truncated
			&[0b_001_001_10, 0x01, 0x02, 0x03], // 32-bit value truncated
			&[0b_001_000_10],       // 32-bit format on class id
		];

		for encoded in cases {
			assert!(matches!(
				LogicalSegment::read_segment(&mut &encoded[..], false),
				Err(ReadError::Invalid { .. })
			));
		}
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network segments: per-hop network parameters.

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

const KIND_MASK: u8 = 0b_000_11111;
/// Subtypes with this bit carry a length byte and a data array.
const DATA_ARRAY_MASK: u8 = 0b_000_10000;

/// The subtype of a [`NetworkSegment`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum NetworkKind {
	Scheduled = 0b_000_00001,
	FixedTag = 0b_000_00010,
	ProductionInhibitTime = 0b_000_00011,
	Safety = 0b_000_10000,
	Extended = 0b_000_11111,
}

impl NetworkKind {
	fn from_bits(bits: u8) -> ReadResult<Self> {
		match bits {
			0b_000_00001 => Ok(Self::Scheduled),
			0b_000_00010 => Ok(Self::FixedTag),
			0b_000_00011 => Ok(Self::ProductionInhibitTime),
			0b_000_10000 => Ok(Self::Safety),
			0b_000_11111 => Ok(Self::Extended),

			other => Err(ReadError::invalid(
				"NetworkSegment",
				format!("network segment subtype unsupported: {other:05b}"),
			)),
		}
	}

	/// Whether this subtype carries a length byte and a data array rather
	/// than a single parameter byte.
	const fn data_array(self) -> bool {
		self as u8 & DATA_ARRAY_MASK != 0
	}
}

/// A network segment of a CIP path.
///
/// The scheduled, fixed-tag, and production-inhibit-time subtypes carry
/// exactly one byte of data. The safety and extended subtypes carry a
/// length-prefixed data array; the first two data bytes of an extended
/// segment select its extended subtype and are not counted in the encoded
/// length.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct NetworkSegment {
	kind: NetworkKind,
	data: Vec<u8>,
}

impl NetworkSegment {
	/// Builds a network segment.
	///
	/// # Errors
	///
	/// [`WriteError::Invalid`] if the data does not fit the subtype.
	pub fn new(kind: NetworkKind, data: impl Into<Vec<u8>>) -> Result<Self, WriteError> {
		let data = data.into();

		if !kind.data_array() && data.len() != 1 {
			return Err(WriteError::invalid(
				"NetworkSegment",
				format!(
					"network segment subtype {:05b} requires exactly one byte of data",
					kind as u8
				),
			));
		}
		if kind == NetworkKind::Extended && data.len() < 2 {
			return Err(WriteError::invalid(
				"NetworkSegment",
				"extended network segments need two data bytes for the extended subtype",
			));
		}

		let counted = data.len() - if kind == NetworkKind::Extended { 2 } else { 0 };
		if counted > usize::from(u8::MAX) {
			return Err(WriteError::LengthOverflow {
				length: counted,
				prefix: "u8",
			});
		}

		Ok(Self { kind, data })
	}

	#[must_use]
	pub const fn kind(&self) -> NetworkKind {
		self.kind
	}

	#[must_use]
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub(crate) fn segment_size(&self) -> usize {
		1 + usize::from(self.kind.data_array()) + self.data.len()
	}

	pub(crate) fn write_segment(&self, writer: &mut impl BufMut) -> WriteResult {
		let header = class::NETWORK | self.kind as u8;
		header.write_to(writer)?;

		if self.kind.data_array() {
			let counted = self.data.len() - if self.kind == NetworkKind::Extended { 2 } else { 0 };
			// the constructor bounds `counted`
			(counted as u8).write_to(writer)?;
		}
		writer.put_slice(&self.data);

		Ok(())
	}

	pub(crate) fn read_segment(reader: &mut impl Buf) -> ReadResult<Self> {
		let header = u8::read_from(reader)?;
		if header & class::MASK != class::NETWORK {
			return Err(ReadError::invalid(
				"NetworkSegment",
				format!("segment class invalid (010): {:03b}", header >> 5),
			));
		}

		let kind = NetworkKind::from_bits(header & KIND_MASK)?;

		let data = if kind.data_array() {
			let mut length = usize::from(
				u8::read_from(reader).map_err(|_| {
					ReadError::invalid("NetworkSegment", "error decoding network segment data")
				})?,
			);
			if kind == NetworkKind::Extended {
				length += 2;
			}

			read_bytes(reader, length).map_err(|_| {
				ReadError::invalid("NetworkSegment", "error decoding network segment data")
			})?
		} else {
			vec![u8::read_from(reader).map_err(|_| {
				ReadError::invalid("NetworkSegment", "error decoding network segment data")
			})?]
		};

		Ok(Self { kind, data })
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn round_trip(segment: &NetworkSegment, encoded: &[u8]) {
		let mut bytes = Vec::new();
		segment.write_segment(&mut bytes).unwrap();

		assert_eq!(bytes, encoded);
		assert_eq!(
			&NetworkSegment::read_segment(&mut &bytes[..]).unwrap(),
			segment
		);
	}

	#[test]
	fn test_encodings() {
		let cases: &[(NetworkKind, &[u8], &[u8])] = &[
			(NetworkKind::Scheduled, b"1", &[0b_010_00001, 0x31]),
			(NetworkKind::FixedTag, b"1", &[0b_010_00010, 0x31]),
			(
				NetworkKind::ProductionInhibitTime,
				b"1",
				&[0b_010_00011, 0x31],
			),
			(NetworkKind::Safety, b"12", &[0b_010_10000, 0x02, 0x31, 0x32]),
			(
				NetworkKind::Extended,
				b"\x00\x00ab",
				&[0b_010_11111, 0x02, 0x00, 0x00, 0x61, 0x62],
			),
		];

		for (kind, data, encoded) in cases {
			round_trip(&NetworkSegment::new(*kind, *data).unwrap(), encoded);
		}
	}

	#[test]
	fn test_bad_constructions() {
		assert!(NetworkSegment::new(NetworkKind::Scheduled, b"abc".as_slice()).is_err());
		assert!(NetworkSegment::new(NetworkKind::Extended, b"".as_slice()).is_err());
	}

	#[test]
	fn test_bad_decodes() {
		// unsupported subtypes
		for encoded in [[0b_010_00111], [0b_010_11000]] {
			assert!(matches!(
				NetworkSegment::read_segment(&mut &encoded[..]),
				Err(ReadError::Invalid { .. })
			));
		}

		// short data array
		assert!(matches!(
			NetworkSegment::read_segment(&mut &[0b_010_10000, 0x02, 0x61][..]),
			Err(ReadError::Invalid { .. })
		));
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data segments: service data embedded in a path.

use cipkit::{
	read_bytes,
	Buf,
	BufMut,
	LengthPrefix,
	ReadError,
	ReadResult,
	Readable,
	Writable,
	WriteError,
	WriteResult,
};

use crate::types::Latin1Str;

use super::class;

const SUBTYPE_MASK: u8 = 0b_000_11111;
const SUBTYPE_SIMPLE: u8 = 0b_000_00000;
const SUBTYPE_ANSI_EXTENDED: u8 = 0b_000_10001;

/// A data segment of a CIP path.
///
/// ```no_rust
/// +----+----+----+---+---+---+---+---+
/// | Segment Type | Segment Sub-Type  |
/// +====+====+====+===+===+===+===+===+
/// |  7 |  6 | 5  | 4 | 3 | 2 | 1 | 0 |
/// +----+----+----+---+---+---+---+---+
/// ```
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum DataSegment {
	/// The simple subtype: a word count followed by raw data, which must
	/// therefore be an even number of bytes.
	Simple(Vec<u8>),
	/// The ANSI extended subtype: a length-prefixed symbol of one-byte
	/// characters, padded to an even total length.
	Ansi(String),
}

impl DataSegment {
	pub(crate) fn segment_size(&self) -> usize {
		match self {
			Self::Simple(data) => 2 + data.len(),
			Self::Ansi(symbol) => {
				let size = 2 + symbol.chars().count();

				size + size % 2
			},
		}
	}

	pub(crate) fn write_segment(&self, writer: &mut impl BufMut) -> WriteResult {
		match self {
			Self::Simple(data) => {
				if data.len() % 2 != 0 {
					return Err(WriteError::invalid(
						"DataSegment",
						format!("simple data of {} bytes is not a whole number of words", data.len()),
					));
				}

				(class::DATA | SUBTYPE_SIMPLE).write_to(writer)?;
				u8::from_length(data.len() / 2)?.write_to(writer)?;
				writer.put_slice(data);
			},

			Self::Ansi(symbol) => {
				(class::DATA | SUBTYPE_ANSI_EXTENDED).write_to(writer)?;

				let bytes = symbol.to_latin1()?;
				u8::from_length(bytes.len())?.write_to(writer)?;
				writer.put_slice(&bytes);

				if bytes.len() % 2 != 0 {
					0x00_u8.write_to(writer)?;
				}
			},
		}

		Ok(())
	}

	pub(crate) fn read_segment(reader: &mut impl Buf) -> ReadResult<Self> {
		let invalid = |reason: String| ReadError::invalid("DataSegment", reason);

		let header = u8::read_from(reader)?;
		if header & class::MASK != class::DATA {
			return Err(invalid(format!(
				"segment class invalid (100): {:03b}",
				header >> 5
			)));
		}

		match header & SUBTYPE_MASK {
			SUBTYPE_SIMPLE => {
				let words = usize::from(
					u8::read_from(reader)
						.map_err(|_| invalid("error decoding data segment".to_owned()))?,
				);
				let data = read_bytes(reader, words * 2)
					.map_err(|_| invalid("error decoding data segment".to_owned()))?;

				Ok(Self::Simple(data))
			},

			SUBTYPE_ANSI_EXTENDED => {
				let length = usize::from(
					u8::read_from(reader)
						.map_err(|_| invalid("error decoding data segment".to_owned()))?,
				);
				let bytes = read_bytes(reader, length)
					.map_err(|_| invalid("error decoding data segment".to_owned()))?;

				if length % 2 != 0 {
					let _pad = u8::read_from(reader)
						.map_err(|_| invalid("expected a pad byte after the symbol".to_owned()))?;
				}

				Ok(Self::Ansi(String::from_latin1(&bytes)))
			},

			other => Err(invalid(format!(
				"data segment subtype unsupported: {other:05b}"
			))),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn round_trip(segment: &DataSegment, encoded: &[u8]) {
		let mut bytes = Vec::new();
		segment.write_segment(&mut bytes).unwrap();

		assert_eq!(bytes, encoded);
		assert_eq!(&DataSegment::read_segment(&mut &bytes[..]).unwrap(), segment);
	}

	#[test]
	fn test_simple() {
		round_trip(
			&DataSegment::Simple(vec![0xDE, 0xAD, 0xBE, 0xEF]),
			&[0x80, 0x02, 0xDE, 0xAD, 0xBE, 0xEF],
		);
	}

	#[test]
	fn test_ansi_even_symbol() {
		round_trip(
			&DataSegment::Ansi("ab".into()),
			&[0x91, 0x02, 0x61, 0x62],
		);
	}

	#[test]
	fn test_ansi_odd_symbol_is_padded() {
		round_trip(
			&DataSegment::Ansi("abc".into()),
			&[0x91, 0x03, 0x61, 0x62, 0x63, 0x00],
		);
	}

	#[test]
	fn test_simple_rejects_odd_data() {
		let mut bytes = Vec::new();

		assert!(DataSegment::Simple(vec![0x01])
			.write_segment(&mut bytes)
			.is_err());
	}
}

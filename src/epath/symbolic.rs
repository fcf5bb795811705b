// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Symbolic segments: names resolved by the target device.

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

const SYMBOL_SIZE_MASK: u8 = 0b_000_11111;

const EXTENDED_FORMAT_MASK: u8 = 0b_111_00000;
const EXTENDED_SIZE_MASK: u8 = 0b_000_11111;
const DOUBLE_BYTE_CHARS: u8 = 0b_001_00000;
const TRIPLE_BYTE_CHARS: u8 = 0b_010_00000;

// The numeric selectors are compared on the whole byte, not masked: their
// high bits collide positionally with the character-size discriminators.
const NUMERIC_USINT: u8 = 0xC6;
const NUMERIC_UINT: u8 = 0xC7;
const NUMERIC_UDINT: u8 = 0xC8;

/// A numeric symbol and its wire width.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NumericSymbol {
	Usint(u8),
	Uint(u16),
	Udint(u32),
}

/// The symbol of a [`SymbolicSegment`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Symbol {
	/// An ASCII symbol of 1 to 31 characters, carried inline in the header.
	Ascii(String),
	/// Double-byte characters in the extended format; the byte count must be
	/// even.
	DoubleByte(Vec<u8>),
	/// Triple-byte characters in the extended format; the byte count must be
	/// a multiple of three.
	TripleByte(Vec<u8>),
	/// A numeric symbol in the extended format.
	Numeric(NumericSymbol),
}

/// A symbolic segment of a CIP path.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SymbolicSegment {
	symbol: Symbol,
}

impl SymbolicSegment {
	/// Builds a symbolic segment.
	///
	/// # Errors
	///
	/// [`WriteError::Invalid`] if the symbol does not fit its format: ASCII
	/// symbols must be 1 to 31 ASCII characters, double-byte data an even
	/// number of bytes, and triple-byte data a multiple of three, with at
	/// most 31 characters each.
	pub fn new(symbol: Symbol) -> Result<Self, WriteError> {
		let invalid = |reason: String| WriteError::invalid("SymbolicSegment", reason);

		match &symbol {
			Symbol::Ascii(text) => {
				if text.is_empty() || text.len() > 31 {
					return Err(invalid(format!(
						"symbol size invalid, must be 1-31 characters: {}",
						text.len()
					)));
				}
				if !text.is_ascii() {
					return Err(invalid(format!("symbol is not ascii: {text:?}")));
				}
			},

			Symbol::DoubleByte(data) => {
				if data.len() % 2 != 0 {
					return Err(invalid(
						"length of a double-byte symbol is not a multiple of 2".to_owned(),
					));
				}
				if data.len() / 2 > 31 {
					return Err(invalid("double-byte symbol too long".to_owned()));
				}
			},

			Symbol::TripleByte(data) => {
				if data.len() % 3 != 0 {
					return Err(invalid(
						"length of a triple-byte symbol is not a multiple of 3".to_owned(),
					));
				}
				if data.len() / 3 > 31 {
					return Err(invalid("triple-byte symbol too long".to_owned()));
				}
			},

			Symbol::Numeric(_) => {},
		}

		Ok(Self { symbol })
	}

	/// Shorthand for an ASCII symbol.
	///
	/// # Errors
	///
	/// As [`SymbolicSegment::new`].
	pub fn ascii(symbol: impl Into<String>) -> Result<Self, WriteError> {
		Self::new(Symbol::Ascii(symbol.into()))
	}

	#[must_use]
	pub const fn symbol(&self) -> &Symbol {
		&self.symbol
	}

	pub(crate) fn segment_size(&self) -> usize {
		match &self.symbol {
			Symbol::Ascii(text) => 1 + text.len(),
			Symbol::DoubleByte(data) | Symbol::TripleByte(data) => 2 + data.len(),
			Symbol::Numeric(NumericSymbol::Usint(_)) => 3,
			Symbol::Numeric(NumericSymbol::Uint(_)) => 4,
			Symbol::Numeric(NumericSymbol::Udint(_)) => 6,
		}
	}

	pub(crate) fn write_segment(&self, writer: &mut impl BufMut) -> WriteResult {
		match &self.symbol {
			Symbol::Ascii(text) => {
				// the constructor bounds the length to 31
				(class::SYMBOLIC | text.len() as u8).write_to(writer)?;
				writer.put_slice(text.as_bytes());
			},

			Symbol::DoubleByte(data) => {
				class::SYMBOLIC.write_to(writer)?;
				(DOUBLE_BYTE_CHARS | (data.len() / 2) as u8).write_to(writer)?;
				writer.put_slice(data);
			},

			Symbol::TripleByte(data) => {
				class::SYMBOLIC.write_to(writer)?;
				(TRIPLE_BYTE_CHARS | (data.len() / 3) as u8).write_to(writer)?;
				writer.put_slice(data);
			},

			Symbol::Numeric(numeric) => {
				class::SYMBOLIC.write_to(writer)?;

				match numeric {
					NumericSymbol::Usint(value) => {
						NUMERIC_USINT.write_to(writer)?;
						value.write_to(writer)?;
					},
					NumericSymbol::Uint(value) => {
						NUMERIC_UINT.write_to(writer)?;
						value.write_to(writer)?;
					},
					NumericSymbol::Udint(value) => {
						NUMERIC_UDINT.write_to(writer)?;
						value.write_to(writer)?;
					},
				}
			},
		}

		Ok(())
	}

	pub(crate) fn read_segment(reader: &mut impl Buf) -> ReadResult<Self> {
		let invalid = |reason: String| ReadError::invalid("SymbolicSegment", reason);

		let header = u8::read_from(reader)?;
		if header & class::MASK != class::SYMBOLIC {
			return Err(invalid(format!(
				"segment class invalid (011): {:03b}",
				header >> 5
			)));
		}

		let size = header & SYMBOL_SIZE_MASK;
		if size != 0 {
			let bytes = read_bytes(reader, usize::from(size))
				.map_err(|_| invalid("error decoding symbol".to_owned()))?;
			let text = String::from_utf8(bytes)
				.map_err(|_| invalid("symbol is not ascii".to_owned()))?;

			return Ok(Self {
				symbol: Symbol::Ascii(text),
			});
		}

		let extended = u8::read_from(reader)
			.map_err(|_| invalid("error decoding extended symbol format".to_owned()))?;

		let symbol = match extended {
			NUMERIC_USINT => Symbol::Numeric(NumericSymbol::Usint(
				u8::read_from(reader)
					.map_err(|_| invalid("error decoding numeric symbol".to_owned()))?,
			)),
			NUMERIC_UINT => Symbol::Numeric(NumericSymbol::Uint(
				u16::read_from(reader)
					.map_err(|_| invalid("error decoding numeric symbol".to_owned()))?,
			)),
			NUMERIC_UDINT => Symbol::Numeric(NumericSymbol::Udint(
				u32::read_from(reader)
					.map_err(|_| invalid("error decoding numeric symbol".to_owned()))?,
			)),

			_ => {
				let count = usize::from(extended & EXTENDED_SIZE_MASK);

				match extended & EXTENDED_FORMAT_MASK {
					DOUBLE_BYTE_CHARS => Symbol::DoubleByte(
						read_bytes(reader, count * 2)
							.map_err(|_| invalid("error decoding symbol".to_owned()))?,
					),
					TRIPLE_BYTE_CHARS => Symbol::TripleByte(
						read_bytes(reader, count * 3)
							.map_err(|_| invalid("error decoding symbol".to_owned()))?,
					),

					other => {
						return Err(invalid(format!(
							"unsupported extended symbol format: {:03b}",
							other >> 5
						)));
					},
				}
			},
		};

		Ok(Self { symbol })
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn round_trip(segment: &SymbolicSegment, encoded: &[u8]) {
		let mut bytes = Vec::new();
		segment.write_segment(&mut bytes).unwrap();

		assert_eq!(bytes, encoded);
		assert_eq!(
			&SymbolicSegment::read_segment(&mut &bytes[..]).unwrap(),
			segment
		);
	}

	#[test]
	fn test_ascii() {
		round_trip(
			&SymbolicSegment::ascii("her?").unwrap(),
			&[0x64, 0x68, 0x65, 0x72, 0x3F],
		);
	}

	#[test]
	fn test_extended_character_sizes() {
		round_trip(
			&SymbolicSegment::new(Symbol::DoubleByte(vec![0x11, 0x11, 0x22, 0x22])).unwrap(),
			&[0x60, 0x22, 0x11, 0x11, 0x22, 0x22],
		);
		round_trip(
			&SymbolicSegment::new(Symbol::TripleByte(vec![
				0x11, 0x11, 0x11, 0x22, 0x22, 0x22,
			]))
			.unwrap(),
			&[0x60, 0x42, 0x11, 0x11, 0x11, 0x22, 0x22, 0x22],
		);
	}

	#[test]
	fn test_numeric() {
		round_trip(
			&SymbolicSegment::new(Symbol::Numeric(NumericSymbol::Usint(1))).unwrap(),
			&[0x60, 0xC6, 0x01],
		);
		round_trip(
			&SymbolicSegment::new(Symbol::Numeric(NumericSymbol::Uint(1))).unwrap(),
			&[0x60, 0xC7, 0x01, 0x00],
		);
		round_trip(
			&SymbolicSegment::new(Symbol::Numeric(NumericSymbol::Udint(1))).unwrap(),
			&[0x60, 0xC8, 0x01, 0x00, 0x00, 0x00],
		);
	}

	#[test]
	fn test_bad_constructions() {
		assert!(SymbolicSegment::ascii("").is_err());
		assert!(SymbolicSegment::ascii("a".repeat(32)).is_err());
		assert!(SymbolicSegment::ascii("héllo").is_err());
		assert!(SymbolicSegment::new(Symbol::DoubleByte(vec![0x11])).is_err());
		assert!(SymbolicSegment::new(Symbol::TripleByte(vec![0x11, 0x11])).is_err());
	}

	#[test]
	fn test_unsupported_extended_format() {
		assert!(matches!(
			SymbolicSegment::read_segment(&mut &[0x60, 0b_101_00001, 0x00][..]),
			Err(ReadError::Invalid { .. })
		));
	}
}

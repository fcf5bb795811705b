// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP character string family.
//!
//! CIP strings are length-prefixed, with a different prefix width and
//! character encoding per type:
//!
//! |Type|Length prefix|Character encoding|
//! |---|---|---|
//! |[`ShortString`]|`u8`|ISO-8859-1|
//! |[`CipString`]|`u16`|ISO-8859-1|
//! |[`LongString`]|`u32`|ISO-8859-1|
//! |[`String2`]|`u16`|UTF-16LE|
//! |[`StringN`]|`u16` char size + `u16` count|UTF-8/UTF-16LE/UTF-32LE|
//! |[`CString`]|none (NUL-terminated)|ISO-8859-1|

use std::fmt;

use cipkit::{
	read_bytes,
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	LengthPrefix,
	ReadError,
	ReadResult,
	Readable,
	ReadableWithContext,
	Writable,
	WriteError,
	WriteResult,
};

/// Conversions between Rust strings and ISO-8859-1 (Latin-1) bytes.
///
/// Latin-1 code points are exactly the first 256 Unicode scalar values, so
/// decoding is total and encoding fails only for characters above U+00FF.
pub trait Latin1Str {
	/// Encodes to Latin-1 bytes, one byte per character.
	///
	/// # Errors
	///
	/// [`WriteError::Invalid`] if any character is above U+00FF.
	fn to_latin1(&self) -> Result<Vec<u8>, WriteError>;

	/// Decodes Latin-1 bytes, one character per byte.
	#[must_use]
	fn from_latin1(bytes: &[u8]) -> String {
		bytes.iter().map(|&byte| char::from(byte)).collect()
	}
}

impl Latin1Str for str {
	fn to_latin1(&self) -> Result<Vec<u8>, WriteError> {
		self.chars()
			.map(|character| {
				u8::try_from(u32::from(character)).map_err(|_| {
					WriteError::invalid(
						"Latin-1 string",
						format!("character {character:?} is not representable in ISO-8859-1"),
					)
				})
			})
			.collect()
	}
}

macro_rules! latin1_string {
	($(
		$(#[$meta:meta])*
		$Type:ident: $len:ty => $name:literal
	),*$(,)?) => {
		$(
			$(#[$meta])*
			#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
			pub struct $Type(String);

			impl $Type {
				/// Wraps the given text.
				///
				/// Whether every character fits the wire encoding is checked
				/// when the string is written, not here.
				pub fn new(text: impl Into<String>) -> Self {
					Self(text.into())
				}

				#[must_use]
				pub fn as_str(&self) -> &str {
					&self.0
				}

				#[must_use]
				pub fn into_string(self) -> String {
					self.0
				}
			}

			impl From<&str> for $Type {
				fn from(text: &str) -> Self {
					Self::new(text)
				}
			}

			impl From<String> for $Type {
				fn from(text: String) -> Self {
					Self(text)
				}
			}

			impl fmt::Display for $Type {
				fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
					self.0.fmt(f)
				}
			}

			impl CipSize for $Type {
				fn cip_size(&self) -> usize {
					<$len>::CIP_SIZE + self.0.chars().count()
				}
			}

			impl Readable for $Type {
				fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
					let length = <$len>::read_from(reader)?.to_length()?;
					let bytes = read_bytes(reader, length)?;

					Ok(Self(String::from_latin1(&bytes)))
				}
			}

			impl Writable for $Type {
				fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
					let bytes = self.0.to_latin1()?;

					<$len>::from_length(bytes.len())?.write_to(writer)?;
					writer.put_slice(&bytes);

					Ok(())
				}
			}
		)*
	};
}

latin1_string! {
	/// The CIP `SHORT_STRING` type: a `u8` character count followed by one
	/// ISO-8859-1 byte per character.
	ShortString: u8 => "SHORT_STRING",
	/// The CIP `STRING` type: a `u16` character count followed by one
	/// ISO-8859-1 byte per character.
	CipString: u16 => "STRING",
	/// A character string with a `u32` character count and one ISO-8859-1
	/// byte per character.
	LongString: u32 => "LONG_STRING",
}

impl Latin1Str for String {
	fn to_latin1(&self) -> Result<Vec<u8>, WriteError> {
		self.as_str().to_latin1()
	}
}

/// The CIP `STRING2` type: a `u16` count of UTF-16 code units followed by
/// the units in little-endian order.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct String2(pub String);

impl String2 {
	fn units(&self) -> Vec<u16> {
		self.0.encode_utf16().collect()
	}
}

impl CipSize for String2 {
	fn cip_size(&self) -> usize {
		u16::CIP_SIZE + 2 * self.units().len()
	}
}

impl Readable for String2 {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let count = u16::read_from(reader)?.to_length()?;
		let units = Vec::<u16>::read_with(reader, &count)?;

		String::from_utf16(&units)
			.map(Self)
			.map_err(|error| ReadError::FailedConversion(Box::new(error)))
	}
}

impl Writable for String2 {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		let units = self.units();

		u16::from_length(units.len())?.write_to(writer)?;
		units.write_to(writer)?;

		Ok(())
	}
}

/// The character encodings supported by [`StringN`] and their character
/// sizes in bytes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum StringNEncoding {
	#[default]
	Utf8 = 1,
	Utf16 = 2,
	Utf32 = 4,
}

impl StringNEncoding {
	const fn char_size(self) -> u16 {
		self as u16
	}

	fn from_char_size(char_size: u16) -> ReadResult<Self> {
		match char_size {
			1 => Ok(Self::Utf8),
			2 => Ok(Self::Utf16),
			4 => Ok(Self::Utf32),

			other => Err(ReadError::invalid(
				"STRINGN",
				format!("unsupported character size: {other}"),
			)),
		}
	}
}

/// The CIP `STRINGN` type: a `u16` character size, a `u16` character count,
/// and the characters in the corresponding encoding (little-endian for the
/// multi-byte ones).
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StringN {
	pub text: String,
	pub encoding: StringNEncoding,
}

impl StringN {
	pub fn new(text: impl Into<String>, encoding: StringNEncoding) -> Self {
		Self {
			text: text.into(),
			encoding,
		}
	}

	/// The encoded characters, and their count in units of the character
	/// size.
	fn encoded(&self) -> (Vec<u8>, usize) {
		match self.encoding {
			StringNEncoding::Utf8 => {
				let bytes = self.text.as_bytes().to_vec();
				let count = bytes.len();

				(bytes, count)
			},

			StringNEncoding::Utf16 => {
				let units: Vec<u16> = self.text.encode_utf16().collect();
				let count = units.len();
				let bytes = units.iter().flat_map(|unit| unit.to_le_bytes()).collect();

				(bytes, count)
			},

			StringNEncoding::Utf32 => {
				let bytes: Vec<u8> = self
					.text
					.chars()
					.flat_map(|character| u32::from(character).to_le_bytes())
					.collect();
				let count = self.text.chars().count();

				(bytes, count)
			},
		}
	}

	fn decode(bytes: &[u8], encoding: StringNEncoding) -> ReadResult<String> {
		match encoding {
			StringNEncoding::Utf8 => String::from_utf8(bytes.to_vec())
				.map_err(|error| ReadError::FailedConversion(Box::new(error))),

			StringNEncoding::Utf16 => {
				let units: Vec<u16> = bytes
					.chunks_exact(2)
					.map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
					.collect();

				String::from_utf16(&units)
					.map_err(|error| ReadError::FailedConversion(Box::new(error)))
			},

			StringNEncoding::Utf32 => bytes
				.chunks_exact(4)
				.map(|quad| {
					let value = u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);

					char::from_u32(value).ok_or_else(|| {
						ReadError::invalid(
							"STRINGN",
							format!("invalid UTF-32 scalar value: {value:#010x}"),
						)
					})
				})
				.collect(),
		}
	}
}

impl CipSize for StringN {
	fn cip_size(&self) -> usize {
		let (bytes, _) = self.encoded();

		2 * u16::CIP_SIZE + bytes.len()
	}
}

impl Readable for StringN {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let char_size = u16::read_from(reader)?;
		let char_count = u16::read_from(reader)?.to_length()?;

		let encoding = StringNEncoding::from_char_size(char_size)?;
		let bytes = read_bytes(reader, char_count * usize::from(char_size))?;

		Ok(Self {
			text: Self::decode(&bytes, encoding)?,
			encoding,
		})
	}
}

impl Writable for StringN {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		let (bytes, count) = self.encoded();

		self.encoding.char_size().write_to(writer)?;
		u16::from_length(count)?.write_to(writer)?;
		writer.put_slice(&bytes);

		Ok(())
	}
}

/// A NUL-terminated ISO-8859-1 string.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CString(pub String);

impl CipSize for CString {
	fn cip_size(&self) -> usize {
		self.0.chars().count() + 1
	}
}

impl Readable for CString {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let mut bytes = Vec::new();

		loop {
			match u8::read_from(reader) {
				Ok(0x00) => break,
				Ok(byte) => bytes.push(byte),

				// A missing terminator after some characters is malformed
				// input, not end-of-sequence.
				Err(ReadError::BufferEmpty) if !bytes.is_empty() => {
					return Err(ReadError::invalid("CSTRING", "null byte not found"));
				},
				Err(error) => return Err(error),
			}
		}

		Ok(Self(String::from_latin1(&bytes)))
	}
}

impl Writable for CString {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		writer.put_slice(&self.0.to_latin1()?);
		0x00_u8.write_to(writer)?;

		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_short_string_round_trip() {
		let text = ShortString::new("A");
		let bytes = text.to_bytes().unwrap();

		assert_eq!(bytes, [0x01, 0x41]);
		assert_eq!(ShortString::read_from(&mut &bytes[..]).unwrap(), text);
	}

	#[test]
	fn test_string_prefix_widths() {
		assert_eq!(CipString::new("ab").to_bytes().unwrap(), [0x02, 0x00, 0x61, 0x62]);
		assert_eq!(
			LongString::new("ab").to_bytes().unwrap(),
			[0x02, 0x00, 0x00, 0x00, 0x61, 0x62]
		);
	}

	#[test]
	fn test_latin1_is_not_utf8() {
		// 0xE9 is é in Latin-1 and an invalid UTF-8 sequence.
		let text = ShortString::read_from(&mut &[0x01, 0xE9][..]).unwrap();
		assert_eq!(text.as_str(), "é");

		assert_eq!(text.to_bytes().unwrap(), [0x01, 0xE9]);
	}

	#[test]
	fn test_latin1_rejects_wide_characters() {
		assert!(ShortString::new("日").to_bytes().is_err());
	}

	#[test]
	fn test_string2_round_trip() {
		let text = String2("hi".into());
		let bytes = text.to_bytes().unwrap();

		assert_eq!(bytes, [0x02, 0x00, 0x68, 0x00, 0x69, 0x00]);
		assert_eq!(String2::read_from(&mut &bytes[..]).unwrap(), text);
	}

	#[test]
	fn test_stringn_round_trip() {
		for encoding in [
			StringNEncoding::Utf8,
			StringNEncoding::Utf16,
			StringNEncoding::Utf32,
		] {
			let text = StringN::new("hello", encoding);
			let bytes = text.to_bytes().unwrap();

			assert_eq!(StringN::read_from(&mut &bytes[..]).unwrap(), text);
		}
	}

	#[test]
	fn test_cstring_round_trip() {
		let text = CString("plc".into());
		let bytes = text.to_bytes().unwrap();

		assert_eq!(bytes, [0x70, 0x6C, 0x63, 0x00]);
		assert_eq!(CString::read_from(&mut &bytes[..]).unwrap(), text);
	}

	#[test]
	fn test_cstring_missing_terminator() {
		assert!(matches!(
			CString::read_from(&mut &[0x70, 0x6C][..]),
			Err(ReadError::Invalid { .. })
		));
	}
}

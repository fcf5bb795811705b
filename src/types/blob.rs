// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte blobs and counted lists.
//!
//! CIP sizes a run of raw bytes one of three ways: a fixed byte count known
//! from the message layout, a length prefix of a declared integer type, or
//! "whatever remains of the message". Fixed runs are plain `[u8; N]` fields;
//! the helpers here cover the other two, plus their element-list
//! equivalents.

use std::fmt;

use cipkit::{
	read_bytes,
	Buf,
	BufMut,
	CipSize,
	LengthPrefix,
	ReadResult,
	Readable,
	ReadableWithContext,
	Writable,
	WriteResult,
};
use derive_more::{From, Into};

/// Reads whatever remains of `reader` as raw bytes.
pub fn read_remaining(reader: &mut impl Buf) -> Vec<u8> {
	let mut bytes = vec![0; reader.remaining()];
	reader.copy_to_slice(&mut bytes);

	bytes
}

/// Reads a length prefix of type `L`, then that many raw bytes.
///
/// # Errors
///
/// [`cipkit::ReadError::BufferEmpty`] if the prefix or the bytes run out.
pub fn read_len_bytes<L: LengthPrefix>(reader: &mut impl Buf) -> ReadResult<Vec<u8>> {
	let length = L::read_from(reader)?.to_length()?;

	read_bytes(reader, length)
}

/// Writes `bytes` preceded by their byte count as a length prefix of type
/// `L`.
///
/// # Errors
///
/// [`cipkit::WriteError::LengthOverflow`] if the count does not fit in `L`.
pub fn write_len_bytes<L: LengthPrefix>(writer: &mut impl BufMut, bytes: &[u8]) -> WriteResult {
	L::from_length(bytes.len())?.write_to(writer)?;
	writer.put_slice(bytes);

	Ok(())
}

/// Reads a count prefix of type `L`, then that many elements of type `T`.
///
/// # Errors
///
/// As [`Readable::read_from`] for `L` and `T`.
pub fn read_len_list<L: LengthPrefix, T: Readable>(reader: &mut impl Buf) -> ReadResult<Vec<T>> {
	let count = L::read_from(reader)?.to_length()?;

	Vec::read_with(reader, &count)
}

/// Writes `elements` preceded by their element count as a prefix of type
/// `L`.
///
/// # Errors
///
/// As [`Writable::write_to`] for `L` and `T`, plus
/// [`cipkit::WriteError::LengthOverflow`] if the count does not fit in `L`.
pub fn write_len_list<L: LengthPrefix, T: Writable>(
	writer: &mut impl BufMut, elements: &[T],
) -> WriteResult {
	L::from_length(elements.len())?.write_to(writer)?;

	for element in elements {
		element.write_to(writer)?;
	}

	Ok(())
}

/// An unsized run of raw bytes: the rest of whatever message contains it.
///
/// This is the default body for service data whose shape is not otherwise
/// declared, and the default failed-response type of the Message Router
/// parser.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, From, Into)]
pub struct Blob(pub Vec<u8>);

impl Blob {
	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<&[u8]> for Blob {
	fn from(bytes: &[u8]) -> Self {
		Self(bytes.to_vec())
	}
}

impl CipSize for Blob {
	fn cip_size(&self) -> usize {
		self.0.len()
	}
}

impl Readable for Blob {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self(read_remaining(reader)))
	}
}

impl Writable for Blob {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		writer.put_slice(&self.0);

		Ok(())
	}
}

impl fmt::Display for Blob {
	/// Formats the bytes as hex pairs, e.g. `Blob([8e 00 00 00])`.
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Blob([")?;

		for (index, byte) in self.0.iter().enumerate() {
			if index > 0 {
				write!(f, " ")?;
			}
			write!(f, "{byte:02x}")?;
		}

		write!(f, "])")
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_len_bytes_round_trip() {
		let mut encoded = Vec::new();
		write_len_bytes::<u16>(&mut encoded, b"abc").unwrap();
		assert_eq!(encoded, [0x03, 0x00, 0x61, 0x62, 0x63]);

		let decoded = read_len_bytes::<u16>(&mut &encoded[..]).unwrap();
		assert_eq!(decoded, b"abc");
	}

	#[test]
	fn test_blob_reads_the_rest() {
		let mut buf = &[0xDE_u8, 0xAD][..];
		let blob = Blob::read_from(&mut buf).unwrap();

		assert_eq!(blob.as_slice(), [0xDE, 0xAD]);
		assert_eq!(buf.remaining(), 0);
		assert_eq!(blob.to_string(), "Blob([de ad])");
	}
}

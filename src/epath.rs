// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP `EPATH` codec: path segments and their containers.
//!
//! An `EPATH` is an ordered sequence of segments identifying a target: a
//! route hop ([`PortSegment`]), an object address ([`LogicalSegment`]), a
//! network parameter ([`NetworkSegment`]), a symbolic name
//! ([`SymbolicSegment`]), or service data ([`DataSegment`]). Each segment
//! starts with a header byte whose top three bits give the segment class.
//!
//! Paths come in two layouts: *packed*, where multi-byte logical values
//! follow their header directly, and *padded*, where a pad byte aligns them
//! to a word boundary. Depending on where a path is embedded it may also be
//! preceded by a length in words, optionally followed by one more pad byte.
//! [`EpathFormat`] names the four combinations in use.

use std::ops::Div;

use cipkit::{
	Buf,
	BufMut,
	CipSize,
	ReadError,
	ReadResult,
	Readable,
	Writable,
	WriteError,
	WriteResult,
};
use derive_more::From;

mod data;
mod logical;
mod network;
mod port;
mod symbolic;

pub use data::DataSegment;
pub use logical::{LogicalSegment, LogicalType, LogicalValue};
pub use network::{NetworkKind, NetworkSegment};
pub use port::{Link, Port, PortIdentifier, PortSegment};
pub use symbolic::{NumericSymbol, Symbol, SymbolicSegment};

/// The segment classes named by the top three bits of a segment header.
pub(crate) mod class {
	pub const MASK: u8 = 0b_1110_0000;

	pub const PORT: u8 = 0b_0000_0000;
	pub const LOGICAL: u8 = 0b_0010_0000;
	pub const NETWORK: u8 = 0b_0100_0000;
	pub const SYMBOLIC: u8 = 0b_0110_0000;
	pub const DATA: u8 = 0b_1000_0000;
	pub const CONSTRUCTED_DATA_TYPE: u8 = 0b_1010_0000;
	pub const ELEMENTARY_DATA_TYPE: u8 = 0b_1100_0000;
}

/// Peeks the next header byte without consuming it.
///
/// # Errors
///
/// [`ReadError::BufferEmpty`] if nothing remains: the caller is between
/// segments, so an empty buffer here is legitimate end-of-sequence.
pub(crate) fn peek_header(reader: &mut impl Buf) -> ReadResult<u8> {
	if reader.remaining() == 0 {
		return Err(ReadError::BufferEmpty);
	}

	Ok(reader.chunk()[0])
}

/// A single segment of an [`Epath`].
#[derive(Clone, Eq, PartialEq, Hash, Debug, From)]
pub enum Segment {
	Port(PortSegment),
	Logical(LogicalSegment),
	Network(NetworkSegment),
	Symbolic(SymbolicSegment),
	Data(DataSegment),
}

impl Segment {
	/// The size of this segment in bytes when emitted with the given layout.
	#[must_use]
	pub fn size_with(&self, padded: bool) -> usize {
		match self {
			Self::Port(segment) => segment.segment_size(),
			Self::Logical(segment) => segment.segment_size(padded),
			Self::Network(segment) => segment.segment_size(),
			Self::Symbolic(segment) => segment.segment_size(),
			Self::Data(segment) => segment.segment_size(),
		}
	}

	/// Writes this segment with the given layout.
	///
	/// # Errors
	///
	/// As [`Writable::write_to`].
	pub fn write_with(&self, writer: &mut impl BufMut, padded: bool) -> WriteResult {
		match self {
			Self::Port(segment) => segment.write_segment(writer),
			Self::Logical(segment) => segment.write_segment(writer, padded),
			Self::Network(segment) => segment.write_segment(writer),
			Self::Symbolic(segment) => segment.write_segment(writer),
			Self::Data(segment) => segment.write_segment(writer),
		}
	}

	/// Reads the next segment, dispatching on the class bits of its header.
	///
	/// # Errors
	///
	/// [`ReadError::BufferEmpty`] if the buffer is empty (legitimate
	/// end-of-sequence); [`ReadError::Invalid`] for unknown or unsupported
	/// segment classes and malformed segment bodies.
	pub fn read_with(reader: &mut impl Buf, padded: bool) -> ReadResult<Self> {
		let header = peek_header(reader)?;

		match header & class::MASK {
			class::PORT => PortSegment::read_segment(reader).map(Self::Port),
			class::LOGICAL => LogicalSegment::read_segment(reader, padded).map(Self::Logical),
			class::NETWORK => NetworkSegment::read_segment(reader).map(Self::Network),
			class::SYMBOLIC => SymbolicSegment::read_segment(reader).map(Self::Symbolic),
			class::DATA => DataSegment::read_segment(reader).map(Self::Data),

			class::CONSTRUCTED_DATA_TYPE | class::ELEMENTARY_DATA_TYPE => Err(ReadError::invalid(
				"CIP segment",
				"constructed and elementary data type segments are not supported",
			)),

			other => Err(ReadError::invalid(
				"CIP segment",
				format!("unknown segment class: {:03b}", other >> 5),
			)),
		}
	}
}

/// The wire layout of an [`Epath`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EpathFormat {
	/// Emit segments in padded form.
	pub padded: bool,
	/// Precede the segments with their length in words (`u8`).
	pub with_len: bool,
	/// Follow the length with one pad byte.
	pub pad_len: bool,
}

impl EpathFormat {
	/// Tightly packed segments, no length.
	pub const PACKED: Self = Self {
		padded: false,
		with_len: false,
		pad_len: false,
	};
	/// Padded segments, no length.
	pub const PADDED: Self = Self {
		padded: true,
		with_len: false,
		pad_len: false,
	};
	/// A word-count byte, then padded segments.
	pub const PADDED_LEN: Self = Self {
		padded: true,
		with_len: true,
		pad_len: false,
	};
	/// A word-count byte, a pad byte, then padded segments.
	pub const PADDED_PAD_LEN: Self = Self {
		padded: true,
		with_len: true,
		pad_len: true,
	};
}

/// An ordered sequence of CIP path segments.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, From)]
pub struct Epath {
	pub segments: Vec<Segment>,
}

impl Epath {
	#[must_use]
	pub fn new(segments: Vec<Segment>) -> Self {
		Self { segments }
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// The size in bytes of the segments alone, without any length prefix.
	#[must_use]
	pub fn segments_size(&self, padded: bool) -> usize {
		self.segments
			.iter()
			.map(|segment| segment.size_with(padded))
			.sum()
	}

	/// The size in bytes with the given layout, length prefix included.
	#[must_use]
	pub fn size_with(&self, format: EpathFormat) -> usize {
		let prefix = match (format.with_len, format.pad_len) {
			(false, _) => 0,
			(true, false) => 1,
			(true, true) => 2,
		};

		prefix + self.segments_size(format.padded)
	}

	/// The length of the path in 16-bit words.
	///
	/// # Errors
	///
	/// [`WriteError::Invalid`] if the path is not a whole number of words,
	/// which cannot happen for padded layouts.
	pub fn word_count(&self, padded: bool) -> Result<u8, WriteError> {
		let bytes = self.segments_size(padded);

		if bytes % 2 != 0 {
			return Err(WriteError::invalid(
				"EPATH",
				format!("path of {bytes} bytes is not a whole number of words"),
			));
		}

		u8::try_from(bytes / 2).map_err(|_| WriteError::LengthOverflow {
			length: bytes / 2,
			prefix: "u8",
		})
	}

	/// Writes the path with the given layout.
	///
	/// # Errors
	///
	/// As [`Writable::write_to`].
	pub fn write_with(&self, writer: &mut impl BufMut, format: EpathFormat) -> WriteResult {
		if format.with_len {
			self.word_count(format.padded)?.write_to(writer)?;

			if format.pad_len {
				0x00_u8.write_to(writer)?;
			}
		}

		for segment in &self.segments {
			segment.write_with(writer, format.padded)?;
		}

		Ok(())
	}

	/// Reads a path with the given layout.
	///
	/// Formats without a length prefix need to be told when to stop:
	/// `segment_count` limits the read to exactly that many segments, and
	/// `None` reads until the buffer runs dry.
	///
	/// # Errors
	///
	/// As [`Readable::read_from`]; a [`ReadError::BufferEmpty`] between
	/// segments of an unbounded read is not an error.
	pub fn read_with(
		reader: &mut impl Buf, format: EpathFormat, segment_count: Option<usize>,
	) -> ReadResult<Self> {
		if format.with_len {
			let words = usize::from(u8::read_from(reader)?);

			if format.pad_len {
				let _pad = u8::read_from(reader)?;
			}

			let mut limited = reader.take(words * 2);
			let mut segments = Vec::new();

			loop {
				match Segment::read_with(&mut limited, format.padded) {
					Ok(segment) => segments.push(segment),
					Err(ReadError::BufferEmpty) => break,
					Err(error) => return Err(error),
				}
			}

			return Ok(Self::new(segments));
		}

		match segment_count {
			Some(count) => {
				let mut segments = Vec::with_capacity(count);

				for _ in 0..count {
					segments.push(Segment::read_with(reader, format.padded)?);
				}

				Ok(Self::new(segments))
			},

			None => {
				let mut segments = Vec::new();

				loop {
					match Segment::read_with(reader, format.padded) {
						Ok(segment) => segments.push(segment),
						Err(ReadError::BufferEmpty) => break,
						Err(error) => return Err(error),
					}
				}

				Ok(Self::new(segments))
			},
		}
	}
}

impl FromIterator<Segment> for Epath {
	fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

impl IntoIterator for Epath {
	type Item = Segment;
	type IntoIter = std::vec::IntoIter<Segment>;

	fn into_iter(self) -> Self::IntoIter {
		self.segments.into_iter()
	}
}

// Appending with `/` mirrors the notation CIP routes are written in.
macro_rules! epath_div {
	($($segment:ty),*$(,)?) => {
		$(
			impl Div<$segment> for Epath {
				type Output = Self;

				fn div(mut self, segment: $segment) -> Self {
					self.segments.push(segment.into());

					self
				}
			}
		)*
	};
}

epath_div! {
	Segment,
	PortSegment,
	LogicalSegment,
	NetworkSegment,
	SymbolicSegment,
	DataSegment,
}

impl Div<Self> for Epath {
	type Output = Self;

	fn div(mut self, other: Self) -> Self {
		self.segments.extend(other.segments);

		self
	}
}

macro_rules! epath_wrapper {
	($(
		$(#[$meta:meta])*
		$Type:ident: $format:expr
	),*$(,)?) => {
		$(
			$(#[$meta])*
			#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, From)]
			pub struct $Type(pub Epath);

			impl CipSize for $Type {
				fn cip_size(&self) -> usize {
					self.0.size_with($format)
				}
			}

			impl Readable for $Type {
				fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
					Epath::read_with(reader, $format, None).map(Self)
				}
			}

			impl Writable for $Type {
				fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
					self.0.write_with(writer, $format)
				}
			}
		)*
	};
}

epath_wrapper! {
	/// An [`Epath`] in packed layout, sized by its surroundings.
	PackedEpath: EpathFormat::PACKED,
	/// An [`Epath`] in padded layout, sized by its surroundings.
	PaddedEpath: EpathFormat::PADDED,
	/// An [`Epath`] in padded layout with a leading word count.
	PaddedEpathLen: EpathFormat::PADDED_LEN,
	/// An [`Epath`] in padded layout with a leading word count and a pad
	/// byte after it.
	PaddedEpathPadLen: EpathFormat::PADDED_PAD_LEN,
}

#[cfg(test)]
mod test {
	use super::*;

	fn path() -> Epath {
		Epath::default()
			/ LogicalSegment::class_id(0x01)
			/ LogicalSegment::instance_id(1)
			/ LogicalSegment::attribute_id(6)
	}

	#[test]
	fn test_padded_len_layout() {
		let mut encoded = Vec::new();
		path()
			.write_with(&mut encoded, EpathFormat::PADDED_LEN)
			.unwrap();

		assert_eq!(encoded, [0x03, 0x20, 0x01, 0x24, 0x01, 0x30, 0x06]);
	}

	#[test]
	fn test_round_trip_all_formats() {
		for format in [
			EpathFormat::PACKED,
			EpathFormat::PADDED,
			EpathFormat::PADDED_LEN,
			EpathFormat::PADDED_PAD_LEN,
		] {
			let mut encoded = Vec::new();
			path().write_with(&mut encoded, format).unwrap();

			let decoded = Epath::read_with(&mut &encoded[..], format, None).unwrap();
			assert_eq!(decoded, path());
		}
	}

	#[test]
	fn test_word_count_counts_words_not_segments() {
		// A port segment with an IP-address link is one segment of many
		// words.
		let path = Epath::default()
			/ PortSegment::new(2_u16, "1.2.3.4").unwrap()
			/ LogicalSegment::class_id(0x02);

		let mut encoded = Vec::new();
		path.write_with(&mut encoded, EpathFormat::PADDED_LEN)
			.unwrap();

		// 10 bytes of port segment + 2 bytes of logical segment = 6 words.
		assert_eq!(encoded[0], 6);

		let decoded = Epath::read_with(&mut &encoded[..], EpathFormat::PADDED_LEN, None).unwrap();
		assert_eq!(decoded, path);
	}

	#[test]
	fn test_fixed_segment_count() {
		let mut encoded = Vec::new();
		path()
			.write_with(&mut encoded, EpathFormat::PADDED)
			.unwrap();
		// trailing bytes beyond the requested segments are left unread
		encoded.extend([0xAB, 0xCD]);

		let mut reader = &encoded[..];
		let decoded = Epath::read_with(&mut reader, EpathFormat::PADDED, Some(3)).unwrap();

		assert_eq!(decoded, path());
		assert_eq!(reader, [0xAB, 0xCD]);
	}
}

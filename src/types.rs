// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common CIP elementary data types.
//!
//! CIP's fixed-width integers and floats map directly onto Rust's: `USINT`
//! is `u8`, `UINT` is `u16`, `UDINT` is `u32`, `ULINT` is `u64` (and the
//! signed `SINT`/`INT`/`DINT`/`LINT` and `REAL`/`LREAL` likewise), all
//! little-endian on the wire via the `cipkit` primitive implementations.
//! This module holds the types that need more than a primitive: the
//! single-byte `BOOL`, the bit-string `WORD`/`DWORD`, the length-prefixed
//! string family, and the byte-blob and counted-list helpers.

use cipkit::{
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	ReadResult,
	Readable,
	Writable,
	WriteResult,
};

mod bits;
mod blob;
mod boolean;
mod string;

pub use bits::{Dword, Word};
pub use blob::{
	read_len_bytes,
	read_len_list,
	read_remaining,
	write_len_bytes,
	write_len_list,
	Blob,
};
pub use boolean::CipBool;
pub use string::{
	CipString,
	CString,
	Latin1Str,
	LongString,
	ShortString,
	String2,
	StringN,
	StringNEncoding,
};

/// The CIP `Revision` type: a major/minor pair of unsigned bytes.
///
/// Used by the Identity object and by electronic keys.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Revision {
	pub major: u8,
	pub minor: u8,
}

impl Revision {
	#[must_use]
	pub const fn new(major: u8, minor: u8) -> Self {
		Self { major, minor }
	}
}

impl ConstantCipSize for Revision {
	const CIP_SIZE: usize = 2;
}

impl CipSize for Revision {
	fn cip_size(&self) -> usize {
		Self::CIP_SIZE
	}
}

impl Readable for Revision {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			major: u8::read_from(reader)?,
			minor: u8::read_from(reader)?,
		})
	}
}

impl Writable for Revision {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.major.write_to(writer)?;
		self.minor.write_to(writer)?;

		Ok(())
	}
}

impl std::fmt::Display for Revision {
	/// Formats the revision the way device documentation prints it, e.g.
	/// `2.013`.
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}.{:03}", self.major, self.minor)
	}
}

/// A list of `UINT`s prefixed with a `UINT` element count.
///
/// The shape of the standard class attributes `optional_attrs_list` and
/// `optional_service_list`, the Message Router's `object_list`, and the
/// request data of Get_Attribute_List.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, derive_more::From, derive_more::Into)]
pub struct UintList(pub Vec<u16>);

impl CipSize for UintList {
	fn cip_size(&self) -> usize {
		u16::CIP_SIZE + self.0.cip_size()
	}
}

impl Readable for UintList {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self(read_len_list::<u16, u16>(reader)?))
	}
}

impl Writable for UintList {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		write_len_list::<u16, u16>(writer, &self.0)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_revision_round_trip() {
		let revision = Revision::new(2, 13);
		let bytes = revision.to_bytes().unwrap();
		assert_eq!(bytes, [2, 13]);
		assert_eq!(Revision::read_from(&mut &bytes[..]).unwrap(), revision);
		assert_eq!(revision.to_string(), "2.013");
	}

	#[test]
	fn test_uint_list_round_trip() {
		let list = UintList(vec![1, 7]);
		let bytes = list.to_bytes().unwrap();
		assert_eq!(bytes, [0x02, 0x00, 0x01, 0x00, 0x07, 0x00]);
		assert_eq!(UintList::read_from(&mut &bytes[..]).unwrap(), list);
	}
}

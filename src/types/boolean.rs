// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

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
use derive_more::{From, Into};

/// The CIP `BOOL` type.
///
/// One byte on the wire: `false` is `0x00` and `true` is `0xFF`. Decoding is
/// lenient and treats any nonzero byte as `true`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, From, Into)]
pub struct CipBool(pub bool);

impl ConstantCipSize for CipBool {
	const CIP_SIZE: usize = 1;
}

impl CipSize for CipBool {
	fn cip_size(&self) -> usize {
		Self::CIP_SIZE
	}
}

impl Readable for CipBool {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self(u8::read_from(reader)? != 0))
	}
}

impl Writable for CipBool {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		let byte: u8 = if self.0 { 0xFF } else { 0x00 };
		byte.write_to(writer)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_wire_values() {
		assert_eq!(CipBool(false).to_bytes().unwrap(), [0x00]);
		assert_eq!(CipBool(true).to_bytes().unwrap(), [0xFF]);
	}

	#[test]
	fn test_lenient_decode() {
		assert_eq!(CipBool::read_from(&mut &[0x00_u8][..]).unwrap(), CipBool(false));
		assert_eq!(CipBool::read_from(&mut &[0xFF_u8][..]).unwrap(), CipBool(true));
		assert_eq!(CipBool::read_from(&mut &[0x01_u8][..]).unwrap(), CipBool(true));
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Writable`] implementations for primitive types

use crate::{Writable, WriteResult};
use bytes::BufMut;

macro_rules! implement {
	($($ident:ident: &$ty:ty => BufMut::$fun:ident($expr:expr)),*$(,)?) => {
		$(
			impl $crate::Writable for $ty {
				fn write_to(
					&self,
					writer: &mut impl bytes::BufMut,
				) -> Result<(), $crate::WriteError> {
					let $ident = self;
					writer.$fun($expr);

					Ok(())
				}
			}
		)*
	};
}

// CIP is little-endian; the single-byte accessors have no endianness.
implement! {
	n: &i8 => BufMut::put_i8(*n),
	n: &i16 => BufMut::put_i16_le(*n),
	n: &i32 => BufMut::put_i32_le(*n),
	n: &i64 => BufMut::put_i64_le(*n),

	n: &u8 => BufMut::put_u8(*n),
	n: &u16 => BufMut::put_u16_le(*n),
	n: &u32 => BufMut::put_u32_le(*n),
	n: &u64 => BufMut::put_u64_le(*n),

	n: &f32 => BufMut::put_f32_le(*n),
	n: &f64 => BufMut::put_f64_le(*n),
}

impl<T: Writable> Writable for &[T] {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		for x in *self {
			x.write_to(writer)?;
		}

		Ok(())
	}
}

impl<T: Writable, const N: usize> Writable for [T; N] {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		for x in self {
			x.write_to(writer)?;
		}

		Ok(())
	}
}

impl<T: Writable> Writable for Vec<T> {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		for x in self {
			x.write_to(writer)?;
		}

		Ok(())
	}
}

impl<T: Writable> Writable for &T {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		T::write_to(self, writer)?;

		Ok(())
	}
}

impl<T: Writable> Writable for &mut T {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		T::write_to(self, writer)?;

		Ok(())
	}
}

impl<T: Writable> Writable for Box<T> {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		T::write_to(self, writer)?;

		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_little_endian_primitives() {
		assert_eq!(1_u8.to_bytes().unwrap(), [0x01]);
		assert_eq!(1_u16.to_bytes().unwrap(), [0x01, 0x00]);
		assert_eq!(1_u32.to_bytes().unwrap(), [0x01, 0x00, 0x00, 0x00]);
	}
}

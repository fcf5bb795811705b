// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Readable`] implementations for primitive types

use crate::{ensure_remaining, ReadError, ReadResult, Readable, ReadableWithContext};
use bytes::Buf;

macro_rules! implement {
	($($reader:ident, $ty:ty => $expr:expr),*$(,)?) => {
		$(
			impl $crate::Readable for $ty {
				fn read_from($reader: &mut impl bytes::Buf) -> Result<Self, $crate::ReadError> {
					$crate::ensure_remaining($reader, std::mem::size_of::<$ty>())?;

					Ok($expr)
				}
			}
		)*
	};
}

// CIP is little-endian; the single-byte accessors have no endianness.
implement! {
	reader, i8 => reader.get_i8(),
	reader, i16 => reader.get_i16_le(),
	reader, i32 => reader.get_i32_le(),
	reader, i64 => reader.get_i64_le(),

	reader, u8 => reader.get_u8(),
	reader, u16 => reader.get_u16_le(),
	reader, u32 => reader.get_u32_le(),
	reader, u64 => reader.get_u64_le(),

	reader, f32 => reader.get_f32_le(),
	reader, f64 => reader.get_f64_le(),
}

impl<T: Readable, const N: usize> Readable for [T; N] {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self>
	where
		Self: Sized,
	{
		let mut vec = Vec::with_capacity(N);

		for _ in 0..N {
			vec.push(T::read_from(reader)?);
		}

		Ok(match vec.try_into() {
			Ok(array) => array,
			Err(_) => unreachable!("we know the length of this vec is `N`"),
		})
	}
}

impl<T: Readable> Readable for Box<T> {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self>
	where
		Self: Sized,
	{
		Ok(Self::new(T::read_from(reader)?))
	}
}

impl<T: Readable> ReadableWithContext for Vec<T> {
	type Context = usize;

	fn read_with(reader: &mut impl Buf, context: &Self::Context) -> ReadResult<Self>
	where
		Self: Sized,
	{
		let mut vec = Self::with_capacity(*context);

		for _ in 0..*context {
			vec.push(T::read_from(reader)?);
		}

		Ok(vec)
	}
}

/// Reads `T`s from `reader` until the buffer runs dry.
///
/// A [`ReadError::BufferEmpty`] raised by an element terminates the list; any
/// other error is propagated. This is the decode path for lists whose length
/// is "the rest of the message".
///
/// # Errors
///
/// Any element error other than [`ReadError::BufferEmpty`].
pub fn read_until_empty<T: Readable>(reader: &mut impl Buf) -> ReadResult<Vec<T>> {
	let mut list = Vec::new();

	loop {
		match T::read_from(reader) {
			Ok(element) => list.push(element),
			Err(ReadError::BufferEmpty) => break,
			Err(error) => return Err(error),
		}
	}

	Ok(list)
}

/// Reads exactly `count` raw bytes from `reader`.
///
/// # Errors
///
/// [`ReadError::BufferEmpty`] if fewer than `count` bytes remain.
pub fn read_bytes(reader: &mut impl Buf, count: usize) -> ReadResult<Vec<u8>> {
	ensure_remaining(reader, count)?;

	let mut bytes = vec![0; count];
	reader.copy_to_slice(&mut bytes);

	Ok(bytes)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_little_endian_primitives() {
		let mut buf = &[0x01_u8, 0x00, 0x02, 0x00, 0x00, 0x00][..];

		assert_eq!(u16::read_from(&mut buf).unwrap(), 1);
		assert_eq!(u32::read_from(&mut buf).unwrap(), 2);
	}

	#[test]
	fn test_buffer_empty() {
		let mut buf = &[0x01_u8][..];

		assert!(matches!(
			u16::read_from(&mut buf),
			Err(ReadError::BufferEmpty)
		));
	}

	#[test]
	fn test_read_until_empty() {
		let mut buf = &[0x01_u8, 0x00, 0x02, 0x00, 0x03, 0x00][..];

		let list: Vec<u16> = read_until_empty(&mut buf).unwrap();
		assert_eq!(list, [1, 2, 3]);
		assert_eq!(buf.remaining(), 0);
	}
}

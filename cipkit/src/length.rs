// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The [`LengthPrefix`] abstraction for length-prefixed wire values.

use num_traits::{FromPrimitive, ToPrimitive};

use crate::{ConstantCipSize, ReadError, ReadResult, Readable, Writable, WriteError};

/// An unsigned integer type which carries the length of another value on the
/// wire: the character count of a string, the element count of a list, or the
/// byte count of a blob.
///
/// CIP declares a different prefix width per type (`SHORT_STRING` counts with
/// one byte, `STRING` with two, `LONG_STRING` with four); implementing this
/// trait for the plain unsigned integers lets one generic read/write path
/// serve them all.
pub trait LengthPrefix: Readable + Writable + ConstantCipSize + Copy {
	/// The name used in diagnostics when a length does not fit.
	const NAME: &'static str;

	/// Converts the decoded prefix into a host length.
	///
	/// # Errors
	///
	/// [`ReadError::FailedConversion`] if the value does not fit in `usize`.
	fn to_length(self) -> ReadResult<usize>;

	/// Converts a host length into the prefix to encode.
	///
	/// # Errors
	///
	/// [`WriteError::LengthOverflow`] if `length` does not fit in `Self`.
	fn from_length(length: usize) -> Result<Self, WriteError>;
}

macro_rules! implement {
	($($ty:ty => $name:literal),*$(,)?) => {
		$(
			impl LengthPrefix for $ty {
				const NAME: &'static str = $name;

				fn to_length(self) -> ReadResult<usize> {
					self.to_usize().ok_or_else(|| {
						ReadError::FailedConversion(
							format!("{} length {} does not fit in usize", $name, self).into(),
						)
					})
				}

				fn from_length(length: usize) -> Result<Self, WriteError> {
					Self::from_usize(length).ok_or(WriteError::LengthOverflow {
						length,
						prefix: $name,
					})
				}
			}
		)*
	};
}

implement! {
	u8 => "u8",
	u16 => "u16",
	u32 => "u32",
	u64 => "u64",
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_round_trip() {
		assert_eq!(u8::from_length(255).unwrap(), 255);
		assert_eq!(255_u8.to_length().unwrap(), 255);
	}

	#[test]
	fn test_overflow() {
		assert!(matches!(
			u8::from_length(256),
			Err(WriteError::LengthOverflow { length: 256, prefix: "u8" })
		));
	}
}

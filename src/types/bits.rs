// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP bit-string types `WORD` and `DWORD`.

use std::fmt;

use cipkit::{
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	ReadError,
	ReadResult,
	Readable,
	Writable,
	WriteResult,
};
use derive_more::{From, Into};

macro_rules! bit_string {
	($(
		$(#[$meta:meta])*
		$Type:ident($int:ty): $name:literal
	),*$(,)?) => {
		$(
			$(#[$meta])*
			#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, From, Into)]
			pub struct $Type(pub $int);

			impl $Type {
				/// The number of bits in this bit string.
				pub const BITS: usize = <$int>::BITS as usize;

				/// Returns bit `index`, counting from the least significant.
				///
				/// # Panics
				///
				/// Panics if `index` is not below [`Self::BITS`].
				#[must_use]
				pub const fn bit(self, index: usize) -> bool {
					assert!(index < Self::BITS);

					self.0 >> index & 1 == 1
				}

				/// Returns all bits, least significant first.
				#[must_use]
				pub fn bits(self) -> [bool; Self::BITS] {
					let mut bits = [false; Self::BITS];

					for (index, bit) in bits.iter_mut().enumerate() {
						*bit = self.bit(index);
					}

					bits
				}

				/// Builds the bit string from a sequence of bits, least
				/// significant first.
				///
				/// # Errors
				///
				/// [`ReadError::Invalid`] unless exactly [`Self::BITS`] bits
				/// are given.
				pub fn from_bits(bits: &[bool]) -> ReadResult<Self> {
					if bits.len() != Self::BITS {
						return Err(ReadError::invalid(
							$name,
							format!(
								"requires exactly {} bits, got: {}",
								Self::BITS,
								bits.len()
							),
						));
					}

					let mut value: $int = 0;
					for (index, &bit) in bits.iter().enumerate() {
						if bit {
							value |= 1 << index;
						}
					}

					Ok(Self(value))
				}
			}

			impl ConstantCipSize for $Type {
				const CIP_SIZE: usize = std::mem::size_of::<$int>();
			}

			impl CipSize for $Type {
				fn cip_size(&self) -> usize {
					Self::CIP_SIZE
				}
			}

			impl Readable for $Type {
				fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
					Ok(Self(<$int>::read_from(reader)?))
				}
			}

			impl Writable for $Type {
				fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
					self.0.write_to(writer)
				}
			}

			impl fmt::LowerHex for $Type {
				/// Formats as `0x`-prefixed hex, zero-padded to the full bit
				/// width.
				fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
					write!(f, "{:#0width$x}", self.0, width = 2 + Self::BITS / 4)
				}
			}

			impl fmt::Binary for $Type {
				/// Formats as binary, zero-padded to the full bit width, with
				/// an underscore between every nibble.
				fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
					let digits = format!("{:0width$b}", self.0, width = Self::BITS);

					for (index, chunk) in digits.as_bytes().chunks(4).enumerate() {
						if index > 0 {
							write!(f, "_")?;
						}
						for &digit in chunk {
							write!(f, "{}", char::from(digit))?;
						}
					}

					Ok(())
				}
			}
		)*
	};
}

bit_string! {
	/// The CIP `WORD` type: a 16-bit string of bits.
	Word(u16): "WORD",
	/// The CIP `DWORD` type: a 32-bit string of bits.
	Dword(u32): "DWORD",
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_bit_round_trip() {
		let word = Word(0b_0000_0001_0000_0101);
		let bits = word.bits();

		assert!(bits[0] && bits[2] && bits[8]);
		assert_eq!(bits.iter().filter(|&&bit| bit).count(), 3);
		assert_eq!(Word::from_bits(&bits).unwrap(), word);
	}

	#[test]
	fn test_from_bits_wrong_width() {
		assert!(Word::from_bits(&[true; 8]).is_err());
		assert!(Dword::from_bits(&[false; 16]).is_err());
	}

	#[test]
	fn test_wire_round_trip() {
		let dword = Dword(0xDEAD_BEEF);
		let bytes = dword.to_bytes().unwrap();

		assert_eq!(bytes, [0xEF, 0xBE, 0xAD, 0xDE]);
		assert_eq!(Dword::read_from(&mut &bytes[..]).unwrap(), dword);
	}

	#[test]
	fn test_formatting() {
		assert_eq!(format!("{:x}", Word(0x1F)), "0x001f");
		assert_eq!(format!("{:b}", Word(0x1F)), "0000_0000_0001_1111");
		assert_eq!(format!("{:x}", Dword(1)), "0x00000001");
	}
}

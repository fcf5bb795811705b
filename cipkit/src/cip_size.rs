// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`CipSize`] and [`ConstantCipSize`] implementations for primitive types

use crate::{CipSize, ConstantCipSize};

/// Simple macro for easely defining size for primitive types
macro_rules! constant_cip_size {
	($($type:ty),+$(,)?) => {
		$(
			impl ConstantCipSize for $type {
				const CIP_SIZE: usize = std::mem::size_of::<Self>();
			}

			impl CipSize for $type {
				fn cip_size(&self) -> usize {
					Self::CIP_SIZE
				}
			}
		)+
	};
}

constant_cip_size! {
	i8,
	i16,
	i32,
	i64,

	u8,
	u16,
	u32,
	u64,

	f32,
	f64,
}

impl<T: CipSize> CipSize for Vec<T> {
	fn cip_size(&self) -> usize {
		self.iter().map(CipSize::cip_size).sum()
	}
}

impl<T: CipSize, const N: usize> CipSize for [T; N] {
	fn cip_size(&self) -> usize {
		let mut cip_size = 0;

		for x in self {
			cip_size += x.cip_size();
		}

		cip_size
	}
}

impl<T: CipSize> CipSize for [T] {
	fn cip_size(&self) -> usize {
		let mut cip_size = 0;

		for element in self {
			cip_size += element.cip_size();
		}

		cip_size
	}
}

impl<T: CipSize + ?Sized> CipSize for &T {
	fn cip_size(&self) -> usize {
		T::cip_size(self)
	}
}

impl<T: CipSize + ?Sized> CipSize for &mut T {
	fn cip_size(&self) -> usize {
		T::cip_size(self)
	}
}

impl<T: CipSize> CipSize for Box<T> {
	fn cip_size(&self) -> usize {
		T::cip_size(self)
	}
}

impl CipSize for str {
	fn cip_size(&self) -> usize {
		self.len()
	}
}

// An absent optional value occupies no bytes on the wire: conditional fields
// serialize to nothing when their controlling predicate says absent.
impl<T: CipSize> CipSize for Option<T> {
	fn cip_size(&self) -> usize {
		self.as_ref().map_or(0, CipSize::cip_size)
	}
}

#[cfg(test)]
mod test {
	use super::CipSize;

	#[test]
	fn test_cip_size_vec() {
		let data = vec![i16::default(); 100];
		assert_eq!(data.cip_size(), 200);
	}

	#[test]
	fn test_cip_size_option() {
		let data: Option<u64> = None;
		assert_eq!(data.cip_size(), 0);
		assert_eq!(Some(0_u64).cip_size(), 8);
	}
}

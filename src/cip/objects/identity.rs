// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Identity object.

use bitflags::bitflags;
use cipkit::{Buf, CipSize, ConstantCipSize, ReadResult, Readable};

use crate::cip::object::{CipAttribute, CipObject};
use crate::types::{Revision, ShortString, Word};

/// The Identity object: general identity and status information about a
/// device.
///
/// It is required of every CIP device; a device of multiple discrete
/// components may expose one instance per component.
#[derive(Debug)]
pub struct Identity;

impl CipObject for Identity {
	const CLASS_CODE: u16 = 0x01;
	const NAME: &'static str = "Identity";

	type InstanceAttrs = IdentityInstanceAttrs;
}

impl Identity {
	/// Identification code assigned to the vendor
	pub const VENDOR_ID: CipAttribute<u16> =
		CipAttribute::instance(1, Self::CLASS_CODE, Self::NAME, "vendor_id");
	/// Indication of general type of product
	pub const DEVICE_TYPE: CipAttribute<u16> =
		CipAttribute::instance(2, Self::CLASS_CODE, Self::NAME, "device_type");
	/// Identification code of a particular product for an individual vendor
	pub const PRODUCT_CODE: CipAttribute<u16> =
		CipAttribute::instance(3, Self::CLASS_CODE, Self::NAME, "product_code");
	/// Revision of the item the Identity object represents
	pub const REVISION: CipAttribute<Revision> =
		CipAttribute::instance(4, Self::CLASS_CODE, Self::NAME, "revision");
	/// Summary status of the device, see [`IdentityStatus`]
	pub const STATUS: CipAttribute<Word> =
		CipAttribute::instance(5, Self::CLASS_CODE, Self::NAME, "status");
	/// Serial number of the device
	pub const SERIAL_NUMBER: CipAttribute<u32> =
		CipAttribute::instance(6, Self::CLASS_CODE, Self::NAME, "serial_number");
	/// Human readable identification of the device
	pub const PRODUCT_NAME: CipAttribute<ShortString> =
		CipAttribute::instance(7, Self::CLASS_CODE, Self::NAME, "product_name");
	/// Present state of the device, see [`DeviceState`]
	pub const STATE: CipAttribute<u8> =
		CipAttribute::instance(8, Self::CLASS_CODE, Self::NAME, "state");
}

bitflags! {
	/// The named bits of the Identity status word.
	pub struct IdentityStatus: u16 {
		/// The device has an owner.
		const OWNED = 0x0001;
		/// The device is configured beyond its defaults.
		const CONFIGURED = 0x0004;
		/// The device observed a recoverable minor fault.
		const MINOR_RECOVERABLE_FAULT = 0x0100;
		/// The device observed an unrecoverable minor fault.
		const MINOR_UNRECOVERABLE_FAULT = 0x0200;
		/// The device observed a recoverable major fault.
		const MAJOR_RECOVERABLE_FAULT = 0x0400;
		/// The device observed an unrecoverable major fault.
		const MAJOR_UNRECOVERABLE_FAULT = 0x0800;
	}
}

impl IdentityStatus {
	/// The extended device status, bits 4 through 7 of the status word.
	#[must_use]
	pub const fn extended_status(word: Word) -> u8 {
		(word.0 >> 4 & 0x0F) as u8
	}
}

impl From<Word> for IdentityStatus {
	fn from(word: Word) -> Self {
		Self::from_bits_truncate(word.0)
	}
}

/// The possible values of the state attribute; any not listed are
/// reserved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum DeviceState {
	/// The device is powered off
	Nonexistent = 0,
	/// The device is currently running self tests
	SelfTesting = 1,
	/// The device requires commissioning, configuration is invalid or incomplete
	Standby = 2,
	/// The device is functioning normally
	Operational = 3,
	/// The device experienced a fault that it can recover from
	MajorRecoverableFault = 4,
	/// The device experienced a fault that it cannot recover from
	MajorUnrecoverableFault = 5,
	/// Default value for a Get_Attributes_All response if the attribute is
	/// not supported
	DefaultGetAttributesAll = 255,
}

impl DeviceState {
	/// The state for an attribute value, `None` for reserved values.
	#[must_use]
	pub const fn from_attribute(state: u8) -> Option<Self> {
		match state {
			0 => Some(Self::Nonexistent),
			1 => Some(Self::SelfTesting),
			2 => Some(Self::Standby),
			3 => Some(Self::Operational),
			4 => Some(Self::MajorRecoverableFault),
			5 => Some(Self::MajorUnrecoverableFault),
			255 => Some(Self::DefaultGetAttributesAll),

			_ => None,
		}
	}
}

/// The instance attributes returned by Get_Attributes_All on an Identity
/// instance.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct IdentityInstanceAttrs {
	pub vendor_id: u16,
	pub device_type: u16,
	pub product_code: u16,
	pub revision: Revision,
	pub status: Word,
	pub serial_number: u32,
	pub product_name: ShortString,
}

impl IdentityInstanceAttrs {
	/// The serial number formatted as eight uppercase hex digits.
	#[must_use]
	pub fn serial(&self) -> String {
		format!("{:08X}", self.serial_number)
	}

	/// The status word's named bits.
	#[must_use]
	pub fn status_flags(&self) -> IdentityStatus {
		self.status.into()
	}
}

impl CipSize for IdentityInstanceAttrs {
	fn cip_size(&self) -> usize {
		3 * 2 + Revision::CIP_SIZE + Word::CIP_SIZE + 4 + self.product_name.cip_size()
	}
}

impl Readable for IdentityInstanceAttrs {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			vendor_id: u16::read_from(reader)?,
			device_type: u16::read_from(reader)?,
			product_code: u16::read_from(reader)?,
			revision: Revision::read_from(reader)?,
			status: Word::read_from(reader)?,
			serial_number: u32::read_from(reader)?,
			product_name: ShortString::read_from(reader)?,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_instance_attrs_decode() {
		let bytes = [
			0x01, 0x00, // vendor
			0x0E, 0x00, // device type
			0x41, 0x00, // product code
			0x14, 0x0B, // revision 20.11
			0x60, 0x00, // status
			0xEF, 0xBE, 0xAD, 0xDE, // serial
			0x02, 0x41, 0x42, // product name "AB"
		];

		let attrs = IdentityInstanceAttrs::read_from(&mut &bytes[..]).unwrap();

		assert_eq!(attrs.vendor_id, 1);
		assert_eq!(attrs.revision, Revision::new(20, 11));
		assert_eq!(attrs.serial(), "DEADBEEF");
		assert_eq!(attrs.product_name.as_str(), "AB");
		assert_eq!(attrs.cip_size(), bytes.len());
	}

	#[test]
	fn test_status_bits() {
		let status = IdentityStatus::from(Word(0x0105));

		assert!(status.contains(IdentityStatus::OWNED));
		assert!(status.contains(IdentityStatus::CONFIGURED));
		assert!(status.contains(IdentityStatus::MINOR_RECOVERABLE_FAULT));
		assert!(!status.contains(IdentityStatus::MAJOR_RECOVERABLE_FAULT));
	}
}

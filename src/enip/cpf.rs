// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Common Packet Format: the item list inside SendRRData and
//! SendUnitData payloads and the ListIdentity/ListServices replies.

use bitflags::bitflags;
use cipkit::{
	read_bytes,
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	LengthPrefix,
	ReadError,
	ReadResult,
	Readable,
	ReadableWithContext,
	Writable,
	WriteResult,
};

use crate::types::{Revision, ShortString, Word};

/// The Common Packet Format item type ids.
pub mod item_type {
	// Address items
	pub const NULL_ADDRESS: u16 = 0x0000;
	pub const CONNECTED_ADDRESS: u16 = 0x00A1;
	pub const SEQUENCED_ADDRESS: u16 = 0x8002;

	// Data items
	pub const CONNECTED_DATA: u16 = 0x00B1;
	pub const UNCONNECTED_DATA: u16 = 0x00B2;
	pub const SOCKADDR_INFO_O2T: u16 = 0x8000;
	pub const SOCKADDR_INFO_T2O: u16 = 0x8001;

	// CIP
	pub const CIP_IDENTITY: u16 = 0x000C;
	pub const CIP_COMMUNICATIONS: u16 = 0x0100;
}

/// The `sockaddr_in` structure embedded in identity and socket-address
/// items.
///
/// Unlike everything around it, its fields are big-endian: the structure is
/// defined to be laid out as it would be in a BSD sockets call.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Sockaddr {
	/// The address family; `AF_INET` (2) in practice.
	pub family: i16,
	pub port: u16,
	/// The IPv4 address as a big-endian integer.
	pub address: u32,
	pub zero: [u8; 8],
}

impl Sockaddr {
	/// The `AF_INET` address family.
	pub const AF_INET: i16 = 2;

	#[must_use]
	pub const fn new(port: u16, address: u32) -> Self {
		Self {
			family: Self::AF_INET,
			port,
			address,
			zero: [0; 8],
		}
	}
}

impl ConstantCipSize for Sockaddr {
	const CIP_SIZE: usize = 16;
}

impl CipSize for Sockaddr {
	fn cip_size(&self) -> usize {
		Self::CIP_SIZE
	}
}

impl Readable for Sockaddr {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		cipkit::ensure_remaining(reader, Self::CIP_SIZE)?;

		// Big-endian, via the network-order accessors.
		Ok(Self {
			family: reader.get_i16(),
			port: reader.get_u16(),
			address: reader.get_u32(),
			zero: <[u8; 8]>::read_from(reader)?,
		})
	}
}

impl Writable for Sockaddr {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		writer.put_i16(self.family);
		writer.put_u16(self.port);
		writer.put_u32(self.address);
		self.zero.write_to(writer)?;

		Ok(())
	}
}

/// The body of a ListIdentity reply item: who the device is.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct IdentityItem {
	pub protocol_version: u16,
	pub socket_address: Sockaddr,
	pub vendor_id: u16,
	pub device_type: u16,
	pub product_code: u16,
	pub revision: Revision,
	pub status: Word,
	pub serial_number: u32,
	pub product_name: ShortString,
	pub state: u8,
}

impl CipSize for IdentityItem {
	fn cip_size(&self) -> usize {
		u16::CIP_SIZE * 4
			+ Sockaddr::CIP_SIZE
			+ Revision::CIP_SIZE
			+ Word::CIP_SIZE
			+ u32::CIP_SIZE
			+ self.product_name.cip_size()
			+ u8::CIP_SIZE
	}
}

impl Readable for IdentityItem {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			protocol_version: u16::read_from(reader)?,
			socket_address: Sockaddr::read_from(reader)?,
			vendor_id: u16::read_from(reader)?,
			device_type: u16::read_from(reader)?,
			product_code: u16::read_from(reader)?,
			revision: Revision::read_from(reader)?,
			status: Word::read_from(reader)?,
			serial_number: u32::read_from(reader)?,
			product_name: ShortString::read_from(reader)?,
			state: u8::read_from(reader)?,
		})
	}
}

impl Writable for IdentityItem {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.protocol_version.write_to(writer)?;
		self.socket_address.write_to(writer)?;
		self.vendor_id.write_to(writer)?;
		self.device_type.write_to(writer)?;
		self.product_code.write_to(writer)?;
		self.revision.write_to(writer)?;
		self.status.write_to(writer)?;
		self.serial_number.write_to(writer)?;
		self.product_name.write_to(writer)?;
		self.state.write_to(writer)?;

		Ok(())
	}
}

bitflags! {
	/// The capability flags of a ListServices reply item.
	#[derive(Default)]
	pub struct CapabilityFlags: u16 {
		/// The target speaks CIP over TCP.
		const CIP_TCP = 0x0020;
		/// The target speaks CIP class 0/1 over UDP.
		const CIP_UDP_CLASS_0_1 = 0x0100;
	}
}

/// The body of a ListServices reply item: what the target speaks.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ServiceItem {
	pub protocol_version: u16,
	pub capability_flags: CapabilityFlags,
	/// A NUL-padded service name, `b"Communications\0\0"` in practice.
	pub service_name: [u8; 16],
}

impl Default for ServiceItem {
	fn default() -> Self {
		Self {
			protocol_version: crate::PROTOCOL_VERSION,
			capability_flags: CapabilityFlags::CIP_TCP,
			service_name: *b"Communications\x00\x00",
		}
	}
}

impl CipSize for ServiceItem {
	fn cip_size(&self) -> usize {
		2 * u16::CIP_SIZE + 16
	}
}

impl Readable for ServiceItem {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			protocol_version: u16::read_from(reader)?,
			capability_flags: CapabilityFlags::from_bits_truncate(u16::read_from(reader)?),
			service_name: <[u8; 16]>::read_from(reader)?,
		})
	}
}

impl Writable for ServiceItem {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.protocol_version.write_to(writer)?;
		self.capability_flags.bits().write_to(writer)?;
		self.service_name.write_to(writer)?;

		Ok(())
	}
}

/// A Common Packet Format item: a `u16` type id, a `u16` byte length, and a
/// type-specific body.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum CpfItem {
	/// The address item of unconnected messaging: no address at all.
	NullAddress,
	/// The address item of connected messaging.
	ConnectedAddress { connection_id: u32 },
	/// The address item of class 0/1 sequenced messaging.
	SequencedAddress {
		connection_id: u32,
		sequence_number: u32,
	},
	/// The data item of a SendUnitData frame.
	ConnectedData(Vec<u8>),
	/// The data item of a SendRRData frame.
	UnconnectedData(Vec<u8>),
	/// The originator-to-target socket address of a Forward Open exchange.
	SockaddrInfoO2T(Sockaddr),
	/// The target-to-originator socket address of a Forward Open exchange.
	SockaddrInfoT2O(Sockaddr),
	/// A ListIdentity reply item.
	Identity(IdentityItem),
	/// A ListServices reply item.
	Services(ServiceItem),
}

impl CpfItem {
	/// The item's type id.
	#[must_use]
	pub const fn type_id(&self) -> u16 {
		match self {
			Self::NullAddress => item_type::NULL_ADDRESS,
			Self::ConnectedAddress { .. } => item_type::CONNECTED_ADDRESS,
			Self::SequencedAddress { .. } => item_type::SEQUENCED_ADDRESS,
			Self::ConnectedData(_) => item_type::CONNECTED_DATA,
			Self::UnconnectedData(_) => item_type::UNCONNECTED_DATA,
			Self::SockaddrInfoO2T(_) => item_type::SOCKADDR_INFO_O2T,
			Self::SockaddrInfoT2O(_) => item_type::SOCKADDR_INFO_T2O,
			Self::Identity(_) => item_type::CIP_IDENTITY,
			Self::Services(_) => item_type::CIP_COMMUNICATIONS,
		}
	}

	fn body_size(&self) -> usize {
		match self {
			Self::NullAddress => 0,
			Self::ConnectedAddress { .. } => 4,
			Self::SequencedAddress { .. } => 8,
			Self::ConnectedData(data) | Self::UnconnectedData(data) => data.len(),
			Self::SockaddrInfoO2T(_) | Self::SockaddrInfoT2O(_) => Sockaddr::CIP_SIZE,
			Self::Identity(identity) => identity.cip_size(),
			Self::Services(services) => services.cip_size(),
		}
	}
}

impl CipSize for CpfItem {
	fn cip_size(&self) -> usize {
		2 * u16::CIP_SIZE + self.body_size()
	}
}

impl Readable for CpfItem {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let type_id = u16::read_from(reader)?;
		let length = u16::read_from(reader)?.to_length()?;
		let body = read_bytes(reader, length)?;
		let mut body = &body[..];

		let item = match type_id {
			item_type::NULL_ADDRESS => Self::NullAddress,
			item_type::CONNECTED_ADDRESS => Self::ConnectedAddress {
				connection_id: u32::read_from(&mut body)?,
			},
			item_type::SEQUENCED_ADDRESS => Self::SequencedAddress {
				connection_id: u32::read_from(&mut body)?,
				sequence_number: u32::read_from(&mut body)?,
			},
			item_type::CONNECTED_DATA => Self::ConnectedData(body.to_vec()),
			item_type::UNCONNECTED_DATA => Self::UnconnectedData(body.to_vec()),
			item_type::SOCKADDR_INFO_O2T => Self::SockaddrInfoO2T(Sockaddr::read_from(&mut body)?),
			item_type::SOCKADDR_INFO_T2O => Self::SockaddrInfoT2O(Sockaddr::read_from(&mut body)?),
			item_type::CIP_IDENTITY => Self::Identity(IdentityItem::read_from(&mut body)?),
			item_type::CIP_COMMUNICATIONS => Self::Services(ServiceItem::read_from(&mut body)?),

			other => {
				return Err(ReadError::invalid(
					"CpfItem",
					format!("unsupported common packet format item type id: {other:#06x}"),
				));
			},
		};

		Ok(item)
	}
}

impl Writable for CpfItem {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.type_id().write_to(writer)?;
		u16::from_length(self.body_size())?.write_to(writer)?;

		match self {
			Self::NullAddress => {},
			Self::ConnectedAddress { connection_id } => connection_id.write_to(writer)?,
			Self::SequencedAddress {
				connection_id,
				sequence_number,
			} => {
				connection_id.write_to(writer)?;
				sequence_number.write_to(writer)?;
			},
			Self::ConnectedData(data) | Self::UnconnectedData(data) => writer.put_slice(data),
			Self::SockaddrInfoO2T(sockaddr) | Self::SockaddrInfoT2O(sockaddr) => {
				sockaddr.write_to(writer)?;
			},
			Self::Identity(identity) => identity.write_to(writer)?,
			Self::Services(services) => services.write_to(writer)?,
		}

		Ok(())
	}
}

/// The Common Packet Format: a `u16` item count followed by the items.
///
/// An explicit-messaging frame carries an address item first and a data item
/// second: (null address, unconnected data) for SendRRData and (connected
/// address, connected data) for SendUnitData.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CommonPacketFormat {
	pub items: Vec<CpfItem>,
}

impl CommonPacketFormat {
	/// A packet of an address item and a data item, in that order.
	#[must_use]
	pub fn new(address: CpfItem, data: CpfItem) -> Self {
		Self {
			items: vec![address, data],
		}
	}

	/// The SendRRData packet for an unconnected message.
	#[must_use]
	pub fn unconnected(message: Vec<u8>) -> Self {
		Self::new(CpfItem::NullAddress, CpfItem::UnconnectedData(message))
	}

	/// The SendUnitData packet for a connected message.
	#[must_use]
	pub fn connected(connection_id: u32, message: Vec<u8>) -> Self {
		Self::new(
			CpfItem::ConnectedAddress { connection_id },
			CpfItem::ConnectedData(message),
		)
	}

	/// The address item, by convention the first.
	#[must_use]
	pub fn address(&self) -> Option<&CpfItem> {
		self.items.first()
	}

	/// The data item, by convention the second.
	#[must_use]
	pub fn data(&self) -> Option<&CpfItem> {
		self.items.get(1)
	}

	/// The bytes of the data item, whether connected or unconnected.
	#[must_use]
	pub fn data_bytes(&self) -> Option<&[u8]> {
		match self.data() {
			Some(CpfItem::ConnectedData(data) | CpfItem::UnconnectedData(data)) => Some(data),
			_ => None,
		}
	}
}

impl CipSize for CommonPacketFormat {
	fn cip_size(&self) -> usize {
		u16::CIP_SIZE + self.items.cip_size()
	}
}

impl Readable for CommonPacketFormat {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let count = u16::read_from(reader)?.to_length()?;

		Ok(Self {
			items: Vec::read_with(reader, &count)?,
		})
	}
}

impl Writable for CommonPacketFormat {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		u16::from_length(self.items.len())?.write_to(writer)?;

		for item in &self.items {
			item.write_to(writer)?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_sockaddr_is_big_endian() {
		let sockaddr = Sockaddr::new(44818, 0x0A01_0105);
		let bytes = sockaddr.to_bytes().unwrap();

		assert_eq!(
			bytes,
			[0x00, 0x02, 0xAF, 0x12, 0x0A, 0x01, 0x01, 0x05, 0, 0, 0, 0, 0, 0, 0, 0]
		);
		assert_eq!(Sockaddr::read_from(&mut &bytes[..]).unwrap(), sockaddr);
	}

	#[test]
	fn test_unconnected_packet_layout() {
		let packet = CommonPacketFormat::unconnected(vec![0xDE, 0xAD]);
		let bytes = packet.to_bytes().unwrap();

		assert_eq!(
			bytes,
			[
				0x02, 0x00, // two items
				0x00, 0x00, 0x00, 0x00, // null address
				0xB2, 0x00, 0x02, 0x00, 0xDE, 0xAD, // unconnected data
			]
		);
		assert_eq!(
			CommonPacketFormat::read_from(&mut &bytes[..]).unwrap(),
			packet
		);
	}

	#[test]
	fn test_connected_packet_layout() {
		let packet = CommonPacketFormat::connected(0x0102_0304, vec![0x01]);
		let bytes = packet.to_bytes().unwrap();

		assert_eq!(
			bytes,
			[
				0x02, 0x00, // two items
				0xA1, 0x00, 0x04, 0x00, 0x04, 0x03, 0x02, 0x01, // connected address
				0xB1, 0x00, 0x01, 0x00, 0x01, // connected data
			]
		);
		assert_eq!(packet.data_bytes(), Some(&[0x01][..]));
	}

	#[test]
	fn test_identity_item_round_trip() {
		let identity = IdentityItem {
			protocol_version: 1,
			socket_address: Sockaddr::new(44818, 0x0A00_0001),
			vendor_id: 1,
			device_type: 0x0C,
			product_code: 167,
			revision: Revision::new(20, 11),
			status: Word(0x0060),
			serial_number: 0x00C0_FFEE,
			product_name: ShortString::new("1756-L62/B LOGIX5562"),
			state: 3,
		};

		let item = CpfItem::Identity(identity.clone());
		let bytes = item.to_bytes().unwrap();

		// type id, then a length that sizes the encoded body
		assert_eq!(&bytes[..2], [0x0C, 0x00]);
		assert_eq!(
			u16::from_le_bytes([bytes[2], bytes[3]]) as usize,
			identity.cip_size()
		);
		assert_eq!(CpfItem::read_from(&mut &bytes[..]).unwrap(), item);
	}

	#[test]
	fn test_unknown_item_type() {
		let bytes = [0xFF_u8, 0x7F, 0x00, 0x00];

		assert!(matches!(
			CpfItem::read_from(&mut &bytes[..]),
			Err(ReadError::Invalid { .. })
		));
	}
}

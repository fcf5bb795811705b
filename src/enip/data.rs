// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The command-specific payloads of the encapsulation commands.

use cipkit::{
	Buf,
	BufMut,
	CipSize,
	ConstantCipSize,
	LengthPrefix,
	ReadResult,
	Readable,
	ReadableWithContext,
	Writable,
	WriteResult,
};

use super::cpf::{CommonPacketFormat, CpfItem};

/// The payload of a RegisterSession request and reply.
///
/// The granted session handle travels in the reply *header*, not here.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RegisterSessionData {
	pub protocol_version: u16,
	pub option_flags: u16,
}

impl Default for RegisterSessionData {
	fn default() -> Self {
		Self {
			protocol_version: crate::PROTOCOL_VERSION,
			option_flags: 0,
		}
	}
}

impl ConstantCipSize for RegisterSessionData {
	const CIP_SIZE: usize = 4;
}

impl CipSize for RegisterSessionData {
	fn cip_size(&self) -> usize {
		Self::CIP_SIZE
	}
}

impl Readable for RegisterSessionData {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			protocol_version: u16::read_from(reader)?,
			option_flags: u16::read_from(reader)?,
		})
	}
}

impl Writable for RegisterSessionData {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.protocol_version.write_to(writer)?;
		self.option_flags.write_to(writer)?;

		Ok(())
	}
}

/// The shared payload of SendRRData and SendUnitData.
///
/// The interface handle is always zero for CIP, and the encapsulation-level
/// timeout is zero because CIP manages its own timeouts in the Unconnected
/// Send wrapper.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SendDataPayload {
	pub interface_handle: u32,
	pub timeout: u16,
	pub packet: CommonPacketFormat,
}

impl SendDataPayload {
	#[must_use]
	pub fn new(packet: CommonPacketFormat) -> Self {
		Self {
			interface_handle: 0,
			timeout: 0,
			packet,
		}
	}
}

impl CipSize for SendDataPayload {
	fn cip_size(&self) -> usize {
		u32::CIP_SIZE + u16::CIP_SIZE + self.packet.cip_size()
	}
}

impl Readable for SendDataPayload {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			interface_handle: u32::read_from(reader)?,
			timeout: u16::read_from(reader)?,
			packet: CommonPacketFormat::read_from(reader)?,
		})
	}
}

impl Writable for SendDataPayload {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.interface_handle.write_to(writer)?;
		self.timeout.write_to(writer)?;
		self.packet.write_to(writer)?;

		Ok(())
	}
}

/// A `u16`-counted list of Common Packet Format items: the reply payload of
/// the List* commands.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CpfItemList {
	pub items: Vec<CpfItem>,
}

impl CipSize for CpfItemList {
	fn cip_size(&self) -> usize {
		u16::CIP_SIZE + self.items.cip_size()
	}
}

impl Readable for CpfItemList {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		let count = u16::read_from(reader)?.to_length()?;

		Ok(Self {
			items: Vec::read_with(reader, &count)?,
		})
	}
}

impl Writable for CpfItemList {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		u16::from_length(self.items.len())?.write_to(writer)?;

		for item in &self.items {
			item.write_to(writer)?;
		}

		Ok(())
	}
}

/// The reply payload of ListIdentity.
pub type ListIdentityData = CpfItemList;
/// The reply payload of ListServices.
pub type ListServicesData = CpfItemList;
/// The reply payload of ListInterfaces.
pub type ListInterfacesData = CpfItemList;

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_register_session_payload() {
		let payload = RegisterSessionData::default();

		assert_eq!(payload.to_bytes().unwrap(), [0x01, 0x00, 0x00, 0x00]);
	}

	#[test]
	fn test_send_data_payload_layout() {
		let payload = SendDataPayload::new(CommonPacketFormat::unconnected(vec![0x0E]));
		let bytes = payload.to_bytes().unwrap();

		// interface handle and timeout precede the packet
		assert_eq!(&bytes[..6], [0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
		assert_eq!(
			SendDataPayload::read_from(&mut &bytes[..]).unwrap(),
			payload
		);
	}
}

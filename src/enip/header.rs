// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The EtherNet/IP encapsulation header.

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

/// The EtherNet/IP encapsulation commands.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u16)]
pub enum EncapsCommand {
	Nop = 0x0000,
	ListServices = 0x0004,
	ListIdentity = 0x0063,
	ListInterfaces = 0x0064,
	RegisterSession = 0x0065,
	UnregisterSession = 0x0066,
	SendRRData = 0x006F,
	SendUnitData = 0x0070,
}

impl EncapsCommand {
	/// The command's display name.
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Nop => "Nop",
			Self::ListServices => "List Services",
			Self::ListIdentity => "List Identity",
			Self::ListInterfaces => "List Interfaces",
			Self::RegisterSession => "Register Session",
			Self::UnregisterSession => "Unregister Session",
			Self::SendRRData => "Send RR Data",
			Self::SendUnitData => "Send Unit Data",
		}
	}
}

impl ConstantCipSize for EncapsCommand {
	const CIP_SIZE: usize = 2;
}

impl CipSize for EncapsCommand {
	fn cip_size(&self) -> usize {
		Self::CIP_SIZE
	}
}

impl Readable for EncapsCommand {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		match u16::read_from(reader)? {
			0x0000 => Ok(Self::Nop),
			0x0004 => Ok(Self::ListServices),
			0x0063 => Ok(Self::ListIdentity),
			0x0064 => Ok(Self::ListInterfaces),
			0x0065 => Ok(Self::RegisterSession),
			0x0066 => Ok(Self::UnregisterSession),
			0x006F => Ok(Self::SendRRData),
			0x0070 => Ok(Self::SendUnitData),

			other => Err(ReadError::invalid(
				"EncapsCommand",
				format!("unknown encapsulation command: {other:#06x}"),
			)),
		}
	}
}

impl Writable for EncapsCommand {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		(*self as u16).write_to(writer)
	}
}

/// The EtherNet/IP encapsulation status codes.
pub mod status {
	/// The request succeeded.
	pub const SUCCESS: u32 = 0x0000;
	pub const INVALID_COMMAND: u32 = 0x0001;
	pub const INSUFFICIENT_MEMORY: u32 = 0x0002;
	pub const BAD_DATA: u32 = 0x0003;
	pub const INVALID_SESSION: u32 = 0x0064;
	pub const INVALID_LENGTH: u32 = 0x0065;
	pub const UNSUPPORTED_PROTOCOL_REVISION: u32 = 0x0069;

	/// The message for a status code, if it is a known one.
	#[must_use]
	pub const fn message(status: u32) -> Option<&'static str> {
		match status {
			SUCCESS => Some("Success"),
			INVALID_COMMAND => Some("Invalid or unsupported encapsulation command"),
			INSUFFICIENT_MEMORY => Some("Insufficient memory to handle command"),
			BAD_DATA => Some("Poorly formed or incorrect command data"),
			INVALID_SESSION => Some("Invalid session handle"),
			INVALID_LENGTH => Some("Invalid message length"),
			UNSUPPORTED_PROTOCOL_REVISION => Some("Unsupported encapsulation protocol revision"),

			_ => None,
		}
	}
}

/// The fixed 24-byte EtherNet/IP encapsulation header.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EnipHeader {
	pub command: EncapsCommand,
	/// The byte length of the payload following the header.
	pub length: u16,
	/// The session handle granted by RegisterSession, zero before one is.
	pub session: u32,
	pub status: u32,
	/// Returned untouched by the target; free for the sender's bookkeeping.
	pub sender_context: [u8; 8],
	pub options: u32,
}

impl EnipHeader {
	/// A request header for the given command, with a zero status and
	/// options.
	#[must_use]
	pub const fn request(
		command: EncapsCommand, session: u32, length: u16, sender_context: [u8; 8],
	) -> Self {
		Self {
			command,
			length,
			session,
			status: 0,
			sender_context,
			options: 0,
		}
	}

	/// The status message, or a placeholder naming the unknown code.
	#[must_use]
	pub fn status_message(&self) -> String {
		status::message(self.status).map_or_else(
			|| format!("Unknown status code: {:#06x}", self.status),
			str::to_owned,
		)
	}
}

impl ConstantCipSize for EnipHeader {
	const CIP_SIZE: usize = 24;
}

impl CipSize for EnipHeader {
	fn cip_size(&self) -> usize {
		Self::CIP_SIZE
	}
}

impl Readable for EnipHeader {
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self> {
		Ok(Self {
			command: EncapsCommand::read_from(reader)?,
			length: u16::read_from(reader)?,
			session: u32::read_from(reader)?,
			status: u32::read_from(reader)?,
			sender_context: <[u8; 8]>::read_from(reader)?,
			options: u32::read_from(reader)?,
		})
	}
}

impl Writable for EnipHeader {
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult {
		self.command.write_to(writer)?;
		self.length.write_to(writer)?;
		self.session.write_to(writer)?;
		self.status.write_to(writer)?;
		self.sender_context.write_to(writer)?;
		self.options.write_to(writer)?;

		Ok(())
	}
}

impl fmt::Display for EnipHeader {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"EnipHeader(command={:#06x}: {:?}, status={:#06x}: {:?}, session={})",
			self.command as u16,
			self.command.name(),
			self.status,
			self.status_message(),
			self.session,
		)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_header_round_trip() {
		let header = EnipHeader::request(EncapsCommand::RegisterSession, 0, 4, [0; 8]);
		let bytes = header.to_bytes().unwrap();

		assert_eq!(bytes.len(), EnipHeader::CIP_SIZE);
		assert_eq!(&bytes[..4], [0x65, 0x00, 0x04, 0x00]);
		assert_eq!(EnipHeader::read_from(&mut &bytes[..]).unwrap(), header);
	}

	#[test]
	fn test_unknown_command() {
		let bytes = [0xAB_u8, 0x00];

		assert!(matches!(
			EncapsCommand::read_from(&mut &bytes[..]),
			Err(ReadError::Invalid { .. })
		));
	}

	#[test]
	fn test_status_messages() {
		assert_eq!(status::message(0), Some("Success"));
		assert_eq!(status::message(0x69), Some("Unsupported encapsulation protocol revision"));
		assert_eq!(status::message(0x1234), None);
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Port object.

use crate::cip::object::{CipAttribute, CipObject};
use crate::epath::{PackedEpath, PaddedEpath, PaddedEpathPadLen};
use crate::types::{Blob, ShortString};

/// The Port object: the CIP ports on the device, one instance per port.
#[derive(Debug)]
pub struct Port;

impl CipObject for Port {
	const CLASS_CODE: u16 = 0xF4;
	const NAME: &'static str = "Port";

	// The Port object does not declare a Get_Attributes_All layout.
	type InstanceAttrs = Blob;
}

impl Port {
	// --- Class attributes ---

	/// The instance id of the Port object the request entered through
	pub const ENTRY_PORT: CipAttribute<u16> =
		CipAttribute::class(8, Self::CLASS_CODE, Self::NAME, "entry_port");

	// --- Instance attributes ---

	/// The kind of port, see [`PortType`]
	pub const PORT_TYPE: CipAttribute<u16> =
		CipAttribute::instance(1, Self::CLASS_CODE, Self::NAME, "port_type");
	/// CIP port number of the port
	pub const PORT_NUMBER: CipAttribute<u16> =
		CipAttribute::instance(2, Self::CLASS_CODE, Self::NAME, "port_number");
	/// Logical path that identifies the object for this port
	pub const LINK_OBJECT: CipAttribute<PaddedEpathPadLen> =
		CipAttribute::instance(3, Self::CLASS_CODE, Self::NAME, "link_object");
	/// String name that identifies the physical port on the device
	pub const PORT_NAME: CipAttribute<ShortString> =
		CipAttribute::instance(4, Self::CLASS_CODE, Self::NAME, "port_name");
	/// String name of the port type
	pub const PORT_TYPE_NAME: CipAttribute<ShortString> =
		CipAttribute::instance(5, Self::CLASS_CODE, Self::NAME, "port_type_name");
	/// String description of the port
	pub const PORT_DESCRIPTION: CipAttribute<ShortString> =
		CipAttribute::instance(6, Self::CLASS_CODE, Self::NAME, "port_description");
	/// Node number of the device on the port
	pub const NODE_ADDRESS: CipAttribute<PaddedEpath> =
		CipAttribute::instance(7, Self::CLASS_CODE, Self::NAME, "node_address");
	/// Electronic key of the network or chassis the port is attached to
	pub const PORT_KEY: CipAttribute<PackedEpath> =
		CipAttribute::instance(9, Self::CLASS_CODE, Self::NAME, "port_key");
}

/// The values of the `port_type` attribute.
///
/// Not listed: 6-99 are reserved for compatibility with existing
/// protocols, 100-199 are vendor specific, and 203-65534 are reserved for
/// future use.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u16)]
pub enum PortType {
	/// Connection terminates in this device
	Endpoint = 0,
	Backplane = 1,
	ControlNet = 2,
	ControlNetRedundant = 3,
	EtherNetIp = 4,
	DeviceNet = 5,
	/// Virtual backplane / CompactLogix
	VirtualBackplane = 100,
	DataHighway = 101,
	DataHighwayRs485 = 102,
	Usb = 107,
	CompoNet = 200,
	ModbusTcp = 201,
	ModbusSl = 202,
	/// Port is not configured
	Unconfigured = 65535,
}

impl PortType {
	/// The port type for an attribute value, `None` for reserved or
	/// vendor-specific values.
	#[must_use]
	pub const fn from_attribute(port_type: u16) -> Option<Self> {
		match port_type {
			0 => Some(Self::Endpoint),
			1 => Some(Self::Backplane),
			2 => Some(Self::ControlNet),
			3 => Some(Self::ControlNetRedundant),
			4 => Some(Self::EtherNetIp),
			5 => Some(Self::DeviceNet),
			100 => Some(Self::VirtualBackplane),
			101 => Some(Self::DataHighway),
			102 => Some(Self::DataHighwayRs485),
			107 => Some(Self::Usb),
			200 => Some(Self::CompoNet),
			201 => Some(Self::ModbusTcp),
			202 => Some(Self::ModbusSl),
			65535 => Some(Self::Unconfigured),

			_ => None,
		}
	}
}

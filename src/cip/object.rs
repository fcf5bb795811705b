// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP object declaration framework.
//!
//! An object is a type implementing [`CipObject`]: a class code, attribute
//! descriptors declared as [`CipAttribute`] constants, status-code tables
//! for failure messages, and services. The standard services every object
//! supports (Get_Attributes_All, Get_Attribute_Single, and
//! Get_Attribute_List) are the free functions here, generic over the
//! object or attribute they target.

use std::fmt;
use std::marker::PhantomData;

use cipkit::{CipSize, ReadError, ReadResult, Readable};

use crate::epath::{Epath, PackedEpath, PaddedEpath, PaddedEpathPadLen};
use crate::error::RequestError;
use crate::types::{Blob, Dword, Revision, ShortString, UintList, Word};

use super::message_router::MessageRouterRequest;
use super::request::{decode_readable, failure_readable, CipRequest, DecodeFn, ResponseParser};

/// The standard service codes every object inherits.
pub mod service_code {
	pub const GET_ATTRIBUTES_ALL: u8 = 0x01;
	pub const GET_ATTRIBUTE_LIST: u8 = 0x03;
	pub const GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
}

/// A CIP object class: its class code and its failure-message tables.
pub trait CipObject {
	/// The 16-bit class code.
	const CLASS_CODE: u16;
	/// The display name of the object.
	const NAME: &'static str;

	/// The body of an instance-level Get_Attributes_All reply: the
	/// instance attributes flagged for it, in attribute-id order. Objects
	/// which do not declare one fall back to raw bytes.
	type InstanceAttrs: Readable + fmt::Debug + 'static;

	/// The object's status-message table, consulted for failed responses.
	#[must_use]
	fn status_codes() -> &'static [StatusEntry] {
		&[]
	}

	/// An object-specific refinement of the extended-status message, e.g.
	/// decoding the extra words that accompany a particular code.
	#[must_use]
	fn customize_extended_status(
		_general_status: u8, _ext_status: u16, _ext_extra: &[u16],
	) -> Option<String> {
		None
	}
}

/// One row of an object's status table: the extended-status messages for a
/// service and general status, with `None` as a wildcard for either.
#[derive(Debug)]
pub struct StatusEntry {
	pub service: Option<u8>,
	pub general: Option<u8>,
	/// Messages for specific extended codes.
	pub extended: &'static [(u16, &'static str)],
	/// The message for any extended code not listed.
	pub fallback: Option<&'static str>,
}

/// A value decoded from an attribute, as carried in a Get_Attribute_List
/// reply.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
	Usint(u8),
	Uint(u16),
	Udint(u32),
	Word(Word),
	Dword(Dword),
	Revision(Revision),
	ShortString(ShortString),
	UintList(UintList),
	Epath(Epath),
	Bytes(Blob),
}

/// A type an attribute can be declared with: how to decode it, and how it
/// lowers into an [`AttributeValue`].
pub trait AttributeType: Sized + 'static {
	fn read_attribute(reader: &mut &[u8]) -> ReadResult<Self>;

	fn into_attribute_value(self) -> AttributeValue;
}

macro_rules! attribute_type {
	($($ty:ty => $variant:ident),*$(,)?) => {
		$(
			impl AttributeType for $ty {
				fn read_attribute(reader: &mut &[u8]) -> ReadResult<Self> {
					Self::read_from(reader)
				}

				fn into_attribute_value(self) -> AttributeValue {
					AttributeValue::$variant(self)
				}
			}
		)*
	};
}

attribute_type! {
	u8 => Usint,
	u16 => Uint,
	u32 => Udint,
	Word => Word,
	Dword => Dword,
	Revision => Revision,
	ShortString => ShortString,
	UintList => UintList,
	Blob => Bytes,
}

// The EPATH-typed attributes all lower to the same value: the format
// wrapper only matters on the wire.
macro_rules! epath_attribute_type {
	($($ty:ty),*$(,)?) => {
		$(
			impl AttributeType for $ty {
				fn read_attribute(reader: &mut &[u8]) -> ReadResult<Self> {
					Self::read_from(reader)
				}

				fn into_attribute_value(self) -> AttributeValue {
					AttributeValue::Epath(self.0)
				}
			}
		)*
	};
}

epath_attribute_type! {
	PackedEpath,
	PaddedEpath,
	PaddedEpathPadLen,
}

/// Decodes an attribute value from a reply stream.
pub type AttributeValueDecoder = fn(&mut &[u8]) -> ReadResult<AttributeValue>;

/// An attribute descriptor: its id, which object it belongs to, and whether
/// it lives on the class or on instances.
#[derive(Debug)]
pub struct CipAttribute<T> {
	pub id: u16,
	pub class_code: u16,
	pub object_name: &'static str,
	pub name: &'static str,
	pub class_attr: bool,
	marker: PhantomData<fn() -> T>,
}

impl<T: AttributeType> CipAttribute<T> {
	/// An instance attribute of the object with the given class code.
	#[must_use]
	pub const fn instance(
		id: u16, class_code: u16, object_name: &'static str, name: &'static str,
	) -> Self {
		Self {
			id,
			class_code,
			object_name,
			name,
			class_attr: false,
			marker: PhantomData,
		}
	}

	/// A class attribute of the object with the given class code.
	#[must_use]
	pub const fn class(
		id: u16, class_code: u16, object_name: &'static str, name: &'static str,
	) -> Self {
		Self {
			id,
			class_code,
			object_name,
			name,
			class_attr: true,
			marker: PhantomData,
		}
	}
}

impl<T> fmt::Display for CipAttribute<T> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}.{}", self.object_name, self.name)
	}
}

/// The object-safe view of a [`CipAttribute`], for heterogeneous attribute
/// lists.
pub trait AttributeDescriptor {
	fn id(&self) -> u16;
	fn class_code(&self) -> u16;
	fn object_name(&self) -> &'static str;
	fn name(&self) -> &'static str;
	fn is_class_attr(&self) -> bool;
	fn value_decoder(&self) -> AttributeValueDecoder;
}

impl<T: AttributeType> AttributeDescriptor for CipAttribute<T> {
	fn id(&self) -> u16 {
		self.id
	}

	fn class_code(&self) -> u16 {
		self.class_code
	}

	fn object_name(&self) -> &'static str {
		self.object_name
	}

	fn name(&self) -> &'static str {
		self.name
	}

	fn is_class_attr(&self) -> bool {
		self.class_attr
	}

	fn value_decoder(&self) -> AttributeValueDecoder {
		|reader| T::read_attribute(reader).map(T::into_attribute_value)
	}
}

/// The standard class attributes, ids 1 through 7, predeclared for every
/// object.
pub mod class_attrs {
	use super::{AttributeType, CipAttribute, CipObject};
	use crate::types::UintList;

	macro_rules! standard_class_attr {
		($($fn_name:ident: $ty:ty = $id:literal),*$(,)?) => {
			$(
				#[must_use]
				pub fn $fn_name<O: CipObject>() -> CipAttribute<$ty>
				where
					$ty: AttributeType,
				{
					CipAttribute::class($id, O::CLASS_CODE, O::NAME, stringify!($fn_name))
				}
			)*
		};
	}

	standard_class_attr! {
		object_revision: u16 = 1,
		max_instance: u16 = 2,
		num_instances: u16 = 3,
		optional_attrs_list: UintList = 4,
		optional_service_list: UintList = 5,
		max_class_attr: u16 = 6,
		max_instance_attr: u16 = 7,
	}
}

/// The body of a class-level Get_Attributes_All reply: the standard class
/// attributes in id order.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StandardClassAttrs {
	pub object_revision: u16,
	pub max_instance: u16,
	pub num_instances: u16,
	pub optional_attrs_list: UintList,
	pub optional_service_list: UintList,
	pub max_class_attr: u16,
	pub max_instance_attr: u16,
}

impl CipSize for StandardClassAttrs {
	fn cip_size(&self) -> usize {
		5 * 2 + self.optional_attrs_list.cip_size() + self.optional_service_list.cip_size()
	}
}

impl Readable for StandardClassAttrs {
	fn read_from(reader: &mut impl cipkit::Buf) -> ReadResult<Self> {
		Ok(Self {
			object_revision: u16::read_from(reader)?,
			max_instance: u16::read_from(reader)?,
			num_instances: u16::read_from(reader)?,
			optional_attrs_list: UintList::read_from(reader)?,
			optional_service_list: UintList::read_from(reader)?,
			max_class_attr: u16::read_from(reader)?,
			max_instance_attr: u16::read_from(reader)?,
		})
	}
}

/// Builds a Get_Attributes_All request for an instance of `O`.
#[must_use]
pub fn get_attributes_all<O: CipObject>(instance: u32) -> CipRequest<O::InstanceAttrs> {
	CipRequest {
		message: MessageRouterRequest::build(
			service_code::GET_ATTRIBUTES_ALL,
			O::CLASS_CODE,
			instance,
			None,
			Vec::new(),
		),
		parser: ResponseParser::new(decode_readable::<O::InstanceAttrs>(), failure_readable()),
	}
}

/// Builds a Get_Attributes_All request for the class of `O` (instance
/// zero), yielding the standard class attributes.
#[must_use]
pub fn get_class_attributes_all<O: CipObject>() -> CipRequest<StandardClassAttrs> {
	CipRequest {
		message: MessageRouterRequest::build(
			service_code::GET_ATTRIBUTES_ALL,
			O::CLASS_CODE,
			0,
			None,
			Vec::new(),
		),
		parser: ResponseParser::new(decode_readable::<StandardClassAttrs>(), failure_readable()),
	}
}

/// Builds a Get_Attribute_Single request for one attribute.
///
/// Class attributes are addressed to instance zero and instance attributes
/// to a nonzero instance; asking for the opposite is caught here rather
/// than left for the device to reject.
///
/// # Errors
///
/// [`RequestError::ClassAttribute`] and [`RequestError::InstanceAttribute`]
/// for a class/instance mismatch.
pub fn get_attribute_single<T: AttributeType>(
	attribute: &CipAttribute<T>, instance: u32,
) -> Result<CipRequest<T>, RequestError> {
	if attribute.class_attr && instance != 0 {
		return Err(RequestError::ClassAttribute {
			object: attribute.object_name,
			attribute: attribute.name,
		});
	}
	if !attribute.class_attr && instance == 0 {
		return Err(RequestError::InstanceAttribute {
			object: attribute.object_name,
			attribute: attribute.name,
		});
	}

	let decode: DecodeFn<T> = Box::new(|reader| T::read_attribute(reader));

	Ok(CipRequest {
		message: MessageRouterRequest::build(
			service_code::GET_ATTRIBUTE_SINGLE,
			attribute.class_code,
			instance,
			Some(attribute.id),
			Vec::new(),
		),
		parser: ResponseParser::new(decode, failure_readable()),
	})
}

/// One attribute's record in a Get_Attribute_List reply.
///
/// The value is present exactly when the per-attribute status is zero; a
/// failed attribute contributes no bytes beyond its id and status.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeListItem {
	pub id: u16,
	pub status: u16,
	pub value: Option<AttributeValue>,
}

/// The body of a Get_Attribute_List reply: a `u16` record count, then one
/// record per requested attribute, in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct GetAttributeListResponse {
	pub attributes: Vec<AttributeListItem>,
}

impl GetAttributeListResponse {
	fn decode(decoders: &[(u16, AttributeValueDecoder)], reader: &mut &[u8]) -> ReadResult<Self> {
		let count = u16::read_from(reader)?;
		if usize::from(count) != decoders.len() {
			return Err(ReadError::invalid(
				"GetAttributeListResponse",
				format!(
					"reply holds {count} attributes, requested {}",
					decoders.len()
				),
			));
		}

		let mut attributes = Vec::with_capacity(decoders.len());
		for (id, decoder) in decoders {
			let reply_id = u16::read_from(reader)?;
			if reply_id != *id {
				return Err(ReadError::invalid(
					"GetAttributeListResponse",
					format!("reply attribute id {reply_id} does not match requested id {id}"),
				));
			}

			let status = u16::read_from(reader)?;
			let value = if status == 0 {
				Some(decoder(reader)?)
			} else {
				None
			};

			attributes.push(AttributeListItem {
				id: reply_id,
				status,
				value,
			});
		}

		Ok(Self { attributes })
	}
}

/// Builds a Get_Attribute_List request for several attributes of one
/// object.
///
/// # Errors
///
/// [`RequestError::MixedObjects`] unless every attribute belongs to the
/// same object.
pub fn get_attribute_list(
	attributes: &[&dyn AttributeDescriptor], instance: u32,
) -> Result<CipRequest<GetAttributeListResponse>, RequestError> {
	let Some(first) = attributes.first() else {
		return Err(RequestError::MixedObjects);
	};
	if attributes
		.iter()
		.any(|attribute| attribute.class_code() != first.class_code())
	{
		return Err(RequestError::MixedObjects);
	}
	let class_code = first.class_code();

	let ids = UintList(attributes.iter().map(|attribute| attribute.id()).collect());
	let decoders: Vec<(u16, AttributeValueDecoder)> = attributes
		.iter()
		.map(|attribute| (attribute.id(), attribute.value_decoder()))
		.collect();

	let decode: DecodeFn<GetAttributeListResponse> =
		Box::new(move |reader| GetAttributeListResponse::decode(&decoders, reader));

	let data = cipkit::Writable::to_bytes(&ids)
		.map_err(|_| RequestError::TooManyAttributes(attributes.len()))?;

	Ok(CipRequest {
		message: MessageRouterRequest::build(
			service_code::GET_ATTRIBUTE_LIST,
			class_code,
			instance,
			None,
			data,
		),
		parser: ResponseParser::new(decode, failure_readable()),
	})
}

#[cfg(test)]
mod test {
	use cipkit::Writable;

	use crate::cip::objects::{ConnectionManager, Identity};
	use crate::cip::request::ResponseData;

	use super::*;

	#[test]
	fn test_get_attribute_single_enforces_attribute_kind() {
		assert!(matches!(
			get_attribute_single(&class_attrs::max_instance::<Identity>(), 1),
			Err(RequestError::ClassAttribute { .. })
		));
		assert!(matches!(
			get_attribute_single(&Identity::VENDOR_ID, 0),
			Err(RequestError::InstanceAttribute { .. })
		));
	}

	#[test]
	fn test_get_attribute_list_rejects_mixed_objects() {
		assert!(matches!(
			get_attribute_list(&[&Identity::VENDOR_ID, &ConnectionManager::OPEN_REQUESTS], 1),
			Err(RequestError::MixedObjects)
		));
		assert!(matches!(
			get_attribute_list(&[], 1),
			Err(RequestError::MixedObjects)
		));
	}

	#[test]
	fn test_get_attribute_list_request_data() {
		let request =
			get_attribute_list(&[&Identity::VENDOR_ID, &Identity::SERIAL_NUMBER], 1).unwrap();

		assert_eq!(
			request.message.to_bytes().unwrap(),
			[
				0x03, 0x02, 0x20, 0x01, 0x24, 0x01, // service and path
				0x02, 0x00, 0x01, 0x00, 0x06, 0x00, // two ids: 1 and 6
			]
		);
	}

	#[test]
	fn test_get_attribute_list_value_presence_follows_status() {
		let request =
			get_attribute_list(&[&Identity::VENDOR_ID, &Identity::SERIAL_NUMBER], 1).unwrap();

		// vendor_id succeeds with value 1; serial_number fails with status
		// 0x14 and contributes no value bytes.
		let response = request
			.parse_response(&[
				0x83, 0x00, 0x00, 0x00, // reply header
				0x02, 0x00, // two records
				0x01, 0x00, 0x00, 0x00, 0x01, 0x00, // id 1, ok, value
				0x06, 0x00, 0x14, 0x00, // id 6, unsupported, no value
			])
			.unwrap();

		let list = match response.data {
			ResponseData::Success(list) => list,
			ResponseData::Failure(_) => panic!("reply parsed as failure"),
		};

		assert_eq!(list.attributes.len(), 2);
		assert_eq!(list.attributes[0].status, 0);
		assert_eq!(list.attributes[0].value, Some(AttributeValue::Uint(1)));
		assert_eq!(list.attributes[1].status, 0x14);
		assert_eq!(list.attributes[1].value, None);
	}

	#[test]
	fn test_standard_class_attrs_decode() {
		let bytes = [
			0x02, 0x00, // object revision
			0x01, 0x00, // max instance
			0x01, 0x00, // num instances
			0x01, 0x00, 0x08, 0x00, // one optional attribute: 8
			0x00, 0x00, // no optional services
			0x07, 0x00, // max class attribute
			0x08, 0x00, // max instance attribute
		];

		let attrs = StandardClassAttrs::read_from(&mut &bytes[..]).unwrap();

		assert_eq!(attrs.object_revision, 2);
		assert_eq!(attrs.optional_attrs_list.0, [8]);
		assert_eq!(attrs.max_instance_attr, 8);
		assert_eq!(attrs.cip_size(), bytes.len());
	}
}

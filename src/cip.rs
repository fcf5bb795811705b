// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CIP explicit-messaging layer.
//!
//! Requests are composed against [objects](objects), each a class code
//! with attribute descriptors and services, and carried as
//! [Message Router](MessageRouterRequest) messages: a service code, an
//! `EPATH` to the target object, and service data. [`CipConnection`] decides
//! how each request travels: unconnected (optionally wrapped in an
//! Unconnected Send with an explicit route) or connected, over a CIP
//! connection negotiated with Forward Open.

mod connection;
mod message_router;
mod object;
pub mod objects;
mod request;
mod route;

pub use connection::{
	CipConfig,
	CipConnection,
	ConnectedConfig,
	UnconnectedConfig,
	DEFAULT_VENDOR_ID,
	LARGE_CONNECTION_SIZE,
	STANDARD_CONNECTION_SIZE,
};
pub use message_router::{MessageRouterRequest, MessageRouterResponse};
pub use object::{
	class_attrs,
	get_attribute_list,
	get_attribute_single,
	get_attributes_all,
	get_class_attributes_all,
	AttributeDescriptor,
	AttributeListItem,
	AttributeValue,
	AttributeType,
	CipAttribute,
	CipObject,
	GetAttributeListResponse,
	StandardClassAttrs,
	StatusEntry,
};
pub use request::{CipRequest, CipResponse, ResponseData, ResponseParser};
pub use route::CipRoute;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed CIP requests and responses.
//!
//! A [`CipRequest`] pairs an encoded Message Router message with the parser
//! for its reply, so whoever carries the request (unconnected, connected,
//! or wrapped in an Unconnected Send) can hand the reply bytes back and get
//! a typed [`CipResponse`].

use std::fmt;

use cipkit::{ReadResult, Readable};
use derivative::Derivative;

use crate::types::Blob;

use super::message_router::{MessageRouterRequest, MessageRouterResponse};
use super::objects;

/// The general status CIP defines as success.
pub const SUCCESS: u8 = 0x00;

/// Decodes a success body from a reply's service data.
pub(crate) type DecodeFn<T> = Box<dyn Fn(&mut &[u8]) -> ReadResult<T> + Send + Sync>;
/// Decodes a failure body from a whole decoded reply.
pub(crate) type FailureFn<F> = Box<dyn Fn(&MessageRouterResponse) -> ReadResult<F> + Send + Sync>;

/// Boxes the plain [`Readable`] decode for a success type.
pub(crate) fn decode_readable<T: Readable + 'static>() -> DecodeFn<T> {
	Box::new(|reader| T::read_from(reader))
}

/// Boxes the plain [`Readable`] decode of a reply's service data for a
/// failure type.
pub(crate) fn failure_readable<F: Readable + 'static>() -> FailureFn<F> {
	Box::new(|response| F::read_from(&mut response.data.as_slice()))
}

/// A Message Router request bundled with the parser for its reply.
///
/// `T` is the body type of a successful reply; `F` the body type of a
/// failed one, raw bytes unless the service declares better.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CipRequest<T, F = Blob> {
	pub message: MessageRouterRequest,
	#[derivative(Debug = "ignore")]
	pub parser: ResponseParser<T, F>,
}

impl<T, F: fmt::Display> CipRequest<T, F> {
	/// Parses the reply bytes of this request.
	///
	/// # Errors
	///
	/// As [`ResponseParser::parse`].
	pub fn parse_response(&self, data: &[u8]) -> ReadResult<CipResponse<T, F>> {
		self.parser.parse(data, &self.message)
	}
}

/// The decoded body of a reply: the declared success type, or the declared
/// failure type when the general status is outside the success set.
#[derive(Clone, Debug)]
pub enum ResponseData<T, F = Blob> {
	Success(T),
	Failure(F),
}

impl<T, F> ResponseData<T, F> {
	/// The success body, if this is one.
	pub fn success(self) -> Option<T> {
		match self {
			Self::Success(value) => Some(value),
			Self::Failure(_) => None,
		}
	}

	/// The failure body, if this is one.
	pub fn failure(self) -> Option<F> {
		match self {
			Self::Success(_) => None,
			Self::Failure(value) => Some(value),
		}
	}
}

/// A parsed reply: the Message Router header, the typed body, and the
/// resolved status message.
#[derive(Clone, Debug)]
pub struct CipResponse<T, F = Blob> {
	/// The reply as decoded, raw service data included.
	pub message: MessageRouterResponse,
	pub data: ResponseData<T, F>,
	/// `"Success"`, or the object-resolved description of the failure.
	pub status_message: String,
	success_statuses: Vec<u8>,
}

impl<T, F> CipResponse<T, F> {
	/// Whether the reply's general status is in the request's success set.
	#[must_use]
	pub fn is_ok(&self) -> bool {
		self.success_statuses.contains(&self.message.general_status)
	}

	/// The success body, discarding everything else.
	pub fn into_success(self) -> Option<T> {
		self.data.success()
	}

	/// Maps the failure body, keeping everything else; the decoded reply is
	/// available to the mapping.
	pub(crate) fn map_failure<G>(
		self, map: impl FnOnce(F, &MessageRouterResponse) -> G,
	) -> CipResponse<T, G> {
		let Self {
			message,
			data,
			status_message,
			success_statuses,
		} = self;

		let data = match data {
			ResponseData::Success(value) => ResponseData::Success(value),
			ResponseData::Failure(value) => {
				let mapped = map(value, &message);

				ResponseData::Failure(mapped)
			},
		};

		CipResponse {
			message,
			data,
			status_message,
			success_statuses,
		}
	}
}

/// The reply parser of a [`CipRequest`]: how to decode each body, and which
/// general statuses count as success.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct ResponseParser<T, F = Blob> {
	#[derivative(Debug = "ignore")]
	decode_success: DecodeFn<T>,
	#[derivative(Debug = "ignore")]
	decode_failure: FailureFn<F>,
	success_statuses: Vec<u8>,
}

impl<T, F: fmt::Display> ResponseParser<T, F> {
	pub(crate) fn new(decode_success: DecodeFn<T>, decode_failure: FailureFn<F>) -> Self {
		Self {
			decode_success,
			decode_failure,
			success_statuses: vec![SUCCESS],
		}
	}

	pub(crate) fn with_success_statuses(mut self, statuses: Vec<u8>) -> Self {
		self.success_statuses = statuses;

		self
	}

	/// Dismantles the parser into its success decoder and success set, for
	/// wrapping a request in another service.
	pub(crate) fn into_success_parts(self) -> (DecodeFn<T>, Vec<u8>) {
		(self.decode_success, self.success_statuses)
	}

	/// Decodes a reply and resolves its status message.
	///
	/// The status message of a failure is assembled from the status tables
	/// of the object named by the request path's class id.
	///
	/// # Errors
	///
	/// Any decode failure of the reply header or the selected body.
	pub fn parse(
		&self, data: &[u8], request: &MessageRouterRequest,
	) -> ReadResult<CipResponse<T, F>> {
		let response = MessageRouterResponse::read_from(&mut &data[..])?;

		let (data, status_message) = if self.success_statuses.contains(&response.general_status) {
			let body = (self.decode_success)(&mut response.data.as_slice())?;

			(ResponseData::Success(body), "Success".to_owned())
		} else {
			let body = (self.decode_failure)(&response)?;

			let (general, extended) = objects::status_messages(
				request.class_code(),
				request.service,
				response.general_status,
				&response.additional_status,
				Some(&body.to_string()),
			);
			let status_message = match extended {
				Some(extended) => {
					format!("{general}({:#04x}): {extended}", response.general_status)
				},
				None => general,
			};

			(ResponseData::Failure(body), status_message)
		};

		Ok(CipResponse {
			message: response,
			data,
			status_message,
			success_statuses: self.success_statuses.clone(),
		})
	}
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Deny the following clippy lints to enforce them:
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::nursery)]
#![deny(clippy::perf)]
#![deny(clippy::style)]
#![deny(clippy::suspicious)]
// Warn for these lints, rather than denying them.
#![warn(clippy::use_self)]
// Warn for pedantic & cargo lints. They are allowed completely by default.
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
// Continue to allow these though.
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]

//! # CIPKit
//!
//! The CIPR Kit, a collection of traits and types to help with
//! (de)serialization of types in CIPR.
//!
//! CIP is a little-endian protocol: every primitive implementation in this
//! crate reads and writes least-significant-byte first. The handful of
//! big-endian fields CIP embeds (the `sockaddr` inside EtherNet/IP identity
//! items) are handled by their containing types with the network-order
//! accessors of [`Buf`] and [`BufMut`] directly.

use std::error::Error;

use thiserror::Error;

pub type ReadResult<T> = Result<T, ReadError>;
pub type WriteResult = Result<(), WriteError>;

pub use bytes::{Buf, BufMut};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReadError {
	/// A decode attempted to read past the end of the buffer.
	///
	/// This variant is the semantic end-of-stream signal: decoders that read
	/// elements until their input runs dry branch on it to terminate, so it
	/// must always be propagated untouched, never wrapped in another variant.
	#[error("attempted to read past the end of the buffer")]
	BufferEmpty,

	#[error("unrecognized variant discriminant: {0}")]
	UnrecognizedDiscriminant(u8),

	#[error("failed to convert value: {0}")]
	FailedConversion(Box<dyn Error + Send + Sync>),

	/// The bytes were readable but did not form a valid value of the type.
	#[error("invalid data for {type_name}: {reason}")]
	Invalid {
		type_name: &'static str,
		reason: String,
	},

	#[error("{0}")]
	Other(Box<dyn Error + Send + Sync>),
}

impl ReadError {
	/// Shorthand for [`ReadError::Invalid`].
	pub fn invalid(type_name: &'static str, reason: impl Into<String>) -> Self {
		Self::Invalid {
			type_name,
			reason: reason.into(),
		}
	}

	#[must_use]
	pub const fn is_buffer_empty(&self) -> bool {
		matches!(self, Self::BufferEmpty)
	}
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WriteError {
	/// A length did not fit in the integer type chosen to carry it on the
	/// wire.
	#[error("length {length} does not fit in a {prefix} length prefix")]
	LengthOverflow { length: usize, prefix: &'static str },

	/// The value cannot be serialized as the type declares.
	#[error("invalid value for {type_name}: {reason}")]
	Invalid {
		type_name: &'static str,
		reason: String,
	},

	#[error("{0}")]
	Other(Box<dyn Error + Send + Sync>),
}

impl WriteError {
	/// Shorthand for [`WriteError::Invalid`].
	pub fn invalid(type_name: &'static str, reason: impl Into<String>) -> Self {
		Self::Invalid {
			type_name,
			reason: reason.into(),
		}
	}
}

mod cip_size;
mod length;
mod readable;
mod writable;

pub use length::LengthPrefix;
pub use readable::{read_bytes, read_until_empty};

/// Returns [`ReadError::BufferEmpty`] unless `reader` has at least `count`
/// bytes remaining.
///
/// The accessors of [`Buf`] panic when the buffer runs out, so every read in
/// this crate and in CIPR goes through this check first.
pub fn ensure_remaining(reader: &impl Buf, count: usize) -> ReadResult<()> {
	if reader.remaining() < count {
		Err(ReadError::BufferEmpty)
	} else {
		Ok(())
	}
}

/// Gives the type size in bytes.
/// The size can vary depending on the quantity of data it contains
pub trait CipSize {
	/// Returns the size of `self` when serialized according to the CIP
	/// specification, measured in bytes.
	fn cip_size(&self) -> usize;
}

/// Defines the constant size in bytes of a type when serialized according to
/// the CIP specification.
///
/// [`CipSize`] must be implemented to return the same `CIP_SIZE`:
/// ```
/// # use cipkit::{CipSize, ConstantCipSize};
/// # struct MyStruct;
/// #
/// # impl ConstantCipSize for MyStruct {
/// #     const CIP_SIZE: usize = 5;
/// # }
/// #
/// impl CipSize for MyStruct {
///     fn cip_size(&self) -> usize {
///         Self::CIP_SIZE
///     }
/// }
/// ```
pub trait ConstantCipSize: CipSize {
	/// The size of this type when serialized according to the CIP
	/// specification, measured in bytes.
	const CIP_SIZE: usize;
}

/// Reads a type from bytes.
pub trait Readable: CipSize {
	/// Reads [`Self`] from a [`Buf`] of bytes.
	///
	/// # Errors
	///
	/// - [`ReadError::BufferEmpty`]: The buffer ran out before the value was
	///   complete.
	/// - [`ReadError::UnrecognizedDiscriminant`]: The value encountered is not
	///   matching any enum's variants discriminant.
	/// - [`ReadError::Invalid`]: Any other error when parsing.
	///
	/// [`Buf`]: Buf
	fn read_from(reader: &mut impl Buf) -> ReadResult<Self>
	where
		Self: Sized;
}

/// Allows the reading of a type from bytes given some additional
/// [`Context`](Self::Context).
pub trait ReadableWithContext: CipSize {
	/// The type of context with which this type can be read from bytes.
	///
	/// For example, this might be `usize` for some collection, where that
	/// `usize` context represents the length of the list with which to read.
	type Context;

	/// Reads [`Self`] from a [`Buf`] of bytes, given some additional
	/// [`Context`](Self::Context).
	///
	/// # Errors
	///
	/// Same as [`Readable::read_from`].
	///
	/// [`Buf`]: Buf
	fn read_with(reader: &mut impl Buf, context: &Self::Context) -> ReadResult<Self>
	where
		Self: Sized;
}

/// Allows a type to be written as bytes.
pub trait Writable: CipSize {
	/// Writes [`self`](Self) as bytes to a [`BufMut`].
	///
	/// # Errors
	///
	/// Returns a [`WriteError`] if it was not able to properly write to the
	/// given `writer`.
	///
	/// [`BufMut`]: BufMut
	fn write_to(&self, writer: &mut impl BufMut) -> WriteResult;

	/// Serializes [`self`](Self) to a freshly allocated byte vector.
	///
	/// # Errors
	///
	/// Same as [`Writable::write_to`].
	fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
		let mut bytes = Vec::with_capacity(self.cip_size());
		self.write_to(&mut bytes)?;

		Ok(bytes)
	}
}

// This function is unused, but writing it here asserts that these traits are
// _object safe_; that is, that the Rust compiler will generate an error if any
// of these traits are accidentally made _object unsafe_, which means that they
// cannot be used with the `dyn` keyword.
fn _assert_object_safety(
	_cip_size: &dyn CipSize,
	_readable: &dyn Readable,
	_contextual_readable: &dyn ReadableWithContext<Context = ()>,
) {
}

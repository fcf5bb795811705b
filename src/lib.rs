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

//! # CIPR
//! CIPR is a Rust library implementing the types and messages of the Common
//! Industrial Protocol (CIP) and its EtherNet/IP encapsulation, together with
//! a synchronous client connection for explicit messaging with industrial
//! controllers such as Allen-Bradley ControlLogix/CompactLogix PLCs.
//!
//! The library is layered the way the protocol is: [`types`] holds the CIP
//! elementary data types, [`epath`] the path segment codec, [`enip`] the
//! EtherNet/IP encapsulation (framing, Common Packet Format, TCP transport
//! and session), and [`cip`] the Message Router layer, the CIP object
//! library, and the connection state machine. (De)serialization is built on
//! the traits of the accompanying `cipkit` crate.

/// The EtherNet/IP encapsulation protocol version spoken by CIPR.
///
/// Version 1 is the only revision the specification has ever defined; the
/// RegisterSession exchange still carries it so a server can reject a
/// revision it does not support.
pub const PROTOCOL_VERSION: u16 = 1;

pub mod cip;
pub mod enip;
pub mod epath;
mod error;
pub mod types;

pub use cipkit::{ReadError, WriteError};
pub use error::{ConnectionError, Error, RequestError, ResponseError};

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routes: the chain of port hops between the client and the target.

use std::fmt;
use std::ops::Div;
use std::str::FromStr;

use derive_more::{Deref, From};

use crate::epath::{Epath, PortSegment, Segment};
use crate::error::RequestError;

/// A CIP route: the port segments to traverse, in order, to reach the
/// target device. An empty route addresses the device at the other end of
/// the TCP connection itself.
///
/// Routes parse from the `/`-separated notation of port/link pairs, e.g.
/// `"1/0"` for slot 0 of the local backplane or
/// `"enet/10.0.0.2/bp/1"` for a bridged hop; `,` and `\` separate too.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Deref, From)]
pub struct CipRoute {
	segments: Vec<PortSegment>,
}

impl CipRoute {
	#[must_use]
	pub fn new(segments: Vec<PortSegment>) -> Self {
		Self { segments }
	}

	/// The route as an [`Epath`], ready to emit in whichever layout the
	/// containing message calls for.
	#[must_use]
	pub fn epath(&self) -> Epath {
		self.segments
			.iter()
			.cloned()
			.map(Segment::Port)
			.collect()
	}
}

impl FromStr for CipRoute {
	type Err = RequestError;

	fn from_str(route: &str) -> Result<Self, Self::Err> {
		let normalized = route.replace(',', "/").replace('\\', "/");
		let parts: Vec<&str> = normalized
			.split('/')
			.map(str::trim)
			.filter(|part| !part.is_empty())
			.collect();

		if parts.len() % 2 != 0 {
			return Err(RequestError::UnpairedRoute(
				parts.into_iter().map(str::to_owned).collect(),
			));
		}

		let segments = parts
			.chunks_exact(2)
			.map(|pair| {
				PortSegment::new(pair[0], pair[1]).map_err(|error| RequestError::InvalidRoute {
					segment: format!("{}/{}", pair[0], pair[1]),
					reason: error.to_string(),
				})
			})
			.collect::<Result<_, _>>()?;

		Ok(Self { segments })
	}
}

impl Div<PortSegment> for CipRoute {
	type Output = Self;

	fn div(mut self, segment: PortSegment) -> Self {
		self.segments.push(segment);

		self
	}
}

impl Div<Self> for CipRoute {
	type Output = Self;

	fn div(mut self, other: Self) -> Self {
		self.segments.extend(other.segments);

		self
	}
}

impl fmt::Display for CipRoute {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (index, segment) in self.segments.iter().enumerate() {
			if index > 0 {
				write!(f, "/")?;
			}

			write!(f, "{}/", segment.port())?;

			let link = segment.link();
			if link.iter().all(|byte| byte.is_ascii_graphic()) && link.len() > 1 {
				for &byte in link {
					write!(f, "{}", char::from(byte))?;
				}
			} else if link.len() == 1 {
				write!(f, "{}", link[0])?;
			} else {
				for (position, byte) in link.iter().enumerate() {
					if position > 0 {
						write!(f, ":")?;
					}
					write!(f, "{byte:02x}")?;
				}
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_parse_numeric_route() {
		let route: CipRoute = "1/0".parse().unwrap();

		assert_eq!(
			route,
			CipRoute::new(vec![PortSegment::new(1_u16, 0_u32).unwrap()])
		);
		assert_eq!(route.to_string(), "1/0");
	}

	#[test]
	fn test_parse_bridged_route() {
		let route: CipRoute = "enet/10.0.0.2/bp/1".parse().unwrap();

		assert_eq!(
			route,
			CipRoute::new(vec![
				PortSegment::new(2_u16, "10.0.0.2").unwrap(),
				PortSegment::new(1_u16, 1_u32).unwrap(),
			])
		);
		assert_eq!(route.to_string(), "2/10.0.0.2/1/1");
	}

	#[test]
	fn test_separators() {
		let slashes: CipRoute = "1/0".parse().unwrap();
		let commas: CipRoute = "1,0".parse().unwrap();
		let backslashes: CipRoute = r"1\0".parse().unwrap();

		assert_eq!(slashes, commas);
		assert_eq!(slashes, backslashes);
	}

	#[test]
	fn test_odd_route_rejected() {
		assert!(matches!(
			"1/0/2".parse::<CipRoute>(),
			Err(RequestError::UnpairedRoute(_))
		));
	}

	#[test]
	fn test_bad_segment_rejected() {
		assert!(matches!(
			"frontplane/0".parse::<CipRoute>(),
			Err(RequestError::InvalidRoute { .. })
		));
	}

	#[test]
	fn test_epath_conversion() {
		let route: CipRoute = "1/0".parse().unwrap();
		let path = route.epath();

		assert_eq!(path.len(), 1);
		assert!(matches!(path.segments[0], Segment::Port(_)));
	}
}

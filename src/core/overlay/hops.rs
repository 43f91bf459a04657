use std::{fmt, slice, str::FromStr};

use super::NodeId;
use crate::{Error, Result};

/// Marker suffix recording a downstream failure in the trace.
const FAIL_MARKER: char = '!';

/// One entry of a query trace. A failed entry names a downstream node the
/// query was addressed to but which never contributed rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hop {
	pub node: NodeId,
	pub failed: bool,
}

impl fmt::Display for Hop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.failed {
			write!(f, "{}{FAIL_MARKER}", self.node)
		} else {
			write!(f, "{}", self.node)
		}
	}
}

impl FromStr for Hop {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let (node, failed) = match s.strip_suffix(FAIL_MARKER) {
			| Some(stripped) => (stripped, true),
			| None => (s, false),
		};

		Ok(Self { node: node.parse()?, failed })
	}
}

/// Ordered append-only trace of the nodes that have accepted a query. Doubles
/// as the loop guard: a node whose id is already present must not accept the
/// query again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hops(Vec<Hop>);

impl Hops {
	#[must_use]
	pub fn new() -> Self { Self::default() }

	/// Parse the wire representation (`["A", "B", "F!"]`).
	pub fn parse(entries: &[String]) -> Result<Self> {
		entries
			.iter()
			.map(|entry| entry.parse())
			.collect::<Result<Vec<_>>>()
			.map(Self)
	}

	/// Membership is by node, regardless of the failure marker.
	#[must_use]
	pub fn contains(&self, node: NodeId) -> bool { self.0.iter().any(|hop| hop.node == node) }

	pub fn push(&mut self, node: NodeId) { self.0.push(Hop { node, failed: false }); }

	/// Record a downstream node that was addressed but failed to contribute.
	pub fn push_failed(&mut self, node: NodeId) {
		if !self.contains(node) {
			self.0.push(Hop { node, failed: true });
		}
	}

	/// Append every entry of a downstream trace not already present,
	/// preserving the downstream order.
	pub fn extend_from(&mut self, other: &Self) {
		for hop in &other.0 {
			if !self.contains(hop.node) {
				self.0.push(*hop);
			}
		}
	}

	#[must_use]
	pub fn to_wire(&self) -> Vec<String> { self.0.iter().map(Hop::to_string).collect() }

	#[must_use]
	pub fn len(&self) -> usize { self.0.len() }

	#[must_use]
	pub fn is_empty(&self) -> bool { self.0.is_empty() }

	/// The most recent hop, i.e. the sender of a forwarded query.
	#[must_use]
	pub fn last(&self) -> Option<&Hop> { self.0.last() }

	pub fn iter(&self) -> slice::Iter<'_, Hop> { self.0.iter() }
}

impl<'a> IntoIterator for &'a Hops {
	type IntoIter = slice::Iter<'a, Hop>;
	type Item = &'a Hop;

	fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

mod hops;
mod tests;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

pub use self::hops::{Hop, Hops};
use crate::{Error, Result};

/// Single-letter overlay process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(char);

impl NodeId {
	#[must_use]
	pub fn as_char(self) -> char { self.0 }
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl fmt::Debug for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for NodeId {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let mut chars = s.chars();
		match (chars.next(), chars.next()) {
			| (Some(c), None) if c.is_ascii_uppercase() => Ok(Self(c)),
			| _ => Err(Error::Err(format!("invalid node id {s:?}").into())),
		}
	}
}

impl Serialize for NodeId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for NodeId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(de::Error::custom)
	}
}

/// Overlay team; each team jointly owns a disjoint date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
	Green,
	Pink,
}

impl Team {
	#[must_use]
	pub fn other(self) -> Self {
		match self {
			| Self::Green => Self::Pink,
			| Self::Pink => Self::Green,
		}
	}

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			| Self::Green => "green",
			| Self::Pink => "pink",
		}
	}
}

impl fmt::Display for Team {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

/// Position in the overlay hierarchy. Forwarding only ever goes to a strictly
/// lower role within the same team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Leader,
	TeamLeader,
	Worker,
}

impl Role {
	#[must_use]
	pub fn rank(self) -> u8 {
		match self {
			| Self::Worker => 0,
			| Self::TeamLeader => 1,
			| Self::Leader => 2,
		}
	}

	/// Whether `other` is strictly below this role in the hierarchy.
	#[must_use]
	pub fn outranks(self, other: Self) -> bool { self.rank() > other.rank() }

	/// Workers own a shard; routers may not.
	#[must_use]
	pub fn owns_data(self) -> bool { matches!(self, Self::Worker) }

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			| Self::Leader => "leader",
			| Self::TeamLeader => "team_leader",
			| Self::Worker => "worker",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

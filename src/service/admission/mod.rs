mod tests;

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU32, Ordering},
};

use queryfan_core::{Error, Result, Server, Team, config::Fairness};
use tracing::trace;

/// Above this system load the hybrid strategy stops granting weighted slack.
const HYBRID_STRICT_LOAD: f64 = 0.8;

/// Gates inbound query work by global and per-team concurrency budgets.
/// Admission never blocks: a query is either granted a token or rejected
/// with `CAPACITY_EXHAUSTED`.
pub struct Admission {
	fairness: Fairness,
	max_total: u32,
	max_team: [u32; 2],
	active_total: AtomicU32,
	active_team: [AtomicU32; 2],
}

/// Point-in-time view of the admission counters.
#[derive(Clone, Copy, Debug)]
pub struct Ledger {
	pub active_total: u32,
	pub active_per_team: [u32; 2],
	pub max_total: u32,
	pub max_per_team: [u32; 2],
}

impl Ledger {
	#[must_use]
	pub fn system_load(&self) -> f64 {
		if self.max_total == 0 {
			return 1.0;
		}

		f64::from(self.active_total) / f64::from(self.max_total)
	}

	#[must_use]
	pub fn active_for(&self, team: Team) -> u32 { self.active_per_team[idx(team)] }
}

/// Reserved concurrency slot. Dropping the token releases the slot, so every
/// exit path of a query, including cancellation and panic unwind, pairs the
/// admit with exactly one release.
pub struct Token<'a> {
	admission: &'a Admission,
	team: Team,
	released: AtomicBool,
}

impl Token<'_> {
	#[must_use]
	pub fn team(&self) -> Team { self.team }

	/// Idempotent; the first call wins, `Drop` covers the rest.
	pub fn release(&self) {
		if !self.released.swap(true, Ordering::AcqRel) {
			self.admission.release(self.team);
		}
	}
}

impl Drop for Token<'_> {
	fn drop(&mut self) { self.release(); }
}

const fn idx(team: Team) -> usize {
	match team {
		| Team::Green => 0,
		| Team::Pink => 1,
	}
}

impl Admission {
	pub(crate) fn build(server: &Arc<Server>) -> Arc<Self> {
		let limits = &server.config.limits;

		Arc::new(Self::new(
			server.config.strategies.fairness,
			limits.max_total,
			server.config.team_budget(Team::Green),
			server.config.team_budget(Team::Pink),
		))
	}

	#[must_use]
	pub fn new(fairness: Fairness, max_total: u32, max_green: u32, max_pink: u32) -> Self {
		Self {
			fairness,
			max_total,
			max_team: [max_green, max_pink],
			active_total: AtomicU32::new(0),
			active_team: [AtomicU32::new(0), AtomicU32::new(0)],
		}
	}

	/// Reserve a slot for the given team. The team counter is reserved
	/// first and rolled back if the total budget is already spent, so
	/// neither counter ever exceeds its bound.
	pub fn admit(&self, team: Team) -> Result<Token<'_>> {
		let cap = self.team_cap(team);
		if !try_reserve(&self.active_team[idx(team)], cap) {
			trace!(%team, cap, "admission rejected by team budget");
			return Err(Error::CapacityExhausted(team));
		}

		if !try_reserve(&self.active_total, self.max_total) {
			self.release_team(team);
			trace!(%team, "admission rejected by total budget");
			return Err(Error::CapacityExhausted(team));
		}

		Ok(Token {
			admission: self,
			team,
			released: AtomicBool::new(false),
		})
	}

	#[must_use]
	pub fn snapshot(&self) -> Ledger {
		Ledger {
			active_total: self.active_total.load(Ordering::Acquire),
			active_per_team: [
				self.active_team[0].load(Ordering::Acquire),
				self.active_team[1].load(Ordering::Acquire),
			],
			max_total: self.max_total,
			max_per_team: self.max_team,
		}
	}

	fn team_cap(&self, team: Team) -> u32 {
		match self.fairness {
			| Fairness::Strict => self.max_team[idx(team)],
			| Fairness::Weighted => self.weighted_cap(team),
			| Fairness::Hybrid =>
				if self.snapshot().system_load() > HYBRID_STRICT_LOAD {
					self.max_team[idx(team)]
				} else {
					self.weighted_cap(team)
				},
		}
	}

	/// An idle opposing team donates up to its own share of headroom:
	/// `max · (1 + slack)` with `slack = max(0, 1 − other_team_load)`.
	fn weighted_cap(&self, team: Team) -> u32 {
		let other = team.other();
		let other_max = self.max_team[idx(other)];
		let other_load = if other_max == 0 {
			1.0
		} else {
			f64::from(self.active_team[idx(other)].load(Ordering::Acquire)) / f64::from(other_max)
		};

		let slack = (1.0 - other_load).max(0.0);

		(f64::from(self.max_team[idx(team)]) * (1.0 + slack)).floor() as u32
	}

	fn release(&self, team: Team) {
		self.release_team(team);
		release_one(&self.active_total);
	}

	fn release_team(&self, team: Team) { release_one(&self.active_team[idx(team)]); }
}

fn try_reserve(counter: &AtomicU32, cap: u32) -> bool {
	counter
		.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
			(current < cap).then_some(current + 1)
		})
		.is_ok()
}

fn release_one(counter: &AtomicU32) {
	counter
		.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| current.checked_sub(1))
		.expect("admission counter released below zero");
}

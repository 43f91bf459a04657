#![cfg(test)]

use std::sync::Arc;

use queryfan_core::{Team, config::Fairness};

use super::Admission;

fn admission(fairness: Fairness, max_total: u32, per_team: u32) -> Arc<Admission> {
	Arc::new(Admission::new(fairness, max_total, per_team, per_team))
}

#[test]
fn strict_enforces_team_budget() {
	let admission = admission(Fairness::Strict, 8, 2);

	let _a = admission.admit(Team::Green).expect("first slot");
	let _b = admission.admit(Team::Green).expect("second slot");
	assert!(admission.admit(Team::Green).is_err());

	// The other team is unaffected.
	assert!(admission.admit(Team::Pink).is_ok());
}

#[test]
fn strict_enforces_total_budget() {
	let admission = admission(Fairness::Strict, 3, 4);

	let _held: Vec<_> = (0..3)
		.map(|i| {
			let team = if i % 2 == 0 { Team::Green } else { Team::Pink };
			admission.admit(team).expect("slot within total budget")
		})
		.collect();

	let rejected = admission.admit(Team::Green);
	assert!(rejected.is_err());

	// A rejected admit must leave the counters untouched.
	assert_eq!(admission.snapshot().active_total, 3);
	assert_eq!(admission.snapshot().active_for(Team::Green), 2);
}

#[test]
fn weighted_borrows_idle_capacity() {
	let admission = admission(Fairness::Weighted, 16, 2);

	// Pink idle: slack = 1, so green may run up to 2 * max_per_team.
	let _held: Vec<_> = (0..4)
		.map(|_| admission.admit(Team::Green).expect("weighted slot"))
		.collect();

	assert!(admission.admit(Team::Green).is_err());
}

#[test]
fn weighted_yields_no_slack_under_contention() {
	let admission = admission(Fairness::Weighted, 16, 2);

	let _pink: Vec<_> = (0..2)
		.map(|_| admission.admit(Team::Pink).expect("pink slot"))
		.collect();

	// Pink fully loaded: slack = 0, green is held to its own budget.
	let _green: Vec<_> = (0..2)
		.map(|_| admission.admit(Team::Green).expect("green slot"))
		.collect();

	assert!(admission.admit(Team::Green).is_err());
}

#[test]
fn hybrid_turns_strict_under_load() {
	let admission = admission(Fairness::Hybrid, 10, 4);

	// Below the load threshold hybrid behaves like weighted and lets green
	// borrow from idle pink.
	let mut held: Vec<_> = (0..6)
		.map(|_| admission.admit(Team::Green).expect("weighted slot"))
		.collect();

	// 6/10 admitted; push past 0.8 with pink, then green is capped at its
	// strict budget (already exceeded), so the next admit fails.
	held.push(admission.admit(Team::Pink).expect("pink slot"));
	held.push(admission.admit(Team::Pink).expect("pink slot"));
	held.push(admission.admit(Team::Pink).expect("pink slot"));

	assert!(admission.snapshot().system_load() > 0.8);
	assert!(admission.admit(Team::Green).is_err());
}

#[test]
fn release_is_idempotent() {
	let admission = admission(Fairness::Strict, 4, 4);

	let token = admission.admit(Team::Green).expect("slot");
	token.release();
	token.release();
	drop(token);

	let ledger = admission.snapshot();
	assert_eq!(ledger.active_total, 0);
	assert_eq!(ledger.active_for(Team::Green), 0);
}

#[test]
fn drop_releases_the_slot() {
	let admission = admission(Fairness::Strict, 1, 1);

	{
		let _token = admission.admit(Team::Green).expect("slot");
		assert!(admission.admit(Team::Green).is_err());
	}

	let token = admission.admit(Team::Green).expect("slot free again after drop");
	assert_eq!(admission.snapshot().active_total, 1);
	drop(token);
}

#[test]
fn counters_settle_under_concurrent_churn() {
	let admission = admission(Fairness::Strict, 8, 4);

	let handles: Vec<_> = (0..8)
		.map(|i| {
			let admission = admission.clone();
			let team = if i % 2 == 0 { Team::Green } else { Team::Pink };
			std::thread::spawn(move || {
				for _ in 0..1000 {
					if let Ok(token) = admission.admit(team) {
						let ledger = admission.admission_bounds_hold();
						assert!(ledger, "counters exceeded configured maxima");
						token.release();
					}
				}
			})
		})
		.collect();

	for handle in handles {
		handle.join().expect("admission churn thread");
	}

	let ledger = admission.snapshot();
	assert_eq!(ledger.active_total, 0);
	assert_eq!(ledger.active_for(Team::Green), 0);
	assert_eq!(ledger.active_for(Team::Pink), 0);
}

impl Admission {
	/// Test helper: verify no counter exceeds its configured maximum.
	fn admission_bounds_hold(&self) -> bool {
		let ledger = self.snapshot();

		ledger.active_total <= ledger.max_total
			&& ledger.active_for(Team::Green) <= ledger.max_per_team[0]
			&& ledger.active_for(Team::Pink) <= ledger.max_per_team[1]
	}
}

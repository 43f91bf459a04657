#![cfg(test)]

use super::{Hops, NodeId, Role, Team};

fn node(c: char) -> NodeId { c.to_string().parse().expect("valid node id") }

#[test]
fn node_id_rejects_garbage() {
	assert!("AB".parse::<NodeId>().is_err());
	assert!("a".parse::<NodeId>().is_err());
	assert!("".parse::<NodeId>().is_err());
	assert!("7".parse::<NodeId>().is_err());
}

#[test]
fn role_ordering() {
	assert!(Role::Leader.outranks(Role::TeamLeader));
	assert!(Role::TeamLeader.outranks(Role::Worker));
	assert!(!Role::Worker.outranks(Role::Worker));
	assert!(!Role::Worker.outranks(Role::Leader));
}

#[test]
fn team_other() {
	assert_eq!(Team::Green.other(), Team::Pink);
	assert_eq!(Team::Pink.other(), Team::Green);
}

#[test]
fn hops_round_trip_with_marker() {
	let wire = vec!["A".to_owned(), "E".to_owned(), "F!".to_owned()];
	let hops = Hops::parse(&wire).expect("parse() failed");

	assert!(hops.contains(node('F')), "failed entries still count for the loop guard");
	assert_eq!(hops.to_wire(), wire);
}

#[test]
fn hops_extend_deduplicates() {
	let mut parent = Hops::parse(&["A".to_owned(), "B".to_owned()]).unwrap();
	let child = Hops::parse(&["A".to_owned(), "B".to_owned(), "C".to_owned()]).unwrap();

	parent.extend_from(&child);
	assert_eq!(parent.to_wire(), vec!["A", "B", "C"]);
}

#[test]
fn hops_failure_marker_is_idempotent() {
	let mut hops = Hops::new();
	hops.push(node('E'));
	hops.push_failed(node('F'));
	hops.push_failed(node('F'));

	assert_eq!(hops.to_wire(), vec!["E", "F!"]);
}

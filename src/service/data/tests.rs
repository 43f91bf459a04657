#![cfg(test)]

use queryfan_core::proto::{Comparator, Row};
use serde_json::json;

use super::Data;

fn row(pm25: f64, station: &str) -> Row {
	let mut row = Row::new();
	row.insert("PM2.5".to_owned(), json!(pm25));
	row.insert("station".to_owned(), json!(station));
	row
}

fn shard() -> Data {
	Data::from_rows(vec![
		row(10.0, "S-1"),
		row(42.0, "S-2"),
		row(35.0, "S-3"),
		row(80.5, "S-4"),
		row(36.1, "S-5"),
	])
}

#[test]
fn scan_returns_matches_in_load_order() {
	let data = shard();
	let rows = data.scan("PM2.5", Comparator::Greater, 35.0, 10);

	let stations: Vec<_> = rows
		.iter()
		.map(|row| row["station"].as_str().unwrap().to_owned())
		.collect();

	assert_eq!(stations, vec!["S-2", "S-4", "S-5"]);
}

#[test]
fn scan_honors_limit() {
	let data = shard();

	assert_eq!(data.scan("PM2.5", Comparator::Greater, 0.0, 2).len(), 2);
	assert_eq!(data.scan("PM2.5", Comparator::Greater, 0.0, 1).len(), 1);
	assert!(data.scan("PM2.5", Comparator::Greater, 0.0, 0).is_empty());
}

#[test]
fn scan_limit_beyond_shard_returns_everything() {
	let data = shard();

	assert_eq!(data.scan("PM2.5", Comparator::GreaterEq, 0.0, 100).len(), data.len());
}

#[test]
fn scan_with_no_matches_is_empty() {
	let data = shard();

	assert!(data.scan("PM2.5", Comparator::Greater, 1000.0, 5).is_empty());
}

#[test]
fn scan_skips_rows_without_the_field() {
	let mut extra = Row::new();
	extra.insert("humidity".to_owned(), json!(55.0));

	let data = Data::from_rows(vec![row(50.0, "S-1"), extra]);

	assert_eq!(data.scan("PM2.5", Comparator::Greater, 0.0, 10).len(), 1);
}

#[test]
fn scan_skips_non_numeric_cells() {
	let mut bad = Row::new();
	bad.insert("PM2.5".to_owned(), json!("n/a"));

	let data = Data::from_rows(vec![bad, row(50.0, "S-1")]);

	assert_eq!(data.scan("PM2.5", Comparator::Greater, 0.0, 10).len(), 1);
}

#[test]
fn comparator_boundaries() {
	let data = shard();

	// A row valued exactly at the threshold.
	assert_eq!(data.scan("PM2.5", Comparator::Equal, 35.0, 10).len(), 1);
	assert_eq!(data.scan("PM2.5", Comparator::GreaterEq, 35.0, 10).len(), 4);
	assert_eq!(data.scan("PM2.5", Comparator::Less, 35.0, 10).len(), 1);
	assert_eq!(data.scan("PM2.5", Comparator::LessEq, 35.0, 10).len(), 2);
}

#[test]
fn empty_shard_never_matches() {
	let data = Data::empty();

	assert!(!data.owns_shard());
	assert!(data.scan("PM2.5", Comparator::Greater, 0.0, 10).is_empty());
}

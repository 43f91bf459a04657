#![cfg(test)]

use std::sync::Arc;

use super::{Comparator, Status, decode_rows, encode_rows};

#[test]
fn comparator_wire_spelling() {
	let json = serde_json::to_string(&Comparator::GreaterEq).unwrap();
	assert_eq!(json, "\">=\"");

	let parsed: Comparator = serde_json::from_str("\"<\"").unwrap();
	assert_eq!(parsed, Comparator::Less);
}

#[test]
fn comparator_semantics() {
	assert!(Comparator::Less.matches(1.0, 2.0));
	assert!(!Comparator::Less.matches(2.0, 2.0));
	assert!(Comparator::LessEq.matches(2.0, 2.0));
	assert!(Comparator::Equal.matches(35.0, 35.0));
	assert!(Comparator::GreaterEq.matches(35.0, 35.0));
	assert!(Comparator::Greater.matches(35.1, 35.0));
	assert!(!Comparator::Greater.matches(35.0, 35.0));
}

#[test]
fn status_wire_spelling() {
	let json = serde_json::to_string(&Status::CapacityExhausted).unwrap();
	assert_eq!(json, "\"CAPACITY_EXHAUSTED\"");

	let parsed: Status = serde_json::from_str("\"LOOP_SUPPRESSED\"").unwrap();
	assert_eq!(parsed, Status::LoopSuppressed);
}

#[test]
fn row_batch_round_trip() {
	let mut row = super::Row::new();
	row.insert("PM2.5".to_owned(), serde_json::json!(42.5));
	row.insert("station".to_owned(), serde_json::json!("S-12"));

	let batch = vec![Arc::new(row.clone()), Arc::new(row.clone())];
	let encoded = encode_rows(&batch).expect("encode failed");
	let decoded = decode_rows(&encoded).expect("decode failed");

	assert_eq!(decoded.len(), 2);
	assert_eq!(decoded[0], row);
}

#[test]
fn empty_row_batch_round_trip() {
	let encoded = encode_rows(&[]).expect("encode failed");
	let decoded = decode_rows(&encoded).expect("decode failed");

	assert!(decoded.is_empty());
}

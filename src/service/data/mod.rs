mod tests;

use std::{fs, path::Path, sync::Arc};

use chrono::NaiveDate;
use queryfan_core::{
	Error, Result, Server,
	proto::{Comparator, Row},
};
use serde_json::Value;
use tracing::{debug, info};

/// In-memory shard of this node. Loaded once at startup and read-only from
/// then on; pure routers hold an empty shard.
pub struct Data {
	rows: Vec<Arc<Row>>,
	files_loaded: usize,
	sharded: bool,
}

impl Data {
	pub(crate) fn build(server: &Arc<Server>) -> Result<Arc<Self>> {
		let local = server.local();
		let data = match local.bounds() {
			| Some((start, end)) => Self::load(&server.config.data_dir, start, end)?,
			| None => Self::empty(),
		};

		server.metrics.set_data_files_loaded(data.files_loaded);
		info!(
			rows = data.rows.len(),
			files = data.files_loaded,
			"shard loaded"
		);

		Ok(Arc::new(data))
	}

	#[must_use]
	pub fn empty() -> Self {
		Self {
			rows: Vec::new(),
			files_loaded: 0,
			sharded: false,
		}
	}

	/// Read every per-date CSV inside the inclusive bounds. Absent dates are
	/// skipped; rows outside the bounds cannot be loaded by construction.
	fn load(dir: &Path, start: u32, end: u32) -> Result<Self> {
		let mut rows = Vec::new();
		let mut files_loaded = 0;

		for date in date_range(start, end)? {
			let path = dir.join(format!("{}.csv", date.format("%Y%m%d")));
			if !path.exists() {
				continue;
			}

			let loaded = load_file(&path, &mut rows)?;
			files_loaded += 1;
			debug!(path = %path.display(), rows = loaded, "loaded shard file");
		}

		Ok(Self {
			rows,
			files_loaded,
			sharded: true,
		})
	}

	/// Single linear pass returning the first `limit` matches in load order.
	#[must_use]
	pub fn scan(
		&self,
		field: &str,
		comparator: Comparator,
		threshold: f64,
		limit: usize,
	) -> Vec<Arc<Row>> {
		if limit == 0 {
			return Vec::new();
		}

		self.rows
			.iter()
			.filter(|row| {
				row.get(field)
					.and_then(Value::as_f64)
					.is_some_and(|value| comparator.matches(value, threshold))
			})
			.take(limit)
			.cloned()
			.collect()
	}

	/// Whether this node owns a shard at all; scan timings are only
	/// meaningful when it does.
	#[must_use]
	pub fn owns_shard(&self) -> bool { self.sharded }

	#[must_use]
	pub fn len(&self) -> usize { self.rows.len() }

	#[must_use]
	pub fn is_empty(&self) -> bool { self.rows.is_empty() }

	#[must_use]
	pub fn files_loaded(&self) -> usize { self.files_loaded }

	#[cfg(test)]
	pub(crate) fn from_rows(rows: Vec<Row>) -> Self {
		Self {
			rows: rows.into_iter().map(Arc::new).collect(),
			files_loaded: 0,
			sharded: true,
		}
	}
}

fn date_range(start: u32, end: u32) -> Result<impl Iterator<Item = NaiveDate>> {
	let first = parse_date(start)?;
	let last = parse_date(end)?;

	Ok(first.iter_days().take_while(move |date| *date <= last))
}

fn parse_date(yyyymmdd: u32) -> Result<NaiveDate> {
	NaiveDate::parse_from_str(&yyyymmdd.to_string(), "%Y%m%d")
		.map_err(|_| Error::Err(format!("invalid shard date {yyyymmdd}").into()))
}

/// Parse one CSV file: first line names the columns, numeric cells become
/// JSON numbers so scans compare without re-parsing.
fn load_file(path: &Path, rows: &mut Vec<Arc<Row>>) -> Result<usize> {
	let text = fs::read_to_string(path)?;
	let mut lines = text.lines();
	let Some(header) = lines.next() else {
		return Ok(0);
	};

	let columns: Vec<&str> = header.split(',').map(str::trim).collect();
	let mut loaded = 0;

	for line in lines {
		if line.trim().is_empty() {
			continue;
		}

		let mut row = Row::new();
		for (column, cell) in columns.iter().zip(line.split(',')) {
			row.insert((*column).to_owned(), parse_cell(cell.trim()));
		}

		rows.push(Arc::new(row));
		loaded += 1;
	}

	Ok(loaded)
}

fn parse_cell(cell: &str) -> Value {
	cell.parse::<f64>()
		.ok()
		.and_then(serde_json::Number::from_f64)
		.map_or_else(|| Value::String(cell.to_owned()), Value::Number)
}

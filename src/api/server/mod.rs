mod chunk;
mod metrics;
mod query;

pub(crate) use self::{chunk::chunk, metrics::metrics, query::query};

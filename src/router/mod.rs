mod layers;
mod run;
mod serve;

pub use run::{run, start, stop};

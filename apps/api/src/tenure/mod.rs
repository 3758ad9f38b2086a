// Experience tenure: how long the candidate has worked, split into general and
// specific experience. Pure computation over the current entry list; re-derived
// on every view, never stored.

pub mod calculator;
pub mod dates;
pub mod handlers;

pub use calculator::{compute_tenure, compute_tenure_now, EntryTenure, Exclusion, Tenure, TenureReport};

//! Search request parameters and the raw page returned by the search endpoint.

pub mod filter;
pub mod page;

pub use filter::*;
pub use page::*;

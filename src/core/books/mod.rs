//! Books list: filters, debounced search, query derivation and the fetch
//! controller that keeps the visible page in step with them.

pub mod controller;
pub mod debounce;
pub mod filter;
pub mod query;
pub mod sort;

pub use controller::{Disposition, ListController, PageInfo, RequestToken, SaveState};
pub use debounce::Debouncer;
pub use filter::{Availability, FilterField, FilterState};
pub use query::BookQuery;
pub use sort::{SortDirection, SortField, SortState};

/// Book Inventory - catalog browser (TUI Edition)
///
/// Core library providing the filterable, sortable, paginated book list
/// controller and the HTTP client for the remote catalog API.

pub mod config;
pub mod core;
pub mod tui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

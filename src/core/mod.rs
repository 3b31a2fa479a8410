pub mod logging;

// List-view query pipeline: filters, debounced search, query derivation,
// fetch reconciliation, client-side sort
pub mod books;

// Remote catalog HTTP API
pub mod catalog;

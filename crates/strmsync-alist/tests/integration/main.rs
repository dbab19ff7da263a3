//! Integration tests for strmsync-alist
//!
//! Uses wiremock to simulate an Alist server and verifies end-to-end
//! behavior of the AlistClient and the AlistProvider ports.

mod common;

mod test_file_url;
mod test_listing;
mod test_ping;

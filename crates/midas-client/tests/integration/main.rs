//! Integration tests for midas-client
//!
//! Uses wiremock to simulate a Midas Server and verifies end-to-end behavior
//! of the MidasCommunicator: login flows, error classification, uploads and
//! downloads.

mod common;

mod test_errors;
mod test_login;
mod test_upload;

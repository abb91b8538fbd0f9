//! HTTP API tests

mod rooms_tests;
mod ws_tests;

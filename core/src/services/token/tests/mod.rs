//! Unit tests for the token security services

mod concurrency_tests;
mod store_tests;

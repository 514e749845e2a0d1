//! Unit tests for authentication guards

mod lockout_tests;

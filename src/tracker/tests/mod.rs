//! Unit tests for the tracker model and adapters.

mod domain_tests;
mod memory_tracker_tests;

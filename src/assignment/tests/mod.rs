//! Unit and service tests for the assignment context.

mod claim_service_tests;
mod support;
mod takeover_tests;
mod webhook_tests;

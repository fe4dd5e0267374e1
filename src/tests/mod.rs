//! Scenario tests for the engine and the record flows

mod test_helpers;

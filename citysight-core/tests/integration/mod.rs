//! Integration test modules

mod persistence_tests;
mod session_tests;
mod simulation_tests;

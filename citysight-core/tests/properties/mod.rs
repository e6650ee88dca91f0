//! Property test modules

mod autoplay_tests;
mod clip_store_tests;
mod leader_tests;
mod pagination_tests;

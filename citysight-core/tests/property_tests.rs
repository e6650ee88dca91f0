//! Property-based tests for `CitySight` core library
//!
//! All property modules live under `tests/properties/` and share this one
//! harness binary.

// Allow common test patterns that Clippy warns about
#![allow(clippy::redundant_clone)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]

mod properties;

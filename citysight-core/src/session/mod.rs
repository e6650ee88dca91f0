//! Split-screen session
//!
//! This module ties the pagination engine, the tile controllers, the
//! shared clock and autoplay together behind one event queue.
//!
//! # Event flow
//!
//! ```text
//! SessionEvent ──► SurveillanceSession::handle ──► Vec<SessionEffect>
//!      ▲                                                 │
//!      └──── host (runtime / simulator) performs effects ◄┘
//! ```

mod event;
mod surveillance;

pub use event::{SessionEffect, SessionEvent, SessionNotice, UserCommand};
pub use surveillance::{SessionMode, SurveillanceSession, TileSnapshot};

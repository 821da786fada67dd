// src/engine/mod.rs

//! Exam question rendering and answer binding.
//!
//! Everything in here is synchronous and free of I/O. The HTTP layer owns the
//! sessions and serialises access to them.

pub mod answer_store;
pub mod countdown;
pub mod drag_drop;
pub mod error;
pub mod highlight;
pub mod lockdown;
pub mod markup;
pub mod question;
pub mod resolver;
pub mod session;
pub mod transform;

pub use error::EngineError;

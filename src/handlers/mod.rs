// src/handlers/mod.rs

pub mod content;
pub mod lockdown;
pub mod session;

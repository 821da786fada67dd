// src/models/mod.rs

pub mod session;
pub mod test_content;

//! Study assistant backend: document question answering, flashcard
//! generation and a natural-language calendar agent.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

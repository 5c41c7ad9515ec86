// src/models/mod.rs

pub mod answer;
pub mod exam;
pub mod question;
pub mod user;

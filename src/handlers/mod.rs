// src/handlers/mod.rs

pub mod answer;
pub mod auth;
pub mod exam;
pub mod question;
pub mod upload;

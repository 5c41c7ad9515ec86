// src/utils/mod.rs

pub mod blacklist;
pub mod hash;
pub mod jwt;

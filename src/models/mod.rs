// src/models/mod.rs

pub mod achievement;
pub mod attempt;
pub mod favorite;
pub mod question;
pub mod quiz;
pub mod statistics;

// src/handlers/mod.rs

pub mod attempt;
pub mod favorite;
pub mod leaderboard;
pub mod profile;
pub mod quiz;

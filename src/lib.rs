//! Lostfound - A community lost-and-found board
//!
//! This library provides the core functionality for the board: account
//! moderation, lost/found posts, comments, direct messages and
//! notifications, served over a JSON API.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

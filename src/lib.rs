//! Adminhub - content administration backend
//!
//! Dashboard modules, users, audit trail, YouTube videos, study notes,
//! blog posts and timed practice tests behind one JSON API, plus an
//! offline-first mirror client.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod offline;
pub mod practice;
pub mod services;

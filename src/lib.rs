//! Minbar - community content site and flower shop
//!
//! This library provides the core functionality behind the `minbar` server:
//! content publishing, comments, newsletter, contact form, the shop and both
//! admin panels.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;

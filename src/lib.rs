//! Authors Heaven - a community publishing platform
//!
//! This library provides the core functionality of the Authors Heaven
//! backend: accounts, profiles, articles and the social features around them.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

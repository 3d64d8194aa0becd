//! Yatube: a small social blogging service with groups, comments, a follow
//! graph and a cached global feed.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;

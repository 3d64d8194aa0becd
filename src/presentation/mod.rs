//! Rendering of HTML fragments and JSON views.

pub mod views;

//! Terminal choropleth of global whale catches, with a year timeline,
//! species filters and per-country tooltips.

pub mod aggregate;
pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod debounce;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod map;
pub mod state;
pub mod timeline;
pub mod ui;

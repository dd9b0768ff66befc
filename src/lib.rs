//! Exploratory data analysis over an e-commerce transactions CSV.
//!
//! One pass loads the file, derives `revenue`, summarizes every column and
//! renders a fixed sequence of charts into a single HTML page.

pub mod aggregate;
pub mod application;
pub mod charts;
pub mod derive;
pub mod events;
pub mod loader;
pub mod page;
pub mod render;
pub mod summary;
pub mod table;

//! Command-line front end for recoding and merging survey datasets.

pub mod cli;
pub mod commands;
pub mod io;
pub mod logging;
pub mod summary;

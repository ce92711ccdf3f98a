//! Tool-facing engine: command lines, progress extraction and error
//! classification. Everything here is pure; processes are run through
//! `ports::ProcessPort`.

pub mod classifier;
pub mod commands;
pub mod progress;

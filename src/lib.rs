#![allow(unknown_lints)]

// NOTE: every pass reads and writes the same tab-separated record format,
// so the output of any pass can be handed straight back to `RankIterator`

// LOGGING
#[macro_use] extern crate slog;
extern crate slog_term;
// SERIALIZING
#[macro_use] extern crate serde_derive;
extern crate serde_json;
extern crate csv;
// MISC
extern crate clap;
extern crate fnv;
extern crate regex;
extern crate rayon;
extern crate chrono;
extern crate thiserror;

// COMPONENTS
pub mod error;
pub mod config;
pub mod page;
pub mod rank_state;

pub use error::{RankError, Result};
pub use config::Config;
pub use page::Page;

// Each pass reads a snapshot (or the raw dump), writes a new one, and is
// done; nothing is shared between passes except the directory in between.
//
//   dump ─build─▶ out/0 ─iterate─▶ out/1 ─iterate─▶ … out/K ─group─▶ out/result
//

use chrono::{DateTime, Utc};
use slog::{Drain, Level, LevelFilter, Logger};

use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub mod shuffle;
pub mod snapshot;
pub mod build;
pub mod iterate;
pub mod driver;
pub mod group;

pub use self::build::GraphBuilder;
pub use self::iterate::{RankIterator, Emission};
pub use self::driver::{IterationDriver, Manifest, Pipeline};
pub use self::group::{RankGrouper, RankGroup};

use self::shuffle::Shuffled;
use crate::error::Result;


pub fn new_logger(verbose: bool) -> Logger {
    let level = if verbose { Level::Debug } else { Level::Info };
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = LevelFilter::new(drain, level).fuse();
    Logger::root(Mutex::new(drain).fuse(), o!())
}

/// Where pass `i` leaves its snapshot; 0 is the freshly built graph
pub fn snapshot_dir(work_dir: &Path, i: usize) -> PathBuf {
    work_dir.join(i.to_string())
}


/// A single map/shuffle/reduce step between two locations on disk
pub trait Pass {
    fn name(&self) -> &'static str;
    /// Either `output` ends up holding the complete result or it is untouched
    fn run(&self, input: &Path, output: &Path, log: &Logger) -> Result<PassReport>;
}

/// What a finished pass did; kept in the run manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub pass:         String,
    pub input:        PathBuf,
    pub output:       PathBuf,
    pub records_in:   usize,
    pub records_out:  usize,
    pub dropped:      usize,
    pub elapsed_ms:   i64,
    pub completed_at: String,
    #[serde(skip)]
    started:          Option<DateTime<Utc>>,
}

impl PassReport {
    pub fn start(pass: &str, input: &Path, output: &Path) -> Self {
        PassReport {
            pass:         pass.to_owned(),
            input:        input.to_path_buf(),
            output:       output.to_path_buf(),
            records_in:   0,
            records_out:  0,
            dropped:      0,
            elapsed_ms:   0,
            completed_at: String::new(),
            started:      Some(Utc::now()),
        }
    }

    pub fn finish<T>(mut self, shuffled: &Shuffled<T>) -> Self {
        self.records_in = shuffled.records_in;
        self.records_out = shuffled.records_out();
        self.dropped = shuffled.dropped();
        self.done()
    }

    pub fn done(mut self) -> Self {
        let now = Utc::now();
        if let Some(start) = self.started.take() {
            self.elapsed_ms = (now - start).num_milliseconds();
        }
        self.completed_at = now.to_rfc3339();
        self
    }
}

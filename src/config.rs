use clap::ArgMatches;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{RankError, Result};
use crate::rank_state;

pub const DAMPING_FACTOR: f64 = 0.85;
pub const ITERATIONS: usize = 4;
pub const PRECISION: usize = 2;
pub const PARTITIONS: usize = 4;

// `format!("{:.*}")` stops meaning anything past what an f64 can hold
const MAX_PRECISION: usize = 15;


/// Knobs shared by every pass; passed into each pass at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub damping:    f64,
    pub iterations: usize,
    pub precision:  usize,
    pub partitions: usize,
    pub threads:    usize,     // 0 lets rayon pick one per core
    pub work_dir:   PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            damping:    DAMPING_FACTOR,
            iterations: ITERATIONS,
            precision:  PRECISION,
            partitions: PARTITIONS,
            threads:    0,
            work_dir:   PathBuf::from("out"),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| RankError::io(e, path))?;
        let config: Config = serde_json::from_reader(BufReader::new(f))?;
        config.validate()
    }

    /// Start from `--config` (or the defaults) and let explicit flags win
    pub fn from_args(args: &ArgMatches) -> Result<Self> {
        let mut config = match args.value_of("config") {
            Some(p) => Config::from_file(Path::new(p))?,
            None => Config::default(),
        };
        if let Some(v) = parse_arg(args, "damping")? {
            config.damping = v;
        }
        if let Some(v) = parse_arg(args, "iterations")? {
            config.iterations = v;
        }
        if let Some(v) = parse_arg(args, "precision")? {
            config.precision = v;
        }
        if let Some(v) = parse_arg(args, "partitions")? {
            config.partitions = v;
        }
        if let Some(v) = parse_arg(args, "threads")? {
            config.threads = v;
        }
        if let Some(dir) = args.value_of("work_dir") {
            config.work_dir = PathBuf::from(dir);
        }
        config.validate()
    }

    pub fn validate(self) -> Result<Self> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(RankError::InvalidConfig(
                    format!("damping must be within [0, 1], got {}", self.damping)));
        }
        if self.precision > MAX_PRECISION {
            return Err(RankError::InvalidConfig(
                    format!("precision must be at most {}, got {}", MAX_PRECISION, self.precision)));
        }
        if self.partitions == 0 {
            return Err(RankError::InvalidConfig(String::from("partitions must be at least 1")));
        }
        Ok(self)
    }

    /// Location of the snapshot produced by pass `i` (0 is the built graph)
    pub fn snapshot_dir(&self, i: usize) -> PathBuf {
        rank_state::snapshot_dir(&self.work_dir, i)
    }

    pub fn result_dir(&self) -> PathBuf {
        self.work_dir.join("result")
    }
}

fn parse_arg<T: FromStr>(args: &ArgMatches, name: &str) -> Result<Option<T>> {
    match args.value_of(name) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            RankError::InvalidConfig(format!("could not parse --{} `{}`", name, s))
        }),
    }
}

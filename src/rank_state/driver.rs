use slog::Logger;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{snapshot_dir, Pass, PassReport};
use super::build::GraphBuilder;
use super::iterate::RankIterator;
use super::group::RankGrouper;
use super::snapshot::part_name;
use crate::config::Config;
use crate::error::{RankError, Result};
use crate::page::Page;

pub const MANIFEST_NAME: &str = "manifest.json";


/// Runs the same `RankIterator` a fixed number of times
/// There is deliberately no convergence check: `iterations` passes, always.
pub struct IterationDriver {
    iterator:   RankIterator,
    iterations: usize,
    work_dir:   PathBuf,
}

impl IterationDriver {
    pub fn new(iterator: RankIterator, iterations: usize, work_dir: PathBuf) -> Self {
        IterationDriver { iterator, iterations, work_dir }
    }

    pub fn from_config(config: &Config) -> Self {
        IterationDriver::new(RankIterator::from_config(config),
                             config.iterations,
                             config.work_dir.clone())
    }

    /// Same chain of passes without touching the disk
    pub fn run_in_memory(&self, mut snapshot: Vec<Vec<Page>>) -> Result<Vec<Vec<Page>>> {
        for _ in 0..self.iterations {
            snapshot = self.iterator.iterate(snapshot)?.partitions;
        }
        Ok(snapshot)
    }

    /// Chain the passes through `work_dir/1 ..= work_dir/K`, starting from
    /// `first`; returns the location of the last snapshot
    pub fn run(&self, first: &Path, manifest: &mut Manifest, log: &Logger) -> Result<PathBuf> {
        let mut input = first.to_path_buf();
        for i in 1..=self.iterations {
            let output = snapshot_dir(&self.work_dir, i);
            let pass_log = log.new(o!("pass" => format!("{}/{}", i, self.iterations)));
            // pass i+1 never starts before pass i has been renamed into place
            let report = self.iterator.run(&input, &output, &pass_log)?;
            debug!(pass_log, "Pass finished in {}ms", report.elapsed_ms);
            manifest.record(report)?;
            input = output;
        }
        Ok(input)
    }
}


/// Record of a run, rewritten after every pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub config: Config,
    pub passes: Vec<PassReport>,
    #[serde(skip)]
    path: PathBuf,
}

impl Manifest {
    pub fn new(config: &Config) -> Self {
        Manifest {
            config: config.clone(),
            passes: vec![],
            path:   config.work_dir.join(MANIFEST_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, report: PassReport) -> Result<()> {
        self.passes.push(report);
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let f = File::create(&self.path).map_err(|e| RankError::io(e, &self.path))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush().map_err(|e| RankError::io(e, &self.path))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| RankError::io(e, path))?;
        let mut m: Manifest = serde_json::from_reader(BufReader::new(f))?;
        m.path = path.to_path_buf();
        Ok(m)
    }
}


/// Build, iterate, group
pub struct Pipeline {
    config: Config,
    log:    Logger,
}

impl Pipeline {
    pub fn new(config: Config, log: Logger) -> Self {
        Pipeline { config, log }
    }

    /// Returns the path of the final `rank \t title` file
    pub fn run(&self, documents: &Path) -> Result<PathBuf> {
        let work_dir = &self.config.work_dir;
        fs::create_dir_all(work_dir).map_err(|e| RankError::io(e, work_dir))?;
        let mut manifest = Manifest::new(&self.config);
        info!(self.log, "Starting run";
              "damping" => self.config.damping,
              "iterations" => self.config.iterations,
              "partitions" => self.config.partitions);

        let graph = self.config.snapshot_dir(0);
        let build_log = self.log.new(o!("pass" => "build",
                                        "input" => format!("{}", documents.display())));
        let report = GraphBuilder::from_config(&self.config)?
            .run(documents, &graph, &build_log)?;
        info!(build_log, "Built graph of {} pages", report.records_out);
        manifest.record(report)?;

        let last = IterationDriver::from_config(&self.config)
            .run(&graph, &mut manifest, &self.log)?;

        let result = self.config.result_dir();
        let group_log = self.log.new(o!("pass" => "group"));
        manifest.record(RankGrouper::from_config(&self.config).run(&last, &result, &group_log)?)?;
        info!(self.log, "Finished"; "manifest" => format!("{}", manifest.path().display()));

        Ok(result.join(part_name(0)))
    }
}

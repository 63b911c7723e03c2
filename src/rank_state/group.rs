//! Final pass: bucket pages by their rounded rank
//!
//! Writes `rank \t title` lines, highest rank first, for whatever sorts or
//! plots them next. Pages that round to the same value share one group.

use slog::Logger;

use std::path::Path;

use super::shuffle::{self, Job};
use super::snapshot;
use super::{Pass, PassReport};
use crate::config::Config;
use crate::error::{RankError, Result};
use crate::page::Page;


#[derive(Debug, Clone, PartialEq)]
pub struct RankGroup {
    pub rank:  f64,
    pub pages: Vec<String>,
}

pub struct RankGrouper {
    precision:  usize,
    partitions: usize,
}

impl RankGrouper {
    pub fn new(precision: usize, partitions: usize) -> Self {
        RankGrouper { precision, partitions }
    }

    pub fn from_config(config: &Config) -> Self {
        RankGrouper::new(config.precision, config.partitions)
    }

    /// `0.8549` → `"0.85"` at the default precision
    pub fn round(&self, rank: f64) -> String {
        format!("{:.*}", self.precision, rank)
    }

    /// Groups ordered from the highest rank down
    pub fn group(&self, snapshot: Vec<Vec<Page>>) -> Result<Vec<RankGroup>> {
        let shuffled = shuffle::execute(self, snapshot, self.partitions)?;
        let mut groups: Vec<RankGroup> = shuffled.into_records().collect();
        groups.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        Ok(groups)
    }

    pub fn write(&self, path: &Path, groups: &[RankGroup]) -> Result<usize> {
        let mut w = snapshot::writer(path)?;
        let mut lines = 0;
        for g in groups {
            let rank = self.round(g.rank);
            for title in &g.pages {
                w.write_record(&[rank.as_str(), title.as_str()])?;
                lines += 1;
            }
        }
        w.flush().map_err(|e| RankError::io(e, path))?;
        Ok(lines)
    }
}

impl Job for RankGrouper {
    type Input = Page;
    type Key = String;
    type Value = String;
    type Output = RankGroup;

    fn map(&self, page: Page, emit: &mut Vec<(String, String)>) {
        emit.push((self.round(page.rank), page.title));
    }

    fn reduce(&self, rounded: String, mut pages: Vec<String>) -> Result<Option<RankGroup>> {
        // the key came out of `round`, so it always parses
        let rank = rounded.parse().unwrap_or(0.0);
        pages.sort();
        Ok(Some(RankGroup { rank, pages }))
    }
}

impl Pass for RankGrouper {
    fn name(&self) -> &'static str {
        "group"
    }

    fn run(&self, input: &Path, output: &Path, log: &Logger) -> Result<PassReport> {
        let mut report = PassReport::start(self.name(), input, output);
        let pages = snapshot::read_snapshot(input)?;
        report.records_in = pages.iter().map(Vec::len).sum();
        let groups = self.group(pages)?;
        if let Some(top) = groups.first() {
            debug!(log, "Top rank {}", self.round(top.rank); "pages" => top.pages.len());
        }
        let lines = snapshot::materialize(output, |tmp| {
            self.write(&tmp.join(snapshot::part_name(0)), &groups)
        })?;
        info!(log, "Grouped ranks"; "groups" => groups.len(), "pages" => lines);
        report.records_out = lines;
        Ok(report.done())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ranked(t: &str, rank: f64) -> Page {
        Page { title: t.into(), rank, links: vec![] }
    }

    #[test]
    fn rounds_to_precision() {
        assert_eq!(RankGrouper::new(2, 1).round(0.8549), "0.85");
        assert_eq!(RankGrouper::new(2, 1).round(1.0), "1.00");
        assert_eq!(RankGrouper::new(0, 1).round(2.7), "3");
        assert_eq!(RankGrouper::new(4, 1).round(0.15), "0.1500");
    }

    #[test]
    fn collisions_share_a_group() {
        let g = RankGrouper::new(2, 3);
        let groups = g.group(vec![
            vec![ranked("B", 0.151), ranked("A", 0.149)],
            vec![ranked("Top", 2.5), ranked("C", 0.1501)],
        ]).unwrap();
        assert_eq!(groups, vec![
            RankGroup { rank: 2.5, pages: vec!["Top".into()] },
            RankGroup { rank: 0.15, pages: vec!["A".into(), "B".into(), "C".into()] },
        ]);
    }

    #[test]
    fn writes_highest_first() {
        let dir = tempfile::tempdir().unwrap();
        let snap = dir.path().join("4");
        snapshot::materialize(&snap, |tmp| snapshot::write_snapshot(tmp, &[
            vec![ranked("Low", 0.15), ranked("High", 1.7)],
            vec![ranked("Mid", 1.0)],
        ])).unwrap();

        let log = Logger::root(slog::Discard, o!());
        let out = dir.path().join("result");
        let report = RankGrouper::new(2, 2).run(&snap, &out, &log).unwrap();
        assert_eq!(report.records_in, 3);
        assert_eq!(report.records_out, 3);

        let text = fs::read_to_string(out.join("part-00000")).unwrap();
        assert_eq!(text, "1.70\tHigh\n1.00\tMid\n0.15\tLow\n");
    }
}

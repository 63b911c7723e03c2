//! One rank propagation pass
//!
//! Every page tells its targets `(rank, out_degree)`, announces that it exists,
//! and sends its own link list to itself so it can be put back on afterwards.
//! A target only survives the pass if it announced itself; rank sent to a
//! page that is never defined is lost along with it.

use slog::Logger;

use std::path::Path;

use super::shuffle::{self, Job, Shuffled};
use super::snapshot;
use super::{Pass, PassReport};
use crate::config::Config;
use crate::error::{RankError, Result};
use crate::page::Page;


/// Everything a page can hear about itself during a pass
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// The page is defined in this snapshot
    Existence,
    /// A share of some other page's rank
    Contribution { rank: f64, out_degree: usize },
    /// The page's own links, to be reattached to its new rank
    EdgeList { targets: Vec<String> },
}

impl Emission {
    fn share(&self) -> Option<f64> {
        match *self {
            Emission::Contribution { rank, out_degree } => Some(rank / out_degree as f64),
            _ => None,
        }
    }
}


pub struct RankIterator {
    damping:    f64,
    partitions: usize,
}

impl RankIterator {
    pub fn new(damping: f64, partitions: usize) -> Self {
        RankIterator { damping, partitions }
    }

    pub fn from_config(config: &Config) -> Self {
        RankIterator::new(config.damping, config.partitions)
    }

    pub fn emit(&self, page: Page, emit: &mut Vec<(String, Emission)>) {
        let Page { title, rank, links } = page;
        emit.push((title.clone(), Emission::Existence));
        let out_degree = links.len();
        for target in &links {
            emit.push((target.clone(), Emission::Contribution { rank, out_degree }));
        }
        emit.push((title, Emission::EdgeList { targets: links }));
    }

    /// New rank of `title` from everything sent to it, or `None` if the page
    /// was only ever linked to
    pub fn aggregate(&self, title: String, emissions: Vec<Emission>) -> Result<Option<Page>> {
        let mut exists = false;
        let mut links: Option<Vec<String>> = None;
        let mut shares: Vec<f64> = Vec::with_capacity(emissions.len());
        for e in emissions {
            match e {
                Emission::Existence => exists = true,
                Emission::EdgeList { targets } => {
                    if links.is_some() {
                        return Err(RankError::DuplicatePage(title));
                    }
                    links = Some(targets);
                },
                ref c => shares.extend(c.share()),
            }
        }
        if !exists {
            return Ok(None);
        }
        // fixed summation order; the shuffle makes no promise about arrival order
        shares.sort_by(|a, b| a.total_cmp(b));
        let sum_share: f64 = shares.iter().sum();
        Ok(Some(Page {
            title: title,
            rank:  self.damping * sum_share + (1.0 - self.damping),
            links: links.unwrap_or_default(),
        }))
    }

    pub fn iterate(&self, snapshot: Vec<Vec<Page>>) -> Result<Shuffled<Page>> {
        shuffle::execute(self, snapshot, self.partitions)
    }
}

impl Job for RankIterator {
    type Input = Page;
    type Key = String;
    type Value = Emission;
    type Output = Page;

    fn map(&self, page: Page, emit: &mut Vec<(String, Emission)>) {
        self.emit(page, emit)
    }

    fn reduce(&self, title: String, emissions: Vec<Emission>) -> Result<Option<Page>> {
        self.aggregate(title, emissions)
    }
}

impl Pass for RankIterator {
    fn name(&self) -> &'static str {
        "iterate"
    }

    fn run(&self, input: &Path, output: &Path, log: &Logger) -> Result<PassReport> {
        let report = PassReport::start(self.name(), input, output);
        let pages = self.iterate(snapshot::read_snapshot(input)?)?;
        let rank_sum: f64 = pages.partitions.iter()
            .flat_map(|p| p.iter())
            .map(|p| p.rank)
            .sum();
        info!(log, "Propagated ranks";
              "pages" => pages.records_out(),
              "dangling" => pages.dropped(),
              "rank_sum" => rank_sum);
        snapshot::materialize(output, |tmp| snapshot::write_snapshot(tmp, &pages.partitions))?;
        Ok(report.finish(&pages))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use std::collections::HashMap;

    const EPS: f64 = 1e-9;

    fn page(t: &str, links: &[&str]) -> Page {
        Page::new(t.into(), links.iter().map(|s| s.to_string()).collect())
    }

    fn ranks(it: &RankIterator, pages: Vec<Page>) -> HashMap<String, Page> {
        it.iterate(vec![pages]).unwrap()
            .into_records()
            .map(|p| (p.title.clone(), p))
            .collect()
    }

    #[test]
    fn edgeless_pages_fall_to_one_minus_damping() {
        let it = RankIterator::new(0.85, 3);
        let out = ranks(&it, vec![page("A", &[]), page("B", &[]), page("C", &[])]);
        assert_eq!(out.len(), 3);
        for p in out.values() {
            assert!((p.rank - 0.15).abs() < EPS, "{} has {}", p.title, p.rank);
            assert!(p.links.is_empty());
        }
    }

    #[test]
    fn two_cycle_is_already_fixed() {
        let it = RankIterator::new(0.85, 2);
        let out = ranks(&it, vec![page("A", &["B"]), page("B", &["A"])]);
        assert!((out["A"].rank - 1.0).abs() < EPS);
        assert!((out["B"].rank - 1.0).abs() < EPS);
    }

    #[test]
    fn sink_collects_and_source_decays() {
        let it = RankIterator::new(0.85, 2);
        let out = ranks(&it, vec![page("A", &["C"]), page("C", &[])]);
        assert!((out["C"].rank - 1.0).abs() < EPS);
        assert!((out["A"].rank - 0.15).abs() < EPS);
        assert_eq!(out["A"].links, vec!["C"]);
    }

    #[test]
    fn undefined_targets_are_dropped() {
        let it = RankIterator::new(0.85, 2);
        let shuffled = it.iterate(vec![vec![page("A", &["Ghost", "B"]), page("B", &[])]]).unwrap();
        assert_eq!(shuffled.dropped(), 1);
        let out: HashMap<_, _> = shuffled.into_records().map(|p| (p.title.clone(), p)).collect();
        assert!(!out.contains_key("Ghost"));
        // B got half of A; the other half went to Ghost and is gone
        assert!((out["B"].rank - (0.85 * 0.5 + 0.15)).abs() < EPS);
        assert_eq!(out["A"].links, vec!["Ghost", "B"]);
    }

    #[test]
    fn repeated_links_count_twice() {
        let it = RankIterator::new(0.85, 1);
        let out = ranks(&it, vec![page("A", &["B", "B", "A"]), page("B", &[])]);
        assert!((out["B"].rank - (0.85 * (2.0 / 3.0) + 0.15)).abs() < EPS);
        assert!((out["A"].rank - (0.85 * (1.0 / 3.0) + 0.15)).abs() < EPS);
    }

    #[test]
    fn duplicate_definitions_fail_the_pass() {
        let it = RankIterator::new(0.85, 1);
        match it.iterate(vec![vec![page("A", &[])], vec![page("A", &["B"])]]) {
            Err(RankError::DuplicatePage(t)) => assert_eq!(t, "A"),
            _ => panic!("expected DuplicatePage"),
        }
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let it = RankIterator::new(0.85, 1);
        let mut rng = StdRng::seed_from_u64(7);
        let mut emissions = vec![Emission::Existence, Emission::EdgeList { targets: vec![] }];
        for _ in 0..200 {
            let rank = rng.gen_range(0.0..10.0);
            let out_degree = rng.gen_range(1..20);
            emissions.push(Emission::Contribution { rank, out_degree });
        }
        let expected = it.aggregate("T".into(), emissions.clone()).unwrap().unwrap().rank;
        for _ in 0..20 {
            emissions.shuffle(&mut rng);
            let got = it.aggregate("T".into(), emissions.clone()).unwrap().unwrap().rank;
            assert_eq!(got.to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn regular_graph_keeps_its_mass() {
        // every page links to the next `d` pages around a ring
        let mut rng = StdRng::seed_from_u64(11);
        for &(n, d) in &[(10usize, 1usize), (50, 3), (200, 7)] {
            let titles: Vec<String> = (0..n).map(|i| format!("P{}", i)).collect();
            let pages: Vec<Page> = (0..n).map(|i| {
                let links = (1..=d).map(|k| titles[(i + k) % n].clone()).collect();
                Page {
                    title: titles[i].clone(),
                    rank:  rng.gen_range(0.5..1.5),
                    links: links,
                }
            }).collect();
            let before: f64 = pages.iter().map(|p| p.rank).sum();
            let shards: Vec<Vec<Page>> = pages.chunks(7).map(|c| c.to_vec()).collect();

            let it = RankIterator::new(0.85, 4);
            let after: f64 = it.iterate(shards).unwrap().into_records().map(|p| p.rank).sum();
            let expected = 0.85 * before + 0.15 * n as f64;
            assert!((after - expected).abs() < 1e-6, "n={} d={}: {} vs {}", n, d, after, expected);
        }
    }

    #[test]
    fn uniform_start_sums_to_page_count() {
        let n = 40;
        let titles: Vec<String> = (0..n).map(|i| format!("P{}", i)).collect();
        let pages: Vec<Page> = (0..n)
            .map(|i| Page::new(titles[i].clone(), vec![titles[(i * 7 + 3) % n].clone(), titles[(i + 1) % n].clone()]))
            .collect();
        let it = RankIterator::new(0.85, 3);
        let after: f64 = it.iterate(vec![pages]).unwrap().into_records().map(|p| p.rank).sum();
        assert!((after - (0.85 * n as f64 + 0.15 * n as f64)).abs() < 1e-6);
    }

    #[test]
    fn output_feeds_the_next_pass() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::root(::slog::Discard, o!());
        let it = RankIterator::new(0.85, 3);
        let zero = dir.path().join("0");
        snapshot::materialize(&zero, |tmp| snapshot::write_snapshot(tmp, &[vec![
            page("A", &["B", "C"]), page("B", &["C"]), page("C", &["A"]), page("D", &[]),
        ]])).unwrap();

        let mut input = zero;
        for i in 1..4 {
            let output = dir.path().join(i.to_string());
            let report = it.run(&input, &output, &log).unwrap();
            assert_eq!(report.records_out, 4);
            input = output;
        }
        let last: Vec<Page> = snapshot::read_snapshot(&input).unwrap().into_iter().flatten().collect();
        assert_eq!(last.len(), 4);
        let d = last.iter().find(|p| p.title == "D").unwrap();
        assert!((d.rank - 0.15).abs() < EPS);
    }
}

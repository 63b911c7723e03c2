//! Pass 0: raw documents to the first graph snapshot

use rayon::prelude::*;
use slog::Logger;

use std::path::Path;

use super::shuffle::{self, Job, Shuffled};
use super::snapshot;
use super::{Pass, PassReport};
use crate::config::Config;
use crate::error::Result;
use crate::page::Page;

pub mod dump;
pub mod regexes;

use self::dump::{Document, DocumentReader};
use self::regexes::LinkPatterns;


pub struct GraphBuilder {
    patterns:   LinkPatterns,
    partitions: usize,
}

impl GraphBuilder {
    pub fn new(patterns: LinkPatterns, partitions: usize) -> Self {
        GraphBuilder { patterns, partitions }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(GraphBuilder::new(LinkPatterns::new()?, config.partitions))
    }

    /// Every outgoing link of `text`, normalized, in order of appearance
    pub fn links(&self, text: &str) -> Vec<String> {
        self.patterns.tokens(text)
            .filter_map(|tok| self.patterns.target(tok))
            .map(normalize_link)
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// `None` for a document without a usable title
    pub fn build_page(&self, doc: &Document) -> Option<Page> {
        let title = normalize_title(doc.title.as_ref()?)?;
        let links = doc.text.as_ref()
            .map(|t| self.links(t))
            .unwrap_or_default();
        Some(Page::new(title, links))
    }

    pub fn build(&self, shards: Vec<Vec<Document>>) -> Result<Shuffled<Page>> {
        shuffle::execute(self, shards, self.partitions)
    }
}

impl Job for GraphBuilder {
    type Input = Document;
    type Key = String;
    type Value = Vec<String>;
    type Output = Page;

    fn map(&self, doc: Document, emit: &mut Vec<(String, Vec<String>)>) {
        if let Some(page) = self.build_page(&doc) {
            emit.push((page.title, page.links));
        }
    }

    /// Documents sharing a title become one page with all of their links
    fn reduce(&self, title: String, links: Vec<Vec<String>>) -> Result<Option<Page>> {
        let links = links.into_iter().flat_map(|l| l.into_iter()).collect();
        Ok(Some(Page::new(title, links)))
    }
}

impl Pass for GraphBuilder {
    fn name(&self) -> &'static str {
        "build"
    }

    fn run(&self, input: &Path, output: &Path, log: &Logger) -> Result<PassReport> {
        let report = PassReport::start(self.name(), input, output);
        let reader = DocumentReader::new()?;
        let shards = snapshot::input_files(input)?
            .par_iter()
            .map(|p| reader.read_file(p))
            .collect::<Result<Vec<_>>>()?;
        debug!(log, "Read documents"; "shards" => shards.len());

        let built = self.build(shards)?;
        let untitled = built.records_in - built.emitted;
        if untitled > 0 {
            info!(log, "Dropped {} documents without a title", untitled);
        }
        snapshot::materialize(output, |tmp| snapshot::write_snapshot(tmp, &built.partitions))?;
        Ok(report.finish(&built))
    }
}

/// `Ada Lovelace` → `Ada_Lovelace`; a blank title is no title
pub fn normalize_title(title: &str) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().map(|c| if c.is_whitespace() { '_' } else { c }).collect())
}

/// Trimmed like a title, then inner whitespace becomes `_`, commas go away
/// along with any whitespace right after them, and `&amp;` left over from
/// double escaping becomes `&`
pub fn normalize_link(raw: &str) -> String {
    let raw = raw.trim();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            while chars.peek().map_or(false, |c| c.is_whitespace()) {
                chars.next();
            }
        } else if c.is_whitespace() {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    if out.contains("&amp;") {
        out = out.replace("&amp;", "&");
    }
    out
}

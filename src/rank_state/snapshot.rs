//! On-disk snapshots: a directory of `part-NNNNN` files, one per reduce
//! partition, each holding `title \t rank \t links` records

use rayon::prelude::*;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{RankError, Result};
use crate::page::Page;

pub fn part_name(i: usize) -> String {
    format!("part-{:05}", i)
}

/// A lone file is one shard; a directory contributes every visible file in it
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = vec![];
    for entry in fs::read_dir(path).map_err(|e| RankError::io(e, path))? {
        let entry = entry.map_err(|e| RankError::io(e, path))?;
        let p = entry.path();
        let hidden = entry.file_name().to_string_lossy()
            .starts_with(|c: char| c == '.' || c == '_');
        if p.is_file() && !hidden {
            files.push(p);
        }
    }
    files.sort();
    Ok(files)
}

fn reader(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let f = File::open(path).map_err(|e| RankError::io(e, path))?;
    Ok(csv::ReaderBuilder::new()
       .delimiter(b'\t')
       .has_headers(false)
       .quoting(false)
       .flexible(true)
       .from_reader(BufReader::new(f)))
}

pub fn writer(path: &Path) -> Result<csv::Writer<File>> {
    let f = File::create(path).map_err(|e| RankError::io(e, path))?;
    Ok(csv::WriterBuilder::new()
       .delimiter(b'\t')
       .has_headers(false)
       .quote_style(csv::QuoteStyle::Never)
       .from_writer(f))
}

pub fn read_pages(path: &Path) -> Result<Vec<Page>> {
    let mut pages = vec![];
    for record in reader(path)?.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let bad = |reason: String| RankError::BadSnapshot {
            path: path.to_path_buf(),
            line,
            reason,
        };
        if record.len() != 3 {
            return Err(bad(format!("expected 3 tab-separated fields, found {}", record.len())));
        }
        pages.push(Page::from_fields(&record[0], &record[1], &record[2]).map_err(bad)?);
    }
    Ok(pages)
}

/// Every input file becomes one shard of the next pass
pub fn read_snapshot(path: &Path) -> Result<Vec<Vec<Page>>> {
    input_files(path)?
        .par_iter()
        .map(|p| read_pages(p))
        .collect()
}

pub fn write_pages(path: &Path, pages: &[Page]) -> Result<()> {
    let mut w = writer(path)?;
    for page in pages {
        let (rank, links) = (page.rank_field(), page.links_field());
        w.write_record(&[page.title.as_str(), rank.as_str(), links.as_str()])?;
    }
    w.flush().map_err(|e| RankError::io(e, path))?;
    Ok(())
}

pub fn write_snapshot(dir: &Path, partitions: &[Vec<Page>]) -> Result<()> {
    partitions
        .par_iter()
        .enumerate()
        .map(|(i, pages)| write_pages(&dir.join(part_name(i)), pages))
        .collect()
}

/// Build a pass's output beside its final location and only move it into
/// place once `fill` is done, so a snapshot directory is always complete.
/// A stale output from an earlier run is replaced.
pub fn materialize<F, T>(output: &Path, fill: F) -> Result<T>
    where F: FnOnce(&Path) -> Result<T>
{
    let tmp = staging_dir(output);
    if tmp.exists() {
        fs::remove_dir_all(&tmp).map_err(|e| RankError::io(e, &tmp))?;
    }
    fs::create_dir_all(&tmp).map_err(|e| RankError::io(e, &tmp))?;
    let t = match fill(&tmp) {
        Ok(t) => t,
        Err(e) => {
            // nothing half-written is left for the next pass to pick up
            let _ = fs::remove_dir_all(&tmp);
            return Err(e);
        }
    };
    if output.exists() {
        fs::remove_dir_all(output).map_err(|e| RankError::io(e, output))?;
    }
    fs::rename(&tmp, output).map_err(|e| RankError::io(e, output))?;
    Ok(t)
}

fn staging_dir(output: &Path) -> PathBuf {
    let mut name = output.file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn page(t: &str, r: f64, links: &[&str]) -> Page {
        Page { title: t.into(), rank: r, links: links.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn snapshot_directory_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("1");
        let parts = vec![
            vec![page("A", 1.0, &["B", "B"]), page("\"Quoted\"", 0.15, &[])],
            vec![],
            vec![page("B", 0.3333333333333333, &["A"])],
        ];
        materialize(&out, |tmp| write_snapshot(tmp, &parts)).unwrap();
        assert!(!dir.path().join("1.tmp").exists());

        let shards = read_snapshot(&out).unwrap();
        assert_eq!(shards, parts);
    }

    #[test]
    fn a_single_file_is_one_shard() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "A\t1.0\tB,C").unwrap();
        writeln!(f, "B\t1.0\t").unwrap();
        let shards = read_snapshot(f.path()).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0][0].links, vec!["B", "C"]);
        assert!(shards[0][1].links.is_empty());
    }

    #[test]
    fn bad_line_names_its_position() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "A\t1.0\tB").unwrap();
        writeln!(f, "B\tlots\tA").unwrap();
        match read_pages(f.path()) {
            Err(RankError::BadSnapshot { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected BadSnapshot, got {:?}", other),
        }
    }

    #[test]
    fn failed_fill_leaves_old_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("0");
        materialize(&out, |tmp| write_snapshot(tmp, &[vec![page("A", 1.0, &[])]])).unwrap();
        let r: Result<()> = materialize(&out, |_| Err(RankError::DuplicatePage("A".into())));
        assert!(r.is_err());
        assert_eq!(read_snapshot(&out).unwrap(), vec![vec![page("A", 1.0, &[])]]);
        assert!(!dir.path().join("0.tmp").exists());
    }

    #[test]
    fn hidden_files_are_not_shards() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("part-00001")).unwrap();
        File::create(dir.path().join("part-00000")).unwrap();
        File::create(dir.path().join("_SUCCESS")).unwrap();
        File::create(dir.path().join(".part-00000.crc")).unwrap();
        let files = input_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["part-00000", "part-00001"]);
    }
}

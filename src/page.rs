use std::fmt;

/// Rank every page starts at when the graph is first built
pub const INITIAL_RANK: f64 = 1.0;

/// One record of a graph snapshot: `title \t rank \t link,link,...`
///
/// `links` is fixed once the graph is built; only `rank` changes between passes.
/// The same link may appear more than once, and a page may link to itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub rank:  f64,
    pub links: Vec<String>,
}

impl Page {
    pub fn new(title: String, links: Vec<String>) -> Self {
        Page {
            title: title,
            rank:  INITIAL_RANK,
            links: links,
        }
    }

    #[inline]
    pub fn out_degree(&self) -> usize {
        self.links.len()
    }

    /// `{:?}` keeps the trailing `.0` and prints the shortest string that
    /// parses back to the same f64, so a snapshot survives being re-read
    pub fn rank_field(&self) -> String {
        format!("{:?}", self.rank)
    }

    pub fn links_field(&self) -> String {
        self.links.join(",")
    }

    /// Rebuild a page from the three columns of a record
    pub fn from_fields(title: &str, rank: &str, links: &str) -> Result<Self, String> {
        if title.is_empty() {
            return Err(String::from("empty page title"));
        }
        let rank: f64 = rank.trim().parse()
            .map_err(|_| format!("rank `{}` of `{}` is not a number", rank, title))?;
        if !rank.is_finite() {
            return Err(format!("rank of `{}` is not finite", title));
        }
        // an empty column is an edgeless page, not one edge to ""
        let links = if links.is_empty() {
            vec![]
        } else {
            links.split(',').map(String::from).collect()
        };
        Ok(Page { title: title.to_owned(), rank, links })
    }

    pub fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.trim_end_matches(&['\n', '\r'][..])
            .split('\t').collect();
        if fields.len() != 3 {
            return Err(format!("expected 3 tab-separated fields, found {}", fields.len()));
        }
        Page::from_fields(fields[0], fields[1], fields[2])
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.title, self.rank_field(), self.links_field())
    }
}

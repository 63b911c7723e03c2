use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use regex::Regex;

use super::regexes::PagePatterns;
use crate::error::{RankError, Result};

// Parsing Note:
//  Dumps are mostly utf8, but not always. Rather than failing a whole shard on
//  one bad byte we use String::from_utf8_lossy(), which swaps it for '�'.
//  Only the `<title>` and the first non-empty `<text>` of each `<page>` are
//  looked at; later revisions of the same page are ignored.
//


/// One raw document as the graph builder sees it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub title: Option<String>,
    pub text:  Option<String>,
}

impl Document {
    pub fn new(title: &str, text: &str) -> Self {
        Document {
            title: Some(title.to_owned()),
            text:  Some(text.to_owned()),
        }
    }
}

/// Splits a MediaWiki XML export into `Document`s, one per `<page>`
pub struct DocumentReader {
    patterns: PagePatterns,
}

impl DocumentReader {
    pub fn new() -> Result<Self> {
        Ok(DocumentReader { patterns: PagePatterns::new()? })
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<Document>> {
        let f = File::open(path).map_err(|e| RankError::io(e, path))?;
        self.read(BufReader::new(f)).map_err(|e| RankError::io(e, path))
    }

    pub fn read<R: Read>(&self, mut reader: BufReader<R>) -> ::std::io::Result<Vec<Document>> {
        let mut docs = vec![];
        let mut buffer = Vec::<u8>::new();
        let mut page = String::new();
        let mut in_page = false;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            let line: Cow<str> = String::from_utf8_lossy(&buffer);
            let mut rest: &str = &line;
            // a line may close one page and open (or hold) several more
            while !rest.is_empty() {
                let open = rest.find("<page>");
                if !in_page {
                    match open {
                        Some(i) => {
                            in_page = true;
                            page.clear();
                            rest = &rest[i + "<page>".len()..];
                        },
                        None => break,
                    }
                    continue;
                }
                match (rest.find("</page>"), open) {
                    (Some(c), o) if o.map_or(true, |o| c < o) => {
                        page.push_str(&rest[..c]);
                        docs.push(self.parse_page(&page));
                        page.clear();
                        in_page = false;
                        rest = &rest[c + "</page>".len()..];
                    },
                    (_, Some(o)) => {
                        // an unterminated page is abandoned when the next one opens
                        page.clear();
                        rest = &rest[o + "<page>".len()..];
                    },
                    _ => {
                        page.push_str(rest);
                        break;
                    },
                }
            }
        }
        Ok(docs)
    }

    /// Pull the title and body out of the xml between `<page>` and `</page>`
    pub fn parse_page(&self, xml: &str) -> Document {
        let field = |re: &Regex| {
            re.captures(xml)
                .and_then(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
        };
        Document {
            title: field(&self.patterns.title).filter(|t| !t.trim().is_empty()),
            text:  field(&self.patterns.text),
        }
    }
}

/// Undo the five predefined XML entities; `&amp;` goes last so that
/// `&amp;lt;` becomes `&lt;` and not `<`
pub fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

use regex::Regex;

use crate::error::Result;

// NOTE about wikitext links:
//  We don't try to understand the markup. Anything between a `[` and the next
//  `]` is a token: `[[Target]]`, `[[Target|label]]`, `[[Target#Section]]` and
//  external `[http://... label]` links all qualify. The target is whatever
//  follows (at most two) opening brackets, up to the first `|`, `#` or `]`.
//  The token is cut at the first `]`, so `[[A|b]]` arrives as `[[A|b]`.
//

pub fn link_token_regex() -> String {
    String::from(r"\[.+?\]")
}

pub fn link_target_regex() -> String {
    let open = r"\[{0,2}";
    let target = r"(.+?)";      // shortest run that reaches a delimiter
    let delim = r"[\]|#]";
    format!("{}{}{}", open, target, delim)
}

pub fn title_regex() -> String {
    String::from(r"(?s)<title>(.*?)</title>")
}

pub fn text_regex() -> String {
    // `<text xml:space="preserve" bytes="12">`; the attributes may not end in
    // `/`, so the self-closing `<text ... />` of an empty revision is skipped
    // rather than opening a capture that runs into the next revision
    String::from(r#"(?s)<text(?:\s(?:[^>]*[^/>])?)?>(.*?)</text>"#)
}


/// Compiled once per builder and handed around by reference
#[derive(Debug, Clone)]
pub struct LinkPatterns {
    token:  Regex,
    target: Regex,
}

impl LinkPatterns {
    pub fn new() -> Result<Self> {
        Ok(LinkPatterns {
            token:  Regex::new(&link_token_regex())?,
            target: Regex::new(&link_target_regex())?,
        })
    }

    pub fn tokens<'t>(&'t self, text: &'t str) -> impl Iterator<Item=&'t str> + 't {
        self.token.find_iter(text).map(|m| m.as_str())
    }

    /// Raw (not yet normalized) link target of one token
    pub fn target<'t>(&self, token: &'t str) -> Option<&'t str> {
        self.target.captures(token)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PagePatterns {
    pub title: Regex,
    pub text:  Regex,
}

impl PagePatterns {
    pub fn new() -> Result<Self> {
        Ok(PagePatterns {
            title: Regex::new(&title_regex())?,
            text:  Regex::new(&text_regex())?,
        })
    }
}

//! URL glob patterns for mock routes
//!
//! Globs follow the browser-automation convention: `*` matches any run of
//! characters except `/`, `**` matches any run including `/`, and
//! `{a,b}` matches either alternative. Everything else is literal. A
//! pattern must match the whole URL.

use regex::Regex;

use crate::error::{MockError, MockResult};

#[derive(Debug, Clone)]
pub struct RoutePattern {
    glob: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn new(glob: &str) -> MockResult<Self> {
        let source = glob_to_regex(glob)?;
        let regex = Regex::new(&source).map_err(|e| MockError::InvalidPattern {
            pattern: glob.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.glob)
    }
}

fn glob_to_regex(glob: &str) -> MockResult<String> {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let chars: Vec<char> = glob.chars().collect();
    let mut in_group = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 1;
            }
            '*' => out.push_str("[^/]*"),
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            ',' if in_group => out.push('|'),
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if in_group {
        return Err(MockError::InvalidPattern {
            pattern: glob.to_string(),
            reason: "unterminated '{' group".to_string(),
        });
    }

    out.push('$');
    Ok(out)
}

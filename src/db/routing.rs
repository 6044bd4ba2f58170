//! Explicit routing table mapping resource identifiers to provider routes.
//! The table is built once at startup and handed to the provider, so tests
//! and multiple stores can each carry their own.

use crate::contract::{BookContract, PATH_BOOKS, SCHEME};

/// Routes the book provider knows how to serve.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BookRoute {
    /// Every book in the table.
    Books,
    /// One book, addressed by the trailing numeric segment.
    BookId,
}

/// A resolved identifier: the route plus the id embedded in it, if any.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RouteMatch<R> {
    pub route: R,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `#` in a pattern: any run of ASCII digits.
    Number,
    /// `*` in a pattern: any non-empty text.
    Text,
}

#[derive(Debug, Clone)]
struct Rule<R> {
    authority: String,
    segments: Vec<Segment>,
    route: R,
}

/// Ordered list of `authority/path` patterns. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct UriMatcher<R> {
    rules: Vec<Rule<R>>,
}

impl<R: Copy> UriMatcher<R> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register `path` under `authority`. Path segments are separated by `/`;
    /// `#` matches a number and `*` matches any segment.
    pub fn add(mut self, authority: &str, path: &str, route: R) -> Self {
        let segments = split_path(path)
            .map(|segment| match segment {
                "#" => Segment::Number,
                "*" => Segment::Text,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        self.rules.push(Rule {
            authority: authority.to_string(),
            segments,
            route,
        });
        self
    }

    /// Resolve `uri` against the table. Returns `None` for anything that is
    /// not a `content://` identifier matching one of the rules.
    pub fn match_uri(&self, uri: &str) -> Option<RouteMatch<R>> {
        let rest = uri.strip_prefix(SCHEME)?;
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let parts: Vec<&str> = split_path(path).collect();

        self.rules
            .iter()
            .filter(|rule| rule.authority == authority)
            .filter(|rule| rule.segments.len() == parts.len())
            .find_map(|rule| {
                let mut id = None;
                for (segment, &part) in rule.segments.iter().zip(&parts) {
                    match segment {
                        Segment::Literal(literal) if literal.as_str() == part => {}
                        Segment::Number if is_number(part) => id = Some(part.parse().ok()?),
                        Segment::Text => {}
                        _ => return None,
                    }
                }
                Some(RouteMatch {
                    route: rule.route,
                    id,
                })
            })
    }
}

impl<R: Copy> Default for UriMatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl UriMatcher<BookRoute> {
    /// Routing table for the book provider under `contract`'s authority.
    pub fn for_books(contract: &BookContract) -> Self {
        UriMatcher::new()
            .add(contract.authority(), PATH_BOOKS, BookRoute::Books)
            .add(
                contract.authority(),
                &format!("{PATH_BOOKS}/#"),
                BookRoute::BookId,
            )
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_number(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

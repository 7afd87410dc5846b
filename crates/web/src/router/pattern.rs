//! Route patterns and how they rank against each other.
//!
//! A pattern is a `/` separated list of segments:
//!
//! - `version`: a literal, matched case-sensitively
//! - `:id`: a parameter, matches one non-empty segment
//! - `*` or `*path`: a wildcard, matches the non-empty rest of the path and
//!   may only be the last segment
//!
//! When several patterns match a path the most specific one wins, see
//! [`RoutePattern::cmp_specificity`].

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::error::RouterError;
use crate::request::PathParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard(Option<String>),
}

impl Segment {
    #[inline]
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
            Segment::Wildcard(_) => 2,
        }
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// # Errors
    ///
    /// Fails when the pattern does not start with `/`, has an empty segment or
    /// parameter name, repeats a parameter name, or has a wildcard before the
    /// last segment.
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        if !raw.starts_with('/') {
            return Err(RouterError::invalid_pattern(raw, "must start with '/'"));
        }

        let parts = split_path(raw);
        let mut names = HashSet::new();
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouterError::invalid_pattern(raw, "empty parameter name"));
                }
                Segment::Param(name.to_owned())
            } else if let Some(name) = part.strip_prefix('*') {
                if index + 1 != parts.len() {
                    return Err(RouterError::invalid_pattern(raw, "wildcard must be the last segment"));
                }
                Segment::Wildcard((!name.is_empty()).then(|| name.to_owned()))
            } else if part.is_empty() {
                return Err(RouterError::invalid_pattern(raw, "empty segment"));
            } else {
                Segment::Literal((*part).to_owned())
            };

            if let Segment::Param(name) | Segment::Wildcard(Some(name)) = &segment {
                if !names.insert(name.clone()) {
                    return Err(RouterError::invalid_pattern(raw, format!("duplicate parameter name '{name}'")));
                }
            }
            segments.push(segment);
        }

        let raw = if parts.is_empty() { "/".to_owned() } else { format!("/{}", parts.join("/")) };
        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Matches a decoded request path, binding parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts = split_path(path);
        let mut params = PathParams::empty();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(index) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.get(index).filter(|part| !part.is_empty())?;
                    params.push(name, part);
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(index..)?.join("/");
                    if rest.is_empty() {
                        return None;
                    }
                    params.set_wildcard(name.as_deref(), rest);
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Number of literal segments before the first parameter or wildcard.
    pub fn leading_literals(&self) -> usize {
        self.segments.iter().take_while(|segment| segment.is_literal()).count()
    }

    /// The literal text in front of the first parameter or wildcard, e.g.
    /// `/assets/` for `/assets/*`.
    pub fn base(&self) -> String {
        let leading = self.leading_literals();
        let literals = self.segments.iter().take(leading).filter_map(|segment| match segment {
            Segment::Literal(literal) => Some(literal.as_str()),
            _ => None,
        });

        let mut base = String::from("/");
        for (index, literal) in literals.enumerate() {
            if index > 0 {
                base.push('/');
            }
            base.push_str(literal);
        }
        if leading > 0 && leading < self.segments.len() {
            base.push('/');
        }
        base
    }

    /// Orders patterns from most to least specific.
    ///
    /// Segments are compared left to right, literal before parameter before
    /// wildcard, and the first difference decides. If one pattern is a prefix
    /// of the other the longer one is more specific. `Equal` means the
    /// patterns are equally specific and registration order decides.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        for (segment, other_segment) in self.segments.iter().zip(&other.segments) {
            match segment.rank().cmp(&other_segment.rank()) {
                Ordering::Equal => {}
                ordering => return ordering,
            }
        }
        other.segments.len().cmp(&self.segments.len())
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits a path into segments, ignoring one leading and one trailing `/`.
/// The root path has no segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() { vec![] } else { trimmed.split('/').collect() }
}

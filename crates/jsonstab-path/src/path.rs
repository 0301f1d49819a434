//! Canonical path representation, parsing, and rendering.
//!
//! The canonical form is a tagged list of segments, never a string — string
//! rendering is a presentation concern, and hashing the string form would
//! collide whenever a key contains another style's delimiter characters.

use jsonstab_utils::error::JsonStabError;
use serde::{Deserialize, Serialize};

/// One step of a path: either an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// An ordered, tagged sequence of path segments.
///
/// This is the canonical internal representation referenced throughout the
/// design: hashing, comparison, and traversal all operate on `Path`, never
/// on a rendered string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The empty path, denoting the document root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a key segment, returning the extended path.
    #[must_use]
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Append an index segment, returning the extended path.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// True if `self` is a strict prefix of `other` (used by the differ's
    /// ordering guarantee to detect subsumed ops).
    #[must_use]
    pub fn is_strict_prefix_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.0[..] == other.0[..self.0.len()]
    }
}

/// The three supported rendering styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStyle {
    /// `a.b[0].c` — brackets only for indices.
    Dot,
    /// `/a/b/0/c`
    Slash,
    /// `a[b][0][c]`
    Bracket,
}

impl PathStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Slash => "slash",
            Self::Bracket => "bracket",
        }
    }
}

/// Parse a rendered path string in the given style into its canonical form.
///
/// # Errors
///
/// Returns [`JsonStabError::BadPath`] when the input is syntactically
/// malformed for the requested style.
pub fn parse(input: &str, style: PathStyle) -> Result<Path, JsonStabError> {
    if input.is_empty() {
        return Ok(Path::root());
    }
    match style {
        PathStyle::Dot => parse_dot(input),
        PathStyle::Slash => parse_slash(input),
        PathStyle::Bracket => parse_bracket(input),
    }
}

fn parse_dot(input: &str) -> Result<Path, JsonStabError> {
    let mut segments = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut current_key = String::new();

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if current_key.is_empty() && segments.is_empty() {
                    return Err(JsonStabError::bad_path("dot path cannot start with '.'"));
                }
                if current_key.is_empty() {
                    return Err(JsonStabError::bad_path("empty key segment between dots"));
                }
                segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                i += 1;
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| JsonStabError::bad_path("unterminated '[' in dot path"))?
                    + i;
                let digits: String = chars[i + 1..close].iter().collect();
                let index: usize = digits
                    .parse()
                    .map_err(|_| JsonStabError::bad_path(format!("invalid index '{digits}'")))?;
                segments.push(PathSegment::Index(index));
                i = close + 1;
            }
            ']' => return Err(JsonStabError::bad_path("unmatched ']' in dot path")),
            c => {
                current_key.push(c);
                i += 1;
            }
        }
    }
    if !current_key.is_empty() {
        segments.push(PathSegment::Key(current_key));
    } else if matches!(chars.last(), Some('.')) {
        return Err(JsonStabError::bad_path("dot path cannot end with '.'"));
    }
    Ok(Path(segments))
}

fn parse_slash(input: &str) -> Result<Path, JsonStabError> {
    let rest = input
        .strip_prefix('/')
        .ok_or_else(|| JsonStabError::bad_path("slash path must start with '/'"))?;
    if rest.is_empty() {
        return Ok(Path::root());
    }
    let mut segments = Vec::new();
    for part in rest.split('/') {
        if part.is_empty() {
            return Err(JsonStabError::bad_path("empty segment in slash path"));
        }
        segments.push(segment_from_token(part));
    }
    Ok(Path(segments))
}

fn parse_bracket(input: &str) -> Result<Path, JsonStabError> {
    let mut segments = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut leading = String::new();

    while i < chars.len() && chars[i] != '[' {
        leading.push(chars[i]);
        i += 1;
    }
    if !leading.is_empty() {
        segments.push(segment_from_token(&leading));
    }

    while i < chars.len() {
        if chars[i] != '[' {
            return Err(JsonStabError::bad_path(
                "expected '[' between bracket segments",
            ));
        }
        let close = chars[i..]
            .iter()
            .position(|&c| c == ']')
            .ok_or_else(|| JsonStabError::bad_path("unterminated '[' in bracket path"))?
            + i;
        let token: String = chars[i + 1..close].iter().collect();
        if token.is_empty() {
            return Err(JsonStabError::bad_path("empty bracket segment"));
        }
        segments.push(segment_from_token(&token));
        i = close + 1;
    }
    Ok(Path(segments))
}

/// A bare numeric token is an index; anything else is a key. This mirrors
/// JSON Pointer's own ambiguity and is why round-tripping a digit-only key
/// through slash or bracket style is explicitly out of scope.
fn segment_from_token(token: &str) -> PathSegment {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = token.parse::<usize>() {
            return PathSegment::Index(index);
        }
    }
    PathSegment::Key(token.to_string())
}

/// Render a canonical path in the requested style. Rendering is total: it
/// never fails, even for keys that would not round-trip through `parse`.
#[must_use]
pub fn render(path: &Path, style: PathStyle) -> String {
    match style {
        PathStyle::Dot => render_dot(path),
        PathStyle::Slash => render_slash(path),
        PathStyle::Bracket => render_bracket(path),
    }
}

fn render_dot(path: &Path) -> String {
    let mut out = String::new();
    for (i, seg) in path.segments().iter().enumerate() {
        match seg {
            PathSegment::Key(k) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathSegment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

fn render_slash(path: &Path) -> String {
    let mut out = String::new();
    for seg in path.segments() {
        out.push('/');
        match seg {
            PathSegment::Key(k) => out.push_str(k),
            PathSegment::Index(idx) => out.push_str(&idx.to_string()),
        }
    }
    out
}

fn render_bracket(path: &Path) -> String {
    let mut out = String::new();
    for (i, seg) in path.segments().iter().enumerate() {
        match seg {
            PathSegment::Key(k) if i == 0 => out.push_str(k),
            PathSegment::Key(k) => {
                out.push('[');
                out.push_str(k);
                out.push(']');
            }
            PathSegment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_parse_mixed_segments() {
        let path = parse("api.users[1].name", PathStyle::Dot).unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("api".into()),
                PathSegment::Key("users".into()),
                PathSegment::Index(1),
                PathSegment::Key("name".into()),
            ]
        );
    }

    #[test]
    fn dot_parse_rejects_leading_dot() {
        assert!(parse(".a", PathStyle::Dot).is_err());
    }

    #[test]
    fn dot_parse_rejects_double_dot() {
        assert!(parse("a..b", PathStyle::Dot).is_err());
    }

    #[test]
    fn slash_parse_root() {
        assert_eq!(parse("/", PathStyle::Slash).unwrap(), Path::root());
        assert_eq!(parse("", PathStyle::Slash).unwrap(), Path::root());
    }

    #[test]
    fn slash_parse_requires_leading_slash() {
        assert!(parse("a/b", PathStyle::Slash).is_err());
    }

    #[test]
    fn bracket_parse_leading_key_then_indices() {
        let path = parse("a[b][0][c]", PathStyle::Bracket).unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("a".into()),
                PathSegment::Key("b".into()),
                PathSegment::Index(0),
                PathSegment::Key("c".into()),
            ]
        );
    }

    #[test]
    fn render_round_trip_all_styles() {
        let path = Path::from_segments(vec![
            PathSegment::Key("api".into()),
            PathSegment::Key("users".into()),
            PathSegment::Index(1),
            PathSegment::Key("name".into()),
        ]);
        for style in [PathStyle::Dot, PathStyle::Slash, PathStyle::Bracket] {
            let rendered = render(&path, style);
            let reparsed = parse(&rendered, style).unwrap();
            assert_eq!(reparsed, path, "round-trip failed for {style:?}");
        }
    }

    #[test]
    fn strict_prefix_detection() {
        let a = Path::root().child_key("a");
        let ab = a.child_key("b");
        assert!(a.is_strict_prefix_of(&ab));
        assert!(!ab.is_strict_prefix_of(&a));
        assert!(!a.is_strict_prefix_of(&a));
    }

    #[test]
    fn digit_only_key_is_ambiguous_under_slash_by_design() {
        let path = Path::root().child_key("123");
        let rendered = render(&path, PathStyle::Slash);
        let reparsed = parse(&rendered, PathStyle::Slash).unwrap();
        assert_eq!(reparsed.segments(), &[PathSegment::Index(123)]);
        assert_ne!(reparsed, path);
    }
}

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Separates segments in the dotted form of a [`Path`].
pub const SEPARATOR: char = '.';

/// The segment addressing the uncommitted "new row" editor of a list.
pub const NEW_ROW: &str = "+";

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A property of an object.
    Name(String),

    /// A committed row of a list.
    Index(usize),

    /// The new row editor of a list.
    NewRow,
}

impl Segment {
    /// Parses a single segment. Canonical non-negative integers become
    /// [`Segment::Index`], `+` becomes [`Segment::NewRow`], anything else is a
    /// [`Segment::Name`].
    pub fn parse(s: &str) -> Self {
        if s == NEW_ROW {
            return Segment::NewRow;
        }

        if is_canonical_index(s) {
            if let Ok(i) = s.parse() {
                return Segment::Index(i);
            }
        }

        Segment::Name(s.to_owned())
    }

    /// The key this segment uses inside a JSON object.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Segment::Name(name) => Cow::Borrowed(name),
            Segment::Index(i) => Cow::Owned(i.to_string()),
            Segment::NewRow => Cow::Borrowed(NEW_ROW),
        }
    }

    pub fn is_row(&self) -> bool {
        !matches!(self, Segment::Name(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

pub(crate) fn is_canonical_index(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'))
}

/// An absolute address from the root data value to a field or value.
///
/// The empty path addresses the root. In dotted form, `a.b.2.c` is
/// `[Name(a), Name(b), Index(2), Name(c)]` and `list.+.name` addresses the
/// `name` column of the new row editor of `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }

        Self {
            segments: s.split(SEPARATOR).map(Segment::parse).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn child(&self, name: &str) -> Self {
        self.join(Segment::Name(name.to_owned()))
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The last segment in text form, or the empty string for the root.
    pub fn name(&self) -> String {
        self.last().map(Segment::to_string).unwrap_or_default()
    }

    /// This path with its last segment replaced by `name`. The root has no
    /// last segment, so renaming it yields a one-segment path.
    pub fn with_name(&self, name: &str) -> Self {
        match self.parent() {
            Some(parent) => parent.join(Segment::parse(name)),
            None => Self::parse(name),
        }
    }

    /// Segment-wise prefix test: `a.1` is a prefix of `a.1.b` but not of
    /// `a.10.b`.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn strip_prefix(&self, prefix: &Path) -> Option<Self> {
        if !self.starts_with(prefix) {
            return None;
        }

        Some(Self {
            segments: self.segments[prefix.len()..].to_vec(),
        })
    }

    /// Drops every row segment, leaving the path through the schema.
    pub fn schema_path(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .filter(|segment| !segment.is_row())
                .cloned()
                .collect(),
        }
    }

    /// Whether this path goes through a new row editor.
    pub fn is_new_row(&self) -> bool {
        self.segments.contains(&Segment::NewRow)
    }

    pub fn index_at(&self, position: usize) -> Option<usize> {
        match self.segments.get(position) {
            Some(Segment::Index(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn set_index_at(&mut self, position: usize, index: usize) {
        if let Some(segment) = self.segments.get_mut(position) {
            if matches!(segment, Segment::Index(_)) {
                *segment = Segment::Index(index);
            }
        }
    }

    /// The position of the `n`th name segment, skipping row segments.
    pub fn name_position(&self, n: usize) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| !segment.is_row())
            .nth(n)
            .map(|(position, _)| position)
    }

    pub fn set_segment(&mut self, position: usize, segment: Segment) {
        if let Some(slot) = self.segments.get_mut(position) {
            *slot = segment;
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }

        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

/// The last segment of a dotted path.
pub fn name_from_path(path: &str) -> String {
    Path::parse(path).name()
}

/// A dotted path with its last segment replaced by `name`.
pub fn set_name_in_path(path: &str, name: &str) -> String {
    Path::parse(path).with_name(name).to_string()
}

use std::cmp::Ordering;
use std::sync::Arc;

/// One segment of a normalized path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly
    Literal(Arc<str>),
    /// `{name}` placeholder, binds any single segment
    Param(Arc<str>),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw.len() > 2 && raw.starts_with('{') && raw.ends_with('}') {
            Segment::Param(Arc::from(&raw[1..raw.len() - 1]))
        } else {
            Segment::Literal(Arc::from(raw))
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }

    /// Whether some concrete segment matches both.
    fn overlaps(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            _ => true,
        }
    }
}

/// A parsed path template such as `/books/{bookId}/reviews`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: Arc<str>,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();
        Self {
            raw: Arc::from(template),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Same segment count and every position equal literals or a wildcard on either side.
    pub fn collides_with(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.overlaps(b))
    }

    /// Identical shape, ignoring parameter names (`/a/{x}` and `/a/{y}`).
    pub fn same_shape(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| match (a, b) {
                    (Segment::Literal(x), Segment::Literal(y)) => x == y,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Compare specificity of two colliding templates.
    ///
    /// `Greater` when `self` has the literal at every differing position, `Less` for the
    /// reverse, `None` when each side wins somewhere (the pair is ambiguous) or the shapes
    /// are identical.
    pub fn specificity(&self, other: &PathTemplate) -> Option<Ordering> {
        let mut self_wins = false;
        let mut other_wins = false;
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match (a.is_param(), b.is_param()) {
                (false, true) => self_wins = true,
                (true, false) => other_wins = true,
                _ => {}
            }
        }
        match (self_wins, other_wins) {
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            _ => None,
        }
    }
}

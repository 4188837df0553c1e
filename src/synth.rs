//! Schema-driven sample value generation.
//!
//! [`Synthesizer::synthesize`] walks a [`SchemaNode`] and produces a `serde_json::Value`
//! that satisfies its type, format and bound metadata. Entropy comes from the caller so a
//! request can use a thread-local generator or a seeded one.

use crate::error::MockError;
use crate::spec::{lookup_pointer, ObjectSchema, RefGuard, SchemaNode, StringFormat, StringSchema};
use fake::faker::address::en::{CityName, CountryName, PostCode, StreetName};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Upper bound on generated plain strings when the schema gives none.
pub const MAX_PLAIN_STRING: usize = 50;

/// Default integer range selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthMode {
    /// Unbounded integers fall in `[0, 100]`
    Simple,
    /// Unbounded integers fall in `[1, 1000]`
    #[default]
    Comprehensive,
}

impl SynthMode {
    fn integer_range(self) -> (i64, i64) {
        match self {
            SynthMode::Simple => (0, 100),
            SynthMode::Comprehensive => (1, 1000),
        }
    }
}

impl FromStr for SynthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(SynthMode::Simple),
            "comprehensive" => Ok(SynthMode::Comprehensive),
            other => Err(format!("unknown synthesis mode '{other}' (expected simple|comprehensive)")),
        }
    }
}

impl std::fmt::Display for SynthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthMode::Simple => write!(f, "simple"),
            SynthMode::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthConfig {
    pub mode: SynthMode,
    /// Array length bounds used when the schema declares none
    pub array_min: usize,
    pub array_max: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            mode: SynthMode::default(),
            array_min: 1,
            array_max: 5,
        }
    }
}

/// Generates sample values for schema nodes.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Produce a value matching `schema`.
    ///
    /// `document` is only consulted for [`SchemaNode::Reference`] nodes, which are resolved
    /// under the same cycle guard the resolver uses.
    ///
    /// # Errors
    ///
    /// [`MockError::Constraint`] for contradictory bounds, [`MockError::Reference`] and
    /// [`MockError::CyclicReference`] for unresolvable references.
    pub fn synthesize<R: Rng>(
        &self,
        schema: &SchemaNode,
        document: &Value,
        rng: &mut R,
    ) -> Result<Value, MockError> {
        let mut guard = RefGuard::new();
        self.node(schema, document, &mut guard, rng, "$", None)
    }

    fn node<R: Rng>(
        &self,
        schema: &SchemaNode,
        document: &Value,
        guard: &mut RefGuard,
        rng: &mut R,
        path: &str,
        hint: Option<&str>,
    ) -> Result<Value, MockError> {
        match schema {
            SchemaNode::String(s) => Ok(Value::String(string_value(s, hint, rng))),
            SchemaNode::Integer { enum_values, .. } if !enum_values.is_empty() => {
                Ok(Value::from(enum_values[rng.gen_range(0..enum_values.len())]))
            }
            SchemaNode::Integer {
                minimum, maximum, ..
            } => self.integer(*minimum, *maximum, path, rng).map(Value::from),
            SchemaNode::Number { enum_values, .. } if !enum_values.is_empty() => {
                Ok(json!(enum_values[rng.gen_range(0..enum_values.len())]))
            }
            SchemaNode::Number {
                minimum, maximum, ..
            } => Ok(json!(number(*minimum, *maximum, path, rng)?)),
            SchemaNode::Boolean => Ok(Value::Bool(rng.gen_bool(0.5))),
            SchemaNode::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(items) = items else {
                    return Ok(Value::Array(Vec::new()));
                };
                let len = self.array_len(*min_items, *max_items, path, rng)?;
                let mut out = Vec::with_capacity(len);
                for i in 0..len {
                    let child = format!("{path}[{i}]");
                    out.push(self.node(items, document, guard, rng, &child, hint)?);
                }
                Ok(Value::Array(out))
            }
            SchemaNode::Object(obj) => self.object(obj, document, guard, rng, path),
            SchemaNode::Reference(pointer) => {
                guard.enter(pointer)?;
                let target = lookup_pointer(document, pointer)?;
                let resolved = SchemaNode::from_value(target, pointer)?;
                let value = self.node(&resolved, document, guard, rng, path, hint)?;
                guard.leave();
                Ok(value)
            }
            SchemaNode::AllOf(branches) => {
                let mut concrete = Vec::with_capacity(branches.len());
                for branch in branches {
                    concrete.push(self.shallow_resolve(branch, document, guard)?);
                }
                let merged = SchemaNode::merge_all_of(concrete);
                self.node(&merged, document, guard, rng, path, hint)
            }
            SchemaNode::Any => Ok(Value::Null),
        }
    }

    /// Follow top-level references of an `allOf` branch so it can be merged.
    fn shallow_resolve(
        &self,
        node: &SchemaNode,
        document: &Value,
        guard: &mut RefGuard,
    ) -> Result<SchemaNode, MockError> {
        let SchemaNode::Reference(pointer) = node else {
            return Ok(node.clone());
        };
        guard.enter(pointer)?;
        let target = lookup_pointer(document, pointer)?;
        let parsed = SchemaNode::from_value(target, pointer)?;
        let resolved = self.shallow_resolve(&parsed, document, guard)?;
        guard.leave();
        Ok(resolved)
    }

    fn object<R: Rng>(
        &self,
        obj: &ObjectSchema,
        document: &Value,
        guard: &mut RefGuard,
        rng: &mut R,
        path: &str,
    ) -> Result<Value, MockError> {
        let mut out = Map::with_capacity(obj.properties.len());
        for (name, prop) in &obj.properties {
            let child = format!("{path}.{name}");
            let value = self.node(prop, document, guard, rng, &child, Some(name))?;
            out.insert(name.clone(), value);
        }
        // Required names without a property schema still get a key.
        for name in &obj.required {
            if !out.contains_key(name) {
                out.insert(name.clone(), Value::Null);
            }
        }
        Ok(Value::Object(out))
    }

    fn integer<R: Rng>(
        &self,
        minimum: Option<i64>,
        maximum: Option<i64>,
        path: &str,
        rng: &mut R,
    ) -> Result<i64, MockError> {
        let (def_lo, def_hi) = self.config.mode.integer_range();
        let span = def_hi - def_lo;
        let (lo, hi) = match (minimum, maximum) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) if lo <= def_hi => (lo, def_hi),
            (Some(lo), None) => (lo, lo.saturating_add(span)),
            (None, Some(hi)) if hi >= def_lo => (def_lo, hi),
            (None, Some(hi)) => (hi.saturating_sub(span), hi),
            (None, None) => (def_lo, def_hi),
        };
        if lo > hi {
            return Err(MockError::constraint(
                path,
                format!("minimum ({lo}) exceeds maximum ({hi})"),
            ));
        }
        Ok(rng.gen_range(lo..=hi))
    }

    fn array_len<R: Rng>(
        &self,
        min_items: Option<usize>,
        max_items: Option<usize>,
        path: &str,
        rng: &mut R,
    ) -> Result<usize, MockError> {
        let (lo, hi) = match (min_items, max_items) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, lo.max(self.config.array_max)),
            (None, Some(hi)) => (self.config.array_min.min(hi), hi),
            (None, None) => (self.config.array_min, self.config.array_max),
        };
        if lo > hi {
            return Err(MockError::constraint(
                path,
                format!("minItems ({lo}) exceeds maxItems ({hi})"),
            ));
        }
        Ok(rng.gen_range(lo..=hi))
    }
}

fn round2(v: f64) -> f64 {
    // Values this large have no fractional digits left to round.
    if v.abs() >= 1e15 {
        return v;
    }
    (v * 100.0).round() / 100.0
}

fn number<R: Rng>(
    minimum: Option<f64>,
    maximum: Option<f64>,
    path: &str,
    rng: &mut R,
) -> Result<f64, MockError> {
    let (lo, hi) = match (minimum, maximum) {
        // 0.11 keeps the rounded value strictly above 0.1
        (None, None) => return Ok(round2(rng.gen_range(0.11..=1000.0))),
        (Some(lo), Some(hi)) => (lo, hi),
        (Some(lo), None) if lo < 1000.0 => (lo, 1000.0),
        (Some(lo), None) => (lo, lo + 1000.0),
        (None, Some(hi)) if hi > 0.1 => (0.1, hi),
        (None, Some(hi)) => (hi - 1000.0, hi),
    };
    if lo > hi || !lo.is_finite() || !hi.is_finite() {
        return Err(MockError::constraint(
            path,
            format!("minimum ({lo}) exceeds maximum ({hi})"),
        ));
    }
    if lo == hi {
        return Ok(lo);
    }
    // Interpolate instead of sampling `lo..=hi` directly: `hi - lo` overflows for bounds
    // near the ends of the f64 range.
    let t: f64 = rng.gen();
    Ok(round2(lo * (1.0 - t) + hi * t).clamp(lo, hi))
}

fn alphanumeric<R: Rng>(len: usize, rng: &mut R) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Realistic value for a property whose name suggests a well-known kind.
fn hinted<R: Rng>(hint: &str, rng: &mut R) -> Option<String> {
    let h = hint.to_ascii_lowercase();
    let value = if h.contains("email") {
        SafeEmail().fake_with_rng(rng)
    } else if h.contains("first_name") || h.contains("firstname") {
        FirstName().fake_with_rng(rng)
    } else if h.contains("last_name") || h.contains("lastname") || h.contains("surname") {
        LastName().fake_with_rng(rng)
    } else if h.contains("username") || h == "login" {
        Username().fake_with_rng(rng)
    } else if h.contains("name") || h == "author" {
        Name().fake_with_rng(rng)
    } else if h.contains("phone") {
        PhoneNumber().fake_with_rng(rng)
    } else if h.contains("city") {
        CityName().fake_with_rng(rng)
    } else if h.contains("country") {
        CountryName().fake_with_rng(rng)
    } else if h.contains("street") || h.contains("address") {
        StreetName().fake_with_rng(rng)
    } else if h.contains("zip") || h.contains("postal") {
        PostCode().fake_with_rng(rng)
    } else if h.contains("title") || h.contains("description") || h.contains("summary") {
        Sentence(2..6).fake_with_rng(rng)
    } else {
        return None;
    };
    Some(value)
}

fn date<R: Rng>(rng: &mut R) -> String {
    // 2000-01-01 plus up to ~30 years
    chrono::NaiveDate::from_num_days_from_ce_opt(730_120 + rng.gen_range(0..11_000))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "2000-01-01".to_string())
}

fn date_time<R: Rng>(rng: &mut R) -> String {
    let secs = rng.gen_range(946_684_800_i64..1_893_456_000);
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "2000-01-01T00:00:00Z".to_string())
}

fn uuid_v4<R: Rng>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.gen())
        .into_uuid()
        .to_string()
}

fn string_value<R: Rng>(schema: &StringSchema, hint: Option<&str>, rng: &mut R) -> String {
    if !schema.enum_values.is_empty() {
        let idx = rng.gen_range(0..schema.enum_values.len());
        return schema.enum_values[idx].clone();
    }
    match schema.format {
        StringFormat::Email => return SafeEmail().fake_with_rng(rng),
        StringFormat::Date => return date(rng),
        StringFormat::DateTime => return date_time(rng),
        StringFormat::Uuid => return uuid_v4(rng),
        StringFormat::Plain => {}
    }

    let min = schema.min_length.unwrap_or(0);
    let max = schema
        .max_length
        .unwrap_or(MAX_PLAIN_STRING)
        .min(MAX_PLAIN_STRING)
        .max(min);

    let mut text = hint
        .and_then(|h| hinted(h, rng))
        .unwrap_or_else(|| Word().fake_with_rng(rng));
    if text.chars().count() > max {
        text = text.chars().take(max).collect();
    }
    let len = text.chars().count();
    if len < min {
        text.push_str(&alphanumeric(min - len, rng));
    }
    text
}

/// Randomize a literal example while keeping its shape.
///
/// Every leaf is replaced by a value of the same kind. Strings are classified by content:
/// emails, phone-like digit strings, boolean words, sentences, uuid-like digit groups, names
/// and short tokens (replaced by an alphanumeric string of the same length). Arrays are
/// regenerated from their first element with 2 to 5 entries.
pub fn vary<R: Rng>(example: &Value, rng: &mut R) -> Value {
    match example {
        Value::Bool(_) => Value::Bool(rng.gen_bool(0.5)),
        Value::Number(n) if n.is_i64() || n.is_u64() => Value::from(rng.gen_range(1000..=99_999)),
        Value::Number(_) => json!(round2(rng.gen_range(10.5..=99_999.99))),
        Value::Array(items) => match items.first() {
            Some(first) => {
                let count = rng.gen_range(2..=5);
                Value::Array((0..count).map(|_| vary(first, rng)).collect())
            }
            None => Value::Array(Vec::new()),
        },
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), vary(v, rng)))
                .collect(),
        ),
        Value::String(s) => Value::String(vary_string(s, rng)),
        Value::Null => Value::Null,
    }
}

fn vary_string<R: Rng>(s: &str, rng: &mut R) -> String {
    let len = s.chars().count();
    if s.contains('@') && s.contains('.') {
        SafeEmail().fake_with_rng(rng)
    } else if s.chars().any(|c| c.is_ascii_digit()) && matches!(len, 10 | 13 | 14) {
        PhoneNumber().fake_with_rng(rng)
    } else if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        let word = if rng.gen_bool(0.5) { "true" } else { "false" };
        word.to_string()
    } else if s.contains(' ') && len > 5 {
        Sentence(3..8).fake_with_rng(rng)
    } else if s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '-')
    {
        uuid_v4(rng)
    } else if len >= 5 {
        Name().fake_with_rng(rng)
    } else {
        alphanumeric(len, rng)
    }
}

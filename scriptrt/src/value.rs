// Engine-native value system
// Represents values as they cross the embedding boundary (different from any
// host-side record, which stays opaque on this side)

use indexmap::IndexMap;
use std::fmt;

/// Which kind of host object a blessed reference stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostRefTag {
    Request,
    Session,
}

impl HostRefTag {
    /// The package name the engine dispatches methods on for this kind of
    /// reference. Also the name of the wrapper module preloaded at startup.
    pub fn type_tag(&self) -> &'static str {
        match self {
            HostRefTag::Request => "Host::Request",
            HostRefTag::Session => "Host::Session",
        }
    }
}

/// A blessed, engine-visible wrapper around an opaque host handle.
///
/// The token is whatever the host supplied; nothing on this side of the
/// boundary ever dereferences it. A `HostRef` is only valid for the duration
/// of the call it was built for, because the underlying handle dies with the
/// host's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRef {
    tag: HostRefTag,
    token: u64,
}

impl HostRef {
    pub fn new(tag: HostRefTag, token: u64) -> Self {
        HostRef { tag, token }
    }

    pub fn tag(&self) -> HostRefTag {
        self.tag
    }

    pub fn type_tag(&self) -> &'static str {
        self.tag.type_tag()
    }

    /// The raw host token. Opaque; exposed so engine implementations can
    /// hand it back to host-provided native functions.
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// The value model shared between the bridge and engine implementations.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Insertion-ordered mapping; inserting an existing key overwrites the
    /// value in place.
    Map(IndexMap<String, ScriptValue>),
    HostRef(HostRef),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Integer(_) => "integer",
            ScriptValue::Float(_) => "float",
            ScriptValue::String(_) => "string",
            ScriptValue::Map(_) => "map",
            ScriptValue::HostRef(r) => r.type_tag(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            ScriptValue::Nil => false,
            ScriptValue::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Total scalar coercion, in the loose style of the kind of interpreter
    /// this crate fronts: integers pass through, booleans map to 1/0, floats
    /// truncate, strings yield their leading decimal run (else 0), nil and
    /// aggregates coerce to 0.
    pub fn as_int(&self) -> i64 {
        match self {
            ScriptValue::Nil => 0,
            ScriptValue::Boolean(b) => i64::from(*b),
            ScriptValue::Integer(i) => *i,
            ScriptValue::Float(f) => *f as i64,
            ScriptValue::String(s) => leading_int(s),
            ScriptValue::Map(_) | ScriptValue::HostRef(_) => 0,
        }
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let run: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    if run.is_empty() {
        0
    } else {
        // A run longer than i64 saturates rather than erroring.
        run.parse::<i64>().map(|n| sign * n).unwrap_or(if sign < 0 {
            i64::MIN
        } else {
            i64::MAX
        })
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "nil"),
            ScriptValue::Boolean(b) => write!(f, "{}", b),
            ScriptValue::Integer(i) => write!(f, "{}", i),
            ScriptValue::Float(fl) => write!(f, "{}", fl),
            ScriptValue::String(s) => write!(f, "\"{}\"", s),
            ScriptValue::Map(m) => {
                let items: Vec<String> =
                    m.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            ScriptValue::HostRef(r) => write!(f, "#<{}>", r.type_tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_match_wrapper_module_names() {
        assert_eq!(HostRefTag::Request.type_tag(), "Host::Request");
        assert_eq!(HostRefTag::Session.type_tag(), "Host::Session");
        let r = HostRef::new(HostRefTag::Session, 0xdead);
        assert_eq!(r.type_tag(), "Host::Session");
        assert_eq!(r.token(), 0xdead);
    }

    #[test]
    fn as_int_coerces_scalars() {
        assert_eq!(ScriptValue::Integer(403).as_int(), 403);
        assert_eq!(ScriptValue::Boolean(true).as_int(), 1);
        assert_eq!(ScriptValue::Boolean(false).as_int(), 0);
        assert_eq!(ScriptValue::Float(1.9).as_int(), 1);
        assert_eq!(ScriptValue::Nil.as_int(), 0);
    }

    #[test]
    fn as_int_takes_leading_decimal_run_of_strings() {
        assert_eq!(ScriptValue::String("403 Forbidden".into()).as_int(), 403);
        assert_eq!(ScriptValue::String("  -2x".into()).as_int(), -2);
        assert_eq!(ScriptValue::String("+7".into()).as_int(), 7);
        assert_eq!(ScriptValue::String("abc".into()).as_int(), 0);
        assert_eq!(ScriptValue::String("".into()).as_int(), 0);
    }

    #[test]
    fn aggregates_coerce_to_zero() {
        assert_eq!(ScriptValue::Map(Default::default()).as_int(), 0);
        let r = ScriptValue::HostRef(HostRef::new(HostRefTag::Request, 7));
        assert_eq!(r.as_int(), 0);
    }

    #[test]
    fn truthiness_follows_nil_and_false() {
        assert!(!ScriptValue::Nil.is_truthy());
        assert!(!ScriptValue::Boolean(false).is_truthy());
        assert!(ScriptValue::Integer(0).is_truthy());
        assert!(ScriptValue::String(String::new()).is_truthy());
    }
}

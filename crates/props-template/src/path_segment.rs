use std::{fmt, sync::Arc};

use crate::value::Value;

pub type Key = Arc<str>;
pub type Index = usize;

/// A component in the path to a node.
///
/// Object members are addressed by key and array elements by position, or by
/// `name=value` when the collection was rendered with an addressing `key`
/// option.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(Key),
    Index(Index),
    Id { name: Key, value: Key },
}

impl PathSegment {
    /// Builds the `name=value` segment of an item addressed by attribute.
    #[must_use]
    pub fn id(name: &str, value: &Value) -> Self {
        Self::Id {
            name: name.into(),
            value: value.to_label().into(),
        }
    }

    /// Parses one segment of a dotted path: integers become indices,
    /// `name=value` becomes an id segment, anything else is a key.
    #[must_use]
    pub fn parse(segment: &str) -> Self {
        if let Ok(index) = segment.parse::<Index>() {
            return Self::Index(index);
        }
        match segment.split_once('=') {
            Some((name, value)) => Self::Id {
                name: name.into(),
                value: value.into(),
            },
            None => Self::Key(segment.into()),
        }
    }

    /// Parses a dotted path such as `data.posts.1.comment`, the format of
    /// the `props_at` query parameter. An empty string is an empty path.
    ///
    /// ```
    /// use props_template::{PathSegment, path};
    ///
    /// assert_eq!(
    ///     PathSegment::parse_dotted("data.posts.id=7"),
    ///     vec![
    ///         PathSegment::Key("data".into()),
    ///         PathSegment::Key("posts".into()),
    ///         PathSegment::Id { name: "id".into(), value: "7".into() },
    ///     ]
    /// );
    /// assert_eq!(PathSegment::parse_dotted("a.0"), path!["a", 0]);
    /// ```
    #[must_use]
    pub fn parse_dotted(path: &str) -> Vec<Self> {
        if path.is_empty() {
            return Vec::new();
        }
        path.split('.').map(Self::parse).collect()
    }

    /// Returns `true` when this segment addresses the object member `key`.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Self::Key(k) => &**k == key,
            Self::Index(i) => key.parse::<Index>().is_ok_and(|k| k == *i),
            Self::Id { .. } => key == self.to_string(),
        }
    }

    /// Returns the position this segment addresses, if it is positional.
    #[must_use]
    pub fn as_index(&self) -> Option<Index> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(k) => k.parse().ok(),
            Self::Id { .. } => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
            Self::Id { name, value } => write!(f, "{name}={value}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Key(s.into())
    }
}

impl From<Index> for PathSegment {
    fn from(i: Index) -> Self {
        Self::Index(i)
    }
}

#[doc(hidden)]
pub trait PathSegmentFrom<T> {
    fn from_path_segment(value: T) -> PathSegment;
}

// use macro_rules to implement for i8..i64, u8..u64, isize, usize
macro_rules! impl_integer_as_path_segment {
    ($($t:ty),+) => {
        $(
            impl PathSegmentFrom<$t> for PathSegment {
                fn from_path_segment(value: $t) -> Self {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    PathSegment::Index(value as Index)
                }
            }
        )+
    };
}
impl_integer_as_path_segment!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl PathSegmentFrom<&str> for PathSegment {
    fn from_path_segment(value: &str) -> Self {
        PathSegment::parse(value)
    }
}

impl PathSegmentFrom<String> for PathSegment {
    fn from_path_segment(value: String) -> Self {
        PathSegment::parse(&value)
    }
}

impl PathSegmentFrom<PathSegment> for PathSegment {
    fn from_path_segment(value: PathSegment) -> Self {
        value
    }
}

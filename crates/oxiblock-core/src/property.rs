//! Typed block properties.
//!
//! A property owns a finite, ordered domain of values. Four kinds exist:
//! boolean, bounded integer, enumerated string and direction. Values are
//! addressed by their position in the domain; [`PropertyValue`] is the owned,
//! typed view of one of them.

use std::fmt;
use std::sync::Arc;

use crate::error::PropertyError;

/// Largest domain a single property may declare.
pub const MAX_DOMAIN_SIZE: usize = 1 << 16;

/// Characters that delimit state names and persisted property strings.
pub const RESERVED_CHARS: [char; 5] = ['[', ']', ',', '=', '|'];

pub(crate) fn has_reserved_char(text: &str) -> bool {
    text.contains(&RESERVED_CHARS[..])
}

/// Block facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    /// All six directions in declaration order.
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Parse a direction name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|dir| dir.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Str(Arc<str>),
    Direction(Direction),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::Direction(d) => f.write_str(d.as_str()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.into())
    }
}

impl From<Direction> for PropertyValue {
    fn from(value: Direction) -> Self {
        PropertyValue::Direction(value)
    }
}

/// The domain of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// `false`, `true`.
    Boolean,
    /// `min..=max`.
    Integer { min: i32, max: i32 },
    /// Declared names, in declaration order.
    Enum(Vec<Arc<str>>),
    /// Declared directions, in declaration order.
    Direction(Vec<Direction>),
}

/// A named, immutable property with an ordered domain and a default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    default: usize,
}

impl Property {
    /// A boolean property. Domain is `[false, true]`, default `false`.
    pub fn boolean(name: impl Into<String>) -> Result<Self, PropertyError> {
        let name = checked_name(name.into())?;
        Ok(Self {
            name,
            kind: PropertyKind::Boolean,
            default: 0,
        })
    }

    /// A bounded integer property over `min..=max`, defaulting to `min`.
    pub fn integer(name: impl Into<String>, min: i32, max: i32) -> Result<Self, PropertyError> {
        let name = checked_name(name.into())?;
        if min > max {
            return Err(PropertyError::InvalidRange {
                property: name,
                min,
                max,
            });
        }
        let size = (max as i64 - min as i64 + 1) as u64;
        if size > MAX_DOMAIN_SIZE as u64 {
            return Err(PropertyError::DomainTooLarge {
                property: name,
                size,
                limit: MAX_DOMAIN_SIZE,
            });
        }
        Ok(Self {
            name,
            kind: PropertyKind::Integer { min, max },
            default: 0,
        })
    }

    /// An enumerated string property, defaulting to the first value.
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = checked_name(name.into())?;
        let mut domain: Vec<Arc<str>> = Vec::new();
        for value in values {
            let value: String = value.into();
            if value.is_empty() || has_reserved_char(&value) {
                return Err(PropertyError::ReservedCharacter {
                    property: name,
                    value,
                });
            }
            if domain.iter().any(|v| **v == *value) {
                return Err(PropertyError::DuplicateValue {
                    property: name,
                    value,
                });
            }
            domain.push(value.into());
        }
        check_domain(&name, domain.len())?;
        Ok(Self {
            name,
            kind: PropertyKind::Enum(domain),
            default: 0,
        })
    }

    /// A direction property, defaulting to the first direction.
    pub fn direction<I>(name: impl Into<String>, values: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = Direction>,
    {
        let name = checked_name(name.into())?;
        let mut domain = Vec::new();
        for dir in values {
            if domain.contains(&dir) {
                return Err(PropertyError::DuplicateValue {
                    property: name,
                    value: dir.to_string(),
                });
            }
            domain.push(dir);
        }
        check_domain(&name, domain.len())?;
        Ok(Self {
            name,
            kind: PropertyKind::Direction(domain),
            default: 0,
        })
    }

    /// Override the default value. The value must belong to the domain.
    pub fn with_default(mut self, value: impl Into<PropertyValue>) -> Result<Self, PropertyError> {
        let value = value.into();
        match self.index_of(&value) {
            Some(idx) => {
                self.default = idx;
                Ok(self)
            }
            None => Err(PropertyError::InvalidDefault {
                property: self.name,
                value: value.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Number of values in the domain.
    pub fn len(&self) -> usize {
        match &self.kind {
            PropertyKind::Boolean => 2,
            PropertyKind::Integer { min, max } => (*max as i64 - *min as i64 + 1) as usize,
            PropertyKind::Enum(values) => values.len(),
            PropertyKind::Direction(values) => values.len(),
        }
    }

    /// Constructors reject empty domains, so this is `false` for any built
    /// property.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_value(&self) -> PropertyValue {
        self.value_at(self.default).unwrap_or(PropertyValue::Bool(false))
    }

    /// Domain position of the default value.
    pub fn default_index(&self) -> usize {
        self.default
    }

    /// The domain, in domain order.
    pub fn possible_values(&self) -> Vec<PropertyValue> {
        (0..self.len()).filter_map(|i| self.value_at(i)).collect()
    }

    /// Value at a domain position.
    pub fn value_at(&self, index: usize) -> Option<PropertyValue> {
        match &self.kind {
            PropertyKind::Boolean => match index {
                0 => Some(PropertyValue::Bool(false)),
                1 => Some(PropertyValue::Bool(true)),
                _ => None,
            },
            PropertyKind::Integer { min, max } => {
                let value = *min as i64 + index as i64;
                (value <= *max as i64).then_some(PropertyValue::Int(value as i32))
            }
            PropertyKind::Enum(values) => values.get(index).cloned().map(PropertyValue::Str),
            PropertyKind::Direction(values) => {
                values.get(index).copied().map(PropertyValue::Direction)
            }
        }
    }

    /// Domain position of a value, or `None` when it is not in the domain.
    pub fn index_of(&self, value: &PropertyValue) -> Option<usize> {
        match (&self.kind, value) {
            (PropertyKind::Boolean, PropertyValue::Bool(b)) => Some(*b as usize),
            (PropertyKind::Integer { min, max }, PropertyValue::Int(i)) => {
                (*min..=*max)
                    .contains(i)
                    .then(|| (*i as i64 - *min as i64) as usize)
            }
            (PropertyKind::Enum(values), PropertyValue::Str(s)) => {
                values.iter().position(|v| v == s)
            }
            (PropertyKind::Direction(values), PropertyValue::Direction(d)) => {
                values.iter().position(|v| v == d)
            }
            _ => None,
        }
    }

    pub fn is_valid(&self, value: &PropertyValue) -> bool {
        self.index_of(value).is_some()
    }

    pub fn value_to_string(&self, value: &PropertyValue) -> String {
        value.to_string()
    }

    /// Strict parse: domain position of `text`, or `None`.
    pub fn parse_index(&self, text: &str) -> Option<usize> {
        match &self.kind {
            PropertyKind::Boolean => match text {
                t if t.eq_ignore_ascii_case("true") => Some(1),
                t if t.eq_ignore_ascii_case("false") => Some(0),
                _ => None,
            },
            PropertyKind::Integer { .. } => {
                let parsed = text.trim().parse::<i32>().ok()?;
                self.index_of(&PropertyValue::Int(parsed))
            }
            PropertyKind::Enum(values) => values.iter().position(|v| **v == *text),
            PropertyKind::Direction(values) => {
                let dir = Direction::parse(text)?;
                values.iter().position(|v| *v == dir)
            }
        }
    }

    /// Lenient parse: anything outside the domain yields the default.
    ///
    /// Persisted data may hold values that a later definition no longer
    /// declares; those resolve to the default instead of failing.
    pub fn from_string(&self, text: &str) -> PropertyValue {
        self.parse_index(text)
            .and_then(|idx| self.value_at(idx))
            .unwrap_or_else(|| self.default_value())
    }

    /// Lenient parse returning a domain position.
    pub fn index_from_str(&self, text: &str) -> usize {
        self.parse_index(text).unwrap_or(self.default)
    }

    // State enumeration visits the default first, then the rest in domain order.

    /// Enumeration rank of a domain position.
    pub(crate) fn rank_of(&self, index: usize) -> usize {
        use std::cmp::Ordering;
        match index.cmp(&self.default) {
            Ordering::Equal => 0,
            Ordering::Less => index + 1,
            Ordering::Greater => index,
        }
    }

    /// Domain position holding an enumeration rank.
    pub(crate) fn index_at_rank(&self, rank: usize) -> usize {
        if rank == 0 {
            self.default
        } else if rank <= self.default {
            rank - 1
        } else {
            rank
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn checked_name(name: String) -> Result<String, PropertyError> {
    if name.is_empty() {
        return Err(PropertyError::EmptyName);
    }
    if has_reserved_char(&name) {
        return Err(PropertyError::ReservedCharacter {
            property: name.clone(),
            value: name,
        });
    }
    Ok(name)
}

fn check_domain(name: &str, size: usize) -> Result<(), PropertyError> {
    if size == 0 {
        return Err(PropertyError::EmptyDomain {
            property: name.to_string(),
        });
    }
    if size > MAX_DOMAIN_SIZE {
        return Err(PropertyError::DomainTooLarge {
            property: name.to_string(),
            size: size as u64,
            limit: MAX_DOMAIN_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_domain_is_false_then_true() {
        let lit = Property::boolean("lit").unwrap();
        assert_eq!(
            lit.possible_values(),
            vec![PropertyValue::Bool(false), PropertyValue::Bool(true)]
        );
        assert_eq!(lit.default_value(), PropertyValue::Bool(false));
    }

    #[test]
    fn boolean_from_string() {
        let lit = Property::boolean("lit").unwrap();
        assert_eq!(lit.from_string("TRUE"), PropertyValue::Bool(true));
        assert_eq!(lit.from_string("false"), PropertyValue::Bool(false));
        assert_eq!(lit.from_string("yes"), PropertyValue::Bool(false));
    }

    #[test]
    fn integer_domain_and_default() {
        let power = Property::integer("power", 0, 3).unwrap();
        assert_eq!(power.len(), 4);
        assert!(!power.is_empty());
        assert_eq!(power.default_value(), PropertyValue::Int(0));
        assert_eq!(power.value_at(3), Some(PropertyValue::Int(3)));
        assert_eq!(power.value_at(4), None);
        assert!(power.is_valid(&PropertyValue::Int(2)));
        assert!(!power.is_valid(&PropertyValue::Int(4)));
        assert!(!power.is_valid(&PropertyValue::Bool(true)));
    }

    #[test]
    fn integer_negative_range() {
        let tilt = Property::integer("tilt", -2, 2).unwrap();
        assert_eq!(tilt.len(), 5);
        assert_eq!(tilt.index_of(&PropertyValue::Int(-2)), Some(0));
        assert_eq!(tilt.index_of(&PropertyValue::Int(2)), Some(4));
    }

    #[test]
    fn integer_from_string_falls_back_to_default() {
        let power = Property::integer("power", 1, 3).unwrap();
        assert_eq!(power.from_string("2"), PropertyValue::Int(2));
        assert_eq!(power.from_string("abc"), PropertyValue::Int(1));
        assert_eq!(power.from_string("9"), PropertyValue::Int(1));
    }

    #[test]
    fn integer_rejects_inverted_range() {
        let err = Property::integer("power", 5, 1).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidRange { min: 5, max: 1, .. }));
    }

    #[test]
    fn integer_rejects_huge_range() {
        let err = Property::integer("age", i32::MIN, i32::MAX).unwrap_err();
        assert!(matches!(err, PropertyError::DomainTooLarge { .. }));
    }

    #[test]
    fn enum_defaults_to_first_value() {
        let color = Property::enumeration("color", ["red", "green", "blue"]).unwrap();
        assert_eq!(color.default_value(), PropertyValue::from("red"));
        assert_eq!(color.from_string("blue"), PropertyValue::from("blue"));
        assert_eq!(color.from_string("purple"), PropertyValue::from("red"));
        assert_eq!(color.from_string("BLUE"), PropertyValue::from("red"));
    }

    #[test]
    fn enum_rejects_empty_and_duplicates() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            Property::enumeration("color", empty),
            Err(PropertyError::EmptyDomain { .. })
        ));
        assert!(matches!(
            Property::enumeration("color", ["red", "red"]),
            Err(PropertyError::DuplicateValue { .. })
        ));
    }

    #[test]
    fn direction_parse_is_case_insensitive() {
        let facing =
            Property::direction("facing", [Direction::North, Direction::East]).unwrap();
        assert_eq!(
            facing.from_string("EAST"),
            PropertyValue::Direction(Direction::East)
        );
        assert_eq!(
            facing.from_string("up"),
            PropertyValue::Direction(Direction::North)
        );
    }

    #[test]
    fn default_override() {
        let power = Property::integer("power", 0, 3).unwrap().with_default(2).unwrap();
        assert_eq!(power.default_value(), PropertyValue::Int(2));
        let err = Property::integer("power", 0, 3)
            .unwrap()
            .with_default(7)
            .unwrap_err();
        assert!(matches!(err, PropertyError::InvalidDefault { .. }));
    }

    #[test]
    fn rank_puts_default_first() {
        let color = Property::enumeration("color", ["a", "b", "c", "d"])
            .unwrap()
            .with_default("c")
            .unwrap();
        let order: Vec<usize> = (0..4).map(|r| color.index_at_rank(r)).collect();
        assert_eq!(order, vec![2, 0, 1, 3]);
        for idx in 0..4 {
            assert_eq!(color.index_at_rank(color.rank_of(idx)), idx);
        }
    }

    #[test]
    fn enum_rejects_separator_characters() {
        for bad in ["a|b", "c=d", "x,y", "[z]", ""] {
            assert!(matches!(
                Property::enumeration("shape", ["plain", bad]),
                Err(PropertyError::ReservedCharacter { .. })
            ));
        }
        assert!(matches!(
            Property::boolean("lit=on"),
            Err(PropertyError::ReservedCharacter { .. })
        ));
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(Property::boolean("").unwrap_err(), PropertyError::EmptyName);
    }
}

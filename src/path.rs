use crate::error::Error;
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

pub const WILDCARD: &str = "[]";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Field(String),
    /// Any index of the array at this depth
    Wildcard,
}

/// Join key between a message's structure and a filter's key space,
/// e.g. `msg_list.[].to.[].addr`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        FieldPath::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.to_string()));
        FieldPath { segments }
    }

    pub fn wildcard(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Wildcard);
        FieldPath { segments }
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Name of the innermost named segment
    pub fn last_field(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            PathSegment::Field(name) => Some(name.as_str()),
            PathSegment::Wildcard => None,
        })
    }

    /// Number of array levels crossed by this path
    pub fn array_depth(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSegment::Wildcard))
            .count()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(name) => f.write_str(name)?,
                PathSegment::Wildcard => f.write_str(WILDCARD)?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        for part in s.split('.') {
            let segment = match part {
                WILDCARD => PathSegment::Wildcard,
                "" => return Err(Error::schema(alloc::format!("empty segment in path {:?}", s))),
                name if name.contains(['[', ']']) => {
                    return Err(Error::schema(alloc::format!(
                        "invalid segment {:?} in path {:?}",
                        name, s
                    )));
                }
                name => PathSegment::Field(name.to_string()),
            };
            segments.push(segment);
        }
        Ok(FieldPath { segments })
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

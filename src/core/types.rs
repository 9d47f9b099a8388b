// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core type definitions for groupflow
//!
//! This module defines the scalar [`DataType`], the comparison operator used
//! by predicates, and the option enums the operator factory accepts
//! (join types, flatten/intersect option sets, input preservation, duplicate
//! handling).

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use super::error::Error;

/// Scalar data types carried by row fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DataType {
    /// NULL data type, used for unknown/unspecified types
    #[default]
    Null = 0,

    /// 64-bit signed integer
    Integer = 1,

    /// 64-bit floating point number
    Float = 2,

    /// UTF-8 text string
    Text = 3,

    /// Boolean true/false
    Boolean = 4,

    /// Timestamp (stored as UTC)
    Timestamp = 5,
}

impl DataType {
    /// Returns true if this type is numeric (INTEGER or FLOAT)
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Returns true if a value of `other` may be stored in a field of this type.
    /// NULL-typed fields accept anything and anything accepts NULL.
    pub fn accepts(&self, other: DataType) -> bool {
        *self == other
            || *self == DataType::Null
            || other == DataType::Null
            || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NULL" => Ok(DataType::Null),
            "INTEGER" | "INT" | "BIGINT" => Ok(DataType::Integer),
            "FLOAT" | "DOUBLE" | "REAL" => Ok(DataType::Float),
            "TEXT" | "VARCHAR" | "STRING" => Ok(DataType::Text),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            _ => Err(Error::type_error(format!("unknown data type '{}'", s))),
        }
    }
}

/// Comparison operators for predicate expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equality (=)
    Eq,
    /// Inequality (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl CompareOp {
    /// Apply the operator to an ordering result
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Gte => ordering != Less,
            CompareOp::Lt => ordering == Less,
            CompareOp::Lte => ordering != Greater,
        }
    }

    /// Returns the negation of this operator
    pub fn negate(&self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Gt => CompareOp::Lte,
            CompareOp::Gte => CompareOp::Lt,
            CompareOp::Lt => CompareOp::Gte,
            CompareOp::Lte => CompareOp::Gt,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Operator options
// =============================================================================

/// Join semantics for flatten, intersect and index selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// Parent rows without children survive the join
    pub fn keeps_left_orphans(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    /// Child rows without a parent survive the join
    pub fn keeps_right_orphans(&self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Full => write!(f, "FULL"),
        }
    }
}

/// Whether lookup and if-empty operators re-emit their input rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPreservation {
    KeepInput,
    DiscardInput,
}

/// Duplicate handling for sort operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOption {
    PreserveDuplicates,
    SuppressDuplicates,
}

/// A flag that can live in an [`OptionSet`]
pub trait OptionFlag: 'static + Copy + fmt::Debug {
    /// Bit position of this flag, must be < 32
    fn bit(self) -> u32;

    /// All flags of this kind, in declaration order
    fn all() -> &'static [Self];
}

/// Small bitset of option flags
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionSet<T: OptionFlag> {
    bits: u32,
    _marker: PhantomData<T>,
}

impl<T: OptionFlag> OptionSet<T> {
    /// Empty set
    pub fn empty() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// Set containing the given flags
    pub fn of(flags: &[T]) -> Self {
        let mut set = Self::empty();
        for flag in flags {
            set.insert(*flag);
        }
        set
    }

    pub fn insert(&mut self, flag: T) {
        self.bits |= 1 << flag.bit();
    }

    pub fn contains(&self, flag: T) -> bool {
        self.bits & (1 << flag.bit()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Flags present in the set
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        T::all().iter().copied().filter(|f| self.contains(*f))
    }
}

impl<T: OptionFlag> Default for OptionSet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: OptionFlag> fmt::Debug for OptionSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Flatten behavior flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlattenOption {
    /// Also emit the parent rows as they arrive
    KeepParent,
    /// Also emit the child rows as they arrive
    KeepChild,
    /// Left-join rows carry the parent hKey instead of a null child segment
    LeftJoinShortensHKey,
}

impl OptionFlag for FlattenOption {
    fn bit(self) -> u32 {
        self as u32
    }

    fn all() -> &'static [Self] {
        &[
            FlattenOption::KeepParent,
            FlattenOption::KeepChild,
            FlattenOption::LeftJoinShortensHKey,
        ]
    }
}

pub type FlattenOptions = OptionSet<FlattenOption>;

/// Intersect output and scan-mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntersectOption {
    OutputLeft,
    OutputRight,
    SequentialScan,
    SkipScan,
}

impl OptionFlag for IntersectOption {
    fn bit(self) -> u32 {
        self as u32
    }

    fn all() -> &'static [Self] {
        &[
            IntersectOption::OutputLeft,
            IntersectOption::OutputRight,
            IntersectOption::SequentialScan,
            IntersectOption::SkipScan,
        ]
    }
}

pub type IntersectOptions = OptionSet<IntersectOption>;

//! Field-type table and format specification.
//!
//! A database schema is declared as a format string over a closed set of
//! one-letter type codes. From the user-declared order this module derives
//! the *dense* order (sorted by descending byte width with a fixed tie-break
//! table) and the permutation between the two index spaces. The dense order
//! is the on-disk field order; it exists to minimize padding and is part of
//! the wire format, so it must be bit-for-bit reproducible.

use crate::error::{Result, StoreError};

/// The closed set of field types a record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Single byte character (`c`).
    Char,
    /// Boolean (`?`), one byte.
    Bool,
    /// Signed 16-bit integer (`h`).
    Short,
    /// Signed 32-bit integer (`i`).
    Int32,
    /// 32-bit float (`f`).
    Float32,
    /// Unsigned 64-bit integer (`Q`).
    UInt64,
    /// 64-bit float (`d`).
    Float64,
}

impl FieldType {
    /// Creates a FieldType from its one-letter format code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'c' => Some(Self::Char),
            '?' => Some(Self::Bool),
            'h' => Some(Self::Short),
            'i' => Some(Self::Int32),
            'f' => Some(Self::Float32),
            'Q' => Some(Self::UInt64),
            'd' => Some(Self::Float64),
            _ => None,
        }
    }

    /// Returns the one-letter format code.
    pub fn code(self) -> char {
        match self {
            Self::Char => 'c',
            Self::Bool => '?',
            Self::Short => 'h',
            Self::Int32 => 'i',
            Self::Float32 => 'f',
            Self::UInt64 => 'Q',
            Self::Float64 => 'd',
        }
    }

    /// Returns the encoded byte width of the type.
    pub fn width(self) -> usize {
        match self {
            Self::Char | Self::Bool => 1,
            Self::Short => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Dense-order sort priority, highest first.
    ///
    /// Width-descending with a fixed same-width tie-break: `Q` before `d`,
    /// `f` before `i`, `c` before `?`. The table is a wire-format contract
    /// fixed by the reference vector `"ci?Qdfchifh" -> "Qdffiihhcc?"`.
    fn priority(self) -> u8 {
        match self {
            Self::UInt64 => 7,
            Self::Float64 => 6,
            Self::Float32 => 5,
            Self::Int32 => 4,
            Self::Short => 3,
            Self::Char => 2,
            Self::Bool => 1,
        }
    }
}

/// A parsed format: user order, dense order, and the permutation between
/// them.
///
/// Immutable once a database is opened. `user_dense_map[dense] = user` is a
/// bijection over `[0, n)`.
///
/// # Examples
/// ```rust,ignore
/// use strata::format::FormatSpec;
///
/// let spec = FormatSpec::parse("icfc")?;
/// assert_eq!(spec.dense_string(), "ficc");
/// assert_eq!(spec.user_dense_map(), &[2, 0, 3, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    user: Vec<FieldType>,
    dense: Vec<FieldType>,
    user_dense_map: Vec<usize>,
    record_len: usize,
}

impl FormatSpec {
    /// Parses a user format string.
    ///
    /// Rejects empty strings and codes outside the closed type set.
    pub fn parse(user_format: &str) -> Result<Self> {
        if user_format.is_empty() {
            return Err(StoreError::EmptyFormat);
        }
        let user = user_format
            .chars()
            .map(|c| FieldType::from_code(c).ok_or(StoreError::UnknownFormatCode(c)))
            .collect::<Result<Vec<_>>>()?;

        let dense = dense_order(&user);
        let user_dense_map = build_permutation(&user, &dense);
        let record_len = dense.iter().map(|t| t.width()).sum();

        Ok(Self {
            user,
            dense,
            user_dense_map,
            record_len,
        })
    }

    /// Fields in user (logical) order.
    pub fn user(&self) -> &[FieldType] {
        &self.user
    }

    /// Fields in dense (on-disk) order.
    pub fn dense(&self) -> &[FieldType] {
        &self.dense
    }

    /// The permutation `user_dense_map[dense_index] = user_index`.
    pub fn user_dense_map(&self) -> &[usize] {
        &self.user_dense_map
    }

    /// Number of fields in a record.
    pub fn arity(&self) -> usize {
        self.user.len()
    }

    /// Fixed byte length of one packed record.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// The user format as a code string.
    pub fn user_string(&self) -> String {
        self.user.iter().map(|t| t.code()).collect()
    }

    /// The dense format as a code string.
    pub fn dense_string(&self) -> String {
        self.dense.iter().map(|t| t.code()).collect()
    }
}

/// Stable-sorts format codes into dense order.
fn dense_order(user: &[FieldType]) -> Vec<FieldType> {
    let mut dense = user.to_vec();
    dense.sort_by_key(|t| std::cmp::Reverse(t.priority()));
    dense
}

/// Builds `user_dense_map[dense_index] = user_index`.
///
/// Per-type stacks of user positions are pushed in ascending order; walking
/// the dense order left to right pops the top of the matching stack, so for
/// a type appearing k times the *last* user occurrence pairs with the
/// *first* dense occurrence. The pairing rule is deterministic and fixed by
/// the reference implementation; data written under it can only be read
/// back under it.
fn build_permutation(user: &[FieldType], dense: &[FieldType]) -> Vec<usize> {
    let mut stacks: std::collections::HashMap<FieldType, Vec<usize>> =
        std::collections::HashMap::new();
    for (i, t) in user.iter().enumerate() {
        stacks.entry(*t).or_default().push(i);
    }
    dense
        .iter()
        .map(|t| {
            stacks
                .get_mut(t)
                .and_then(Vec::pop)
                .expect("dense order is a permutation of the user order")
        })
        .collect()
}

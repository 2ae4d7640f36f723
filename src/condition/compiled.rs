//! Compiled condition objects
//!
//! A compiled condition is a header (size, clause count, number count)
//! followed by an ordered clause array and an ordered operand array.
//! Numeric operands are stored in the order the parser met them: left side
//! before right side, clause by clause.

use super::number::NumberUnion;
use super::selector::Selector;
use std::fmt;
use std::mem::size_of;
use xxhash_rust::xxh3::Xxh3;

/// One `LEFT=RIGHT` or `LEFT!=RIGHT` comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Clause {
    pub left: Selector,
    pub right: Selector,
    /// `false` for `!=`
    pub equals: bool,
}

impl Clause {
    pub fn new(left: Selector, right: Selector, equals: bool) -> Self {
        Clause {
            left,
            right,
            equals,
        }
    }
}

/// Clause and operand counts produced by the sizing pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Shape {
    pub clause_count: u16,
    pub number_count: u16,
}

impl Shape {
    pub const HEADER_SIZE: usize = size_of::<CompiledCondition>();
    pub const CLAUSE_SIZE: usize = size_of::<Clause>();
    pub const NUMBER_SIZE: usize = size_of::<NumberUnion>();

    /// Total byte size of a condition with this shape
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE
            + self.clause_count as usize * Self::CLAUSE_SIZE
            + self.number_count as usize * Self::NUMBER_SIZE
    }
}

/// Immutable compiled condition
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    size: usize,
    shape: Shape,
    clauses: Box<[Clause]>,
    numbers: Box<[NumberUnion]>,
    fingerprint: u64,
}

impl CompiledCondition {
    /// Assemble a condition from arrays filled by the build pass.
    ///
    /// # Panics
    ///
    /// Panics if the arrays disagree with `shape`.
    pub(crate) fn from_parts(shape: Shape, clauses: Vec<Clause>, numbers: Vec<NumberUnion>) -> Self {
        assert_eq!(
            clauses.len(),
            shape.clause_count as usize,
            "clause count differs between sizing and build pass"
        );
        assert_eq!(
            numbers.len(),
            shape.number_count as usize,
            "number count differs between sizing and build pass"
        );

        let size = shape.size();
        let fingerprint = fingerprint(size, shape, &clauses, &numbers);
        CompiledCondition {
            size,
            shape,
            clauses: clauses.into_boxed_slice(),
            numbers: numbers.into_boxed_slice(),
            fingerprint,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn clause_count(&self) -> u16 {
        self.shape.clause_count
    }

    pub fn number_count(&self) -> u16 {
        self.shape.number_count
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn numbers(&self) -> &[NumberUnion] {
        &self.numbers
    }

    /// xxh3 hash of the header and trailing layout
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl PartialEq for CompiledCondition {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.shape == other.shape
            && self.fingerprint == other.fingerprint
            && self.clauses == other.clauses
            && self.numbers == other.numbers
    }
}

impl Eq for CompiledCondition {}

impl fmt::Display for CompiledCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numbers = self.numbers.iter();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write_operand(f, clause.left, &mut numbers)?;
            f.write_str(if clause.equals { "=" } else { "!=" })?;
            write_operand(f, clause.right, &mut numbers)?;
        }
        Ok(())
    }
}

fn write_operand<'a>(
    f: &mut fmt::Formatter<'_>,
    selector: Selector,
    numbers: &mut impl Iterator<Item = &'a NumberUnion>,
) -> fmt::Result {
    match selector {
        Selector::Number => match numbers.next() {
            Some(number) => write!(f, "{}", number),
            None => Err(fmt::Error),
        },
        keyword => write!(f, "{}", keyword),
    }
}

fn fingerprint(size: usize, shape: Shape, clauses: &[Clause], numbers: &[NumberUnion]) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(&(size as u64).to_le_bytes());
    hasher.update(&shape.clause_count.to_le_bytes());
    hasher.update(&shape.number_count.to_le_bytes());
    for clause in clauses {
        hasher.update(&[clause.left.tag(), clause.right.tag(), clause.equals as u8]);
    }
    for number in numbers {
        number.hash_into(&mut hasher);
    }
    hasher.digest()
}

//! Optional language capabilities.
//!
//! A [`FeatureSet`] is fixed when a program is compiled. The lexer uses it to
//! decide which keywords and brackets exist, the parser uses it to decide which
//! grammar branches are legal, and the interpreter only consults it for the
//! `rand` pseudo-variable.

use std::fmt;
use std::ops::{BitOr, Sub};

use bitflags::bitflags;

bitflags! {
    /// Immutable set of features supporting union, difference and subset tests.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct FeatureSet: u8 {
        /// `if` / `else` blocks.
        const CONDITIONAL = 1 << 0;
        /// `elif` branches inside an if-chain.
        const ELSE_IF = 1 << 1;
        /// Array literals, index reads and index assignment.
        const ARRAY = 1 << 2;
        /// The `rand` pseudo-variable.
        const RANDOM_VAR = 1 << 3;
        /// `for` loops.
        const LOOP = 1 << 4;
        /// `func` declarations, calls and `return`.
        const FUNCTION = 1 << 5;
    }
}

impl FeatureSet {
    /// Only assignment and integer arithmetic.
    pub const NONE: FeatureSet = FeatureSet::empty();
    /// Every optional feature.
    pub const ALL: FeatureSet = FeatureSet::all();
}

/// A single feature tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Conditional,
    ElseIf,
    Array,
    RandomVar,
    Loop,
    Function,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Conditional,
        Feature::ElseIf,
        Feature::Array,
        Feature::RandomVar,
        Feature::Loop,
        Feature::Function,
    ];

    pub const fn flag(self) -> FeatureSet {
        match self {
            Feature::Conditional => FeatureSet::CONDITIONAL,
            Feature::ElseIf => FeatureSet::ELSE_IF,
            Feature::Array => FeatureSet::ARRAY,
            Feature::RandomVar => FeatureSet::RANDOM_VAR,
            Feature::Loop => FeatureSet::LOOP,
            Feature::Function => FeatureSet::FUNCTION,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::Conditional => "CONDITIONAL",
            Feature::ElseIf => "ELSE_IF",
            Feature::Array => "ARRAY",
            Feature::RandomVar => "RANDOM_VAR",
            Feature::Loop => "LOOP",
            Feature::Function => "FUNCTION",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|feature| feature.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Feature> for FeatureSet {
    fn from(feature: Feature) -> Self {
        feature.flag()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FeatureSet::NONE, |set, feature| set | feature.flag())
    }
}

impl BitOr for Feature {
    type Output = FeatureSet;

    fn bitor(self, rhs: Feature) -> FeatureSet {
        self.flag() | rhs.flag()
    }
}

impl BitOr<Feature> for FeatureSet {
    type Output = FeatureSet;

    fn bitor(self, rhs: Feature) -> FeatureSet {
        self | rhs.flag()
    }
}

impl Sub<Feature> for FeatureSet {
    type Output = FeatureSet;

    fn sub(self, rhs: Feature) -> FeatureSet {
        self - rhs.flag()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.iter_names().map(|(name, _)| name).collect::<Vec<_>>();
        write!(f, "<FeatureSet {}>", names.join(","))
    }
}

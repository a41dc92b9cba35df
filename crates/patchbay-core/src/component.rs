//! Component descriptors.
//!
//! Every node names the processor it wants with a [`ComponentDescription`]: a
//! type/subtype/manufacturer triple of [`FourCc`] codes. The triple is resolved
//! against a [`ComponentRegistry`](crate::ComponentRegistry) when the graph is
//! opened. An all-zero code is a wildcard, which is only meaningful in registry
//! patterns, never in a concrete node.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// A four-character code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// The all-zero wildcard code.
    pub const WILDCARD: Self = Self([0; 4]);

    /// Creates a code from four bytes.
    #[inline]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// Returns true for the all-zero wildcard.
    #[inline]
    pub fn is_wildcard(self) -> bool {
        self.0 == [0; 4]
    }

    /// Returns true if every byte is printable ASCII (space included).
    pub fn is_printable(self) -> bool {
        self.0.iter().all(|b| (0x20..=0x7e).contains(b))
    }

    /// Returns the code as a big-endian integer.
    #[inline]
    pub fn as_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.as_u32())
        }
    }
}

/// Error returned when a string is not a valid four-character code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a four-character ASCII code")]
pub struct ParseFourCcError(pub String);

impl FromStr for FourCc {
    type Err = ParseFourCcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        match <[u8; 4]>::try_from(bytes) {
            Ok(code) if s.is_ascii() => Ok(Self(code)),
            _ => Err(ParseFourCcError(s.to_string())),
        }
    }
}

/// Well-known component types.
pub mod types {
    use super::FourCc;

    /// Output unit. At most one output node may exist per graph.
    pub const OUTPUT: FourCc = FourCc(*b"auou");
    /// Effect: one input, one output.
    pub const EFFECT: FourCc = FourCc(*b"aufx");
    /// Generator: produces signal without inputs.
    pub const GENERATOR: FourCc = FourCc(*b"augn");
    /// Mixer: many inputs, one output.
    pub const MIXER: FourCc = FourCc(*b"aumx");
    /// Format converter: routing and channel shuffling.
    pub const FORMAT_CONVERTER: FourCc = FourCc(*b"aufc");
    /// Nested graph. Only created through `Graph::add_subgraph_node`.
    pub const SUB_GRAPH: FourCc = FourCc(*b"augr");
}

/// Manufacturer code used by the built-in components.
pub const MANUFACTURER: FourCc = FourCc(*b"pbay");

/// Type/subtype/manufacturer triple identifying a processor implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentDescription {
    /// Broad category, e.g. [`types::EFFECT`].
    pub component_type: FourCc,
    /// Specific component within the category.
    pub subtype: FourCc,
    /// Vendor code.
    pub manufacturer: FourCc,
}

impl ComponentDescription {
    /// Description carried by sub-graph nodes.
    pub const SUB_GRAPH: Self = Self::new(types::SUB_GRAPH, FourCc(*b"nest"), MANUFACTURER);

    /// Creates a description from its three codes.
    pub const fn new(component_type: FourCc, subtype: FourCc, manufacturer: FourCc) -> Self {
        Self {
            component_type,
            subtype,
            manufacturer,
        }
    }

    /// Creates a description from byte literals, e.g. `from_bytes(b"aufx", b"gain", b"pbay")`.
    pub const fn from_bytes(component_type: &[u8; 4], subtype: &[u8; 4], manufacturer: &[u8; 4]) -> Self {
        Self::new(
            FourCc(*component_type),
            FourCc(*subtype),
            FourCc(*manufacturer),
        )
    }

    /// Pattern matching every component of one type.
    pub const fn any_of_type(component_type: FourCc) -> Self {
        Self::new(component_type, FourCc::WILDCARD, FourCc::WILDCARD)
    }

    /// True if this describes an output unit.
    #[inline]
    pub fn is_output(&self) -> bool {
        self.component_type == types::OUTPUT
    }

    /// True if this describes a nested graph.
    #[inline]
    pub fn is_sub_graph(&self) -> bool {
        self.component_type == types::SUB_GRAPH
    }

    /// A concrete description: printable codes, no wildcard type or subtype.
    pub fn is_well_formed(&self) -> bool {
        self.component_type.is_printable()
            && self.subtype.is_printable()
            && self.manufacturer.is_printable()
            && !self.component_type.is_wildcard()
            && !self.subtype.is_wildcard()
    }

    /// Treats `self` as a pattern: wildcard fields match anything.
    pub fn matches(&self, candidate: &ComponentDescription) -> bool {
        fn field(pattern: FourCc, value: FourCc) -> bool {
            pattern.is_wildcard() || pattern == value
        }
        field(self.component_type, candidate.component_type)
            && field(self.subtype, candidate.subtype)
            && field(self.manufacturer, candidate.manufacturer)
    }
}

impl fmt::Display for ComponentDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.component_type, self.subtype, self.manufacturer
        )
    }
}

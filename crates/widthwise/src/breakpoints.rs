#![forbid(unsafe_code)]

//! Ordered, named width regions and the width-to-region match.
//!
//! # Design
//!
//! A [`Breakpoints`] table is an ordered list of [`Region`]s, each pairing a
//! name with an exclusive upper width bound. Matching scans in order and
//! returns the first region whose bound strictly exceeds the probed width;
//! widths at or beyond every bound match nothing.
//!
//! Bound ordering is the caller's contract: [`Breakpoints::new`] accepts the
//! list as given and the scan semantics stay well-defined (first match wins)
//! even when bounds are not ascending. [`Breakpoints::strict`] is the opt-in
//! validated constructor for callers that want the contract checked.
//!
//! # Invariants
//!
//! 1. `region_for(w)` returns the first region in list order with
//!    `w < max_width`, or `None`.
//! 2. Matching never allocates and never fails; an empty table matches
//!    nothing.
//! 3. `strict` accepts exactly the tables with strictly ascending bounds and
//!    pairwise distinct names.

use std::rc::Rc;

use thiserror::Error;

/// Why a region table failed [`Breakpoints::strict`] validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakpointsError {
    /// Adjacent bounds were not strictly ascending.
    #[error("region `{name}` bound {bound} does not exceed preceding bound {prev}")]
    UnorderedBounds {
        /// Name of the offending region.
        name: String,
        /// Bound of the preceding region.
        prev: u16,
        /// Bound of the offending region.
        bound: u16,
    },
    /// The same name appeared more than once.
    #[error("duplicate region name `{name}`")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// One named width region: matches widths strictly below `max_width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    name: Rc<str>,
    max_width: u16,
}

impl Region {
    /// Create a region matching widths in `..max_width`.
    pub fn new(name: impl Into<Rc<str>>, max_width: u16) -> Self {
        Self {
            name: name.into(),
            max_width,
        }
    }

    /// Region name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exclusive upper width bound.
    #[must_use]
    pub fn max_width(&self) -> u16 {
        self.max_width
    }

    /// Whether `width` falls inside this region.
    #[must_use]
    pub fn contains(&self, width: u16) -> bool {
        width < self.max_width
    }

    pub(crate) fn name_shared(&self) -> Rc<str> {
        Rc::clone(&self.name)
    }
}

/// Ordered list of named width regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakpoints {
    regions: Vec<Region>,
}

impl Breakpoints {
    /// Create a table from regions in match order. No validation is
    /// performed; see [`Breakpoints::strict`] for the checked variant.
    pub fn new(regions: impl IntoIterator<Item = Region>) -> Self {
        Self {
            regions: regions.into_iter().collect(),
        }
    }

    /// Create a table, rejecting bounds that are not strictly ascending and
    /// names that repeat.
    pub fn strict(regions: impl IntoIterator<Item = Region>) -> Result<Self, BreakpointsError> {
        let regions: Vec<Region> = regions.into_iter().collect();
        for (ix, region) in regions.iter().enumerate() {
            if ix > 0 && region.max_width <= regions[ix - 1].max_width {
                return Err(BreakpointsError::UnorderedBounds {
                    name: region.name().to_string(),
                    prev: regions[ix - 1].max_width,
                    bound: region.max_width,
                });
            }
            if regions[..ix].iter().any(|r| r.name == region.name) {
                return Err(BreakpointsError::DuplicateName {
                    name: region.name().to_string(),
                });
            }
        }
        Ok(Self { regions })
    }

    /// Start building a table with chained `region` calls.
    #[must_use]
    pub fn builder() -> BreakpointsBuilder {
        BreakpointsBuilder {
            regions: Vec::new(),
        }
    }

    /// First region in order whose bound strictly exceeds `width`.
    #[must_use]
    pub fn region_for(&self, width: u16) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(width))
    }

    /// Name of the matching region, if any.
    #[must_use]
    pub fn name_for(&self, width: u16) -> Option<&str> {
        self.region_for(width).map(Region::name)
    }

    /// Regions in match order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the table has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Chained constructor for [`Breakpoints`].
#[derive(Debug, Default)]
pub struct BreakpointsBuilder {
    regions: Vec<Region>,
}

impl BreakpointsBuilder {
    /// Append a region; order of calls is match order.
    #[must_use]
    pub fn region(mut self, name: impl Into<Rc<str>>, max_width: u16) -> Self {
        self.regions.push(Region::new(name, max_width));
        self
    }

    /// Finish without validation.
    #[must_use]
    pub fn build(self) -> Breakpoints {
        Breakpoints::new(self.regions)
    }

    /// Finish with [`Breakpoints::strict`] validation.
    pub fn build_strict(self) -> Result<Breakpoints, BreakpointsError> {
        Breakpoints::strict(self.regions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

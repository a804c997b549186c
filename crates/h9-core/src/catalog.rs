//! Static module/algorithm catalog.
//!
//! The H9 groups its effects into modules (the algorithm sets of the
//! Factor pedals plus the H9-only set), each holding an ordered list of
//! algorithms. The table is `'static` and never mutated, so a
//! `&'static Catalog` can be shared freely.
//!
//! # Example
//!
//! ```
//! use h9_core::catalog::Catalog;
//!
//! let catalog = Catalog::h9();
//! assert_eq!(catalog.module(0).unwrap().name, "TimeFactor");
//! assert_eq!(catalog.algorithm(3, 7).unwrap().name, "BlackHole");
//! ```

use crate::error::{H9Error, H9Result};

/// Largest module or algorithm count a dump can address. Both indices
/// travel as a single 7-bit byte.
pub const MAX_CATALOG_ENTRIES: usize = 128;

/// A single algorithm (effect variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Algorithm {
    /// Display name.
    pub name: &'static str,
}

impl Algorithm {
    /// Create a new algorithm entry.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

/// A module: a named, ordered set of algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Module {
    /// Display name.
    pub name: &'static str,
    /// Algorithms in device order.
    pub algorithms: &'static [Algorithm],
}

impl Module {
    /// Create a new module entry.
    pub const fn new(name: &'static str, algorithms: &'static [Algorithm]) -> Self {
        Self { name, algorithms }
    }

    /// Number of algorithms in this module.
    #[inline]
    pub const fn algorithm_count(&self) -> usize {
        self.algorithms.len()
    }

    /// Algorithm names in order.
    pub fn algorithm_names(&self) -> Vec<&'static str> {
        self.algorithms.iter().map(|alg| alg.name).collect()
    }
}

/// Read-only table of modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    modules: &'static [Module],
}

// =============================================================================
// H9 Table
// =============================================================================

const TIME_FACTOR: &[Algorithm] = &[
    Algorithm::new("Digital Delay"),
    Algorithm::new("Vintage Delay"),
    Algorithm::new("Tape Echo"),
    Algorithm::new("Mod Delay"),
    Algorithm::new("Ducked Delay"),
    Algorithm::new("Band Delay"),
    Algorithm::new("Filter Pong"),
    Algorithm::new("MultiTap"),
    Algorithm::new("Reverse"),
    Algorithm::new("Looper"),
];

const MOD_FACTOR: &[Algorithm] = &[
    Algorithm::new("Chorus"),
    Algorithm::new("Phaser"),
    Algorithm::new("Q-Wah"),
    Algorithm::new("Flanger"),
    Algorithm::new("ModFilter"),
    Algorithm::new("Rotary"),
    Algorithm::new("TremoloPan"),
    Algorithm::new("Vibrato"),
    Algorithm::new("Undulator"),
    Algorithm::new("RingMod"),
];

const PITCH_FACTOR: &[Algorithm] = &[
    Algorithm::new("Diatonic"),
    Algorithm::new("Quadravox"),
    Algorithm::new("HarModulator"),
    Algorithm::new("MicroPitch"),
    Algorithm::new("H910/H949"),
    Algorithm::new("PitchFlex"),
    Algorithm::new("Octaver"),
    Algorithm::new("Crystals"),
    Algorithm::new("HarPeggiator"),
    Algorithm::new("Synthonizer"),
];

const SPACE: &[Algorithm] = &[
    Algorithm::new("Hall"),
    Algorithm::new("Room"),
    Algorithm::new("Plate"),
    Algorithm::new("Spring"),
    Algorithm::new("DualVerb"),
    Algorithm::new("Reverse"),
    Algorithm::new("ModEchoVerb"),
    Algorithm::new("BlackHole"),
    Algorithm::new("MangledVerb"),
    Algorithm::new("TremoloVerb"),
    Algorithm::new("DynaVerb"),
    Algorithm::new("Shimmer"),
];

const H9_ONLY: &[Algorithm] = &[
    Algorithm::new("UltraTap"),
    Algorithm::new("Resonator"),
    Algorithm::new("EQ Compressor"),
    Algorithm::new("CrushStation"),
    Algorithm::new("SpaceTime"),
    Algorithm::new("Sculpt"),
    Algorithm::new("PitchFuzz"),
    Algorithm::new("Harmadillo"),
    Algorithm::new("TriCeratops"),
    Algorithm::new("Polyphony"),
];

const H9_MODULES: &[Module] = &[
    Module::new("TimeFactor", TIME_FACTOR),
    Module::new("ModFactor", MOD_FACTOR),
    Module::new("PitchFactor", PITCH_FACTOR),
    Module::new("Space", SPACE),
    Module::new("H9", H9_ONLY),
];

static H9_CATALOG: Catalog = Catalog::new(H9_MODULES);

/// Number of modules in the H9 catalog.
pub const H9_NUM_MODULES: usize = H9_MODULES.len();

impl Catalog {
    /// Build a catalog over a static module table.
    ///
    /// # Panics
    ///
    /// Panics if there are more than [`MAX_CATALOG_ENTRIES`] modules, or a
    /// module holds more than [`MAX_CATALOG_ENTRIES`] algorithms. In a
    /// `static` initializer this is a compile error.
    pub const fn new(modules: &'static [Module]) -> Self {
        assert!(modules.len() <= MAX_CATALOG_ENTRIES, "too many modules");
        let mut i = 0;
        while i < modules.len() {
            assert!(
                modules[i].algorithms.len() <= MAX_CATALOG_ENTRIES,
                "too many algorithms in module"
            );
            i += 1;
        }
        Self { modules }
    }

    /// The stock H9 catalog.
    pub fn h9() -> &'static Catalog {
        &H9_CATALOG
    }

    /// Number of modules.
    #[inline]
    pub const fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Look up a module by index.
    pub fn module(&self, index: usize) -> H9Result<&'static Module> {
        self.modules.get(index).ok_or(H9Error::IndexOutOfRange {
            what: "Module",
            index,
            len: self.modules.len(),
        })
    }

    /// Number of algorithms in a module.
    pub fn algorithm_count(&self, module: usize) -> H9Result<usize> {
        Ok(self.module(module)?.algorithm_count())
    }

    /// Look up an algorithm by module and algorithm index.
    pub fn algorithm(&self, module: usize, algorithm: usize) -> H9Result<&'static Algorithm> {
        let entry = self.module(module)?;
        entry.algorithms.get(algorithm).ok_or(H9Error::IndexOutOfRange {
            what: "Algorithm",
            index: algorithm,
            len: entry.algorithm_count(),
        })
    }

    /// Iterate over modules in order.
    pub fn modules(&self) -> impl Iterator<Item = &'static Module> {
        self.modules.iter()
    }

    /// Find a module index by name (case-insensitive).
    pub fn find_module(&self, name: &str) -> Option<usize> {
        self.modules
            .iter()
            .position(|module| module.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h9_shape() {
        let catalog = Catalog::h9();
        assert_eq!(catalog.module_count(), H9_NUM_MODULES);
        assert_eq!(catalog.module_count(), 5);
        assert_eq!(catalog.algorithm_count(3).unwrap(), 12);
        assert!(catalog.modules().all(|m| m.algorithm_count() > 0));
    }

    #[test]
    fn test_module_out_of_range() {
        let catalog = Catalog::h9();
        assert_eq!(
            catalog.module(5),
            Err(H9Error::IndexOutOfRange { what: "Module", index: 5, len: 5 })
        );
        assert!(catalog.algorithm_count(42).is_err());
    }

    #[test]
    fn test_algorithm_out_of_range() {
        let catalog = Catalog::h9();
        assert_eq!(catalog.algorithm(0, 9).unwrap().name, "Looper");
        assert_eq!(
            catalog.algorithm(0, 10),
            Err(H9Error::IndexOutOfRange { what: "Algorithm", index: 10, len: 10 })
        );
    }

    #[test]
    fn test_find_module() {
        let catalog = Catalog::h9();
        assert_eq!(catalog.find_module("space"), Some(3));
        assert_eq!(catalog.find_module("Fuzz Factory"), None);
    }

    #[test]
    fn test_custom_catalog() {
        static ALGS: &[Algorithm] = &[Algorithm::new("Only")];
        static MODULES: &[Module] = &[Module::new("Solo", ALGS)];
        let catalog = Catalog::new(MODULES);
        assert_eq!(catalog.module(0).unwrap().algorithm_names(), vec!["Only"]);
    }

    #[test]
    fn test_catalog_at_index_limit() {
        static ALGS: [Algorithm; MAX_CATALOG_ENTRIES] = [Algorithm::new("x"); MAX_CATALOG_ENTRIES];
        static MODULES: &[Module] = &[Module::new("Full", &ALGS)];
        let catalog = Catalog::new(MODULES);
        assert_eq!(catalog.algorithm_count(0).unwrap(), 128);
        assert!(catalog.algorithm(0, 127).is_ok());
    }

    #[test]
    #[should_panic(expected = "too many algorithms")]
    fn test_oversize_module_rejected() {
        static ALGS: [Algorithm; 130] = [Algorithm::new("x"); 130];
        static MODULES: &[Module] = &[Module::new("Big", &ALGS)];
        let _ = Catalog::new(MODULES);
    }
}

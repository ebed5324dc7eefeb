//! Layout suggestions shown in the popup
//!
//! There is no window detection yet: [`RandomSuggestions`] picks presets
//! from a fixed catalog. Anything smarter plugs in behind
//! [`SuggestionSource`].

mod catalog;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub use catalog::catalog;

/// Rectangle of a layout, in fractions of the screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region lies inside the unit square
    pub fn is_normalized(&self) -> bool {
        let within = |v: f32| (0.0..=1.0).contains(&v);
        within(self.x)
            && within(self.y)
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + 1e-4
            && self.y + self.height <= 1.0 + 1e-4
    }
}

/// A suggested arrangement of windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub description: String,
    pub regions: Vec<Region>,
}

/// Produces the layouts displayed each time the popup opens
pub trait SuggestionSource {
    fn generate(&mut self) -> Vec<Layout>;
}

/// Picks `count` distinct layouts from the catalog at random
pub struct RandomSuggestions {
    rng: StdRng,
    count: usize,
    catalog: Vec<Layout>,
}

impl RandomSuggestions {
    pub const DEFAULT_COUNT: usize = 3;

    pub fn new(count: usize) -> Self {
        Self::with_rng(StdRng::from_os_rng(), count)
    }

    /// Deterministic picks
    #[cfg(test)]
    pub fn seeded(seed: u64, count: usize) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), count)
    }

    fn with_rng(rng: StdRng, count: usize) -> Self {
        let catalog = catalog();
        debug_assert!(catalog
            .iter()
            .all(|layout| layout.regions.iter().all(Region::is_normalized)));

        Self {
            rng,
            count,
            catalog,
        }
    }
}

impl Default for RandomSuggestions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COUNT)
    }
}

impl SuggestionSource for RandomSuggestions {
    fn generate(&mut self) -> Vec<Layout> {
        self.catalog
            .choose_multiple(&mut self.rng, self.count)
            .cloned()
            .collect()
    }
}

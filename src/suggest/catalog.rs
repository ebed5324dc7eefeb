//! Built-in layout presets

use super::{Layout, Region};

fn layout(name: &str, description: &str, regions: &[Region]) -> Layout {
    Layout {
        name: name.to_string(),
        description: description.to_string(),
        regions: regions.to_vec(),
    }
}

/// All presets the random source can pick from
pub fn catalog() -> Vec<Layout> {
    vec![
        layout(
            "Side by side",
            "Two windows splitting the screen vertically",
            &[
                Region::new(0.0, 0.0, 0.5, 1.0),
                Region::new(0.5, 0.0, 0.5, 1.0),
            ],
        ),
        layout(
            "Stacked",
            "Two windows splitting the screen horizontally",
            &[
                Region::new(0.0, 0.0, 1.0, 0.5),
                Region::new(0.0, 0.5, 1.0, 0.5),
            ],
        ),
        layout(
            "Thirds",
            "Three equal columns",
            &[
                Region::new(0.0, 0.0, 1.0 / 3.0, 1.0),
                Region::new(1.0 / 3.0, 0.0, 1.0 / 3.0, 1.0),
                Region::new(2.0 / 3.0, 0.0, 1.0 / 3.0, 1.0),
            ],
        ),
        layout(
            "Quadrants",
            "Four windows, one per corner",
            &[
                Region::new(0.0, 0.0, 0.5, 0.5),
                Region::new(0.5, 0.0, 0.5, 0.5),
                Region::new(0.0, 0.5, 0.5, 0.5),
                Region::new(0.5, 0.5, 0.5, 0.5),
            ],
        ),
        layout(
            "Main and stack",
            "One large window with two stacked on the right",
            &[
                Region::new(0.0, 0.0, 0.65, 1.0),
                Region::new(0.65, 0.0, 0.35, 0.5),
                Region::new(0.65, 0.5, 0.35, 0.5),
            ],
        ),
        layout(
            "Focus",
            "A single centered window",
            &[Region::new(0.15, 0.1, 0.7, 0.8)],
        ),
        layout(
            "Wide and narrow",
            "A two-thirds window next to a one-third sidebar",
            &[
                Region::new(0.0, 0.0, 2.0 / 3.0, 1.0),
                Region::new(2.0 / 3.0, 0.0, 1.0 / 3.0, 1.0),
            ],
        ),
    ]
}

use std::collections::BTreeSet;

use log::debug;

use crate::nav::Section;
use crate::scroll::PageLayout;

/// Remembers which sections have entered the viewport. A section is
/// revealed the first time any part of it is visible and stays revealed.
#[derive(Debug, Clone, Default)]
pub struct RevealTracker {
    revealed: BTreeSet<Section>,
}

impl RevealTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the section's viewport-relative bounds; returns `true` only on
    /// the observation that reveals it.
    pub fn observe(
        &mut self,
        section: Section,
        top: f64,
        bottom: f64,
        viewport_height: f64,
    ) -> bool {
        let visible = top < viewport_height && bottom > 0.0;
        if visible && self.revealed.insert(section) {
            debug!("revealed section {section}");
            return true;
        }
        false
    }

    /// Observes every section of `layout` at `scroll_y` and returns the ones
    /// revealed by this call, in page order.
    pub fn observe_page(&mut self, layout: &PageLayout, scroll_y: f64) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|&section| {
                let (top, bottom) = layout.section_bounds(section, scroll_y);
                self.observe(section, top, bottom, layout.viewport_height())
            })
            .collect()
    }

    pub fn is_revealed(&self, section: Section) -> bool {
        self.revealed.contains(&section)
    }

    pub fn revealed(&self) -> impl Iterator<Item = Section> + '_ {
        self.revealed.iter().copied()
    }
}

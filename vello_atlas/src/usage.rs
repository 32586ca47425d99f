// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recency bookkeeping for plots.

use smallvec::SmallVec;
use static_assertions::const_assert;

use crate::draw_op_atlas::{MAX_MULTITEXTURE_PAGES, MAX_PLOTS};
use crate::plot::{AtlasLocator, PlotLocator};

// One bit per plot in a page's bitmask.
const_assert!(MAX_PLOTS <= u32::BITS);

/// The plots of one page, most recently used first.
#[derive(Clone, Debug)]
pub(crate) struct MruList {
    order: SmallVec<[u32; MAX_PLOTS as usize]>,
}

impl MruList {
    /// A list of plots `0..count`, with plot 0 as the most recently used.
    pub(crate) fn new(count: u32) -> Self {
        Self {
            order: (0..count).collect(),
        }
    }

    /// Move `plot_index` to the front.
    pub(crate) fn make_mru(&mut self, plot_index: u32) {
        if self.order.first() == Some(&plot_index) {
            return;
        }
        if let Some(position) = self.order.iter().position(|&index| index == plot_index) {
            self.order.remove(position);
            self.order.insert(0, plot_index);
        }
    }

    /// Plot indices from most to least recently used.
    pub(crate) fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.order.iter().copied()
    }
}

/// Collects the plots a draw reads so they can be marked used in one pass.
///
/// Every plot is recorded once, however many locators into it are added. The plot is
/// recorded at the generation of the first locator added for it, and is only marked
/// if it still has that generation when the update is applied.
#[derive(Clone, Debug, Default)]
pub struct BulkUseTokenUpdater {
    plots_to_update: SmallVec<[PlotLocator; 4]>,
    already_updated: [u32; MAX_MULTITEXTURE_PAGES as usize],
}

impl BulkUseTokenUpdater {
    /// An empty updater.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the plot behind `locator`.
    ///
    /// Returns `false` if it was already recorded or the locator is invalid.
    pub fn add(&mut self, locator: &AtlasLocator) -> bool {
        let page_index = locator.page_index();
        let plot_index = locator.plot_index();
        if !locator.is_valid() || plot_index >= MAX_PLOTS {
            return false;
        }
        let Some(mask) = self.already_updated.get_mut(page_index as usize) else {
            return false;
        };
        let bit = 1_u32 << plot_index;
        if *mask & bit != 0 {
            return false;
        }
        *mask |= bit;
        self.plots_to_update.push(locator.plot_locator());
        true
    }

    /// Forget every recorded plot.
    pub fn reset(&mut self) {
        self.plots_to_update.clear();
        self.already_updated = [0; MAX_MULTITEXTURE_PAGES as usize];
    }

    /// Number of distinct plots recorded.
    pub fn len(&self) -> usize {
        self.plots_to_update.len()
    }

    /// Whether no plot is recorded.
    pub fn is_empty(&self) -> bool {
        self.plots_to_update.is_empty()
    }

    /// The recorded plots, in insertion order.
    pub(crate) fn plots(&self) -> impl Iterator<Item = PlotLocator> + '_ {
        self.plots_to_update.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::AtlasRect;

    fn locator(page: u32, plot: u32) -> AtlasLocator {
        AtlasLocator::new(PlotLocator::new(page, plot, 1), AtlasRect::default())
    }

    #[test]
    fn mru_moves_to_front() {
        let mut list = MruList::new(4);
        list.make_mru(2);
        list.make_mru(3);
        assert_eq!(list.iter().collect::<Vec<_>>(), [3, 2, 0, 1]);
        list.make_mru(3);
        assert_eq!(list.iter().collect::<Vec<_>>(), [3, 2, 0, 1]);
    }

    #[test]
    fn plots_are_deduplicated() {
        let mut updater = BulkUseTokenUpdater::new();
        assert!(updater.add(&locator(0, 5)));
        assert!(!updater.add(&locator(0, 5)));
        assert!(updater.add(&locator(1, 5)));
        assert!(updater.add(&locator(0, 31)));
        assert_eq!(updater.len(), 3);
        let plots: Vec<_> = updater
            .plots()
            .map(|plot| (plot.page_index(), plot.plot_index()))
            .collect();
        assert_eq!(plots, [(0, 5), (1, 5), (0, 31)]);

        updater.reset();
        assert!(updater.is_empty());
        assert!(updater.add(&locator(0, 5)));
    }

    #[test]
    fn invalid_locators_are_ignored() {
        let mut updater = BulkUseTokenUpdater::new();
        assert!(!updater.add(&AtlasLocator::default()));
        assert!(!updater.add(&locator(MAX_MULTITEXTURE_PAGES, 0)));
        assert!(updater.is_empty());
    }
}

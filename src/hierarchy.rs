//! Two-level temporal hierarchy over a block's iterations
//!
//! Iteration windows are cut into groups of `group_size` consecutive
//! iterations and each group into sublayers of `sublayer_size`. Only the
//! final group and the final sublayer of a group may be short.

use crate::blocks::IterationWindow;
use crate::config::{ConfigError, HierarchyConfig};
use serde::Serialize;

/// Position of a sublayer in the hierarchy
///
/// `global_index = group_index * (group_size / sublayer_size) + sublayer_index`,
/// so it increases strictly across groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SublayerAddress {
    pub group_index: usize,
    pub sublayer_index: usize,
    pub global_index: usize,
}

/// A run of up to `sublayer_size` consecutive iteration windows
#[derive(Debug, Clone, PartialEq)]
pub struct Sublayer<'w> {
    pub address: SublayerAddress,
    pub members: &'w [IterationWindow],
}

impl<'w> Sublayer<'w> {
    fn first(&self) -> Option<&IterationWindow> {
        self.members.first()
    }

    fn last(&self) -> Option<&IterationWindow> {
        self.members.last()
    }

    /// Start of the first member
    pub fn start(&self) -> u64 {
        self.first().map_or(0, |w| w.start)
    }

    /// End of the last member
    ///
    /// Gaps and overlaps between intervening members do not affect the window.
    pub fn end(&self) -> u64 {
        self.last().map_or(0, |w| w.end)
    }

    /// `end - start` when positive, else 0
    pub fn window_len(&self) -> u64 {
        self.end().saturating_sub(self.start())
    }

    pub fn first_iter(&self) -> usize {
        self.first().map_or(0, |w| w.iter_id)
    }

    pub fn last_iter(&self) -> usize {
        self.last().map_or(0, |w| w.iter_id)
    }
}

/// A run of up to `group_size` consecutive iteration windows
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'w> {
    pub index: usize,
    pub sublayers: Vec<Sublayer<'w>>,
}

/// Splits iteration windows into groups and sublayers
#[derive(Debug, Clone, Copy)]
pub struct Grouper {
    config: HierarchyConfig,
}

impl Grouper {
    /// Fails when `sublayer_size` is not a positive divisor of `group_size`
    pub fn new(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config: *config })
    }

    pub fn sublayers_per_group(&self) -> usize {
        self.config.sublayers_per_group()
    }

    /// Partition `windows`, in iteration order, into groups of sublayers
    ///
    /// # Example
    /// ```
    /// use stallscope::blocks::IterationWindow;
    /// use stallscope::config::HierarchyConfig;
    /// use stallscope::hierarchy::Grouper;
    ///
    /// let windows: Vec<_> = (0..25u64)
    ///     .map(|i| IterationWindow { iter_id: i as usize + 1, start: i * 10, end: i * 10 + 8, instructions: 4 })
    ///     .collect();
    /// let grouper = Grouper::new(&HierarchyConfig { group_size: 10, sublayer_size: 4 });
    /// assert!(grouper.is_err());
    ///
    /// let grouper = Grouper::new(&HierarchyConfig { group_size: 10, sublayer_size: 5 })?;
    /// let groups = grouper.partition(&windows);
    /// assert_eq!(groups.len(), 3);
    /// assert_eq!(groups[2].sublayers.len(), 1);
    /// assert_eq!(groups[2].sublayers[0].address.global_index, 4);
    /// # Ok::<(), stallscope::config::ConfigError>(())
    /// ```
    pub fn partition<'w>(&self, windows: &'w [IterationWindow]) -> Vec<Group<'w>> {
        let per_group = self.sublayers_per_group();
        windows
            .chunks(self.config.group_size)
            .enumerate()
            .map(|(group_index, group)| Group {
                index: group_index,
                sublayers: group
                    .chunks(self.config.sublayer_size)
                    .enumerate()
                    .map(|(sublayer_index, members)| Sublayer {
                        address: SublayerAddress {
                            group_index,
                            sublayer_index,
                            global_index: group_index * per_group + sublayer_index,
                        },
                        members,
                    })
                    .collect(),
            })
            .collect()
    }
}

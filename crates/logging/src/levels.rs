//! crates/logging/src/levels.rs
//! Flag enums and level structures for info and debug verbosity.

/// Info flags for user-facing progress categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InfoFlag {
    /// One line per history file processed.
    Files,
    /// Per-file reconstruction statistics.
    Stats,
}

/// Debug flags for engine diagnostic categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugFlag {
    /// RCS container parsing.
    Rcs,
    /// Revision record pruning.
    Prune,
    /// Diff program application.
    Delta,
    /// Keyword expansion and collapse.
    Keyword,
    /// Scratch store spills and reloads.
    Store,
    /// Blob record emission.
    Emit,
}

impl InfoFlag {
    /// All info flags in declaration order.
    pub const ALL: [Self; 2] = [Self::Files, Self::Stats];

    /// Returns the `tracing` target events for this flag are emitted under.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Files => "blobgen::files",
            Self::Stats => "blobgen::stats",
        }
    }
}

impl DebugFlag {
    /// All debug flags in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Rcs,
        Self::Prune,
        Self::Delta,
        Self::Keyword,
        Self::Store,
        Self::Emit,
    ];

    /// Returns the `tracing` target events for this flag are emitted under.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Rcs => "blobgen::rcs",
            Self::Prune => "blobgen::prune",
            Self::Delta => "blobgen::delta",
            Self::Keyword => "blobgen::keyword",
            Self::Store => "blobgen::store",
            Self::Emit => "blobgen::emit",
        }
    }
}

/// Info verbosity levels for each flag.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoLevels {
    /// Per-file progress level.
    pub files: u8,
    /// Statistics level.
    pub stats: u8,
}

impl InfoLevels {
    /// Get the level for a specific flag.
    pub fn get(&self, flag: InfoFlag) -> u8 {
        match flag {
            InfoFlag::Files => self.files,
            InfoFlag::Stats => self.stats,
        }
    }

    /// Set the level for a specific flag.
    pub fn set(&mut self, flag: InfoFlag, level: u8) {
        match flag {
            InfoFlag::Files => self.files = level,
            InfoFlag::Stats => self.stats = level,
        }
    }

    /// Set all flags to the specified level.
    pub fn set_all(&mut self, level: u8) {
        self.files = level;
        self.stats = level;
    }
}

/// Debug verbosity levels for each flag.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugLevels {
    /// RCS parsing level.
    pub rcs: u8,
    /// Pruning level.
    pub prune: u8,
    /// Diff application level.
    pub delta: u8,
    /// Keyword transform level.
    pub keyword: u8,
    /// Scratch store level.
    pub store: u8,
    /// Blob emission level.
    pub emit: u8,
}

impl DebugLevels {
    /// Get the level for a specific flag.
    pub fn get(&self, flag: DebugFlag) -> u8 {
        match flag {
            DebugFlag::Rcs => self.rcs,
            DebugFlag::Prune => self.prune,
            DebugFlag::Delta => self.delta,
            DebugFlag::Keyword => self.keyword,
            DebugFlag::Store => self.store,
            DebugFlag::Emit => self.emit,
        }
    }

    /// Set the level for a specific flag.
    pub fn set(&mut self, flag: DebugFlag, level: u8) {
        match flag {
            DebugFlag::Rcs => self.rcs = level,
            DebugFlag::Prune => self.prune = level,
            DebugFlag::Delta => self.delta = level,
            DebugFlag::Keyword => self.keyword = level,
            DebugFlag::Store => self.store = level,
            DebugFlag::Emit => self.emit = level,
        }
    }

    /// Set all flags to the specified level.
    pub fn set_all(&mut self, level: u8) {
        for flag in DebugFlag::ALL {
            self.set(flag, level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_levels_round_trip_through_set_and_get() {
        let mut levels = InfoLevels::default();
        levels.set(InfoFlag::Stats, 2);
        assert_eq!(levels.get(InfoFlag::Stats), 2);
        assert_eq!(levels.get(InfoFlag::Files), 0);
    }

    #[test]
    fn debug_set_all_touches_every_flag() {
        let mut levels = DebugLevels::default();
        levels.set_all(3);
        for flag in DebugFlag::ALL {
            assert_eq!(levels.get(flag), 3, "{flag:?}");
        }
    }

    #[test]
    fn targets_are_unique() {
        let mut targets: Vec<_> = DebugFlag::ALL.iter().map(|f| f.target()).collect();
        targets.extend(InfoFlag::ALL.iter().map(|f| f.target()));
        let count = targets.len();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), count);
    }
}

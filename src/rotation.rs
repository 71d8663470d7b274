// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use jiff::civil::Date;

/// Defines when a log file is rolled over.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Rotation {
    /// Roll once the active file would reach `max_size` bytes, keeping at most `max_backups`
    /// numbered backups.
    ///
    /// A `max_backups` of 0 or 1 disables size rotation: the active file grows without bound.
    ///
    /// An empty active file is never rolled, so a single line larger than `max_size` is written
    /// to the fresh file instead of pushing an empty file into the backups.
    Size {
        /// The size cap of the active file in bytes.
        max_size: u64,
        /// The number of numbered backups to keep.
        max_backups: usize,
    },
    /// Roll when the local calendar date moves past the date of the last rotation.
    Daily,
}

/// A snapshot of a writer taken right before a rotation decision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Probe {
    /// Size of the active file, or `None` if no handle is open.
    pub(crate) size: Option<u64>,
    /// Bytes about to be appended.
    pub(crate) pending: u64,
    pub(crate) today: Date,
    pub(crate) last_rotation: Date,
}

impl Rotation {
    pub(crate) fn is_due(&self, probe: &Probe) -> bool {
        match *self {
            Rotation::Size {
                max_size,
                max_backups,
            } => {
                if max_backups <= 1 {
                    return false;
                }
                // an empty file is never rolled, even if a single line exceeds the cap
                probe
                    .size
                    .is_some_and(|size| size > 0 && size.saturating_add(probe.pending) >= max_size)
            }
            Rotation::Daily => probe.today > probe.last_rotation,
        }
    }

    pub(crate) const fn date_format(&self) -> &'static str {
        "%Y-%m-%d"
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn probe(size: Option<u64>, pending: u64) -> Probe {
        Probe {
            size,
            pending,
            today: date(2024, 8, 10),
            last_rotation: date(2024, 8, 10),
        }
    }

    #[test]
    fn test_size_rotation_due_before_cap_is_crossed() {
        let rotation = Rotation::Size {
            max_size: 100,
            max_backups: 3,
        };
        assert!(!rotation.is_due(&probe(Some(60), 39)));
        assert!(rotation.is_due(&probe(Some(60), 40)));
        assert!(rotation.is_due(&probe(Some(120), 0)));
    }

    #[test]
    fn test_size_rotation_requires_open_non_empty_file() {
        let rotation = Rotation::Size {
            max_size: 100,
            max_backups: 3,
        };
        assert!(!rotation.is_due(&probe(None, 500)));
        assert!(!rotation.is_due(&probe(Some(0), 500)));
    }

    #[test]
    fn test_size_rotation_disabled_with_one_backup_or_less() {
        for max_backups in [0, 1] {
            let rotation = Rotation::Size {
                max_size: 100,
                max_backups,
            };
            assert!(!rotation.is_due(&probe(Some(10_000), 100)));
        }
    }

    #[test]
    fn test_daily_rotation_due_on_later_date_only() {
        let mut p = probe(Some(10), 10);
        assert!(!Rotation::Daily.is_due(&p));

        p.today = date(2024, 8, 11);
        assert!(Rotation::Daily.is_due(&p));

        // a clock moving backwards never triggers a rotation
        p.today = date(2024, 8, 9);
        assert!(!Rotation::Daily.is_due(&p));
    }
}

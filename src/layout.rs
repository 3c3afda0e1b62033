//! Day-timeline geometry: vertical placement from the time-to-row mapping and
//! side-by-side column assignment for entries whose intervals overlap.
//!
//! The whole module is a pure function of the entry list; callers recompute it
//! on every draw and never cache across mutations.

use crate::model::ScheduleEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// First visible hour of the day window.
    pub day_start_hour: i32,
    /// Last visible hour of the day window.
    pub day_end_hour: i32,
    /// Minutes per row; drag positions snap to this granularity.
    pub row_minutes: i32,
    /// Pixels (terminal cells) per row.
    pub row_height: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            day_start_hour: 6,
            day_end_hour: 22,
            row_minutes: 15,
            row_height: 1,
        }
    }
}

impl LayoutConfig {
    pub fn window_start(&self) -> i32 {
        self.day_start_hour * 60
    }

    pub fn window_end(&self) -> i32 {
        self.day_end_hour * 60
    }

    pub fn total_rows(&self) -> i32 {
        (self.window_end() - self.window_start()) / self.row_minutes
    }

    pub fn total_height(&self) -> i32 {
        self.total_rows() * self.row_height
    }
}

/// Geometry for one entry, in the same order as the input slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryBox {
    pub index: usize,
    pub top: i32,
    pub height: i32,
    pub column: usize,
    pub columns: usize,
}

/// Compute per-entry geometry for the current schedule.
///
/// Intervals are clamped into the visible window first; an entry wholly
/// outside collapses to a zero-length interval at the nearest edge and keeps
/// a zero height rather than being rejected.
pub fn layout(entries: &[ScheduleEntry], cfg: &LayoutConfig) -> Vec<EntryBox> {
    let spans: Vec<(i32, i32)> = entries
        .iter()
        .map(|e| clamp_span(e.start, e.end, cfg))
        .collect();

    let mut boxes: Vec<EntryBox> = spans
        .iter()
        .enumerate()
        .map(|(index, &(start, end))| EntryBox {
            index,
            top: (start - cfg.window_start()) * cfg.row_height / cfg.row_minutes,
            height: (end - start) * cfg.row_height / cfg.row_minutes,
            column: 0,
            columns: 1,
        })
        .collect();

    for mut cluster in clusters(&spans) {
        // Stable: ties on start keep input order.
        cluster.sort_by_key(|&i| (spans[i].0, i));

        // Greedy coloring; a column is free once its last occupant has ended.
        let mut column_ends: Vec<i32> = Vec::new();
        for &i in &cluster {
            let (start, end) = spans[i];
            let column = match column_ends.iter().position(|&e| e <= start) {
                Some(free) => {
                    column_ends[free] = end;
                    free
                }
                None => {
                    column_ends.push(end);
                    column_ends.len() - 1
                }
            };
            boxes[i].column = column;
        }
        for &i in &cluster {
            boxes[i].columns = column_ends.len();
        }
    }

    boxes
}

/// Half-open intersection test: abutting intervals do not overlap.
pub fn overlaps(a: (i32, i32), b: (i32, i32)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn clamp_span(start: i32, end: i32, cfg: &LayoutConfig) -> (i32, i32) {
    let lo = cfg.window_start();
    let hi = cfg.window_end();
    let start = start.clamp(lo, hi);
    let end = end.clamp(lo, hi);
    (start, end.max(start))
}

/// Connected components of the overlap graph, by transitive closure: grow a
/// group by absorbing any unvisited entry that overlaps any current member.
fn clusters(spans: &[(i32, i32)]) -> Vec<Vec<usize>> {
    let mut visited = vec![false; spans.len()];
    let mut groups = Vec::new();
    for seed in 0..spans.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut group = vec![seed];
        let mut grew = true;
        while grew {
            grew = false;
            for candidate in 0..spans.len() {
                if visited[candidate] {
                    continue;
                }
                if group.iter().any(|&g| overlaps(spans[g], spans[candidate])) {
                    visited[candidate] = true;
                    group.push(candidate);
                    grew = true;
                }
            }
        }
        groups.push(group);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_time;

    fn entry(start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            name: format!("{}-{}", start, end),
            start: parse_time(start).unwrap(),
            end: parse_time(end).unwrap(),
            flexible: true,
            length: None,
            intensity: None,
            location: None,
        }
    }

    fn cfg() -> LayoutConfig {
        LayoutConfig {
            row_height: 4,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn vertical_placement_follows_the_row_mapping() {
        let boxes = layout(&[entry("09:00", "10:30")], &cfg());
        // 09:00 is 180 minutes past the 06:00 window start: 12 rows of 4px.
        assert_eq!(boxes[0].top, 48);
        assert_eq!(boxes[0].height, 24);
    }

    #[test]
    fn abutting_entries_share_column_zero() {
        let boxes = layout(&[entry("09:00", "10:00"), entry("10:00", "11:00")], &cfg());
        for b in &boxes {
            assert_eq!((b.column, b.columns), (0, 1));
        }
    }

    #[test]
    fn nested_entries_split_two_columns() {
        let boxes = layout(&[entry("09:00", "11:00"), entry("09:30", "10:30")], &cfg());
        assert_eq!((boxes[0].column, boxes[0].columns), (0, 2));
        assert_eq!((boxes[1].column, boxes[1].columns), (1, 2));
    }

    #[test]
    fn chained_overlap_reuses_a_freed_column() {
        let boxes = layout(
            &[
                entry("09:00", "10:00"),
                entry("09:30", "10:30"),
                entry("10:15", "11:00"),
            ],
            &cfg(),
        );
        assert_eq!((boxes[0].column, boxes[0].columns), (0, 2));
        assert_eq!((boxes[1].column, boxes[1].columns), (1, 2));
        // First entry ended 10:00 <= 10:15, so column 0 is free again.
        assert_eq!((boxes[2].column, boxes[2].columns), (0, 2));
    }

    #[test]
    fn start_tie_breaks_by_input_order() {
        let boxes = layout(&[entry("09:00", "10:00"), entry("09:00", "09:30")], &cfg());
        assert_eq!(boxes[0].column, 0);
        assert_eq!(boxes[1].column, 1);
    }

    #[test]
    fn clusters_are_independent() {
        let boxes = layout(
            &[
                entry("07:00", "08:00"),
                entry("07:30", "08:30"),
                entry("12:00", "13:00"),
            ],
            &cfg(),
        );
        assert_eq!(boxes[0].columns, 2);
        assert_eq!(boxes[1].columns, 2);
        assert_eq!((boxes[2].column, boxes[2].columns), (0, 1));
    }

    #[test]
    fn no_two_entries_in_one_column_overlap() {
        let entries = vec![
            entry("09:00", "12:00"),
            entry("09:15", "10:00"),
            entry("09:30", "11:00"),
            entry("10:00", "10:45"),
            entry("10:30", "11:30"),
            entry("11:00", "11:15"),
        ];
        let boxes = layout(&entries, &cfg());
        for a in &boxes {
            for b in &boxes {
                if a.index != b.index && a.column == b.column {
                    let sa = (entries[a.index].start, entries[a.index].end);
                    let sb = (entries[b.index].start, entries[b.index].end);
                    assert!(!overlaps(sa, sb), "{:?} and {:?} collide", sa, sb);
                }
            }
        }
    }

    #[test]
    fn column_count_equals_peak_simultaneous_overlap() {
        let entries = vec![
            entry("09:00", "12:00"),
            entry("09:15", "10:00"),
            entry("09:30", "11:00"),
            entry("10:00", "10:45"),
        ];
        let boxes = layout(&entries, &cfg());
        // Peak is three at 09:30..10:00 (and again 10:00..10:45).
        assert!(boxes.iter().all(|b| b.columns == 3));
    }

    #[test]
    fn out_of_window_entries_clamp_instead_of_failing() {
        let cfg = cfg();
        let boxes = layout(&[entry("05:00", "07:00"), entry("21:30", "23:00")], &cfg);
        assert_eq!(boxes[0].top, 0);
        assert_eq!(boxes[0].height, 4 * 4);
        assert_eq!(boxes[1].top + boxes[1].height, cfg.total_height());

        let wholly_outside = layout(&[entry("01:00", "05:00")], &cfg);
        assert_eq!(wholly_outside[0].top, 0);
        assert_eq!(wholly_outside[0].height, 0);
    }

    #[test]
    fn zero_length_entries_take_no_height() {
        let boxes = layout(&[entry("09:00", "09:00"), entry("10:00", "11:00")], &cfg());
        assert_eq!(boxes[0].height, 0);
        assert_eq!((boxes[0].column, boxes[0].columns), (0, 1));
        assert_eq!((boxes[1].column, boxes[1].columns), (0, 1));
    }
}

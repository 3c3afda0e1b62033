//! Grab-and-snap repositioning for schedule entries.
//!
//! A gesture owns one ephemeral value: the live vertical offset of the grabbed
//! entry, in pixels. Every movement re-snaps the offset to the row granularity
//! and clamps it so the entry stays inside the day window; release converts
//! the offset back into minutes and proposes a new interval to the owner.
//! Layout collisions are not checked here: columns are recomputed from the
//! authoritative entry list on the next draw.

use crate::layout::{EntryBox, LayoutConfig};

#[derive(Debug, Clone, Copy)]
pub struct DragGesture {
    index: usize,
    offset: i32,
    row_height: i32,
    row_minutes: i32,
    min_offset: i32,
    max_offset: i32,
}

/// The new interval a finished gesture proposes for `schedule[index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveProposal {
    pub index: usize,
    pub start: i32,
    pub end: i32,
}

impl DragGesture {
    pub fn grab(slot: &EntryBox, cfg: &LayoutConfig) -> Self {
        let min_offset = -slot.top;
        let max_offset = cfg.total_height() - slot.top - slot.height;
        DragGesture {
            index: slot.index,
            offset: 0,
            row_height: cfg.row_height,
            row_minutes: cfg.row_minutes,
            min_offset,
            max_offset: max_offset.max(min_offset),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Current snapped, clamped offset in pixels.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Re-snap from a raw pixel offset; called continuously while dragging.
    pub fn update(&mut self, raw: i32) {
        self.offset = snap(raw, self.row_height).clamp(self.min_offset, self.max_offset);
    }

    /// Keyboard variant of a drag movement: shift by whole rows.
    pub fn nudge(&mut self, rows: i32) {
        self.update(self.offset + rows * self.row_height);
    }

    /// Finish the gesture, converting the offset back into minutes.
    ///
    /// The moved start is clamped into `[window_start, window_end - duration]`
    /// and the duration is always preserved.
    pub fn release(self, start: i32, end: i32, cfg: &LayoutConfig) -> MoveProposal {
        let duration = end - start;
        let moved_minutes = self.offset / self.row_height * self.row_minutes;
        let lo = cfg.window_start();
        let hi = cfg.window_end() - duration;
        let new_start = (start + moved_minutes).clamp(lo, hi.max(lo));
        MoveProposal {
            index: self.index,
            start: new_start,
            end: new_start + duration,
        }
    }
}

/// Round to the nearest multiple of `row_height`.
pub fn snap(offset: i32, row_height: i32) -> i32 {
    if row_height <= 1 {
        return offset;
    }
    (offset as f64 / row_height as f64).round() as i32 * row_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{layout, LayoutConfig};
    use crate::model::{parse_time, ScheduleEntry};

    fn cfg() -> LayoutConfig {
        LayoutConfig {
            row_height: 4,
            ..LayoutConfig::default()
        }
    }

    fn entry(start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            name: "block".into(),
            start: parse_time(start).unwrap(),
            end: parse_time(end).unwrap(),
            flexible: true,
            length: None,
            intensity: None,
            location: None,
        }
    }

    fn grab(start: &str, end: &str) -> (DragGesture, ScheduleEntry, LayoutConfig) {
        let cfg = cfg();
        let e = entry(start, end);
        let boxes = layout(std::slice::from_ref(&e), &cfg);
        (DragGesture::grab(&boxes[0], &cfg), e, cfg)
    }

    #[test]
    fn snapping_rounds_to_the_nearest_row() {
        assert_eq!(snap(0, 4), 0);
        assert_eq!(snap(1, 4), 0);
        assert_eq!(snap(2, 4), 4);
        assert_eq!(snap(5, 4), 4);
        assert_eq!(snap(-3, 4), -4);
        assert_eq!(snap(-1, 4), 0);
    }

    #[test]
    fn snapping_is_idempotent() {
        for raw in -200..200 {
            let once = snap(raw, 4);
            assert_eq!(snap(once, 4), once);
        }
    }

    #[test]
    fn offset_updates_live_at_each_snap_boundary() {
        let (mut gesture, _, _) = grab("12:00", "13:00");
        gesture.update(1);
        assert_eq!(gesture.offset(), 0);
        gesture.update(3);
        assert_eq!(gesture.offset(), 4);
        gesture.update(9);
        assert_eq!(gesture.offset(), 8);
    }

    #[test]
    fn offset_clamps_to_the_day_window() {
        let (mut gesture, e, cfg) = grab("09:00", "10:00");
        let boxes = layout(std::slice::from_ref(&e), &cfg);
        gesture.update(-100_000);
        assert_eq!(gesture.offset(), -boxes[0].top);
        gesture.update(100_000);
        assert_eq!(
            gesture.offset(),
            cfg.total_height() - boxes[0].top - boxes[0].height
        );
    }

    #[test]
    fn release_moves_by_whole_rows() {
        let (mut gesture, e, cfg) = grab("09:00", "10:00");
        gesture.nudge(2);
        let proposal = gesture.release(e.start, e.end, &cfg);
        assert_eq!(proposal.start, parse_time("09:30").unwrap());
        assert_eq!(proposal.end, parse_time("10:30").unwrap());
    }

    #[test]
    fn release_preserves_duration_even_at_the_edges() {
        for raw in [-100_000, -37, 0, 41, 100_000] {
            let (mut gesture, e, cfg) = grab("09:00", "10:30");
            gesture.update(raw);
            let proposal = gesture.release(e.start, e.end, &cfg);
            assert_eq!(proposal.end - proposal.start, e.duration());
            assert!(proposal.start >= cfg.window_start());
            assert!(proposal.end <= cfg.window_end());
        }
    }

    #[test]
    fn drag_to_either_boundary_clamps_rather_than_rejects() {
        let (mut gesture, e, cfg) = grab("09:00", "10:00");
        gesture.update(-100_000);
        let proposal = gesture.release(e.start, e.end, &cfg);
        assert_eq!(proposal.start, cfg.window_start());

        let (mut gesture, e, cfg) = grab("09:00", "10:00");
        gesture.update(100_000);
        let proposal = gesture.release(e.start, e.end, &cfg);
        assert_eq!(proposal.end, cfg.window_end());
    }

    #[test]
    fn canceling_and_regrabbing_starts_from_zero() {
        let (mut gesture, _, _) = grab("12:00", "13:00");
        gesture.nudge(3);
        assert_ne!(gesture.offset(), 0);
        let (fresh, _, _) = grab("12:00", "13:00");
        assert_eq!(fresh.offset(), 0);
    }
}

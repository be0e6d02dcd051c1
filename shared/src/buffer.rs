//! Authoritative in-memory stroke list for one session.

use std::collections::{HashSet, VecDeque};

use crate::error::BufferError;
use crate::sanitize::sanitize_stroke;
use crate::{Point, Stroke, StrokeId, StrokeState};

/// Owned, versioned copy of the buffer contents for rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub strokes: Vec<Stroke>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stroke> {
        self.strokes.iter()
    }
}

/// Evicted ids remembered for duplicate detection, oldest forgotten first.
pub const MAX_RETIRED_IDS: usize = 10_000;

/// Closed strokes in arrival order plus at most one open stroke per author.
#[derive(Debug, Default)]
pub struct StrokeBuffer {
    closed: Vec<Stroke>,
    open: Vec<Stroke>,
    // Ids of closed strokes, including the most recently evicted ones.
    closed_ids: HashSet<StrokeId>,
    retired: VecDeque<StrokeId>,
    version: u64,
}

impl StrokeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of strokes a snapshot would contain.
    pub fn len(&self) -> usize {
        self.closed.len() + self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &StrokeId) -> bool {
        self.closed_ids.contains(id) || self.open.iter().any(|stroke| &stroke.id == id)
    }

    pub fn open_stroke_for(&self, author: &str) -> Option<&Stroke> {
        self.open.iter().find(|stroke| stroke.author == author)
    }

    /// Closed ids still recognized as duplicates, evicted ones included.
    pub fn known_ids(&self) -> usize {
        self.closed_ids.len()
    }

    pub fn closed_strokes(&self) -> &[Stroke] {
        &self.closed
    }

    pub fn begin_stroke(
        &mut self,
        author: &str,
        first_point: Point,
        color: &str,
        width: f64,
    ) -> Result<StrokeId, BufferError> {
        self.begin_stroke_with_id(StrokeId::generate(), author, first_point, color, width)
    }

    pub fn begin_stroke_with_id(
        &mut self,
        id: StrokeId,
        author: &str,
        first_point: Point,
        color: &str,
        width: f64,
    ) -> Result<StrokeId, BufferError> {
        if let Some(open) = self.open_stroke_for(author) {
            return Err(BufferError::Conflict {
                author: author.to_string(),
                open: open.id.clone(),
            });
        }
        if self.contains(&id) {
            return Err(BufferError::DuplicateId(id));
        }
        if !first_point.is_finite() {
            return Err(BufferError::InvalidPoint);
        }
        self.open.push(Stroke {
            id: id.clone(),
            points: vec![first_point],
            color: color.to_string(),
            stroke_width: width,
            author: author.to_string(),
            state: StrokeState::Open,
        });
        self.version += 1;
        Ok(id)
    }

    pub fn append_point(&mut self, id: &StrokeId, point: Point) -> Result<(), BufferError> {
        let Some(stroke) = self.open.iter_mut().find(|stroke| &stroke.id == id) else {
            return Err(self.missing(id));
        };
        if !point.is_finite() {
            return Err(BufferError::InvalidPoint);
        }
        stroke.points.push(point);
        self.version += 1;
        Ok(())
    }

    /// Finalizes an open stroke and returns the now immutable copy.
    pub fn close_stroke(&mut self, id: &StrokeId) -> Result<Stroke, BufferError> {
        let Some(index) = self.open.iter().position(|stroke| &stroke.id == id) else {
            return Err(self.missing(id));
        };
        let mut stroke = self.open.remove(index);
        stroke.state = StrokeState::Closed;
        self.closed_ids.insert(stroke.id.clone());
        self.closed.push(stroke.clone());
        self.version += 1;
        Ok(stroke)
    }

    /// Inserts a finished stroke from a peer.
    ///
    /// Returns `Ok(false)` without touching the buffer when the id is already
    /// known, so replays and duplicate broadcasts are harmless.
    pub fn apply_remote(&mut self, stroke: Stroke) -> Result<bool, BufferError> {
        if self.contains(&stroke.id) {
            return Ok(false);
        }
        let id = stroke.id.clone();
        let mut stroke = sanitize_stroke(stroke).ok_or(BufferError::InvalidStroke(id))?;
        stroke.state = StrokeState::Closed;
        self.closed_ids.insert(stroke.id.clone());
        self.closed.push(stroke);
        self.version += 1;
        Ok(true)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            strokes: self.closed.iter().chain(self.open.iter()).cloned().collect(),
        }
    }

    /// Drops the oldest closed strokes beyond `max`. Their ids stay known
    /// until [`MAX_RETIRED_IDS`] newer evictions push them out.
    pub fn evict_oldest(&mut self, max: usize) -> usize {
        let overflow = self.closed.len().saturating_sub(max);
        if overflow == 0 {
            return 0;
        }
        self.retired
            .extend(self.closed.drain(0..overflow).map(|stroke| stroke.id));
        while self.retired.len() > MAX_RETIRED_IDS {
            if let Some(id) = self.retired.pop_front() {
                self.closed_ids.remove(&id);
            }
        }
        self.version += 1;
        overflow
    }

    fn missing(&self, id: &StrokeId) -> BufferError {
        if self.closed_ids.contains(id) {
            BufferError::InvalidState(id.clone())
        } else {
            BufferError::NotFound(id.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str, author: &str) -> Stroke {
        Stroke {
            id: StrokeId::from(id),
            points: vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            color: "#0000FF".to_string(),
            stroke_width: 5.0,
            author: author.to_string(),
            state: StrokeState::Closed,
        }
    }

    #[test]
    fn test_points_accumulate_in_order() {
        let mut buffer = StrokeBuffer::new();
        let id = buffer
            .begin_stroke("user", Point::new(10.0, 10.0), "#000000", 5.0)
            .unwrap();
        buffer.append_point(&id, Point::new(12.0, 11.0)).unwrap();
        buffer.append_point(&id, Point::new(15.0, 13.0)).unwrap();
        let stroke = buffer.close_stroke(&id).unwrap();

        assert_eq!(stroke.state, StrokeState::Closed);
        assert_eq!(
            stroke.points,
            vec![
                Point::new(10.0, 10.0),
                Point::new(12.0, 11.0),
                Point::new(15.0, 13.0),
            ]
        );
        assert!(buffer.open_stroke_for("user").is_none());
    }

    #[test]
    fn test_second_begin_conflicts_and_keeps_open_stroke() {
        let mut buffer = StrokeBuffer::new();
        let id = buffer
            .begin_stroke("user", Point::new(0.0, 0.0), "#000000", 5.0)
            .unwrap();
        buffer.append_point(&id, Point::new(1.0, 1.0)).unwrap();
        let before = buffer.open_stroke_for("user").cloned().unwrap();

        let err = buffer
            .begin_stroke("user", Point::new(9.0, 9.0), "#ff0000", 2.0)
            .unwrap_err();
        assert_eq!(
            err,
            BufferError::Conflict {
                author: "user".to_string(),
                open: id.clone(),
            }
        );
        assert_eq!(buffer.open_stroke_for("user"), Some(&before));

        // Other authors are independent.
        assert!(buffer
            .begin_stroke("jarvis", Point::new(0.0, 0.0), "#0000FF", 5.0)
            .is_ok());
    }

    #[test]
    fn test_append_and_close_report_missing_or_closed() {
        let mut buffer = StrokeBuffer::new();
        let ghost = StrokeId::from("ghost");
        assert_eq!(
            buffer.append_point(&ghost, Point::new(0.0, 0.0)),
            Err(BufferError::NotFound(ghost.clone()))
        );
        assert_eq!(
            buffer.close_stroke(&ghost),
            Err(BufferError::NotFound(ghost))
        );

        let id = buffer
            .begin_stroke("user", Point::new(0.0, 0.0), "#000000", 5.0)
            .unwrap();
        buffer.close_stroke(&id).unwrap();
        assert_eq!(
            buffer.append_point(&id, Point::new(1.0, 1.0)),
            Err(BufferError::InvalidState(id.clone()))
        );
        assert_eq!(
            buffer.close_stroke(&id),
            Err(BufferError::InvalidState(id))
        );
    }

    #[test]
    fn test_non_finite_points_are_rejected() {
        let mut buffer = StrokeBuffer::new();
        assert_eq!(
            buffer.begin_stroke("user", Point::new(f64::NAN, 0.0), "#000000", 5.0),
            Err(BufferError::InvalidPoint)
        );
        let id = buffer
            .begin_stroke("user", Point::new(0.0, 0.0), "#000000", 5.0)
            .unwrap();
        assert_eq!(
            buffer.append_point(&id, Point::new(0.0, f64::INFINITY)),
            Err(BufferError::InvalidPoint)
        );
        assert_eq!(buffer.open_stroke_for("user").unwrap().points.len(), 1);
    }

    #[test]
    fn test_apply_remote_is_idempotent() {
        let mut buffer = StrokeBuffer::new();
        assert_eq!(buffer.apply_remote(remote("c", "jarvis")), Ok(true));
        let first = buffer.snapshot();
        assert_eq!(buffer.apply_remote(remote("c", "jarvis")), Ok(false));
        let second = buffer.snapshot();
        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_apply_remote_rejects_undrawable_stroke() {
        let mut buffer = StrokeBuffer::new();
        let mut empty = remote("e", "jarvis");
        empty.points.clear();
        assert_eq!(
            buffer.apply_remote(empty),
            Err(BufferError::InvalidStroke(StrokeId::from("e")))
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_snapshot_follows_arrival_order() {
        let mut buffer = StrokeBuffer::new();
        let a = buffer
            .begin_stroke("user", Point::new(0.0, 0.0), "#000000", 5.0)
            .unwrap();
        buffer.close_stroke(&a).unwrap();
        buffer.apply_remote(remote("c", "jarvis")).unwrap();
        let b = buffer
            .begin_stroke("user", Point::new(5.0, 5.0), "#000000", 5.0)
            .unwrap();
        buffer.close_stroke(&b).unwrap();

        let ids: Vec<_> = buffer.snapshot().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![a, StrokeId::from("c"), b]);
    }

    #[test]
    fn test_snapshot_appends_open_strokes_and_versions() {
        let mut buffer = StrokeBuffer::new();
        buffer.apply_remote(remote("c", "jarvis")).unwrap();
        let id = buffer
            .begin_stroke("user", Point::new(0.0, 0.0), "#000000", 5.0)
            .unwrap();
        let before = buffer.snapshot();
        buffer.append_point(&id, Point::new(1.0, 0.0)).unwrap();
        let after = buffer.snapshot();

        assert!(after.version > before.version);
        assert_eq!(before.strokes[1].points.len(), 1);
        assert_eq!(after.strokes[1].points.len(), 2);
        assert!(after.strokes[1].is_open());
        assert!(!after.strokes[0].is_open());
    }

    #[test]
    fn test_remote_duplicate_of_local_open_stroke_is_ignored() {
        let mut buffer = StrokeBuffer::new();
        let id = buffer
            .begin_stroke("user", Point::new(0.0, 0.0), "#000000", 5.0)
            .unwrap();
        let mut echo = remote("x", "user");
        echo.id = id.clone();
        assert_eq!(buffer.apply_remote(echo), Ok(false));
        assert!(buffer.open_stroke_for("user").is_some());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_evicted_ids_stay_known() {
        let mut buffer = StrokeBuffer::new();
        for id in ["a", "b", "c"] {
            buffer.apply_remote(remote(id, "jarvis")).unwrap();
        }
        assert_eq!(buffer.evict_oldest(2), 1);
        assert_eq!(buffer.closed_strokes().len(), 2);
        assert_eq!(buffer.apply_remote(remote("a", "jarvis")), Ok(false));
    }

    #[test]
    fn test_remembered_ids_are_bounded() {
        let mut buffer = StrokeBuffer::new();
        let total = MAX_RETIRED_IDS + 500;
        for i in 0..total {
            buffer
                .apply_remote(remote(&format!("s-{i}"), "jarvis"))
                .unwrap();
            buffer.evict_oldest(2);
        }
        assert_eq!(buffer.closed_strokes().len(), 2);
        assert_eq!(buffer.known_ids(), MAX_RETIRED_IDS + 2);

        // The oldest ids were forgotten, recent evictions are still duplicates.
        assert_eq!(buffer.apply_remote(remote("s-0", "jarvis")), Ok(true));
        let recent = format!("s-{}", total - 10);
        assert_eq!(buffer.apply_remote(remote(&recent, "jarvis")), Ok(false));
    }
}

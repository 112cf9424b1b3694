/// Rows moved by a half-page jump.
pub const HALF_PAGE: i64 = 15;

/// Cursor over the chat log.
///
/// The controller mirrors the log length it was told about; the cursor is
/// `None` exactly when that length is zero. Every operation returns whether the
/// cursor moved so callers can skip redundant redraws.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    cursor: Option<usize>,
    len: usize,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether new entries should pull the cursor along.
    pub fn is_at_tail(&self) -> bool {
        match self.cursor {
            Some(cursor) => cursor + 1 == self.len,
            None => true,
        }
    }

    /// Initial placement after history is loaded: the newest entry.
    pub fn reset_to_tail(&mut self, len: usize) {
        self.len = len;
        self.cursor = len.checked_sub(1);
    }

    pub fn select(&mut self, index: i64) -> bool {
        if self.len == 0 {
            return false;
        }
        let max = (self.len - 1) as i64;
        let next = index.clamp(0, max) as usize;
        if self.cursor == Some(next) {
            return false;
        }
        self.cursor = Some(next);
        true
    }

    pub fn move_by(&mut self, delta: i64) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        self.select((cursor as i64).saturating_add(delta))
    }

    pub fn select_first(&mut self) -> bool {
        self.select(0)
    }

    pub fn select_last(&mut self) -> bool {
        self.select(i64::MAX)
    }

    pub fn half_page_down(&mut self) -> bool {
        self.move_by(HALF_PAGE)
    }

    pub fn half_page_up(&mut self) -> bool {
        self.move_by(-HALF_PAGE)
    }

    /// Follows the tail when `was_at_tail`, otherwise leaves the cursor alone.
    pub fn on_append(&mut self, new_len: usize, was_at_tail: bool) -> bool {
        self.len = new_len;
        if new_len == 0 {
            self.cursor = None;
            return false;
        }
        if was_at_tail || self.cursor.is_none() {
            return self.select((new_len - 1) as i64);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(len: usize, cursor: i64) -> Selection {
        let mut selection = Selection::new();
        selection.reset_to_tail(len);
        selection.select(cursor);
        selection
    }

    #[test]
    fn reset_places_cursor_on_tail() {
        let mut selection = Selection::new();
        selection.reset_to_tail(3);
        assert_eq!(selection.cursor(), Some(2));
        assert!(selection.is_at_tail());

        selection.reset_to_tail(0);
        assert_eq!(selection.cursor(), None);
        assert!(selection.is_at_tail());
    }

    #[test]
    fn select_clamps_to_log_bounds() {
        for len in [1usize, 2, 7, 40] {
            for requested in [i64::MIN, -100, -1, 0, 1, 5, 39, 40, 1_000, i64::MAX] {
                let mut selection = at(len, 0);
                selection.select(requested);
                let cursor = selection.cursor().expect("cursor set") as i64;
                assert!((0..len as i64).contains(&cursor), "len={len} req={requested}");
            }
        }
    }

    #[test]
    fn empty_log_makes_every_operation_a_noop() {
        let mut selection = Selection::new();
        assert!(!selection.select(3));
        assert!(!selection.move_by(1));
        assert!(!selection.select_first());
        assert!(!selection.select_last());
        assert!(!selection.half_page_up());
        assert_eq!(selection.cursor(), None);
    }

    #[test]
    fn select_reports_unchanged_cursor() {
        let mut selection = at(5, 2);
        assert!(!selection.select(2));
        assert!(selection.select(3));
        assert!(selection.move_by(10));
        assert_eq!(selection.cursor(), Some(4));
        assert!(!selection.move_by(1));
        assert_eq!(selection.cursor(), Some(4));
    }

    #[test]
    fn half_page_and_boundary_jumps() {
        let mut selection = at(40, 0);
        assert!(selection.half_page_down());
        assert_eq!(selection.cursor(), Some(15));
        assert!(selection.half_page_down());
        assert!(selection.half_page_down());
        assert_eq!(selection.cursor(), Some(39));
        assert!(selection.half_page_up());
        assert_eq!(selection.cursor(), Some(24));
        assert!(selection.select_first());
        assert_eq!(selection.cursor(), Some(0));
        assert!(selection.select_last());
        assert_eq!(selection.cursor(), Some(39));
    }

    #[test]
    fn append_follows_tail_only_when_viewing_it() {
        let mut following = at(3, 2);
        let was_at_tail = following.is_at_tail();
        assert!(following.on_append(4, was_at_tail));
        assert_eq!(following.cursor(), Some(3));

        let mut reading = at(5, 0);
        let was_at_tail = reading.is_at_tail();
        assert!(!reading.on_append(6, was_at_tail));
        assert_eq!(reading.cursor(), Some(0));
        assert_eq!(reading.len(), 6);
    }

    #[test]
    fn first_append_into_empty_log_selects_it() {
        let mut selection = Selection::new();
        let was_at_tail = selection.is_at_tail();
        assert!(selection.on_append(1, was_at_tail));
        assert_eq!(selection.cursor(), Some(0));
    }
}

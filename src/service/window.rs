use crate::constants::MAX_ROWS;

/// One caption window of a service. Row buffers exist only while memory is reserved.
#[derive(Debug, Default)]
pub struct WindowState {
    rows: Option<Vec<Vec<u8>>>,
    cursor_row: usize,
    start_ms: Option<i64>,
}

impl WindowState {
    pub fn memory_reserved(&self) -> bool {
        self.rows.is_some()
    }

    /// Allocate `MAX_ROWS` empty row buffers if not already reserved
    pub fn reserve(&mut self) {
        if self.rows.is_none() {
            self.rows = Some((0..MAX_ROWS).map(|_| Vec::new()).collect());
            self.cursor_row = 0;
        }
    }

    /// Free every row buffer; empty rows are released the same way as used ones
    pub fn release(&mut self) {
        self.rows = None;
        self.cursor_row = 0;
        self.start_ms = None;
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        self.rows.as_deref().unwrap_or(&[])
    }

    pub fn has_text(&self) -> bool {
        self.rows().iter().any(|row| !row.is_empty())
    }

    pub fn start_ms(&self) -> Option<i64> {
        self.start_ms
    }

    pub fn push_byte(&mut self, byte: u8, now_ms: i64) {
        self.reserve();
        let row = self.cursor_row;
        if let Some(rows) = self.rows.as_mut() {
            rows[row].push(byte);
            self.start_ms.get_or_insert(now_ms);
        }
    }

    /// Move to the next row, scrolling the oldest row out when the window is full
    pub fn carriage_return(&mut self) {
        let Some(rows) = self.rows.as_mut() else {
            return;
        };
        if self.cursor_row + 1 < MAX_ROWS {
            self.cursor_row += 1;
        } else {
            rows.remove(0);
            rows.push(Vec::new());
        }
    }

    /// Take the non-empty rows and clear them; the reservation is kept
    pub fn take_text(&mut self) -> Vec<Vec<u8>> {
        let Some(rows) = self.rows.as_mut() else {
            return Vec::new();
        };
        let text = rows
            .iter_mut()
            .filter(|row| !row.is_empty())
            .map(std::mem::take)
            .collect();
        self.cursor_row = 0;
        self.start_ms = None;
        text
    }
}

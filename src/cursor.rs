/// Index of the image currently on display. `None` while nothing is uploaded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NavigationCursor {
    index: Option<usize>,
    len: usize,
}

impl NavigationCursor {
    pub fn new(len: usize) -> Self {
        let mut cursor = Self::default();
        cursor.reset(len);
        cursor
    }

    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.index = if len > 0 { Some(0) } else { None };
    }

    pub fn current(&self) -> Option<usize> {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.index.is_some()
    }

    pub fn next(&mut self) -> Option<usize> {
        if let Some(i) = self.index {
            if i + 1 < self.len {
                self.index = Some(i + 1);
            }
        }
        self.index
    }

    pub fn prev(&mut self) -> Option<usize> {
        if let Some(i) = self.index {
            self.index = Some(i.saturating_sub(1));
        }
        self.index
    }
}

#![forbid(unsafe_code)]

use kdm_contracts::mutation::check_param_len;

pub const DUPLICATE_TAG_ERROR: &str = "The epithet has already been added!";
pub const TOO_LONG_TAG_ERROR: &str = "This entry is too long to be saved!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAddOutcome {
    Added,
    Duplicate,
    Blank,
    /// Longer than the server accepts; kept out of the list.
    TooLong,
}

/// Ordered free-text list attached to a survivor (notes, epithets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList {
    items: Vec<String>,
    insert_at: InsertAt,
    error_text: String,
}

impl TagList {
    /// Newest note first.
    pub fn notes() -> Self {
        Self::with_order(InsertAt::Front)
    }

    pub fn epithets() -> Self {
        Self::with_order(InsertAt::Back)
    }

    fn with_order(insert_at: InsertAt) -> Self {
        Self {
            items: Vec::new(),
            insert_at,
            error_text: String::new(),
        }
    }

    pub fn seeded(mut self, items: impl IntoIterator<Item = String>) -> Self {
        self.items = items.into_iter().collect();
        self
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    pub fn add(&mut self, raw: &str) -> TagAddOutcome {
        self.error_text.clear();
        if raw.is_empty() {
            return TagAddOutcome::Blank;
        }
        if check_param_len("tag", raw).is_err() {
            self.error_text = TOO_LONG_TAG_ERROR.to_string();
            return TagAddOutcome::TooLong;
        }
        if self.items.iter().any(|i| i == raw) {
            self.error_text = DUPLICATE_TAG_ERROR.to_string();
            return TagAddOutcome::Duplicate;
        }
        match self.insert_at {
            InsertAt::Front => self.items.insert(0, raw.to_string()),
            InsertAt::Back => self.items.push(raw.to_string()),
        }
        TagAddOutcome::Added
    }

    pub fn remove_at(&mut self, index: usize) -> Option<String> {
        self.error_text.clear();
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.remove(index))
    }
}

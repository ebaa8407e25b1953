use tracing::debug;

use super::{IdGenerator, OutlineItem};

pub const DEFAULT_MAX_LEVEL: usize = 6;
pub const NEW_ITEM_TITLE: &str = "New Title";

/// List edits on a flat outline, addressed by item id. Every operation keeps the ids of the
/// untouched items stable and never produces a negative level.
#[derive(Debug, Clone)]
pub struct OutlineEditor {
    items: Vec<OutlineItem>,
    max_level: usize,
    new_title: String,
}

impl OutlineEditor {
    pub fn new(items: Vec<OutlineItem>) -> Self {
        Self {
            items,
            max_level: DEFAULT_MAX_LEVEL,
            new_title: NEW_ITEM_TITLE.to_string(),
        }
    }

    pub fn max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn new_title(mut self, title: impl Into<String>) -> Self {
        self.new_title = title.into();
        self
    }

    pub fn items(&self) -> &[OutlineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<OutlineItem> {
        self.items
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Inserts a new entry right after `anchor`, or at the end when there is no anchor or it
    /// cannot be found. A child sits one level below the anchor, up to the level ceiling.
    /// Returns the id of the new entry.
    pub fn insert(
        &mut self,
        anchor: Option<&str>,
        as_child: bool,
        page_index: usize,
        ids: &mut dyn IdGenerator,
    ) -> String {
        let base = anchor.and_then(|id| self.position(id));
        let insert_at = base.map(|i| i + 1).unwrap_or(self.items.len());
        let base_level = base.map(|i| self.items[i].level).unwrap_or(0);
        let level = if as_child {
            (base_level + 1).min(self.max_level)
        } else {
            base_level
        };

        let item = OutlineItem {
            id: ids.next_id(),
            title: self.new_title.clone(),
            page_index,
            level,
        };
        let id = item.id.clone();
        debug!("Inserting outline entry {} at {} (level {})", id, insert_at, level);
        self.items.insert(insert_at, item);
        id
    }

    /// Removes an entry. Returns it together with the id that should be selected next: the
    /// entry that moved into its place, otherwise the one before it.
    pub fn remove(&mut self, id: &str) -> Option<(OutlineItem, Option<String>)> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        let next = self
            .items
            .get(index)
            .or_else(|| index.checked_sub(1).and_then(|i| self.items.get(i)))
            .map(|item| item.id.clone());
        Some((removed, next))
    }

    pub fn indent(&mut self, id: &str) -> bool {
        self.adjust_level(id, 1)
    }

    pub fn outdent(&mut self, id: &str) -> bool {
        self.adjust_level(id, -1)
    }

    fn adjust_level(&mut self, id: &str, delta: isize) -> bool {
        let max_level = self.max_level;
        let Some(index) = self.position(id) else {
            return false;
        };
        let item = &mut self.items[index];
        let level = item
            .level
            .saturating_add_signed(delta)
            .min(max_level.max(item.level));
        let changed = level != item.level;
        item.level = level;
        changed
    }

    /// Moves an entry `delta` places up (negative) or down. Moves that would leave the list
    /// are ignored.
    pub fn shift(&mut self, id: &str, delta: isize) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(delta) else {
            return false;
        };
        if target >= self.items.len() {
            return false;
        }
        let item = self.items.remove(index);
        self.items.insert(target, item);
        true
    }

    pub fn rename(&mut self, id: &str, title: impl Into<String>) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items[index].title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn retarget(&mut self, id: &str, page_index: usize) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items[index].page_index = page_index;
                true
            }
            None => false,
        }
    }
}

use anyhow::Result;
use lopdf::{Dictionary, Object, ObjectId};
use tracing::debug;

use crate::outline::{OutlineNode, tree::node_count};

use super::{
    OutlineDocument,
    destination::{PageIndex, PagePolicy, write_destination},
    text::encode_title,
};

/// One outline entry lowered into the arena. Relations are indices into the arena, resolved to
/// object ids only when the dictionaries are written.
#[derive(Debug)]
struct Slot<'a> {
    node: &'a OutlineNode,
    id: ObjectId,
    parent: Option<usize>,
    prev: Option<usize>,
    next: Option<usize>,
    first: Option<usize>,
    last: Option<usize>,
    descendants: usize,
}

/// Turns an outline forest into a fresh set of outline dictionaries inside a document.
#[derive(Debug)]
pub struct OutlineWriter<'p> {
    pages: &'p PageIndex,
    policy: PagePolicy,
}

impl<'p> OutlineWriter<'p> {
    pub fn new(pages: &'p PageIndex, policy: PagePolicy) -> Self {
        Self { pages, policy }
    }

    /// Writes the root dictionary and one dictionary per node and returns the id of the root.
    /// Nothing is stored in the document when a page lookup fails. The catalog is not touched.
    pub fn write(&self, document: &mut OutlineDocument, forest: &[OutlineNode]) -> Result<ObjectId> {
        let root_id = document.allocate();
        let mut slots = Vec::with_capacity(node_count(forest));
        let top_level = lower(forest, &mut slots, document);

        let mut dictionaries = Vec::with_capacity(slots.len() + 1);
        for slot in &slots {
            let dict = self.entry_dictionary(slot, &slots, root_id)?;
            dictionaries.push((slot.id, dict));
        }

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Outlines".to_vec()));
        if let (Some(first), Some(last)) = (top_level.first(), top_level.last()) {
            root.set("First", slots[*first].id);
            root.set("Last", slots[*last].id);
        }
        root.set("Count", slots.len() as i64);
        dictionaries.push((root_id, root));

        debug!("Committing {} outline dictionaries", dictionaries.len());
        for (id, dict) in dictionaries {
            document.assign(id, dict);
        }
        Ok(root_id)
    }

    fn entry_dictionary(&self, slot: &Slot, slots: &[Slot], root_id: ObjectId) -> Result<Dictionary> {
        let page = self.pages.page_for(slot.node.page_index, self.policy)?;
        let id_of = |index: usize| slots[index].id;

        let mut dict = Dictionary::new();
        dict.set("Title", encode_title(&slot.node.title));
        dict.set("Parent", slot.parent.map(id_of).unwrap_or(root_id));
        dict.set("Dest", write_destination(page));
        if let Some(prev) = slot.prev {
            dict.set("Prev", id_of(prev));
        }
        if let Some(next) = slot.next {
            dict.set("Next", id_of(next));
        }
        if let (Some(first), Some(last)) = (slot.first, slot.last) {
            dict.set("First", id_of(first));
            dict.set("Last", id_of(last));
            // Always positive: every entry is written expanded.
            dict.set("Count", slot.descendants as i64);
        }
        Ok(dict)
    }
}

/// Appends every node of `forest` to the arena in preorder, allocating an object id for each,
/// and fills in the descendant counts. Returns the arena indices of the top level entries.
fn lower<'a>(
    forest: &'a [OutlineNode],
    slots: &mut Vec<Slot<'a>>,
    document: &mut OutlineDocument,
) -> Vec<usize> {
    let mut top_level = Vec::with_capacity(forest.len());
    let mut pending: Vec<(&'a OutlineNode, Option<usize>)> =
        forest.iter().rev().map(|node| (node, None)).collect();

    while let Some((node, parent)) = pending.pop() {
        let index = slots.len();
        // Preorder reaches a node right after the whole subtree of its previous sibling.
        let prev = match parent {
            Some(parent) => slots[parent].last,
            None => top_level.last().copied(),
        };
        slots.push(Slot {
            node,
            id: document.allocate(),
            parent,
            prev,
            next: None,
            first: None,
            last: None,
            descendants: 0,
        });
        if let Some(prev) = prev {
            slots[prev].next = Some(index);
        }
        match parent {
            Some(parent) => {
                slots[parent].first.get_or_insert(index);
                slots[parent].last = Some(index);
            }
            None => top_level.push(index),
        }
        pending.extend(node.children.iter().rev().map(|child| (child, Some(index))));
    }

    // Children always follow their parent in the arena.
    for index in (0..slots.len()).rev() {
        if let Some(parent) = slots[index].parent {
            let below = 1 + slots[index].descendants;
            slots[parent].descendants += below;
        }
    }
    top_level
}

use std::collections::HashSet;

use lopdf::{Dictionary, Object, ObjectId};
use tracing::{debug, warn};

use crate::outline::{DEFAULT_TITLE, IdGenerator, OutlineItem, OutlineNode, SequentialIds, build_tree};

use super::{
    OUTLINES_KEY, OutlineDocument,
    destination::{PageIndex, resolve_page},
    resolve, resolve_dict,
    text::decode_title,
};

/// `/Type` values of the objects that make up the document itself. A link from an outline entry
/// to one of these is corruption and is never read as an entry.
const DOCUMENT_TYPES: [&[u8]; 3] = [b"Catalog", b"Pages", b"Page"];

pub struct OutlineExtractor<'a> {
    document: &'a OutlineDocument,
    pages: PageIndex,
}

impl<'a> OutlineExtractor<'a> {
    pub fn new(document: &'a OutlineDocument) -> Self {
        Self {
            document,
            pages: PageIndex::new(document.pages()),
        }
    }

    /// Reads the outline tree. A missing or malformed outline yields an empty forest, and a
    /// pointer back to an entry that was already read ends the chain it appears in.
    pub fn extract_outline(&self, ids: &mut dyn IdGenerator) -> Vec<OutlineNode> {
        build_tree(&self.extract_items(ids))
    }

    /// Reads the outline in preorder, each entry at a level equal to its depth.
    pub fn extract_items(&self, ids: &mut dyn IdGenerator) -> Vec<OutlineItem> {
        self.walk(&mut HashSet::new(), ids)
    }

    /// Ids of the outline root and every entry read from it.
    pub fn outline_object_ids(&self) -> Vec<ObjectId> {
        let mut visited = HashSet::new();
        self.walk(&mut visited, &mut SequentialIds::default());
        let mut ids: Vec<ObjectId> = visited.into_iter().collect();
        ids.sort();
        ids
    }

    fn walk(&self, visited: &mut HashSet<ObjectId>, ids: &mut dyn IdGenerator) -> Vec<OutlineItem> {
        let document: &'a OutlineDocument = self.document;
        let Some(root_ref) = document.catalog_get(OUTLINES_KEY) else {
            debug!("Document has no outline");
            return vec![];
        };
        let doc = document.document();
        let Some(root) = resolve_dict(doc, root_ref) else {
            warn!("Outline root is not a dictionary");
            return vec![];
        };
        if is_document_object(root) {
            warn!("Outline root is a document structure object");
            return vec![];
        }

        if let Object::Reference(id) = root_ref {
            visited.insert(*id);
        }
        let mut items = Vec::new();
        // Chains still to be read, with the depth of their entries. The chain on top is read
        // first, so an entry's children come before its next sibling.
        let mut pending: Vec<(&'a Object, usize)> = Vec::new();
        if let Ok(first) = root.get(b"First") {
            pending.push((first, 0));
        }

        while let Some((link, level)) = pending.pop() {
            let Object::Reference(id) = link else {
                warn!("Outline entry is not an indirect object: {:?}", link);
                continue;
            };
            let Ok(entry) = doc.get_dictionary(*id) else {
                warn!("Outline entry {:?} is missing or not a dictionary", id);
                continue;
            };
            if is_document_object(entry) {
                warn!("Outline entry {:?} is a document structure object, stopping this chain", id);
                continue;
            }
            if !visited.insert(*id) {
                warn!("Outline entry {:?} was already visited, stopping this chain", id);
                continue;
            }

            items.push(OutlineItem {
                id: ids.next_id(),
                title: self.title(entry),
                page_index: self.page(entry),
                level,
            });
            if let Ok(next) = entry.get(b"Next") {
                pending.push((next, level));
            }
            if let Ok(child) = entry.get(b"First") {
                pending.push((child, level + 1));
            }
        }
        items
    }

    fn title(&self, entry: &Dictionary) -> String {
        let doc = self.document.document();
        entry
            .get(b"Title")
            .ok()
            .and_then(|title| resolve(doc, title))
            .and_then(decode_title)
            .unwrap_or_else(|| {
                debug!("Outline entry without a readable title");
                DEFAULT_TITLE.to_string()
            })
    }

    fn page(&self, entry: &Dictionary) -> usize {
        resolve_page(self.document.document(), entry, &self.pages).unwrap_or(0)
    }
}

fn is_document_object(dict: &Dictionary) -> bool {
    dict.get(b"Type")
        .and_then(Object::as_name)
        .is_ok_and(|name| DOCUMENT_TYPES.iter().any(|kind| *kind == name))
}

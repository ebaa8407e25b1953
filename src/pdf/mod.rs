use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::outline::{IdGenerator, OutlineItem, build_tree};

pub mod destination;
pub mod outline_extraction;
pub mod outline_writer;
pub mod text;

use destination::{PageIndex, PagePolicy};
use outline_extraction::OutlineExtractor;
use outline_writer::OutlineWriter;

const OUTLINES_KEY: &[u8] = b"Outlines";

/// A loaded pdf seen through the handful of object store operations the outline code needs.
/// Everything else about the file is left to `lopdf`.
#[derive(Debug)]
pub struct OutlineDocument {
    document: Document,
}

impl OutlineDocument {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let document = Document::load_mem(bytes).context("Failed to parse pdf")?;
        Self::from_document(document)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::load(&bytes)
    }

    pub fn from_document(document: Document) -> Result<Self> {
        if document.is_encrypted() {
            bail!("Encrypted pdf files are not supported");
        }
        Ok(Self { document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Page objects in document order.
    pub fn pages(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Reserves a fresh object id. Ids are handed out in increasing order.
    pub fn allocate(&mut self) -> ObjectId {
        self.document.new_object_id()
    }

    /// Stores `dictionary` under an id obtained from [`OutlineDocument::allocate`].
    pub fn assign(&mut self, id: ObjectId, dictionary: Dictionary) {
        self.document.objects.insert(id, Object::Dictionary(dictionary));
    }

    pub fn catalog_get(&self, key: &[u8]) -> Option<&Object> {
        self.document.catalog().ok()?.get(key).ok()
    }

    pub fn catalog_set(&mut self, key: &[u8], value: impl Into<Object>) -> Result<()> {
        self.document
            .catalog_mut()
            .map_err(|e| anyhow!("Document has no catalog: {}", e))?
            .set(key.to_vec(), value);
        Ok(())
    }

    pub fn save(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.document
            .save_to(&mut out)
            .context("Failed to serialize pdf")?;
        Ok(out)
    }

    pub fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.save()?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// The catalog, the pages and every node of the page tree above them.
    fn structure_ids(&self) -> HashSet<ObjectId> {
        let mut ids = HashSet::new();
        if let Ok(Object::Reference(catalog)) = self.document.trailer.get(b"Root") {
            ids.insert(*catalog);
        }
        for page in self.pages() {
            let mut cursor = Some(page);
            while let Some(id) = cursor {
                if !ids.insert(id) {
                    break;
                }
                cursor = self
                    .document
                    .get_dictionary(id)
                    .and_then(|dict| dict.get(b"Parent"))
                    .and_then(Object::as_reference)
                    .ok();
            }
        }
        ids
    }

    /// Reads the outline as a flat list. Documents without a usable outline give an empty list.
    pub fn extract(&self, ids: &mut dyn IdGenerator) -> Vec<OutlineItem> {
        let items = OutlineExtractor::new(self).extract_items(ids);
        debug!("Extracted {} outline entries", items.len());
        items
    }

    /// Replaces the outline with `items`. The previous outline objects are dropped. An empty
    /// list leaves the document as it is.
    pub fn apply(&mut self, items: &[OutlineItem], policy: PagePolicy) -> Result<()> {
        let forest = build_tree(items);
        if forest.is_empty() {
            debug!("Empty outline, leaving the catalog untouched");
            return Ok(());
        }

        let pages = PageIndex::new(self.pages());
        let previous = OutlineExtractor::new(self).outline_object_ids();
        let root = OutlineWriter::new(&pages, policy).write(self, &forest)?;

        // A corrupt old outline may link into the page tree.
        let structure = self.structure_ids();
        for id in previous.into_iter().filter(|id| !structure.contains(id)) {
            self.document.objects.remove(&id);
        }
        self.catalog_set(OUTLINES_KEY, root)?;
        info!("Wrote {} outline entries", items.len());
        Ok(())
    }
}

/// Parses `bytes`, replaces the outline and serializes the result.
pub fn apply_outline(bytes: &[u8], items: &[OutlineItem]) -> Result<Vec<u8>> {
    let mut document = OutlineDocument::load(bytes)?;
    document.apply(items, PagePolicy::default())?;
    document.save()
}

pub fn extract_outline(bytes: &[u8], ids: &mut dyn IdGenerator) -> Result<Vec<OutlineItem>> {
    Ok(OutlineDocument::load(bytes)?.extract(ids))
}

/// Follows a reference to the object it points at. Direct objects are returned as they are.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, object)?.as_dict().ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{Document, Object, ObjectId, dictionary};

    /// A minimal document with `page_count` empty pages. Returns the document and its page ids
    /// in order.
    pub fn blank_document(page_count: usize) -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_ids: Vec<ObjectId> = (0..page_count)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                })
            })
            .collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => page_count as i64,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page_ids)
    }
}

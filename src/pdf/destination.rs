use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use lopdf::{Dictionary, Document, Object, ObjectId};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use super::{resolve, resolve_dict};

/// Named and dictionary destinations may point at each other. Chains longer than this are
/// treated as unresolvable.
const MAX_DESTINATION_HOPS: usize = 8;

/// What to do with an outline entry whose page index lies past the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum PagePolicy {
    /// Point the entry at the first page.
    #[default]
    FirstPage,
    /// Point the entry at the last page.
    LastPage,
    /// Refuse to write the outline.
    Reject,
}

/// The ordered page list of a document together with a reverse lookup from page object to
/// ordinal, built once per conversion.
#[derive(Debug, Clone)]
pub struct PageIndex {
    pages: Vec<ObjectId>,
    ordinals: HashMap<ObjectId, usize>,
}

impl PageIndex {
    pub fn new(pages: Vec<ObjectId>) -> Self {
        let ordinals = pages
            .iter()
            .enumerate()
            .map(|(ordinal, id)| (*id, ordinal))
            .collect();
        Self { pages, ordinals }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn ordinal(&self, page: ObjectId) -> Option<usize> {
        self.ordinals.get(&page).copied()
    }

    /// The page object an entry pointing at `page_index` should be bound to.
    pub fn page_for(&self, page_index: usize, policy: PagePolicy) -> Result<ObjectId> {
        if let Some(id) = self.pages.get(page_index) {
            return Ok(*id);
        }
        let fallback = match policy {
            PagePolicy::FirstPage => self.pages.first(),
            PagePolicy::LastPage => self.pages.last(),
            PagePolicy::Reject => bail!(
                "Page index {} is out of range for a document with {} pages",
                page_index,
                self.len()
            ),
        };
        match fallback {
            Some(id) => {
                warn!(
                    "Page index {} is past the last page ({}), using {}",
                    page_index,
                    self.len(),
                    policy
                );
                Ok(*id)
            }
            None => bail!("The document has no pages to point outline entries at"),
        }
    }
}

/// Builds `[page /XYZ null null null]`. Null coordinates and zoom keep whatever position and
/// magnification the viewer currently has.
pub fn write_destination(page: ObjectId) -> Object {
    Object::Array(vec![
        Object::Reference(page),
        Object::Name(b"XYZ".to_vec()),
        Object::Null,
        Object::Null,
        Object::Null,
    ])
}

/// Works out which page an outline entry points at. Returns `None` when the entry has no
/// destination, uses an action other than GoTo or names a page outside the document.
pub fn resolve_page(document: &Document, entry: &Dictionary, pages: &PageIndex) -> Option<usize> {
    let destination = match entry.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => goto_destination(document, entry)?,
    };
    let target = destination_array(document, destination, MAX_DESTINATION_HOPS)?;
    match target.first()? {
        Object::Reference(page) => pages.ordinal(*page),
        Object::Integer(ordinal) => usize::try_from(*ordinal)
            .ok()
            .filter(|ordinal| *ordinal < pages.len()),
        other => {
            debug!("Unsupported destination target {:?}", other);
            None
        }
    }
}

fn goto_destination<'a>(document: &'a Document, entry: &'a Dictionary) -> Option<&'a Object> {
    let action = resolve_dict(document, entry.get(b"A").ok()?)?;
    let kind = resolve(document, action.get(b"S").ok()?)?.as_name().ok()?;
    if kind != b"GoTo" {
        debug!("Ignoring outline action {}", String::from_utf8_lossy(kind));
        return None;
    }
    action.get(b"D").ok()
}

fn destination_array<'a>(
    document: &'a Document,
    destination: &'a Object,
    hops: usize,
) -> Option<&'a Vec<Object>> {
    if hops == 0 {
        warn!("Giving up on a destination that refers to itself");
        return None;
    }
    match resolve(document, destination)? {
        Object::Array(array) => Some(array),
        Object::Dictionary(dict) => destination_array(document, dict.get(b"D").ok()?, hops - 1),
        Object::Name(name) => {
            let named = named_destination(document, name)?;
            destination_array(document, named, hops - 1)
        }
        Object::String(name, _) => {
            let named = named_destination(document, name)?;
            destination_array(document, named, hops - 1)
        }
        _ => None,
    }
}

/// Looks a destination name up in the catalog's `Dests` dictionary, then in the `Dests` name
/// tree under `Names`.
fn named_destination<'a>(document: &'a Document, name: &[u8]) -> Option<&'a Object> {
    let catalog = document.catalog().ok()?;
    if let Some(dests) = catalog.get(b"Dests").ok().and_then(|d| resolve_dict(document, d))
        && let Ok(found) = dests.get(name)
    {
        return Some(found);
    }
    let names = resolve_dict(document, catalog.get(b"Names").ok()?)?;
    let tree = resolve_dict(document, names.get(b"Dests").ok()?)?;
    let mut visited = HashSet::new();
    name_tree_lookup(document, tree, name, &mut visited)
}

fn name_tree_lookup<'a>(
    document: &'a Document,
    node: &'a Dictionary,
    key: &[u8],
    visited: &mut HashSet<ObjectId>,
) -> Option<&'a Object> {
    if let Some(pairs) = node.get(b"Names").ok().and_then(|n| resolve(document, n))
        && let Ok(pairs) = pairs.as_array()
    {
        for pair in pairs.chunks_exact(2) {
            if let Some(Object::String(candidate, _)) = resolve(document, &pair[0])
                && candidate.as_slice() == key
            {
                return Some(&pair[1]);
            }
        }
    }

    let kids = resolve(document, node.get(b"Kids").ok()?)?.as_array().ok()?;
    for kid in kids {
        if let Object::Reference(id) = kid
            && !visited.insert(*id)
        {
            continue;
        }
        if let Some(child) = resolve_dict(document, kid)
            && let Some(found) = name_tree_lookup(document, child, key, visited)
        {
            return Some(found);
        }
    }
    None
}

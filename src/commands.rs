use std::{fmt::Write as _, fs, path::Path};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    config::Config,
    outline::{OutlineItem, RawOutlineItem, UuidGenerator, normalize_items, validate},
    pdf::OutlineDocument,
};

/// Reads the outline of the pdf at `pdf_path` and renders it as JSON.
pub fn extract_to_json(pdf_path: &Path, config: &Config) -> Result<String> {
    let document = OutlineDocument::open(pdf_path)?;
    let items = document.extract(&mut UuidGenerator);
    info!("Read {} outline entries from {}", items.len(), pdf_path.display());
    let json = if config.pretty_json {
        serde_json::to_string_pretty(&items)?
    } else {
        serde_json::to_string(&items)?
    };
    Ok(json)
}

pub fn read_outline_file(path: &Path) -> Result<Vec<OutlineItem>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read outline {}", path.display()))?;
    let raw: Vec<RawOutlineItem> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse outline {}", path.display()))?;
    Ok(normalize_items(raw, &mut UuidGenerator))
}

/// Writes `items` as the outline of the pdf at `pdf_path` and saves the result to `output`.
/// Lists that break the level rules are still written, nested as far as their levels allow.
pub fn apply_to_file(
    pdf_path: &Path,
    items: &[OutlineItem],
    output: &Path,
    config: &Config,
) -> Result<()> {
    for violation in validate(items) {
        warn!("{}", violation);
    }
    let mut document = OutlineDocument::open(pdf_path)?;
    document.apply(items, config.out_of_range_pages)?;
    document.save_to_path(output)?;
    info!("Saved {} with {} outline entries", output.display(), items.len());
    Ok(())
}

/// One line per entry, indented by level, with 1-based page numbers.
pub fn render_tree(items: &[OutlineItem]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{}{} (p. {})",
            "  ".repeat(item.level),
            item.title,
            item.page_index + 1
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{destination::PagePolicy, test_support::blank_document};

    fn write_blank_pdf(dir: &Path, pages: usize) -> std::path::PathBuf {
        let (doc, _) = blank_document(pages);
        let path = dir.join("blank.pdf");
        OutlineDocument::from_document(doc)
            .unwrap()
            .save_to_path(&path)
            .unwrap();
        path
    }

    #[test]
    fn apply_then_extract_through_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pdf = write_blank_pdf(dir.path(), 4);
        let outline = dir.path().join("outline.json");
        fs::write(
            &outline,
            r#"[
                {"id": "a", "title": "Cover", "pageIndex": 0, "level": 0},
                {"title": "Body", "pageIndex": 2, "level": 0},
                {"pageIndex": -3, "level": 1}
            ]"#,
        )?;
        let out = dir.path().join("out.pdf");
        let config = Config::default();

        let items = read_outline_file(&outline)?;
        apply_to_file(&pdf, &items, &out, &config)?;

        let json = extract_to_json(&out, &config)?;
        let read: Vec<OutlineItem> = serde_json::from_str(&json)?;
        let summary: Vec<(&str, usize, usize)> = read
            .iter()
            .map(|i| (i.title.as_str(), i.page_index, i.level))
            .collect();
        assert_eq!(
            summary,
            vec![("Cover", 0, 0), ("Body", 2, 0), ("Untitled", 0, 1)]
        );
        Ok(())
    }

    #[test]
    fn rejected_pages_leave_no_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pdf = write_blank_pdf(dir.path(), 1);
        let out = dir.path().join("out.pdf");
        let config = Config {
            out_of_range_pages: PagePolicy::Reject,
            ..Config::default()
        };
        let items = vec![OutlineItem {
            id: "a".into(),
            title: "Far".into(),
            page_index: 3,
            level: 0,
        }];
        assert!(apply_to_file(&pdf, &items, &out, &config).is_err());
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn compact_json_when_configured() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pdf = write_blank_pdf(dir.path(), 1);
        let config = Config {
            pretty_json: false,
            ..Config::default()
        };
        assert_eq!(extract_to_json(&pdf, &config)?, "[]");
        Ok(())
    }

    #[test]
    fn tree_rendering_indents_by_level() {
        let items = vec![
            OutlineItem {
                id: "a".into(),
                title: "Introduction".into(),
                page_index: 2,
                level: 0,
            },
            OutlineItem {
                id: "b".into(),
                title: "Goals".into(),
                page_index: 3,
                level: 1,
            },
        ];
        assert_eq!(render_tree(&items), "Introduction (p. 3)\n  Goals (p. 4)\n");
    }
}

// src/layout_store.rs
//
// Named layout files. One plain text file per layout under the app data
// dir, newline-separated `<cell index>:<encoded marking>` lines, the
// format the tablet app has always written. No header, version or
// checksum.

use std::fs;
use std::path::{Path, PathBuf};

use crate::marking::{Layout, MarkingItem};

/// Serialize a layout to file content, ascending cell-index order.
pub fn serialize_layout(layout: &Layout) -> String {
    layout
        .iter()
        .map(|(key, item)| format!("{}:{}", key, item.encode()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse layout file content. Lines that do not decode are skipped and
/// logged; one bad record must not take down the rest of the file.
pub fn parse_layout(content: &str) -> Layout {
    let mut layout = Layout::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, record)) = line.split_once(':') else {
            tlog!("[layout_store] Skipping line without a cell key: {}", line);
            continue;
        };
        let Ok(key) = key.trim().parse::<u32>() else {
            tlog!("[layout_store] Skipping line with a bad cell key: {}", line);
            continue;
        };
        match MarkingItem::decode(record) {
            Ok(item) => {
                layout.insert(key, item);
            }
            Err(e) => tlog!("[layout_store] Skipping record: {}", e),
        }
    }
    layout
}

/// Read a layout from an arbitrary path (CLI use).
pub fn read_layout_file(path: &Path) -> Result<Layout, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read layout file {}: {}", path.display(), e))?;
    Ok(parse_layout(&content))
}

/// Save a layout under a name in the app's layout directory.
pub fn save_layout(name: &str, layout: &Layout) -> Result<(), String> {
    let path = layout_path(name)?;
    fs::write(&path, serialize_layout(layout))
        .map_err(|e| format!("Failed to save layout {}: {}", name, e))?;
    tlog!("[layout_store] Saved layout {} ({} items)", name, layout.len());
    Ok(())
}

/// Load a named layout. `Ok(None)` when no such layout exists.
pub fn load_layout(name: &str) -> Result<Option<Layout>, String> {
    let path = layout_path(name)?;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read layout {}: {}", name, e))?;
    Ok(Some(parse_layout(&content)))
}

/// Delete a named layout. `Ok(false)` when it did not exist.
pub fn delete_layout(name: &str) -> Result<bool, String> {
    let path = layout_path(name)?;
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).map_err(|e| format!("Failed to delete layout {}: {}", name, e))?;
    tlog!("[layout_store] Deleted layout {}", name);
    Ok(true)
}

/// Names of all stored layouts, sorted.
pub fn list_layouts() -> Result<Vec<String>, String> {
    let dir = layouts_dir()?;
    let entries =
        fs::read_dir(&dir).map_err(|e| format!("Failed to list layouts: {}", e))?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

fn layouts_dir() -> Result<PathBuf, String> {
    let dir = dirs::data_dir()
        .ok_or_else(|| "Failed to resolve the app data dir".to_string())?
        .join("markstudio")
        .join("layouts");
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create layouts dir: {}", e))?;
    Ok(dir)
}

fn layout_path(name: &str) -> Result<PathBuf, String> {
    validate_name(name)?;
    Ok(layouts_dir()?.join(name))
}

/// Layout names are file names; keep them inside the layouts dir.
fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Layout name is empty".to_string());
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(format!("Invalid layout name: {}", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::DEFAULT_FONT;

    fn item(text: &str) -> MarkingItem {
        MarkingItem::new(
            text.to_string(),
            1,
            2,
            20,
            50.0,
            0.0,
            0.0,
            99,
            1,
            DEFAULT_FONT.to_string(),
        )
    }

    #[test]
    fn test_serialize_parse_round_trip() {
        let mut layout = Layout::new();
        layout.insert(1, item("Hello"));
        layout.insert(121, item("World"));

        let content = serialize_layout(&layout);
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("1:Hello,"));

        assert_eq!(parse_layout(&content), layout);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let mut layout = Layout::new();
        layout.insert(1, item("Hello"));
        let good = serialize_layout(&layout);
        let content = format!("{}\n7:Oops,1,2\nnot a line at all\n", good);

        let parsed = parse_layout(&content);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&1].text, "Hello");
    }

    #[test]
    fn test_parse_skips_bad_keys() {
        let content = "abc:Hello,1,2,20,50.0,0.0,0.0,99,1,F1";
        assert!(parse_layout(content).is_empty());
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_layout("").is_empty());
        assert!(parse_layout("\n\n").is_empty());
    }

    #[test]
    fn test_validate_name_rejects_paths() {
        assert!(validate_name("plate-a").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..\\evil").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn test_read_layout_file() {
        let mut layout = Layout::new();
        layout.insert(3, item("From disk"));

        let path = std::env::temp_dir().join(format!(
            "markstudio-test-layout-{}.txt",
            std::process::id()
        ));
        fs::write(&path, serialize_layout(&layout)).unwrap();

        let loaded = read_layout_file(&path).unwrap();
        assert_eq!(loaded, layout);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_layout_file_missing() {
        let path = std::env::temp_dir().join("markstudio-test-no-such-file.txt");
        assert!(read_layout_file(&path).is_err());
    }
}

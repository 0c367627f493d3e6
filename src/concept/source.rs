//! Taxonomy source file parsing
//!
//! Relation records arrive as tab-separated lines
//! `parentId \t parentName \t childId \t childName`; the element map ties
//! concept ids to mesh file ids as `conceptId \t ... \t fileId` (only the
//! first and last columns are significant). Malformed lines are skipped
//! with a warning rather than failing the whole load.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use log::warn;

use super::tree::Relation;

/// Reads relation records from a tab-separated file.
pub fn read_relations(path: &Path) -> io::Result<Vec<Relation>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_relations(&content))
}

/// Parses relation records from tab-separated text.
pub fn parse_relations(content: &str) -> Vec<Relation> {
    let mut relations = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 4 {
            warn!("skipping relation line {}: {} columns", line_no + 1, cols.len());
            continue;
        }
        relations.push(Relation {
            parent_id: cols[0].trim().to_string(),
            parent_name: cols[1].trim().to_string(),
            child_id: cols[2].trim().to_string(),
            child_name: cols[3].trim().to_string(),
        });
    }
    relations
}

/// Reads the concept-to-file-id map from a tab-separated file.
pub fn read_element_map(path: &Path) -> io::Result<HashMap<String, Vec<String>>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_element_map(&content))
}

/// Parses the element map from tab-separated text.
///
/// A concept id may appear on several lines, one per mesh file; order of
/// appearance is preserved per concept.
pub fn parse_element_map(content: &str) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 2 {
            warn!("skipping element line {}: {} columns", line_no + 1, cols.len());
            continue;
        }
        let concept_id = cols[0].trim().to_string();
        let file_id = cols[cols.len() - 1].trim().to_string();
        let files = map.entry(concept_id).or_default();
        if !files.contains(&file_id) {
            files.push(file_id);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relations() {
        let content = "body\tBody\ttorso\tTorso\nbody\tBody\thead\tHead\n";
        let relations = parse_relations(content);
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].parent_id, "body");
        assert_eq!(relations[1].child_name, "Head");
    }

    #[test]
    fn test_parse_relations_skips_malformed_lines() {
        let content = "body\tBody\ttorso\tTorso\n\nonly\ttwo\nbad line\n";
        let relations = parse_relations(content);
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn test_parse_element_map_first_and_last_column() {
        let content = "heart\tignored\talso ignored\tf_heart\nlung\tf_lung_left\n";
        let map = parse_element_map(content);
        assert_eq!(map["heart"], vec!["f_heart".to_string()]);
        assert_eq!(map["lung"], vec!["f_lung_left".to_string()]);
    }

    #[test]
    fn test_parse_element_map_accumulates_files_per_concept() {
        let content = "lung\tf_lung_left\nlung\tf_lung_right\nlung\tf_lung_left\n";
        let map = parse_element_map(content);
        assert_eq!(
            map["lung"],
            vec!["f_lung_left".to_string(), "f_lung_right".to_string()]
        );
    }
}

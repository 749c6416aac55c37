// File: src/persistence.rs
use crate::core::search_graph::SearchGraph;
use crate::error::PersistError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes search graphs next to `path` first and renames them into place, so
/// a reader never sees a half-written file.
pub fn save_search_graphs(graphs: &[SearchGraph], path: &Path) -> Result<(), PersistError> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, graphs)?;
        writer.flush()?;
    }
    temp_file.persist(path)?;
    tracing::debug!(path = %path.display(), sentences = graphs.len(), "search graphs saved");
    Ok(())
}

pub fn load_search_graphs(path: &Path) -> Result<Vec<SearchGraph>, PersistError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(bincode::deserialize_from(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search_graph::SearchGraphNode;
    use crate::core::span::Span;

    fn graph() -> SearchGraph {
        SearchGraph {
            sentence: 3,
            nodes: vec![
                SearchGraphNode {
                    id: 0,
                    stack: 0,
                    back: None,
                    recombined_into: None,
                    span: None,
                    target: Vec::new(),
                    transition_score: 0.0,
                    total_score: -4.0,
                    future_score: -4.0,
                    covered: 0,
                },
                SearchGraphNode {
                    id: 1,
                    stack: 1,
                    back: Some(0),
                    recombined_into: None,
                    span: Some(Span::single(0)),
                    target: vec![7, 8],
                    transition_score: -1.5,
                    total_score: -4.5,
                    future_score: -3.0,
                    covered: 1,
                },
            ],
        }
    }

    #[test]
    fn graphs_survive_a_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.bin");
        save_search_graphs(&[graph()], &path).unwrap();
        assert_eq!(load_search_graphs(&path).unwrap(), vec![graph()]);
    }

    #[test]
    fn saving_replaces_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        save_search_graphs(&[graph(), graph()], &path).unwrap();
        save_search_graphs(&[graph()], &path).unwrap();
        assert_eq!(load_search_graphs(&path).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_search_graphs(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}

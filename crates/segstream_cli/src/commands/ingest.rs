//! Ingest command implementation.

use segstream_core::{
    create_writer, Config, DirectoryStore, SegmentSink, SegmentWriter, StreamId, StreamStore,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Summary of one ingested file.
#[derive(Debug)]
pub struct IngestedEntry {
    /// Source file.
    pub file: PathBuf,
    /// Bytes copied.
    pub bytes: u64,
}

/// Writes `files` into a new container `id` under `path`.
pub fn ingest(
    path: &Path,
    id: &str,
    files: &[PathBuf],
    config: &Config,
) -> Result<Vec<IngestedEntry>, Box<dyn std::error::Error>> {
    let store = DirectoryStore::with_config(path, config);
    let id = StreamId::new(id);
    if store.exists(&id) {
        return Err(format!("Container {id} already exists in {}", path.display()).into());
    }

    let mut writer = create_writer(&store, &id, config)?;
    let segment_writer = SegmentWriter::new(config.clone());
    let mut entries = Vec::with_capacity(files.len());

    for file in files {
        let input = match File::open(file) {
            Ok(input) => BufReader::new(input),
            Err(err) => {
                writer.close()?;
                return Err(format!("Cannot open {}: {err}", file.display()).into());
            }
        };
        let bytes = segment_writer.write(input, &mut writer, false)?;
        info!(file = %file.display(), bytes, "ingested");
        entries.push(IngestedEntry {
            file: file.clone(),
            bytes,
        });
    }

    writer.close()?;
    Ok(entries)
}

/// Runs the ingest command.
pub fn run(
    path: &Path,
    id: &str,
    files: &[PathBuf],
    lookahead: usize,
    lock: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new().xml_lookahead(lookahead).lock_writer(lock);
    let entries = ingest(path, id, files, &config)?;

    let total: u64 = entries.iter().map(|entry| entry.bytes).sum();
    for (ordinal, entry) in entries.iter().enumerate() {
        println!("  [{ordinal}] {} ({} bytes)", entry.file.display(), entry.bytes);
    }
    println!("Wrote {} entries, {total} bytes to {id}", entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use segstream_core::open_reader;
    use tempfile::tempdir;

    #[test]
    fn ingest_one_entry_per_file() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.txt");
        let second = dir.path().join("b.xml");
        std::fs::write(&first, "x\ny\n").unwrap();
        std::fs::write(&second, "<?xml version=\"1.0\"?><r><a/><b/><c/></r>").unwrap();

        let store_dir = dir.path().join("store");
        let entries = ingest(
            &store_dir,
            "c1",
            &[first, second],
            &Config::default(),
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].bytes, 4);

        let store = DirectoryStore::new(&store_dir);
        let mut reader = open_reader(&store, &StreamId::new("c1")).unwrap();
        assert_eq!(reader.input_stream(0).unwrap().segment_count(), 2);
        assert_eq!(reader.input_stream(1).unwrap().segment_count(), 3);
    }

    #[test]
    fn ingest_refuses_existing_container() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        ingest(dir.path(), "dup", &[file.clone()], &Config::default()).unwrap();
        assert!(ingest(dir.path(), "dup", &[file], &Config::default()).is_err());
    }
}

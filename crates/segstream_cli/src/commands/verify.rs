//! Verify command implementation.

use segstream_codec::validate_monotonic;
use segstream_core::{open_reader, CompoundReader, DirectoryStore, StreamId};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of entries checked.
    pub entries_checked: u64,
    /// Number of segment boundaries checked.
    pub boundaries_checked: u64,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks the indexes of an open container against its data stream.
///
/// - boundary offsets never decrease and stay within the data
/// - segment offsets never decrease
/// - every segment offset lies strictly inside one entry
pub fn verify(reader: &CompoundReader) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();
    let data_size = reader.nested().data_size();
    let boundaries = reader.nested().boundary_index().read_all()?;
    let segments = reader.segment_index().read_all()?;

    if let Err(err) = validate_monotonic(&boundaries) {
        result.errors.push(format!("boundary index: {err}"));
    }
    if let Some(&first) = boundaries.first() {
        if first != 0 {
            result
                .errors
                .push(format!("boundary index starts at {first}, not 0"));
        }
    }
    if let Some(&last) = boundaries.last() {
        if last != data_size {
            result.errors.push(format!(
                "boundary index ends at {last} but data stream holds {data_size} bytes"
            ));
        }
    }
    if let Err(err) = validate_monotonic(&segments) {
        result.errors.push(format!("segment index: {err}"));
    }

    result.entries_checked = reader.input_stream_count();
    for (slot, &offset) in segments.iter().enumerate() {
        result.boundaries_checked += 1;
        let entry = boundaries.partition_point(|&start| start < offset);
        let inside = entry > 0 && entry < boundaries.len() && boundaries[entry] != offset;
        if !inside {
            result.errors.push(format!(
                "segment boundary {slot} at {offset} is not inside any entry"
            ));
        }
    }

    Ok(result)
}

/// Runs the verify command.
pub fn run(path: &Path, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying container {id} at {:?}", path);
    println!();

    let store = DirectoryStore::new(path);
    let mut reader = open_reader(&store, &StreamId::new(id))?;
    let result = verify(&reader)?;
    reader.close()?;

    println!("  Entries checked:            {}", result.entries_checked);
    println!("  Segment boundaries checked: {}", result.boundaries_checked);
    for error in &result.errors {
        println!("  Error: {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Container verification passed");
        Ok(())
    } else {
        println!("✗ Container verification failed");
        Err("Verification failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segstream_codec::encode_offsets;
    use segstream_core::{Config, MemoryStore, SegmentWriter, Triad};
    use segstream_storage::InMemoryBackend;

    fn reader(data: &[u8], boundaries: &[u64], segments: &[u64]) -> CompoundReader {
        let triad = Triad::new(
            Box::new(InMemoryBackend::with_data(data.to_vec())),
            Box::new(InMemoryBackend::with_data(encode_offsets(boundaries).unwrap())),
            Box::new(InMemoryBackend::with_data(encode_offsets(segments).unwrap())),
        );
        CompoundReader::open(triad).unwrap()
    }

    #[test]
    fn written_container_verifies() {
        let store = MemoryStore::new();
        let id = StreamId::new("ok");
        let mut writer = segstream_core::create_writer(&store, &id, &Config::default()).unwrap();
        SegmentWriter::default()
            .write(&b"a\nb\nc\n"[..], &mut writer, true)
            .unwrap();

        let reader = open_reader(&store, &id).unwrap();
        let result = verify(&reader).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(result.entries_checked, 1);
        assert_eq!(result.boundaries_checked, 2);
    }

    #[test]
    fn segment_on_entry_edge_is_reported() {
        let reader = reader(b"aaaabbbb", &[0, 4, 8], &[2, 4]);
        let result = verify(&reader).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("at 4"));
    }

    #[test]
    fn short_data_is_reported() {
        let reader = reader(b"aaaabbbbcc", &[0, 4, 8], &[]);
        let result = verify(&reader).unwrap();
        assert!(!result.is_ok());
    }
}

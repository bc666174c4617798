//! Inspect command implementation.

use segstream_core::{open_reader, CompoundReader, DirectoryStore, StreamId, StreamRole, StreamStore};
use serde::Serialize;
use std::path::Path;

/// Container inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Container id.
    pub id: String,
    /// Data stream size in bytes.
    pub data_size: u64,
    /// Boundary index size in bytes.
    pub boundary_index_size: u64,
    /// Segment index size in bytes.
    pub segment_index_size: u64,
    /// Number of entries.
    pub entry_count: u64,
    /// Total number of segments across all entries.
    pub segment_count: u64,
    /// Per-entry details.
    pub entries: Vec<EntryInfo>,
}

/// Layout of a single entry.
#[derive(Debug, Serialize)]
pub struct EntryInfo {
    /// Zero-based entry ordinal.
    pub ordinal: u64,
    /// First data byte.
    pub start: u64,
    /// One past the last data byte.
    pub end: u64,
    /// Number of segments.
    pub segment_count: u64,
    /// Segment ranges (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<[u64; 2]>>,
}

/// Collects layout information from an open container.
pub fn inspect(
    id: &str,
    reader: &mut CompoundReader,
    sizes: [u64; 3],
    show_segments: bool,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let [data_size, boundary_index_size, segment_index_size] = sizes;
    let mut result = InspectResult {
        id: id.to_string(),
        data_size,
        boundary_index_size,
        segment_index_size,
        entry_count: reader.input_stream_count(),
        segment_count: 0,
        entries: Vec::new(),
    };

    for ordinal in 0..result.entry_count {
        let stream = reader.input_stream(ordinal)?;
        let range = stream.range();
        let segments = if show_segments {
            let mut ranges = Vec::new();
            for k in 0..stream.segment_count() {
                let segment = stream.segment_range(k)?;
                ranges.push([segment.start, segment.end]);
            }
            Some(ranges)
        } else {
            None
        };
        result.segment_count += stream.segment_count();
        result.entries.push(EntryInfo {
            ordinal,
            start: range.start,
            end: range.end,
            segment_count: stream.segment_count(),
            segments,
        });
    }

    Ok(result)
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    id: &str,
    show_segments: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DirectoryStore::new(path);
    let stream_id = StreamId::new(id);
    if !store.exists(&stream_id) {
        return Err(format!("No container {id} found at {}", path.display()).into());
    }

    let mut sizes = [0u64; 3];
    for (size, role) in sizes.iter_mut().zip(StreamRole::ALL) {
        *size = std::fs::metadata(store.path_of(&stream_id, role))?.len();
    }

    let mut reader = open_reader(&store, &stream_id)?;
    let result = inspect(id, &mut reader, sizes, show_segments)?;
    reader.close()?;

    // Output
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("SegStream Container Inspection");
    println!("==============================");
    println!();
    println!("Id: {}", result.id);
    println!();
    println!("Storage:");
    println!("  Data:           {} bytes", format_size(result.data_size));
    println!(
        "  Boundary index: {} bytes",
        format_size(result.boundary_index_size)
    );
    println!(
        "  Segment index:  {} bytes",
        format_size(result.segment_index_size)
    );
    println!();
    println!("Entries:  {}", result.entry_count);
    println!("Segments: {}", result.segment_count);

    if !result.entries.is_empty() {
        println!();
        for entry in &result.entries {
            println!(
                "  [{}] [{}, {}) {} segments",
                entry.ordinal, entry.start, entry.end, entry.segment_count
            );
            if let Some(segments) = &entry.segments {
                for (k, [start, end]) in segments.iter().enumerate() {
                    println!("      {k}: [{start}, {end})");
                }
            }
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

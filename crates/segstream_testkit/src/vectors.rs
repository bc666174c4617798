//! Container layout vectors.
//!
//! Each vector pairs writer inputs with the exact bytes of the two index
//! streams they must produce, pinning the on-disk format.

use crate::fixtures::TestContainer;
use segstream_core::{StreamRole, StreamStore};

/// A writer input together with its expected index bytes.
#[derive(Debug, Clone)]
pub struct ContainerVector {
    /// Unique identifier for this vector.
    pub id: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// One input per entry, written through the segment writer.
    pub inputs: Vec<&'static [u8]>,
    /// Expected boundary index (hex-encoded).
    pub boundary_hex: String,
    /// Expected segment index (hex-encoded).
    pub segment_hex: String,
}

impl ContainerVector {
    /// Writes the inputs to a fresh in-memory container and returns the
    /// hex-encoded boundary and segment indexes.
    pub fn write(&self) -> (String, String) {
        let container = TestContainer::memory();
        container.write_entries(&self.inputs);
        (
            hex_encode(&read_stream(container.store(), container.id(), StreamRole::BoundaryIndex)),
            hex_encode(&read_stream(container.store(), container.id(), StreamRole::SegmentIndex)),
        )
    }
}

fn read_stream(
    store: &dyn StreamStore,
    id: &segstream_core::StreamId,
    role: StreamRole,
) -> Vec<u8> {
    let backend = store.open(id, role).expect("Failed to open stream");
    let size = backend.size().expect("Failed to size stream");
    backend
        .read_at(0, size as usize)
        .expect("Failed to read stream")
}

/// Hex of a sequence of big-endian `u64` offsets.
pub fn offsets_hex(offsets: &[u64]) -> String {
    offsets
        .iter()
        .map(|offset| format!("{offset:016x}"))
        .collect()
}

/// Standard layout vectors.
pub fn container_vectors() -> Vec<ContainerVector> {
    vec![
        ContainerVector {
            id: "empty_container",
            description: "No entries: only the leading zero offset",
            inputs: vec![],
            boundary_hex: offsets_hex(&[0]),
            segment_hex: String::new(),
        },
        ContainerVector {
            id: "empty_entry",
            description: "One empty entry",
            inputs: vec![&b""[..]],
            boundary_hex: offsets_hex(&[0, 0]),
            segment_hex: String::new(),
        },
        ContainerVector {
            id: "three_lines",
            description: "Text entry split after each newline",
            inputs: vec![&b"line1\nline2\nline3\n"[..]],
            boundary_hex: offsets_hex(&[0, 18]),
            segment_hex: offsets_hex(&[6, 12]),
        },
        ContainerVector {
            id: "unterminated_line",
            description: "Final line without newline is its own segment",
            inputs: vec![&b"ab\ncd"[..]],
            boundary_hex: offsets_hex(&[0, 5]),
            segment_hex: offsets_hex(&[3]),
        },
        ContainerVector {
            id: "two_entries",
            description: "Segment offsets are absolute in the data stream",
            inputs: vec![&b"a\nb\n"[..], &b"c\nd\n"[..]],
            boundary_hex: offsets_hex(&[0, 4, 8]),
            segment_hex: offsets_hex(&[2, 6]),
        },
        ContainerVector {
            id: "xml_two_records",
            description: "XML entry split after the first child element",
            inputs: vec![&b"<?xml version=\"1.0\"?><r><a>1</a><b>2</b></r>"[..]],
            boundary_hex: offsets_hex(&[0, 44]),
            segment_hex: offsets_hex(&[32]),
        },
        ContainerVector {
            id: "xml_single_record",
            description: "XML entry with one child is one segment",
            inputs: vec![&b"<?xml version=\"1.0\"?><r><a/></r>"[..]],
            boundary_hex: offsets_hex(&[0, 32]),
            segment_hex: String::new(),
        },
    ]
}

/// Converts bytes to hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Converts hex string to bytes.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("Hex string must have even length".into());
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("Invalid hex at position {}: {}", i, e))
        })
        .collect()
}

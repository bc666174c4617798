//! Benchmark utilities.

use rand::Rng;

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate text input of `line_count` lines of roughly `line_len` bytes.
pub fn text_input(line_count: usize, line_len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut text = Vec::with_capacity(line_count * (line_len + 1));
    for _ in 0..line_count {
        text.extend((0..line_len).map(|_| rng.gen_range(b'a'..=b'z')));
        text.push(b'\n');
    }
    text
}

/// Generate an XML document with `record_count` children of about
/// `record_len` bytes each.
pub fn xml_input(record_count: usize, record_len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut doc = b"<?xml version=\"1.0\"?>\n<records>\n".to_vec();
    for i in 0..record_count {
        doc.extend_from_slice(format!("  <record id=\"{i}\">").as_bytes());
        doc.extend((0..record_len).map(|_| rng.gen_range(b'a'..=b'z')));
        doc.extend_from_slice(b"</record>\n");
    }
    doc.extend_from_slice(b"</records>\n");
    doc
}

/// Generate strictly increasing offsets with random gaps.
pub fn offsets(count: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    let mut next = 0u64;
    (0..count)
        .map(|_| {
            next += rng.gen_range(1..4096);
            next
        })
        .collect()
}

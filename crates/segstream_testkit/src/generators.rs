//! Property-based test generators using proptest.
//!
//! Provides strategies for generating container inputs together with the
//! segments a writer is expected to produce for them.

use proptest::prelude::*;

/// Strategy for a single text line without its terminator.
pub fn line_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 ,.]{0,24}").expect("Invalid regex")
}

/// Strategy for text input of one or more lines, with or without a final
/// newline.
pub fn text_input_strategy() -> impl Strategy<Value = Vec<u8>> {
    (prop::collection::vec(line_strategy(), 1..16), any::<bool>()).prop_map(
        |(lines, trailing_newline)| {
            let mut text = lines.join("\n");
            if trailing_newline {
                text.push('\n');
            }
            text.into_bytes()
        },
    )
}

/// Strategy for an XML document with a declaration and a root element of
/// `<record>` children. Yields the document and its record values.
pub fn xml_records_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<String>)> {
    prop::collection::vec(
        prop::string::string_regex("[a-z0-9 ]{0,12}").expect("Invalid regex"),
        1..12,
    )
    .prop_map(|values| {
        let mut doc = String::from("<?xml version=\"1.0\"?>\n<records>\n");
        for value in &values {
            doc.push_str("  <record>");
            doc.push_str(value);
            doc.push_str("</record>\n");
        }
        doc.push_str("</records>\n");
        (doc.into_bytes(), values)
    })
}

/// Strategy for arbitrary entry bytes.
pub fn entry_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for a list of arbitrary entries.
pub fn entries_strategy(max_entries: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(entry_data_strategy(), 0..=max_entries)
}

/// Strategy for an entry given as explicit, non-empty segments.
pub fn segmented_entry_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..8)
}

/// Strategy for strictly increasing offsets, as found in an offset index.
pub fn offsets_strategy(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..1 << 20, 0..=max_len).prop_map(|gaps| {
        let mut next = 0u64;
        gaps.into_iter()
            .map(|gap| {
                next += gap;
                next
            })
            .collect()
    })
}

/// Segments text input is expected to split into: a boundary after every
/// newline that is followed by more bytes.
pub fn expected_text_segments(input: &[u8]) -> Vec<Vec<u8>> {
    let mut segments = vec![Vec::new()];
    for (i, &byte) in input.iter().enumerate() {
        if let Some(current) = segments.last_mut() {
            current.push(byte);
        }
        if byte == b'\n' && i + 1 < input.len() {
            segments.push(Vec::new());
        }
    }
    segments
}

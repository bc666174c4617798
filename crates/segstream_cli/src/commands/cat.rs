//! Cat command implementation.

use segstream_core::{open_provider, DirectoryStore, InputStreamProvider, StreamId};
use std::io::{self, Write};
use std::path::Path;

/// Copies entry `entry`, or only its segment `segment`, to `out`.
pub fn copy_to(
    provider: &mut dyn InputStreamProvider,
    entry: u64,
    segment: Option<u64>,
    out: &mut dyn Write,
) -> Result<u64, Box<dyn std::error::Error>> {
    let copied = match segment {
        Some(segment) => {
            let stream = provider.segment_input_stream(entry)?;
            let mut reader = stream.segment_reader(segment)?;
            io::copy(&mut reader, out)?
        }
        None => {
            let mut reader = provider.stream(entry)?;
            io::copy(&mut reader, out)?
        }
    };
    Ok(copied)
}

/// Runs the cat command.
pub fn run(
    path: &Path,
    id: &str,
    entry: u64,
    segment: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DirectoryStore::new(path);
    let mut provider = open_provider(&store, &StreamId::new(id))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    copy_to(&mut provider, entry, segment, &mut out)?;
    out.flush()?;

    provider.close()?;
    Ok(())
}

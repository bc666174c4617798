//! Copies an input stream into a container, one entry per call.

use super::container::SegmentSink;
use super::scanner::Scanner;
use crate::config::Config;
use crate::error::CoreResult;
use crate::triad::CloseErrors;
use crate::types::ContentType;
use std::io::{self, Read};
use tracing::{debug, warn};

const XML_DECLARATION: &[u8] = b"<?xml";

/// Decides how an entry is segmented from its first bytes.
///
/// Input is XML if `<?xml` occurs anywhere in `head`; everything else is
/// treated as line-oriented text.
#[must_use]
pub fn detect_content_type(head: &[u8]) -> ContentType {
    if head
        .windows(XML_DECLARATION.len())
        .any(|window| window == XML_DECLARATION)
    {
        ContentType::Xml
    } else {
        ContentType::Text
    }
}

/// Copies input streams into a [`SegmentSink`], marking segment boundaries.
///
/// Each [`SegmentWriter::write`] call produces exactly one entry. The bytes
/// are copied verbatim; segmentation only adds boundaries to the segment
/// index.
#[derive(Debug, Clone, Default)]
pub struct SegmentWriter {
    config: Config,
}

impl SegmentWriter {
    /// Creates a segment writer.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Copies `input` into `output` as one entry and returns the number of
    /// bytes copied.
    ///
    /// The sink is flushed afterwards, and closed if `close_on_finish` is
    /// set, whether or not the copy succeeded. A failed copy still ends its
    /// entry so the sink accepts further entries; the bytes copied so far
    /// stay in it.
    ///
    /// # Errors
    ///
    /// Returns the read or write failure of the copy if there was one,
    /// otherwise the first flush or close failure.
    pub fn write<R, S>(&self, input: R, output: &mut S, close_on_finish: bool) -> CoreResult<u64>
    where
        R: Read,
        S: SegmentSink + ?Sized,
    {
        let copied = self.copy(input, output);

        let mut cleanup = CloseErrors::new();
        if copied.is_err() {
            cleanup.record("entry", output.close_entry());
        }
        cleanup.record("sink flush", output.flush());
        if close_on_finish {
            cleanup.record("sink", output.close());
        }

        match copied {
            Ok(written) => cleanup.finish().map(|()| written),
            Err(err) => {
                if let Err(cleanup_err) = cleanup.finish() {
                    warn!(error = %cleanup_err, "cleanup after failed copy also failed");
                }
                Err(err)
            }
        }
    }

    fn copy<R, S>(&self, mut input: R, output: &mut S) -> CoreResult<u64>
    where
        R: Read,
        S: SegmentSink + ?Sized,
    {
        let mut head = Vec::with_capacity(self.config.xml_lookahead);
        (&mut input)
            .take(self.config.xml_lookahead as u64)
            .read_to_end(&mut head)?;
        let content = detect_content_type(&head);

        output.put_next_entry()?;
        let entry_start = output.position();
        let mut copy = EntryCopy {
            output,
            scanner: Scanner::for_content(content),
            entry_start,
            written: 0,
            found: Vec::new(),
        };
        copy.push(&head)?;

        let mut buffer = vec![0u8; self.config.copy_buffer_size.max(1)];
        loop {
            let read = match input.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            copy.push(&buffer[..read])?;
        }

        let written = copy.written;
        copy.output.close_entry()?;
        debug!(%content, bytes = written, "entry written");
        Ok(written)
    }
}

struct EntryCopy<'a, S: SegmentSink + ?Sized> {
    output: &'a mut S,
    scanner: Scanner,
    entry_start: u64,
    written: u64,
    found: Vec<u64>,
}

impl<S: SegmentSink + ?Sized> EntryCopy<'_, S> {
    /// Writes a chunk, then records the boundaries found in it. Boundaries
    /// always point at bytes that are already in the sink.
    fn push(&mut self, chunk: &[u8]) -> CoreResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.output.write_all(chunk)?;
        self.found.clear();
        self.scanner.scan(chunk, self.written, &mut self.found);
        for &boundary in &self.found {
            self.output.add_segment_at(self.entry_start + boundary)?;
        }
        self.written += chunk.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::reader::CompoundReader;
    use crate::testing::FaultyBackend;
    use crate::triad::Triad;
    use crate::writer::ContainerWriter;
    use segstream_storage::InMemoryBackend;

    struct Recorder {
        data: Vec<u8>,
        boundaries: Vec<u64>,
        entries: u64,
        open: bool,
        closed: bool,
        fail_flush: bool,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                data: Vec::new(),
                boundaries: Vec::new(),
                entries: 0,
                open: false,
                closed: false,
                fail_flush: false,
            }
        }
    }

    impl SegmentSink for Recorder {
        fn put_next_entry(&mut self) -> CoreResult<()> {
            self.open = true;
            Ok(())
        }

        fn write_all(&mut self, bytes: &[u8]) -> CoreResult<()> {
            self.data.extend_from_slice(bytes);
            Ok(())
        }

        fn position(&self) -> u64 {
            self.data.len() as u64
        }

        fn add_segment_at(&mut self, position: u64) -> CoreResult<()> {
            assert!(position <= self.position(), "boundary ahead of data");
            self.boundaries.push(position);
            Ok(())
        }

        fn close_entry(&mut self) -> CoreResult<()> {
            if self.open {
                self.entries += 1;
                self.open = false;
            }
            Ok(())
        }

        fn flush(&mut self) -> CoreResult<()> {
            if self.fail_flush {
                return Err(CoreError::invalid_state("disk full"));
            }
            Ok(())
        }

        fn close(&mut self) -> CoreResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    struct FailingInput;

    /// Yields `head` and then fails.
    struct BrokenAfter<'a> {
        head: &'a [u8],
    }

    impl Read for BrokenAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.head.is_empty() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
            }
            let n = self.head.len().min(buf.len());
            buf[..n].copy_from_slice(&self.head[..n]);
            self.head = &self.head[n..];
            Ok(n)
        }
    }

    impl Read for FailingInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"))
        }
    }

    #[test]
    fn detects_xml_declaration_anywhere_in_head() {
        assert_eq!(detect_content_type(b"<?xml version=\"1.0\"?>"), ContentType::Xml);
        assert_eq!(detect_content_type(b"\xEF\xBB\xBF  <?xml?>"), ContentType::Xml);
        assert_eq!(detect_content_type(b"<root/>"), ContentType::Text);
        assert_eq!(detect_content_type(b""), ContentType::Text);
    }

    #[test]
    fn declaration_beyond_lookahead_is_text() {
        let mut input = vec![b' '; 32];
        input.extend_from_slice(b"<?xml?><r><a/><b/></r>");
        let writer = SegmentWriter::new(Config::new().xml_lookahead(16));
        let mut sink = Recorder::new();
        writer.write(input.as_slice(), &mut sink, false).unwrap();
        assert!(sink.boundaries.is_empty());
    }

    #[test]
    fn text_input_is_split_into_lines() {
        let writer = SegmentWriter::new(Config::new().copy_buffer_size(3));
        let mut sink = Recorder::new();
        let written = writer.write(&b"a\nbb\nccc\n"[..], &mut sink, true).unwrap();

        assert_eq!(written, 9);
        assert_eq!(sink.data, b"a\nbb\nccc\n");
        assert_eq!(sink.boundaries, vec![2, 5]);
        assert_eq!(sink.entries, 1);
        assert!(sink.closed);
    }

    #[test]
    fn boundaries_are_absolute_positions() {
        let writer = SegmentWriter::default();
        let mut sink = Recorder::new();
        writer.write(&b"x\ny\n"[..], &mut sink, false).unwrap();
        writer.write(&b"p\nq"[..], &mut sink, false).unwrap();

        assert_eq!(sink.entries, 2);
        assert_eq!(sink.boundaries, vec![2, 6]);
        assert!(!sink.closed);
    }

    #[test]
    fn xml_input_is_split_per_record() {
        let input = b"<?xml version=\"1.0\"?>\n<root>\n  <a>1</a>\n  <b>2</b>\n</root>\n";
        let writer = SegmentWriter::new(Config::new().copy_buffer_size(5));
        let mut sink = Recorder::new();
        writer.write(&input[..], &mut sink, false).unwrap();

        assert_eq!(sink.boundaries.len(), 1);
        let cut = sink.boundaries[0] as usize;
        assert!(input[..cut].ends_with(b"<a>1</a>"));
    }

    #[test]
    fn empty_input_makes_empty_entry() {
        let writer = SegmentWriter::default();
        let mut sink = Recorder::new();
        assert_eq!(writer.write(&b""[..], &mut sink, false).unwrap(), 0);
        assert_eq!(sink.entries, 1);
        assert!(sink.boundaries.is_empty());
    }

    #[test]
    fn read_failure_closes_sink_when_asked() {
        let writer = SegmentWriter::default();
        let mut sink = Recorder::new();
        let result = writer.write(FailingInput, &mut sink, true);
        assert!(matches!(result, Err(CoreError::Io(_))));
        assert!(sink.closed);
    }

    #[test]
    fn writes_into_container() {
        let data = InMemoryBackend::new();
        let boundary = InMemoryBackend::new();
        let segment = InMemoryBackend::new();
        let readers = Triad::new(
            Box::new(data.share()),
            Box::new(boundary.share()),
            Box::new(segment.share()),
        );
        let triad = Triad::new(Box::new(data), Box::new(boundary), Box::new(segment));
        let mut container = ContainerWriter::new(triad, &Config::default()).unwrap();

        let writer = SegmentWriter::default();
        writer.write(&b"l1\nl2\n"[..], &mut container, false).unwrap();
        writer.write(&b"only\n"[..], &mut container, true).unwrap();
        assert!(container.is_closed());

        let mut reader = CompoundReader::open(readers).unwrap();
        assert_eq!(reader.input_stream_count(), 2);
        let mut first = reader.input_stream(0).unwrap();
        assert_eq!(first.segment_count(), 2);
        assert_eq!(first.read_segment(1).unwrap(), b"l2\n");
        first.close();
        let mut second = reader.input_stream(1).unwrap();
        assert_eq!(second.segment_count(), 1);
        assert_eq!(second.read_segment(0).unwrap(), b"only\n");
        second.close();
        reader.close().unwrap();
    }

    #[test]
    fn close_failure_is_reported() {
        let (data, closed) = FaultyBackend::failing_close(b"");
        let triad = Triad::new(
            Box::new(data),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
        );
        let mut container = ContainerWriter::new(triad, &Config::default()).unwrap();
        let result = SegmentWriter::default().write(&b"x"[..], &mut container, true);
        assert!(result.is_err());
        assert!(closed.get());
    }

    #[test]
    fn flush_failure_still_closes_sink() {
        let writer = SegmentWriter::default();
        let mut sink = Recorder::new();
        sink.fail_flush = true;
        let result = writer.write(&b"a\nb\n"[..], &mut sink, true);
        assert!(matches!(result, Err(CoreError::InvalidState { .. })));
        assert!(sink.closed);
        assert_eq!(sink.entries, 1);
    }

    #[test]
    fn copy_failure_wins_over_flush_failure() {
        let writer = SegmentWriter::default();
        let mut sink = Recorder::new();
        sink.fail_flush = true;
        let result = writer.write(FailingInput, &mut sink, true);
        assert!(matches!(result, Err(CoreError::Io(_))));
        assert!(sink.closed);
    }

    #[test]
    fn failed_copy_ends_its_entry() {
        let data = InMemoryBackend::new();
        let boundary = InMemoryBackend::new();
        let segment = InMemoryBackend::new();
        let readers = Triad::new(
            Box::new(data.share()),
            Box::new(boundary.share()),
            Box::new(segment.share()),
        );
        let triad = Triad::new(Box::new(data), Box::new(boundary), Box::new(segment));
        let mut container = ContainerWriter::new(triad, &Config::default()).unwrap();

        let writer = SegmentWriter::new(Config::new().xml_lookahead(1));
        let first = writer.write(BrokenAfter { head: b"ab" }, &mut container, false);
        assert!(matches!(first, Err(CoreError::Io(_))));
        assert!(!container.is_entry_open());
        assert_eq!(container.entry_count(), 1);

        writer.write(&b"next\n"[..], &mut container, true).unwrap();
        assert_eq!(container.entry_count(), 2);

        let mut reader = CompoundReader::open(readers).unwrap();
        assert_eq!(reader.input_stream_count(), 2);
        assert_eq!(reader.input_stream(0).unwrap().read_segment(0).unwrap(), b"ab");
        assert_eq!(reader.input_stream(1).unwrap().read_segment(0).unwrap(), b"next\n");
    }
}

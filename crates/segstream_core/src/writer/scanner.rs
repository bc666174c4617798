//! Incremental segment boundary detection.
//!
//! Scanners see the entry as a sequence of chunks and report boundary
//! positions relative to the start of the entry. A boundary is only reported
//! once it is certain that more bytes follow it inside the entry, so no scanner
//! ever produces a trailing empty segment.
//!
//! - Text: one segment per line. A boundary sits after every `\n` that is
//!   followed by at least one more byte.
//! - XML: one segment per child of the root element. The prolog and the root
//!   start tag belong to the first segment, the root end tag and any trailing
//!   bytes to the last one. Markup inside comments, CDATA sections, processing
//!   instructions, doctype declarations and quoted attribute values is ignored.

use crate::types::ContentType;

/// Boundary scanner for one entry.
#[derive(Debug)]
pub(crate) enum Scanner {
    Text(TextScanner),
    Xml(XmlScanner),
}

impl Scanner {
    pub(crate) fn for_content(content: ContentType) -> Self {
        match content {
            ContentType::Text => Self::Text(TextScanner::default()),
            ContentType::Xml => Self::Xml(XmlScanner::default()),
        }
    }

    /// Scans `chunk`, whose first byte sits at entry offset `base`, and pushes
    /// every boundary it can commit to `out`.
    pub(crate) fn scan(&mut self, chunk: &[u8], base: u64, out: &mut Vec<u64>) {
        match self {
            Self::Text(scanner) => scanner.scan(chunk, base, out),
            Self::Xml(scanner) => scanner.scan(chunk, base, out),
        }
    }
}

/// Line scanner.
#[derive(Debug, Default)]
pub(crate) struct TextScanner {
    pending: Option<u64>,
}

impl TextScanner {
    fn scan(&mut self, chunk: &[u8], base: u64, out: &mut Vec<u64>) {
        for (i, &byte) in chunk.iter().enumerate() {
            if let Some(boundary) = self.pending.take() {
                out.push(boundary);
            }
            if byte == b'\n' {
                self.pending = Some(base + i as u64 + 1);
            }
        }
    }
}

const COMMENT_OPEN: &[u8] = b"--";
const CDATA_OPEN: &[u8] = b"[CDATA[";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XmlState {
    Content,
    /// Just after `<`.
    Open,
    /// After `<!`, collecting bytes to tell comments, CDATA and declarations apart.
    Bang,
    Comment { dashes: u8 },
    CData { brackets: u8 },
    Declaration { depth: u32, quote: Option<u8> },
    Instruction { question: bool },
    StartTag { quote: Option<u8>, slash: bool },
    EndTag { quote: Option<u8> },
}

/// Element depth tracker.
#[derive(Debug)]
pub(crate) struct XmlScanner {
    state: XmlState,
    depth: u32,
    pending: Option<u64>,
    bang: Vec<u8>,
}

impl Default for XmlScanner {
    fn default() -> Self {
        Self {
            state: XmlState::Content,
            depth: 0,
            pending: None,
            bang: Vec::with_capacity(CDATA_OPEN.len()),
        }
    }
}

impl XmlScanner {
    fn scan(&mut self, chunk: &[u8], base: u64, out: &mut Vec<u64>) {
        for (i, &byte) in chunk.iter().enumerate() {
            self.step(byte, base + i as u64, out);
        }
    }

    fn step(&mut self, byte: u8, pos: u64, out: &mut Vec<u64>) {
        self.state = match self.state {
            XmlState::Content => {
                if byte == b'<' {
                    XmlState::Open
                } else {
                    XmlState::Content
                }
            }
            XmlState::Open => match byte {
                b'!' => {
                    self.bang.clear();
                    XmlState::Bang
                }
                b'?' => XmlState::Instruction { question: false },
                b'/' => XmlState::EndTag { quote: None },
                _ => self.start_tag(None, false, byte, pos, out),
            },
            XmlState::Bang => self.bang(byte),
            XmlState::Comment { dashes } => match byte {
                b'-' => XmlState::Comment {
                    dashes: dashes.saturating_add(1),
                },
                b'>' if dashes >= 2 => XmlState::Content,
                _ => XmlState::Comment { dashes: 0 },
            },
            XmlState::CData { brackets } => match byte {
                b']' => XmlState::CData {
                    brackets: brackets.saturating_add(1),
                },
                b'>' if brackets >= 2 => XmlState::Content,
                _ => XmlState::CData { brackets: 0 },
            },
            XmlState::Declaration { depth, quote } => declaration(depth, quote, byte),
            XmlState::Instruction { question } => match byte {
                b'>' if question => XmlState::Content,
                b'?' => XmlState::Instruction { question: true },
                _ => XmlState::Instruction { question: false },
            },
            XmlState::StartTag { quote, slash } => self.start_tag(quote, slash, byte, pos, out),
            XmlState::EndTag { quote } => match (quote, byte) {
                (Some(q), b) if b == q => XmlState::EndTag { quote: None },
                (Some(_), _) => XmlState::EndTag { quote },
                (None, b'"' | b'\'') => XmlState::EndTag { quote: Some(byte) },
                (None, b'>') => {
                    self.end_tag(pos);
                    XmlState::Content
                }
                (None, _) => XmlState::EndTag { quote: None },
            },
        };
    }

    fn bang(&mut self, byte: u8) -> XmlState {
        self.bang.push(byte);
        let seen = self.bang.as_slice();
        if seen == COMMENT_OPEN {
            return XmlState::Comment { dashes: 0 };
        }
        if seen == CDATA_OPEN {
            return XmlState::CData { brackets: 0 };
        }
        if COMMENT_OPEN.starts_with(seen) || CDATA_OPEN.starts_with(seen) {
            return XmlState::Bang;
        }
        // A declaration such as <!DOCTYPE ...>; replay what was collected.
        let mut state = XmlState::Declaration {
            depth: 0,
            quote: None,
        };
        for &b in seen {
            if let XmlState::Declaration { depth, quote } = state {
                state = declaration(depth, quote, b);
            }
        }
        state
    }

    fn start_tag(
        &mut self,
        quote: Option<u8>,
        slash: bool,
        byte: u8,
        pos: u64,
        out: &mut Vec<u64>,
    ) -> XmlState {
        if let Some(q) = quote {
            let quote = if byte == q { None } else { quote };
            return XmlState::StartTag {
                quote,
                slash: false,
            };
        }
        match byte {
            b'"' | b'\'' => XmlState::StartTag {
                quote: Some(byte),
                slash: false,
            },
            b'/' => XmlState::StartTag { quote: None, slash: true },
            b'>' => {
                self.element_opened(slash, pos, out);
                XmlState::Content
            }
            _ => XmlState::StartTag {
                quote: None,
                slash: false,
            },
        }
    }

    /// A start tag ended at `pos` (the offset of its `>`).
    fn element_opened(&mut self, empty: bool, pos: u64, out: &mut Vec<u64>) {
        if self.depth == 1 {
            if let Some(boundary) = self.pending.take() {
                out.push(boundary);
            }
        }
        if empty {
            if self.depth == 1 {
                self.pending = Some(pos + 1);
            }
        } else {
            self.depth += 1;
        }
    }

    /// An end tag ended at `pos`.
    fn end_tag(&mut self, pos: u64) {
        self.depth = self.depth.saturating_sub(1);
        match self.depth {
            0 => self.pending = None,
            1 => self.pending = Some(pos + 1),
            _ => {}
        }
    }
}

fn declaration(depth: u32, quote: Option<u8>, byte: u8) -> XmlState {
    match (quote, byte) {
        (Some(q), b) if b == q => XmlState::Declaration { depth, quote: None },
        (Some(_), _) => XmlState::Declaration { depth, quote },
        (None, b'"' | b'\'') => XmlState::Declaration {
            depth,
            quote: Some(byte),
        },
        (None, b'[') => XmlState::Declaration {
            depth: depth + 1,
            quote: None,
        },
        (None, b']') => XmlState::Declaration {
            depth: depth.saturating_sub(1),
            quote: None,
        },
        (None, b'>') if depth == 0 => XmlState::Content,
        (None, _) => XmlState::Declaration { depth, quote: None },
    }
}

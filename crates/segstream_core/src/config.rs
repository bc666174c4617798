//! Container configuration.

/// Default size of the window inspected for an XML declaration.
pub const DEFAULT_XML_LOOKAHEAD: usize = 2000;

/// Default chunk size used when copying input into the data stream.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for writing containers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of leading input bytes searched for `<?xml`.
    pub xml_lookahead: usize,

    /// Size of the chunks read from the input and appended to the data stream.
    pub copy_buffer_size: usize,

    /// Whether to sync all three streams to disk before closing them.
    pub sync_on_close: bool,

    /// Whether writers take an exclusive lock on the data stream.
    pub lock_writer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xml_lookahead: DEFAULT_XML_LOOKAHEAD,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            sync_on_close: true,
            lock_writer: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the XML detection window.
    #[must_use]
    pub const fn xml_lookahead(mut self, bytes: usize) -> Self {
        self.xml_lookahead = bytes;
        self
    }

    /// Sets the copy chunk size. Zero is treated as one byte.
    #[must_use]
    pub const fn copy_buffer_size(mut self, bytes: usize) -> Self {
        self.copy_buffer_size = if bytes == 0 { 1 } else { bytes };
        self
    }

    /// Sets whether to sync streams before closing.
    #[must_use]
    pub const fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Sets whether writers lock the data stream.
    #[must_use]
    pub const fn lock_writer(mut self, value: bool) -> Self {
        self.lock_writer = value;
        self
    }
}

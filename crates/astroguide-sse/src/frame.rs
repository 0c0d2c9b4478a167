/// Splits an arbitrarily chunked byte stream into complete text lines.
///
/// `\r\n` and lone `\r` terminate lines exactly like `\n`. A `\r` at the
/// buffer tail is held back until the next chunk disambiguates a split
/// `\r\n` pair. One decoder instance serves one connection.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one transport chunk and returns every newly completed line.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut index = 0;
        while index < self.buffer.len() {
            match self.buffer[index] {
                b'\n' => {
                    lines.push(decode_line(&self.buffer[start..index]));
                    start = index + 1;
                    index = start;
                }
                b'\r' => {
                    // A CR at the buffer tail may be half of a split CRLF.
                    if index + 1 >= self.buffer.len() {
                        break;
                    }
                    lines.push(decode_line(&self.buffer[start..index]));
                    start = if self.buffer[index + 1] == b'\n' {
                        index + 2
                    } else {
                        index + 1
                    };
                    index = start;
                }
                _ => index += 1,
            }
        }
        self.buffer.drain(..start);
        lines
    }

    /// Flushes the trailing unterminated line once the stream has ended.
    ///
    /// Returns `None` when nothing is buffered. A lone trailing `\r`
    /// counts as a terminator at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    // Lossy so a bad byte stays local to its line instead of killing the
    // connection. Multi-byte sequences never span lines, so chunk splits
    // inside a character are safe once the full line is buffered.
    String::from_utf8_lossy(bytes).into_owned()
}

/// Split one chunk of process output into lines.
///
/// CRLF and lone CR are treated as LF. A terminator at the end of the chunk
/// does not produce an empty last line, while an unterminated tail is
/// returned as a line of its own. Nothing is carried over between chunks;
/// use [`LineSplitter`] when a line may span two chunks.
pub fn split_lines(chunk: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(chunk);
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Longest line held back waiting for a terminator; anything longer is
/// emitted in pieces of at most this many bytes
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Line splitter that buffers partial lines across chunks
#[derive(Debug, Default)]
pub struct LineSplitter {
    /// Bytes of the line currently being received
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no terminator
    scanned: usize,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut i = self.scanned;
        while i < self.pending.len() {
            match self.pending[i] {
                b'\n' => {
                    lines.push(decode(&self.pending[start..i]));
                    i += 1;
                    start = i;
                }
                b'\r' => {
                    // A CR ending the buffer may be the first half of a CRLF
                    let Some(&next) = self.pending.get(i + 1) else {
                        break;
                    };
                    lines.push(decode(&self.pending[start..i]));
                    i += if next == b'\n' { 2 } else { 1 };
                    start = i;
                }
                _ => {
                    i += 1;
                    if i - start >= MAX_LINE_BYTES {
                        let cut = start + char_boundary(&self.pending[start..i]);
                        lines.push(decode(&self.pending[start..cut]));
                        start = cut;
                    }
                }
            }
        }

        self.pending.drain(..start);
        self.scanned = i - start;
        lines
    }

    /// Flush whatever is left at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut rest = std::mem::take(&mut self.pending);
        self.scanned = 0;
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        Some(decode(&rest))
    }

    /// Bytes waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Length of the longest prefix of `bytes` that does not end inside a
/// UTF-8 sequence
fn char_boundary(bytes: &[u8]) -> usize {
    let end = bytes.len();
    let mut lead = end;
    while lead > 0 && end - lead < 4 {
        lead -= 1;
        if bytes[lead] & 0xC0 != 0x80 {
            break;
        }
    }

    let width = match bytes.get(lead) {
        Some(&b) if b >= 0xF0 => 4,
        Some(&b) if b >= 0xE0 => 3,
        Some(&b) if b >= 0xC0 => 2,
        _ => 1,
    };
    if lead > 0 && lead + width > end { lead } else { end }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut lines: Vec<String> = chunks.iter().flat_map(|c| splitter.push(c)).collect();
        lines.extend(splitter.finish());
        lines
    }

    #[test]
    fn test_split_lines_unterminated() {
        assert_eq!(split_lines(b"line 1\nline 2\nline 3"), ["line 1", "line 2", "line 3"]);
    }

    #[test]
    fn test_split_lines_drops_trailing_empty_line() {
        assert_eq!(split_lines(b"line 1\nline 2\n"), ["line 1", "line 2"]);
    }

    #[test]
    fn test_split_lines_crlf() {
        assert_eq!(split_lines(b"line 1\r\nline 2\r\n"), ["line 1", "line 2"]);
        assert_eq!(split_lines(b"line 1\r\nline 2\r\n"), split_lines(b"line 1\nline 2\n"));
    }

    #[test]
    fn test_split_lines_lone_cr() {
        assert_eq!(split_lines(b"a\rb\r"), ["a", "b"]);
    }

    #[test]
    fn test_split_lines_keeps_inner_empty_lines() {
        assert_eq!(split_lines(b"a\n\nb\n"), ["a", "", "b"]);
        assert_eq!(split_lines(b"\n"), [""]);
    }

    #[test]
    fn test_split_lines_empty() {
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn test_split_lines_invalid_utf8() {
        assert_eq!(split_lines(b"ok\n\xff\n"), ["ok", "\u{fffd}"]);
    }

    #[test]
    fn test_splitter_joins_line_across_chunks() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"   2018-12-21T09:45"), Vec::<String>::new());
        assert_eq!(splitter.pending_len(), 19);
        assert_eq!(splitter.push(b":49.73-0500 [RTR/18] OUT\nnext"), ["   2018-12-21T09:45:49.73-0500 [RTR/18] OUT"]);
        assert_eq!(splitter.finish(), Some("next".to_string()));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_crlf_split_between_chunks() {
        assert_eq!(split_all(&[b"line 1\r", b"\nline 2\r\n"]), ["line 1", "line 2"]);
    }

    #[test]
    fn test_splitter_multibyte_split_between_chunks() {
        let text = "caf\u{e9}\n".as_bytes();
        assert_eq!(split_all(&[&text[..4], &text[4..]]), ["caf\u{e9}"]);
    }

    #[test]
    fn test_splitter_bounds_unterminated_line() {
        let chunk = [b'x'; 8 * 1024];
        let mut splitter = LineSplitter::new();
        let mut lines = Vec::new();
        for _ in 0..100 {
            lines.extend(splitter.push(&chunk));
            assert!(splitter.pending_len() < MAX_LINE_BYTES);
        }
        lines.extend(splitter.finish());

        assert_eq!(lines.len(), 13);
        assert!(lines[..12].iter().all(|l| l.len() == MAX_LINE_BYTES));
        assert_eq!(lines.iter().map(String::len).sum::<usize>(), 100 * chunk.len());
    }

    #[test]
    fn test_splitter_long_line_then_terminator() {
        let mut splitter = LineSplitter::new();
        let long = "y".repeat(MAX_LINE_BYTES + 10);
        let lines = splitter.push(format!("{long}\nnext\n").as_bytes());
        assert_eq!(lines, ["y".repeat(MAX_LINE_BYTES), "y".repeat(10), "next".to_string()]);
        assert_eq!(splitter.pending_len(), 0);
    }

    #[test]
    fn test_splitter_forced_cut_keeps_characters_whole() {
        let text = format!("x{}", "\u{e9}".repeat(MAX_LINE_BYTES));
        let mut splitter = LineSplitter::new();
        let mut lines: Vec<String> = text
            .as_bytes()
            .chunks(1000)
            .flat_map(|c| splitter.push(c))
            .collect();
        lines.extend(splitter.finish());

        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| !l.contains('\u{fffd}')));
        assert!(lines.iter().all(|l| l.len() <= MAX_LINE_BYTES));
        assert_eq!(lines.concat(), text);
    }

    #[test]
    fn test_char_boundary() {
        assert_eq!(char_boundary(b"abc"), 3);
        assert_eq!(char_boundary("a\u{e9}".as_bytes()), 3);
        assert_eq!(char_boundary(&"a\u{e9}".as_bytes()[..2]), 1);
        assert_eq!(char_boundary(&"ab\u{1f600}".as_bytes()[..4]), 2);
        assert_eq!(char_boundary(b""), 0);
    }

    #[test]
    fn test_splitter_resumes_after_held_cr() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"abc").is_empty());
        assert!(splitter.push(b"def\r").is_empty());
        assert_eq!(splitter.push(b"\nghi\r"), ["abcdef"]);
        assert_eq!(splitter.push(b"jk\n"), ["ghi", "jk"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_matches_split_lines_for_single_chunk() {
        let inputs: [&[u8]; 8] = [
            b"",
            b"a",
            b"a\n",
            b"a\r",
            b"\r",
            b"a\r\rb",
            b"line 1\r\nline 2\r\n",
            b"x\n\ny\rz",
        ];
        for input in inputs {
            assert_eq!(split_all(&[input]), split_lines(input), "input {:?}", input);
        }
    }

    #[test]
    fn test_splitter_chunking_does_not_matter() {
        let input = b"one\r\ntwo\rthree\n\nfour";
        let whole = split_lines(input);
        for at in 0..=input.len() {
            let (a, b) = input.split_at(at);
            assert_eq!(split_all(&[a, b]), whole, "split at {}", at);
        }
    }
}

use std::io::BufRead;

use log::warn;

/// A stream of opaque documents. `None` ends the stream.
pub trait DocSource {
    fn next_doc(&mut self) -> Option<Vec<u8>>;
}

/// One document per line of a reader.
///
/// Line terminators are stripped; empty lines are still documents. A read
/// error ends the stream.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: BufRead> DocSource for LineSource<R> {
    fn next_doc(&mut self) -> Option<Vec<u8>> {
        if self.done {
            return None;
        }
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
            Err(e) => {
                warn!("stopping line source after read error: {e}");
                self.done = true;
                None
            }
        }
    }
}

/// A single buffer handed out as one document.
#[derive(Debug, Clone, Default)]
pub struct OnceSource {
    doc: Option<Vec<u8>>,
}

impl OnceSource {
    pub fn new(doc: impl Into<Vec<u8>>) -> Self {
        Self {
            doc: Some(doc.into()),
        }
    }
}

impl DocSource for OnceSource {
    fn next_doc(&mut self) -> Option<Vec<u8>> {
        self.doc.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    fn drain(source: &mut dyn DocSource) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| source.next_doc()).collect()
    }

    #[test]
    fn test_line_source() {
        let mut source = LineSource::new(Cursor::new(b"a b\r\n\nlast".to_vec()));
        assert_eq!(drain(&mut source), vec![b"a b".to_vec(), Vec::new(), b"last".to_vec()]);
        assert!(source.next_doc().is_none());
    }

    #[test]
    fn test_line_source_stops_on_error() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("boom"))
            }
        }
        let mut source = LineSource::new(BufReader::new(Failing));
        assert!(source.next_doc().is_none());
        assert!(source.next_doc().is_none());
    }

    #[test]
    fn test_once_source() {
        let mut source = OnceSource::new("payload");
        assert_eq!(source.next_doc(), Some(b"payload".to_vec()));
        assert_eq!(source.next_doc(), None);
    }
}

use log::warn;
use std::fmt;
use std::io::Write;

/// Writes the line-oriented progress output.
///
/// Output failures are logged and swallowed: a closed stdout must not stop
/// the release phase from giving memory back.
pub struct Reporter<W: Write> {
    out: W,
    write_failures: usize,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            write_failures: 0,
        }
    }

    pub fn allocated(&mut self, megabytes: usize) {
        self.line(format_args!("Allocated {} MB", megabytes));
    }

    pub fn freed(&mut self, megabytes: usize) {
        self.line(format_args!("Freed {} MB", megabytes));
    }

    pub fn mismatch(&mut self, index: usize, expected: u8) {
        self.line(format_args!("buffer[{}][0] != {}", index, expected as char));
    }

    /// Number of lines that could not be written.
    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        let result = writeln!(self.out, "{}", args).and_then(|()| self.out.flush());
        if let Err(e) = result {
            self.write_failures += 1;
            if self.write_failures == 1 {
                warn!("Failed to write progress output: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn formats_each_line_kind() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.allocated(25);
        reporter.freed(925);
        reporter.mismatch(36, b'K');
        let text = String::from_utf8(reporter.into_inner()).expect("utf8");
        assert_eq!(text, "Allocated 25 MB\nFreed 925 MB\nbuffer[36][0] != K\n");
    }

    #[test]
    fn counts_failed_writes_without_panicking() {
        let mut reporter = Reporter::new(Closed);
        reporter.allocated(25);
        reporter.freed(25);
        assert_eq!(reporter.write_failures(), 2);
    }
}

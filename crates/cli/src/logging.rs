use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Writes every log line to stderr and to a log file.
pub struct TeeWriter<W: Write> {
    stderr: io::Stderr,
    file: W,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(file: W) -> Self {
        Self {
            stderr: io::stderr(),
            file,
        }
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A broken stderr must not stop the log file
        let _ = self.stderr.write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.stderr.flush();
        self.file.flush()
    }
}

fn builder() -> Builder {
    Builder::from_env(Env::default().default_filter_or("info"))
}

/// Log to stderr only. stdout stays free for the tool protocol.
///
/// A logger installed earlier in the process stays in place.
pub fn init() {
    let _ = builder().target(Target::Stderr).try_init();
}

/// Log to stderr and mirror into `log_path`, truncating it first.
pub fn init_with_file(log_path: &Path) -> io::Result<()> {
    let file = File::create(log_path)?;
    let _ = builder()
        .target(Target::Pipe(Box::new(TeeWriter::new(file))))
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_writes_whole_buffer_to_file() {
        let mut tee = TeeWriter::new(Vec::new());
        let written = tee.write(b"[INFO] hello\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(written, 13);
        assert_eq!(tee.file, b"[INFO] hello\n");
    }

    #[test]
    fn test_tee_to_real_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("job.log");
        std::fs::write(&path, "stale content\n").unwrap();

        let mut tee = TeeWriter::new(File::create(&path).unwrap());
        writeln!(tee, "line one").unwrap();
        tee.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line one\n");
    }
}

//! Script file loading.
//!
//! Every file the shell executes goes through [`load_script`]: batch units,
//! and the `load`, `run` and `checkSyntax` host functions.  The file is read
//! whole into a NUL-terminated buffer, and a leading `#!` line is turned into
//! a `//` comment so that executable scripts parse.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::LoadError;

/// Initial read buffer size; doubled whenever it fills up.
const INITIAL_CAPACITY: usize = 1024;

// ── ScriptBuffer ──────────────────────────────────────────────────────────────

/// The raw contents of a script file, followed by a single NUL byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBuffer {
    bytes: Vec<u8>,
}

impl ScriptBuffer {
    /// The script source: every byte before the first NUL.
    pub fn source(&self) -> &[u8] {
        let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(self.bytes.len());
        &self.bytes[..end]
    }

    /// The full buffer, terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes read from the file (terminator excluded).
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read `path` into a [`ScriptBuffer`].
///
/// Opening is the only failure: a read error part-way through ends the read
/// and whatever was read so far is returned.
pub fn load_script(path: &Path) -> Result<ScriptBuffer, LoadError> {
    let file = File::open(path).map_err(|source| LoadError {
        path: path.to_owned(),
        source,
    })?;
    Ok(read_script(file, path))
}

fn read_script(mut reader: impl Read, path: &Path) -> ScriptBuffer {
    let mut buffer = vec![0u8; INITIAL_CAPACITY];
    let mut len = 0;

    loop {
        match reader.read(&mut buffer[len..]) {
            Ok(0) => break,
            Ok(n) => {
                len += n;
                // Keeps at least one free byte for the terminator.
                if len == buffer.len() {
                    buffer.resize(buffer.len() * 2, 0);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("error reading {}: {e}", path.display());
                break;
            }
        }
    }

    buffer[len] = 0;
    buffer.truncate(len + 1);
    neutralize_shebang(&mut buffer);
    ScriptBuffer { bytes: buffer }
}

/// Rewrite a leading `#!` to `//` in place.
pub fn neutralize_shebang(buffer: &mut [u8]) {
    if buffer.starts_with(b"#!") {
        buffer[0] = b'/';
        buffer[1] = b'/';
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_script(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn shebang_becomes_comment() {
        let f = temp_script(b"#!/usr/bin/env jsc\nprint(1);\n");
        let buf = load_script(f.path()).unwrap();
        assert_eq!(&buf.source()[..2], b"//");
        assert_eq!(buf.source(), b"///usr/bin/env jsc\nprint(1);\n");
    }

    #[test]
    fn plain_file_is_unchanged() {
        let content = b"var x = 1;\n# not a shebang\n";
        let f = temp_script(content);
        let buf = load_script(f.path()).unwrap();
        assert_eq!(buf.source(), content);
    }

    #[test]
    fn buffer_is_nul_terminated() {
        let f = temp_script(b"1 + 1");
        let buf = load_script(f.path()).unwrap();
        assert_eq!(buf.as_bytes().last(), Some(&0));
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.js");
        let err = load_script(&path).unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.to_string().starts_with("Could not open file: "));
    }

    #[test]
    fn empty_file_loads_empty() {
        let f = temp_script(b"");
        let buf = load_script(f.path()).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes(), b"\0");
    }

    #[test]
    fn file_larger_than_initial_capacity() {
        // Exactly one full chunk, then a partial second chunk.
        let mut content = vec![b'a'; INITIAL_CAPACITY];
        content.extend_from_slice(b";\n");
        let f = temp_script(&content);
        let buf = load_script(f.path()).unwrap();
        assert_eq!(buf.source(), &content[..]);
    }

    #[test]
    fn exact_capacity_file_still_terminated() {
        let content = vec![b' '; INITIAL_CAPACITY * 2];
        let f = temp_script(&content);
        let buf = load_script(f.path()).unwrap();
        assert_eq!(buf.len(), content.len());
        assert_eq!(buf.as_bytes().last(), Some(&0));
    }

    #[test]
    fn single_hash_is_not_a_shebang() {
        let mut bytes = *b"#x";
        neutralize_shebang(&mut bytes);
        assert_eq!(&bytes, b"#x");
    }

    #[test]
    fn source_stops_at_embedded_nul() {
        let f = temp_script(b"1;\0garbage");
        let buf = load_script(f.path()).unwrap();
        assert_eq!(buf.source(), b"1;");
    }
}

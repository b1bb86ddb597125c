//! Content fingerprints.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used while streaming a file through the digest
pub const CHUNK_SIZE: usize = 8 * 1024;

/// MD5 of the full byte stream of `path` as lowercase hex.
///
/// Depends only on the bytes, never on the name, location or EXIF tags.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    fingerprint_reader(&mut file)
}

/// MD5 of everything `reader` yields, read in [`CHUNK_SIZE`] pieces.
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..read]);
    }

    Ok(format!("{:x}", context.compute()))
}

//! SHA-256 of release files and the hash manifest.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// `{file name: sha256 hex}` as written to the hash manifest.
pub type HashManifest = BTreeMap<String, String>;

/// Streaming SHA-256 of the file at `path`, or `None` if it cannot be read.
pub fn sha256_file(path: &Path) -> Option<String> {
    sha256_reader(File::open(path).ok()?).ok()
}

fn sha256_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn write_hash_manifest(path: &Path, hashes: &HashManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(hashes)
        .map_err(|e| Error::config(format!("failed to serialise hash manifest: {e}")))?;
    std::fs::write(path, json).map_err(|e| Error::write(path, e))
}

pub fn read_hash_manifest(path: &Path) -> Result<HashManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("invalid hash manifest {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn known_digests() {
        let td = tempdir().expect("tempdir");
        let empty = td.path().join("empty");
        let abc = td.path().join("abc");
        fs::write(&empty, b"").expect("write");
        fs::write(&abc, b"abc").expect("write");

        assert_eq!(
            sha256_file(&empty).as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(
            sha256_file(&abc).as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn larger_than_buffer_is_deterministic() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join("big.bin");
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).expect("write");

        let first = sha256_file(&path).expect("hash");
        let second = sha256_file(&path).expect("hash");
        assert_eq!(first, second);
        assert_eq!(first, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn missing_file_has_no_hash() {
        let td = tempdir().expect("tempdir");
        assert_eq!(sha256_file(&td.path().join("missing")), None);
    }

    #[test]
    fn directory_has_no_hash() {
        let td = tempdir().expect("tempdir");
        assert_eq!(sha256_file(td.path()), None);
    }

    #[test]
    fn manifest_round_trip() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join("linux-sha256.json");
        let mut hashes = HashManifest::new();
        hashes.insert("app.zip".into(), "aa".repeat(32));
        hashes.insert("app.tar.gz".into(), "bb".repeat(32));

        write_hash_manifest(&path, &hashes).expect("write");
        let text = fs::read_to_string(&path).expect("read");
        assert!(text.contains("\n  \"app.tar.gz\": "));

        assert_eq!(read_hash_manifest(&path).expect("read"), hashes);
    }
}

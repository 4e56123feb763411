//! Layer archives: gzip-compressed tarballs unpacked over the root
//!
//! Each layer is unpacked on top of the previous ones, so a later layer's
//! files replace an earlier layer's. Whiteout entries are not interpreted.

use flate2::read::GzDecoder;
use std::{
    fs::File,
    io,
    io::BufReader,
    path::{Path, PathBuf},
};
use tar::Archive;
use tokio::task;

/// Unpack one `.tar.gz` archive into `dest`, on the blocking thread pool
pub async fn extract(archive: &Path, dest: &Path) -> io::Result<()> {
    let archive: PathBuf = archive.to_owned();
    let dest: PathBuf = dest.to_owned();
    task::spawn_blocking(move || extract_sync(&archive, &dest))
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
}

/// Unpack one `.tar.gz` archive into `dest`
///
/// File modes and modification times come from the archive. Entries whose
/// paths would land outside `dest` are refused.
pub fn extract_sync(archive: &Path, dest: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    archive.unpack(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::{fs, os::unix::fs::PermissionsExt};
    use tar::{Builder, EntryType, Header};

    fn layer(files: &[(&str, &str, u32)]) -> Vec<u8> {
        let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data, mode) in files {
            let mut header = Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_mtime(1_600_000_000);
            header.set_cksum();
            builder.append_data(&mut header, path, data.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn write_layer(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn later_layers_win() {
        let scratch = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let first = write_layer(
            scratch.path(),
            "1.tar.gz",
            &layer(&[
                ("bin/tool", "#!/bin/sh\necho one\n", 0o755),
                ("etc/motd", "first", 0o644),
            ]),
        );
        let second = write_layer(
            scratch.path(),
            "2.tar.gz",
            &layer(&[("etc/motd", "second", 0o600)]),
        );

        extract_sync(&first, root.path()).unwrap();
        extract_sync(&second, root.path()).unwrap();

        assert_eq!(fs::read(root.path().join("etc/motd")).unwrap(), b"second");
        let tool = fs::metadata(root.path().join("bin/tool")).unwrap();
        assert_eq!(tool.permissions().mode() & 0o777, 0o755);
        let motd = fs::metadata(root.path().join("etc/motd")).unwrap();
        assert_eq!(motd.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn symlinks_are_kept() {
        let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_link_name("busybox").unwrap();
        builder
            .append_data(&mut header, "bin/sh", std::io::empty())
            .unwrap();
        let data = builder.into_inner().unwrap().finish().unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let archive = write_layer(scratch.path(), "l.tar.gz", &data);
        extract_sync(&archive, root.path()).unwrap();
        assert_eq!(
            fs::read_link(root.path().join("bin/sh")).unwrap(),
            Path::new("busybox")
        );
    }

    #[test]
    fn corrupt_archive_fails() {
        let scratch = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let archive = write_layer(scratch.path(), "bad.tar.gz", b"definitely not gzip");
        assert!(extract_sync(&archive, root.path()).is_err());
        assert!(extract_sync(&scratch.path().join("missing"), root.path()).is_err());
    }

    #[tokio::test]
    async fn extract_async() {
        let scratch = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let archive = write_layer(
            scratch.path(),
            "l.tar.gz",
            &layer(&[("hello.txt", "hi", 0o644)]),
        );
        extract(&archive, root.path()).await.unwrap();
        assert_eq!(fs::read(root.path().join("hello.txt")).unwrap(), b"hi");
    }
}

//! FileLogStore - durable store, one JSON-lines file per partition
//!
//! Layout: `<dir>/<encoded output id>.jsonl`, one [`BufferedEntry`] per line.
//! Appends write a single line; deletions rewrite the partition file through a
//! temporary file and an atomic rename.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{BufferedEntry, ContractError, EntryId, LogStore, NewEntry};
use tracing::{debug, info, instrument, warn};

use crate::partitions::Partitions;

const PARTITION_EXT: &str = "jsonl";

/// Store that persists every partition under a directory
#[derive(Debug)]
pub struct FileLogStore {
    dir: PathBuf,
    partitions: Partitions,
    sync_writes: bool,
}

impl FileLogStore {
    /// Open (or create) a store rooted at `dir`, loading existing partitions
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or read.
    #[instrument(name = "file_log_store_open", skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ContractError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut partitions = Partitions::default();
        let mut restored_total = 0usize;
        let mut torn = Vec::new();
        for dir_entry in fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PARTITION_EXT) {
                continue;
            }
            let Some(output_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_partition_name)
            else {
                warn!(path = %path.display(), "Skipping file with undecodable partition name");
                continue;
            };
            let (entries, intact) = read_partition(&path)?;
            restored_total += entries.len();
            partitions.restore(&output_id, entries);
            if !intact {
                torn.push(output_id);
            }
        }

        let store = Self {
            dir,
            partitions,
            sync_writes: true,
        };

        // later appends must not land on a torn tail
        for output_id in &torn {
            store.rewrite_partition(output_id)?;
            warn!(output = %output_id, "Partition repaired after corrupt entries");
        }

        info!(entries = restored_total, repaired = torn.len(), "FileLogStore opened");
        Ok(store)
    }

    /// Skip `fsync` after each write (faster, loses the last writes on power loss)
    pub fn without_sync(mut self) -> Self {
        self.sync_writes = false;
        self
    }

    /// Number of entries buffered for an output
    pub fn len(&self, output_id: &str) -> usize {
        self.partitions.len(output_id)
    }

    /// Whether an output has nothing buffered
    pub fn is_empty(&self, output_id: &str) -> bool {
        self.len(output_id) == 0
    }

    fn partition_path(&self, output_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{PARTITION_EXT}", encode_partition_name(output_id)))
    }

    fn append_line(&self, output_id: &str, entry: &BufferedEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(entry).map_err(std::io::Error::other)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.partition_path(output_id))?;
        let committed = file.metadata()?.len();

        let written = file.write_all(&line).and_then(|()| {
            if self.sync_writes {
                file.sync_data()
            } else {
                Ok(())
            }
        });
        if written.is_err() {
            // drop a partially written line
            if let Err(e) = file.set_len(committed) {
                warn!(output = %output_id, error = %e, "Failed to truncate torn append");
            }
        }
        written
    }

    fn rewrite_partition(&self, output_id: &str) -> std::io::Result<()> {
        let path = self.partition_path(output_id);
        let tmp_path = path.with_extension(format!("{PARTITION_EXT}.tmp"));

        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        for entry in self.partitions.partition(output_id) {
            serde_json::to_writer(&mut writer, entry).map_err(std::io::Error::other)?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if self.sync_writes {
            file.sync_data()?;
        }
        fs::rename(&tmp_path, &path)
    }

    /// Persist an in-memory removal, or put the partition back as it was
    fn commit_removal(
        &mut self,
        output_id: &str,
        snapshot: VecDeque<BufferedEntry>,
    ) -> Result<(), ContractError> {
        self.rewrite_partition(output_id).map_err(|e| {
            self.partitions.replace(output_id, snapshot);
            Self::store_error(output_id, e)
        })
    }

    fn store_error(output_id: &str, e: std::io::Error) -> ContractError {
        ContractError::store(output_id, e.to_string())
    }
}

impl LogStore for FileLogStore {
    fn append(&mut self, output_id: &str, entry: NewEntry) -> Result<EntryId, ContractError> {
        let entry = self.partitions.push(output_id, entry);
        if let Err(e) = self.append_line(output_id, &entry) {
            // keep memory and disk in step
            self.partitions.remove_ids(output_id, &[entry.id]);
            return Err(Self::store_error(output_id, e));
        }
        Ok(entry.id)
    }

    fn fetch(&self, output_id: &str, limit: usize) -> Result<Vec<BufferedEntry>, ContractError> {
        Ok(self.partitions.oldest(output_id, limit))
    }

    fn delete_by_ids(&mut self, output_id: &str, ids: &[EntryId]) -> Result<(), ContractError> {
        let snapshot = self.partitions.snapshot(output_id);
        if self.partitions.remove_ids(output_id, ids) == 0 {
            return Ok(());
        }
        self.commit_removal(output_id, snapshot)
    }

    fn delete_older_than(
        &mut self,
        output_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, ContractError> {
        let snapshot = self.partitions.snapshot(output_id);
        let removed = self.partitions.remove_created_up_to(output_id, cutoff);
        if removed > 0 {
            self.commit_removal(output_id, snapshot)?;
            debug!(output = %output_id, removed, "Partition rewritten after purge");
        }
        Ok(removed)
    }
}

/// Entries of one partition file, and whether the file was intact
///
/// A file is not intact when a line fails to parse or the last line has no
/// newline; a torn final line is expected after a crash mid-append.
fn read_partition(path: &Path) -> Result<(Vec<BufferedEntry>, bool), ContractError> {
    let bytes = fs::read(path)?;
    let mut intact = bytes.is_empty() || bytes.ends_with(b"\n");
    let mut entries = Vec::new();
    for (line_no, line) in bytes.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<BufferedEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                intact = false;
                warn!(path = %path.display(), line = line_no + 1, error = %e, "Skipping corrupt entry");
            }
        }
    }
    Ok((entries, intact))
}

/// Output ids may contain any character; file names keep `[A-Za-z0-9_-]`
/// and percent-encode every other byte.
fn encode_partition_name(output_id: &str) -> String {
    let mut name = String::with_capacity(output_id.len());
    for byte in output_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name
}

fn decode_partition_name(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use contracts::Document;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(at: DateTime<Utc>, seq: u64) -> NewEntry {
        let mut log = Document::new();
        log.insert("sequence".to_string(), json!(seq));
        NewEntry { created_at: at, log }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = FileLogStore::open(dir.path()).unwrap();
            store.append("logcat", entry(t0(), 1)).unwrap();
            store.append("logcat", entry(t0(), 2)).unwrap();
        }

        let mut store = FileLogStore::open(dir.path()).unwrap();
        let entries = store.fetch("logcat", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].log["sequence"], json!(1));

        // ids keep increasing after reopen
        let next = store.append("logcat", entry(t0(), 3)).unwrap();
        assert!(next > entries[1].id);
    }

    #[test]
    fn test_deletions_are_persisted() {
        let dir = tempdir().unwrap();
        {
            let mut store = FileLogStore::open(dir.path()).unwrap();
            let first = store.append("out", entry(t0(), 1)).unwrap();
            store
                .append("out", entry(t0() + Duration::seconds(30), 2))
                .unwrap();
            store
                .append("out", entry(t0() + Duration::seconds(60), 3))
                .unwrap();
            store.delete_by_ids("out", &[first]).unwrap();
            let purged = store
                .delete_older_than("out", t0() + Duration::seconds(30))
                .unwrap();
            assert_eq!(purged, 1);
        }

        let store = FileLogStore::open(dir.path()).unwrap();
        let entries = store.fetch("out", 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].log["sequence"], json!(3));
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let dir = tempdir().unwrap();
        {
            let mut store = FileLogStore::open(dir.path()).unwrap();
            store.append("out", entry(t0(), 1)).unwrap();
        }
        let path = dir.path().join("out.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"id\":2,\"created_at\"").unwrap();

        let store = FileLogStore::open(dir.path()).unwrap();
        assert_eq!(store.len("out"), 1);
    }

    #[test]
    fn test_append_after_torn_tail_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = FileLogStore::open(dir.path()).unwrap();
            store.append("out", entry(t0(), 1)).unwrap();
        }
        let path = dir.path().join("out.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"id\":2,\"created_at\"").unwrap();
        drop(file);

        {
            let mut store = FileLogStore::open(dir.path()).unwrap();
            store.append("out", entry(t0(), 3)).unwrap();
            assert_eq!(store.len("out"), 2);
        }

        let store = FileLogStore::open(dir.path()).unwrap();
        let sequences: Vec<_> = store
            .fetch("out", 10)
            .unwrap()
            .into_iter()
            .map(|e| e.log["sequence"].clone())
            .collect();
        assert_eq!(sequences, vec![json!(1), json!(3)]);
        assert!(fs::read(&path).unwrap().ends_with(b"\n"));
    }

    #[test]
    fn test_failed_rewrite_keeps_entries() {
        let dir = tempdir().unwrap();
        let mut store = FileLogStore::open(dir.path()).unwrap();
        let first = store.append("out", entry(t0(), 1)).unwrap();
        store.append("out", entry(t0(), 2)).unwrap();

        // the temporary file cannot be created over a directory
        fs::create_dir(dir.path().join("out.jsonl.tmp")).unwrap();

        assert!(store.delete_by_ids("out", &[first]).is_err());
        assert_eq!(store.len("out"), 2);
        assert!(store.delete_older_than("out", t0()).is_err());
        assert_eq!(store.fetch("out", 10).unwrap()[0].id, first);
    }

    #[test]
    fn test_partition_name_encoding() {
        assert_eq!(encode_partition_name("logcat_debug-1"), "logcat_debug-1");
        assert_eq!(encode_partition_name("a/b c"), "a%2Fb%20c");
        assert_eq!(decode_partition_name("a%2Fb%20c").as_deref(), Some("a/b c"));
        assert_eq!(decode_partition_name("bad%zz"), None);
    }
}

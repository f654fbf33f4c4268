use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::types::StateMutation;

/// WAL entry: one state mutation with length and CRC framing.
///
/// On-disk format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized StateMutation)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    pub mutation: StateMutation,
}

/// Flush/sync strategy for the WAL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Flush to the OS and let the page cache decide.
    #[default]
    OsDefault,
}

/// Configuration for the Write-Ahead Log.
#[derive(Clone, Debug, Default)]
pub struct WalConfig {
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct WalWriter {
    writer: BufWriter<File>,
    offset: u64,
}

/// Crash-recoverable Write-Ahead Log.
///
/// Mutations are serialized with bincode, framed with a length prefix and a
/// CRC32 checksum, and appended to a single file. Recovery reads the file
/// front to back: entries failing the CRC check are skipped, and a torn
/// entry at the tail ends recovery. [`recover_and_truncate`] also removes
/// that tail from disk.
///
/// [`recover_and_truncate`]: WriteAheadLog::recover_and_truncate
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    config: WalConfig,
}

impl WriteAheadLog {
    /// Open (or create) the WAL file at `path`.
    pub fn open(path: &Path, config: WalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter {
                writer: BufWriter::new(file),
                offset,
            }),
            config,
        })
    }

    /// Append one entry. Returns the byte offset it was written at.
    pub fn append(&self, entry: &WalEntry) -> StoreResult<u64> {
        let payload = bincode::serialize(&entry.mutation)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StoreError::Serialization("WAL entry exceeds 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut w = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        let entry_offset = w.offset;

        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }

        w.offset += (HEADER_SIZE + payload.len()) as u64;

        debug!(offset = entry_offset, len = payload.len(), key = %entry.mutation.key, "WAL append");
        Ok(entry_offset)
    }

    /// Recover every valid entry, oldest first.
    pub fn recover(&self) -> StoreResult<Vec<WalEntry>> {
        Ok(self.scan()?.0)
    }

    /// Recover every valid entry, then cut the file back to the end of the
    /// last complete entry so later appends do not land behind a torn tail.
    pub fn recover_and_truncate(&self) -> StoreResult<Vec<WalEntry>> {
        let (entries, valid_end) = self.scan()?;

        let mut w = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        w.writer.flush()?;
        let file_len = w.writer.get_ref().metadata()?.len();
        if valid_end < file_len {
            w.writer.get_ref().set_len(valid_end)?;
            w.writer.get_ref().sync_all()?;
            warn!(valid_end, dropped = file_len - valid_end, "truncated torn WAL tail");
        }
        w.offset = valid_end;
        Ok(entries)
    }

    /// Read entries front to back. Also returns the offset just past the
    /// last complete frame.
    fn scan(&self) -> StoreResult<(Vec<WalEntry>, u64)> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || offset + HEADER_SIZE as u64 + u64::from(length) > file_len {
                warn!(offset, length, file_len, "invalid WAL entry length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated WAL entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let next = offset + HEADER_SIZE as u64 + u64::from(length);
            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(offset, expected = expected_crc, actual = actual_crc, "CRC mismatch; skipping entry");
                offset = next;
                continue;
            }

            match bincode::deserialize::<StateMutation>(&payload) {
                Ok(mutation) => entries.push(WalEntry { mutation }),
                Err(e) => warn!(offset, error = %e, "failed to deserialize WAL entry; skipping"),
            }
            offset = next;
        }

        debug!(recovered = entries.len(), valid_end = offset, "WAL recovery complete");
        Ok((entries, offset))
    }

    /// Current write offset. A poisoned lock still reports the last offset.
    pub fn offset(&self) -> u64 {
        match self.writer.lock() {
            Ok(w) => w.offset,
            Err(poisoned) => poisoned.into_inner().offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("sync_mode", &self.config.sync_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(seq: i64) -> WalEntry {
        WalEntry {
            mutation: StateMutation {
                tx_id: format!("tx-{seq}"),
                key: format!("O{seq}"),
                value: (seq % 3 != 0).then(|| format!("{{\"seq\":{seq}}}").into_bytes()),
                timestamp_ms: 1_000 + seq,
            },
        }
    }

    #[test]
    fn append_and_recover_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let wal = WriteAheadLog::open(&dir.path().join("state.wal"), WalConfig::default()).unwrap();
        for seq in 1..=3 {
            wal.append(&make_entry(seq)).unwrap();
        }
        let recovered = wal.recover().unwrap();
        assert_eq!(recovered, vec![make_entry(1), make_entry(2), make_entry(3)]);
        assert!(recovered[2].mutation.value.is_none());
    }

    #[test]
    fn recover_empty_wal() {
        let dir = tempfile::tempdir().unwrap();
        let wal = WriteAheadLog::open(&dir.path().join("empty.wal"), WalConfig::default()).unwrap();
        assert!(wal.recover().unwrap().is_empty());
        assert_eq!(wal.offset(), 0);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/state.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert!(path.exists());
        assert_eq!(wal.path(), path.as_path());
    }

    #[test]
    fn crc_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        drop(wal);

        {
            let mut file = OpenOptions::new().write(true).read(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover().unwrap(), vec![make_entry(2)]);
    }

    #[test]
    fn recovery_survives_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        let total_len = wal.offset();
        drop(wal);

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(total_len - 4).unwrap();

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover().unwrap(), vec![make_entry(1)]);
    }

    #[test]
    fn appends_after_torn_tail_are_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        let good_end = wal.offset();
        wal.append(&make_entry(2)).unwrap();
        let total_len = wal.offset();
        drop(wal);

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(total_len - 4).unwrap();
        drop(file);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover_and_truncate().unwrap(), vec![make_entry(1)]);
        assert_eq!(wal.offset(), good_end);
        assert_eq!(fs::metadata(&path).unwrap().len(), good_end);
        assert_eq!(wal.append(&make_entry(4)).unwrap(), good_end);
        drop(wal);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover_and_truncate().unwrap(), vec![make_entry(1), make_entry(4)]);
    }

    #[test]
    fn truncate_keeps_intact_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intact.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        let end = wal.offset();
        assert_eq!(wal.recover_and_truncate().unwrap().len(), 2);
        assert_eq!(wal.offset(), end);
        assert_eq!(fs::metadata(&path).unwrap().len(), end);
    }

    #[test]
    fn offsets_increase_and_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        let first = wal.append(&make_entry(1)).unwrap();
        let second = wal.append(&make_entry(2)).unwrap();
        assert_eq!(first, 0);
        assert!(second > first);
        let end = wal.offset();
        drop(wal);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.offset(), end);
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = WalConfig {
            sync_mode: SyncMode::EveryWrite,
        };
        let wal = WriteAheadLog::open(&dir.path().join("sync.wal"), config).unwrap();
        wal.append(&make_entry(1)).unwrap();
        assert_eq!(wal.recover().unwrap().len(), 1);
    }

    #[test]
    fn sync_mode_config_names() {
        let mode: SyncMode = serde_json::from_str("\"every_write\"").unwrap();
        assert_eq!(mode, SyncMode::EveryWrite);
        assert_eq!(SyncMode::default(), SyncMode::OsDefault);
    }
}

//! Append-only framed checkpoint file.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::types::BlockIndex;

use super::crc::crc32;
use super::record::{BathymetryRecord, Checkpoint, CheckpointRecord, Frame};
use super::CheckpointError;

/// File signature.
pub const MAGIC: &[u8; 8] = b"SWECKPT1";

/// Current layout version.
pub const FORMAT_VERSION: u32 = 2;

const HEADER_LEN: u64 = 12;
const FRAME_HEADER_LEN: u64 = 12;

fn header() -> [u8; HEADER_LEN as usize] {
    let mut bytes = [0u8; HEADER_LEN as usize];
    bytes[..8].copy_from_slice(MAGIC);
    bytes[8..].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes
}

/// Borrowed [`Frame`] with the same encoding.
#[derive(Serialize)]
enum FrameRef<'a> {
    Bathymetry(&'a BathymetryRecord),
    State(&'a CheckpointRecord),
}

fn encode_frame(frame: FrameRef<'_>, out: &mut Vec<u8>) -> Result<(), CheckpointError> {
    let payload = bincode::serialize(&frame)?;
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&crc32(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

/// Result of walking the frames of a file.
struct Scan {
    frames: Vec<Frame>,
    /// Byte offset just past the last valid frame
    valid_end: u64,
    damage: Option<CheckpointError>,
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn check_header(bytes: &[u8]) -> Result<(), CheckpointError> {
    if &bytes[..8] != MAGIC {
        return Err(CheckpointError::BadHeader("wrong magic bytes".into()));
    }
    let version = read_u32(bytes, 8);
    if version != FORMAT_VERSION {
        return Err(CheckpointError::BadHeader(format!(
            "format version {}, expected {}",
            version, FORMAT_VERSION
        )));
    }
    Ok(())
}

fn scan(bytes: &[u8]) -> Result<Scan, CheckpointError> {
    let len = bytes.len() as u64;
    if len < HEADER_LEN {
        // Crash while creating the file: nothing was ever committed.
        let damage = (len > 0).then(|| CheckpointError::Corrupt {
            offset: 0,
            reason: format!("truncated header of {} bytes", len),
        });
        return Ok(Scan {
            frames: Vec::new(),
            valid_end: 0,
            damage,
        });
    }
    check_header(bytes)?;

    let mut frames = Vec::new();
    let mut offset = HEADER_LEN;
    let corrupt = |offset: u64, reason: String| Some(CheckpointError::Corrupt { offset, reason });

    let damage = loop {
        if offset == len {
            break None;
        }
        if len - offset < FRAME_HEADER_LEN {
            break corrupt(offset, format!("truncated frame header ({} bytes)", len - offset));
        }
        let payload_len = read_u64(bytes, offset as usize);
        let stored_crc = read_u32(bytes, offset as usize + 8);
        let start = offset + FRAME_HEADER_LEN;
        if payload_len > len - start {
            break corrupt(
                offset,
                format!("payload of {} bytes, only {} present", payload_len, len - start),
            );
        }
        let payload = &bytes[start as usize..(start + payload_len) as usize];
        let computed = crc32(payload);
        if computed != stored_crc {
            break corrupt(
                offset,
                format!("checksum {:08x}, expected {:08x}", computed, stored_crc),
            );
        }
        let frame: Frame = match bincode::deserialize(payload) {
            Ok(frame) => frame,
            Err(e) => break corrupt(offset, format!("undecodable payload: {}", e)),
        };
        if let Err(reason) = frame.validate() {
            break corrupt(offset, reason);
        }
        frames.push(frame);
        offset = start + payload_len;
    };

    Ok(Scan {
        frames,
        valid_end: offset.max(HEADER_LEN),
        damage,
    })
}

type Slot = (CheckpointRecord, Option<Arc<BathymetryRecord>>);

/// Group state frames into checkpoints, each block paired with the latest
/// bed frame written before it. Incomplete checkpoints are dropped.
fn group(frames: Vec<Frame>) -> Vec<Checkpoint> {
    let mut beds: HashMap<BlockIndex, Arc<BathymetryRecord>> = HashMap::new();
    let mut by_sequence: BTreeMap<u64, BTreeMap<(usize, usize), Slot>> = BTreeMap::new();
    for frame in frames {
        match frame {
            Frame::Bathymetry(bed) => {
                beds.insert(bed.block(), Arc::new(bed));
            }
            Frame::State(record) => {
                let bed = beds.get(&record.block()).cloned();
                by_sequence
                    .entry(record.sequence)
                    .or_default()
                    .insert((record.block_y, record.block_x), (record, bed));
            }
        }
    }

    by_sequence
        .into_iter()
        .filter_map(|(sequence, blocks)| {
            let (records, beds): (Vec<CheckpointRecord>, Vec<Option<Arc<BathymetryRecord>>>) =
                blocks.into_values().unzip();
            let first = records.first()?;
            let (time, step, count) = (first.time, first.step, first.block_count);
            let consistent = records
                .iter()
                .all(|r| r.time.to_bits() == time.to_bits() && r.step == step && r.block_count == count);
            let bathymetry: Vec<Arc<BathymetryRecord>> = beds.into_iter().collect::<Option<_>>()?;
            let beds_fit = records
                .iter()
                .zip(&bathymetry)
                .all(|(record, bed)| record.geometry == bed.geometry);
            (consistent && beds_fit && records.len() == count).then_some(Checkpoint {
                sequence,
                time,
                step,
                records,
                bathymetry,
            })
        })
        .collect()
}

/// Checkpoint file on disk.
///
/// Each [`append`](Self::append) adds one complete checkpoint and syncs it
/// to disk before returning. The file is scanned once before the first
/// append; later appends only check the file length against the end of
/// the last write.
#[derive(Clone, Debug)]
pub struct CheckpointFile {
    path: PathBuf,
    /// End of the valid frames after our last write
    valid_len: Option<u64>,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            valid_len: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Length of the file after the last successful write of this handle.
    pub fn valid_len(&self) -> Option<u64> {
        self.valid_len
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, CheckpointError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn scan(&self) -> Result<Scan, CheckpointError> {
        let bytes = self.read_bytes()?.unwrap_or_default();
        scan(&bytes)
    }

    /// Append the bed frames (if any) and state records of one checkpoint
    /// and fsync.
    ///
    /// A damaged tail left by an earlier crash is cut off first so the new
    /// frames stay reachable.
    pub fn append(
        &mut self,
        bathymetry: &[BathymetryRecord],
        records: &[CheckpointRecord],
    ) -> Result<(), CheckpointError> {
        let mut buf = Vec::new();
        for bed in bathymetry {
            encode_frame(FrameRef::Bathymetry(bed), &mut buf)?;
        }
        for record in records {
            encode_frame(FrameRef::State(record), &mut buf)?;
        }
        let written = self.write_at_valid_end(&buf);
        if written.is_err() {
            self.valid_len = None;
        }
        written
    }

    fn write_at_valid_end(&mut self, buf: &[u8]) -> Result<(), CheckpointError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        let on_disk = file.metadata()?.len();

        let mut valid_end = match self.valid_len {
            Some(len) if len == on_disk => len,
            _ => {
                let scan = self.scan()?;
                if let Some(damage) = scan.damage.as_ref().filter(|_| on_disk > scan.valid_end) {
                    warn!("Discarding damaged checkpoint tail: {}", damage);
                }
                scan.valid_end
            }
        };
        if valid_end < HEADER_LEN {
            file.set_len(0)?;
            file.write_all(&header())?;
            valid_end = HEADER_LEN;
        } else if on_disk > valid_end {
            file.set_len(valid_end)?;
        }

        file.seek(SeekFrom::Start(valid_end))?;
        file.write_all(buf)?;
        file.sync_all()?;
        self.valid_len = Some(valid_end + buf.len() as u64);
        Ok(())
    }

    /// Every valid frame up to the first damaged one.
    pub fn read_frames(&self) -> Result<Vec<Frame>, CheckpointError> {
        let scan = self.scan()?;
        if let Some(damage) = &scan.damage {
            warn!(
                "Recovered {} checkpoint frames from {}, ignoring the rest: {}",
                scan.frames.len(),
                self.path.display(),
                damage
            );
        }
        Ok(scan.frames)
    }

    /// Every valid state record up to the first damaged frame.
    pub fn read_all(&self) -> Result<Vec<CheckpointRecord>, CheckpointError> {
        Ok(self
            .read_frames()?
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::State(record) => Some(record),
                Frame::Bathymetry(_) => None,
            })
            .collect())
    }

    /// Checkpoints with a valid record and bed for every block, oldest
    /// first.
    pub fn complete_checkpoints(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        Ok(group(self.read_frames()?))
    }

    /// The `n` most recent complete checkpoints, oldest first.
    pub fn last_n(&self, n: usize) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut all = self.complete_checkpoints()?;
        let skip = all.len().saturating_sub(n);
        Ok(all.split_off(skip))
    }

    pub fn latest(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.complete_checkpoints()?.pop())
    }

    /// Simulation time of the most recent complete checkpoint.
    pub fn last_time(&self) -> Result<Option<f64>, CheckpointError> {
        Ok(self.latest()?.map(|c| c.time))
    }

    /// Rewrite the file keeping only the `keep` most recent complete
    /// checkpoints and the bed frames they use.
    ///
    /// Writes to a temporary file next to the original and renames it into
    /// place, so a crash leaves either the old or the new file.
    pub fn compact(&mut self, keep: usize) -> Result<usize, CheckpointError> {
        let kept = self.last_n(keep)?;
        let mut buf = header().to_vec();
        let mut written_beds: HashMap<BlockIndex, Arc<BathymetryRecord>> = HashMap::new();
        for checkpoint in &kept {
            for bed in &checkpoint.bathymetry {
                let current = written_beds.get(&bed.block());
                if !current.is_some_and(|current| Arc::ptr_eq(current, bed)) {
                    encode_frame(FrameRef::Bathymetry(bed), &mut buf)?;
                    written_beds.insert(bed.block(), Arc::clone(bed));
                }
            }
            for record in &checkpoint.records {
                encode_frame(FrameRef::State(record), &mut buf)?;
            }
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        self.valid_len = Some(buf.len() as u64);
        info!(
            "Compacted {} to {} checkpoints",
            self.path.display(),
            kept.len()
        );
        Ok(kept.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryType;
    use crate::checkpoint::RecordStamp;
    use crate::state::{BlockGeometry, GridState};
    use crate::types::{CellIndex, EdgeMap};
    use tempfile::tempdir;

    fn states(time: f64, blocks: usize, bed: f64) -> Vec<GridState> {
        (0..blocks)
            .map(|x| {
                let geometry = BlockGeometry::new(3, 2, 1.0, 1.0, 3.0 * x as f64, 0.0);
                let mut state = GridState::new(geometry);
                state.time = time;
                state.h[(2, 1)] = time + x as f64;
                state.b[(1, 2)] = bed;
                state
            })
            .collect()
    }

    fn records(sequence: u64, time: f64, blocks: usize) -> Vec<CheckpointRecord> {
        let stamp = RecordStamp {
            sequence,
            step: sequence * 10,
            block_count: blocks,
            boundaries: EdgeMap::uniform(BoundaryType::Outflow),
            end_time: 50.0,
        };
        states(time, blocks, 0.0)
            .iter()
            .enumerate()
            .map(|(x, state)| CheckpointRecord::capture(state, BlockIndex::new(x, 0), &stamp))
            .collect()
    }

    fn beds(time: f64, blocks: usize, bed: f64) -> Vec<BathymetryRecord> {
        states(time, blocks, bed)
            .iter()
            .enumerate()
            .map(|(x, state)| BathymetryRecord::capture(state, BlockIndex::new(x, 0), blocks))
            .collect()
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let mut file = CheckpointFile::new(dir.path().join("run.ckpt"));
        assert!(file.latest().unwrap().is_none());

        file.append(&beds(0.0, 2, -1.0), &records(0, 1.5, 2)).unwrap();
        file.append(&[], &records(1, 3.25, 2)).unwrap();

        let all = file.read_all().unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(file.read_frames().unwrap().len(), 6);
        let latest = file.latest().unwrap().unwrap();
        assert_eq!(latest.sequence, 1);
        assert_eq!(latest.records, records(1, 3.25, 2));
        assert_eq!(file.last_time().unwrap(), Some(3.25));
        assert_eq!(file.last_n(5).unwrap().len(), 2);
        assert_eq!(file.last_n(1).unwrap()[0].sequence, 1);
    }

    #[test]
    fn test_checkpoints_use_latest_preceding_bed() {
        let dir = tempdir().unwrap();
        let mut file = CheckpointFile::new(dir.path().join("run.ckpt"));
        file.append(&beds(0.0, 2, -1.0), &records(0, 1.0, 2)).unwrap();
        file.append(&[], &records(1, 2.0, 2)).unwrap();
        // Seabed moved before the third checkpoint
        file.append(&beds(3.0, 2, -0.5), &records(2, 3.0, 2)).unwrap();

        let all = file.complete_checkpoints().unwrap();
        assert_eq!(all.len(), 3);
        let bed_at = |c: &Checkpoint| {
            c.bathymetry_record(BlockIndex::new(1, 0))
                .unwrap()
                .bed(CellIndex::new(1, 2))
        };
        assert_eq!(bed_at(&all[0]), -1.0);
        assert_eq!(bed_at(&all[1]), -1.0);
        assert_eq!(bed_at(&all[2]), -0.5);
        assert!(Arc::ptr_eq(&all[0].bathymetry[0], &all[1].bathymetry[0]));

        // Compaction keeps the beds still in use
        file.compact(2).unwrap();
        let kept = file.complete_checkpoints().unwrap();
        assert_eq!(kept.iter().map(|c| c.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(bed_at(&kept[0]), -1.0);
        assert_eq!(bed_at(&kept[1]), -0.5);
        assert_eq!(file.read_frames().unwrap().len(), 8);
    }

    #[test]
    fn test_checkpoint_without_bed_is_incomplete() {
        let dir = tempdir().unwrap();
        let mut file = CheckpointFile::new(dir.path().join("run.ckpt"));
        file.append(&[], &records(0, 1.0, 1)).unwrap();
        assert!(file.latest().unwrap().is_none());
        assert_eq!(file.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_append_does_not_reread_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.ckpt");
        let mut file = CheckpointFile::new(&path);
        assert_eq!(file.valid_len(), None);
        file.append(&beds(0.0, 1, 0.0), &records(0, 1.0, 1)).unwrap();
        file.append(&[], &records(1, 2.0, 1)).unwrap();
        assert_eq!(file.valid_len(), Some(fs::metadata(&path).unwrap().len()));

        // Damage inside the file that leaves its length alone is not
        // looked for: the next append goes straight to the end.
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 5;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();
        file.append(&[], &records(2, 3.0, 1)).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();
        let sequences: Vec<u64> = file.complete_checkpoints().unwrap().iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(file.valid_len(), Some(bytes.len() as u64));
    }

    #[test]
    fn test_truncated_tail_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.ckpt");
        let mut file = CheckpointFile::new(&path);
        file.append(&beds(0.0, 2, 0.0), &records(0, 1.0, 2)).unwrap();
        file.append(&[], &records(1, 2.0, 2)).unwrap();

        let len = fs::metadata(&path).unwrap().len();
        let handle = OpenOptions::new().write(true).open(&path).unwrap();
        handle.set_len(len - 17).unwrap();

        // second block of checkpoint 1 is gone
        assert_eq!(file.read_all().unwrap().len(), 3);
        let latest = file.latest().unwrap().unwrap();
        assert_eq!(latest.sequence, 0);
        assert_eq!(latest.time, 1.0);

        // the length changed behind our back, so appending rescans and cuts
        // the damaged tail before writing the new checkpoint
        file.append(&[], &records(2, 3.0, 2)).unwrap();
        let sequences: Vec<u64> = file.complete_checkpoints().unwrap().iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![0, 2]);
    }

    #[test]
    fn test_flipped_byte_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.ckpt");
        let mut file = CheckpointFile::new(&path);
        file.append(&beds(0.0, 1, 0.0), &records(0, 1.0, 1)).unwrap();
        file.append(&[], &records(1, 2.0, 1)).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 5;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let scan = scan(&bytes).unwrap();
        assert!(matches!(scan.damage, Some(CheckpointError::Corrupt { .. })));
        assert_eq!(file.latest().unwrap().unwrap().sequence, 0);
    }

    #[test]
    fn test_incomplete_checkpoint_is_skipped() {
        let dir = tempdir().unwrap();
        let mut file = CheckpointFile::new(dir.path().join("run.ckpt"));
        file.append(&beds(0.0, 2, 0.0), &records(0, 1.0, 2)).unwrap();
        let mut partial = records(1, 2.0, 2);
        partial.pop();
        file.append(&[], &partial).unwrap();
        assert_eq!(file.latest().unwrap().unwrap().sequence, 0);
    }

    #[test]
    fn test_bad_header_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.bin");
        fs::write(&path, b"NOTACKPT\x01\x00\x00\x00").unwrap();
        let mut file = CheckpointFile::new(&path);
        assert!(matches!(file.read_all(), Err(CheckpointError::BadHeader(_))));
        // Never overwrite a file that is not ours
        assert!(matches!(
            file.append(&[], &records(0, 1.0, 1)),
            Err(CheckpointError::BadHeader(_))
        ));
        assert_eq!(fs::read(&path).unwrap(), b"NOTACKPT\x01\x00\x00\x00");
    }

    #[test]
    fn test_compact_keeps_latest() {
        let dir = tempdir().unwrap();
        let mut file = CheckpointFile::new(dir.path().join("run.ckpt"));
        file.append(&beds(0.0, 2, 0.0), &records(0, 0.0, 2)).unwrap();
        for k in 1..5 {
            file.append(&[], &records(k, k as f64, 2)).unwrap();
        }
        assert_eq!(file.compact(2).unwrap(), 2);
        let sequences: Vec<u64> = file.complete_checkpoints().unwrap().iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![3, 4]);
    }
}

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::model::Event;

/// Bytes of framing around each payload: u32 length prefix + u32 crc.
const FRAME_OVERHEAD: u64 = 8;

/// Larger length prefixes are treated as corruption.
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "event too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read one frame. `Ok(None)` means clean EOF, a torn tail, or a bad record;
/// replay stops there either way.
fn decode_event(reader: &mut impl Read) -> io::Result<Option<(Event, u64)>> {
    let mut len_buf = [0u8; 4];
    if !read_full(reader, &mut len_buf)? {
        return Ok(None);
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_RECORD_LEN {
        return Ok(None);
    }

    let mut payload = vec![0u8; len];
    if !read_full(reader, &mut payload)? {
        return Ok(None);
    }
    let mut crc_buf = [0u8; 4];
    if !read_full(reader, &mut crc_buf)? {
        return Ok(None);
    }
    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    match bincode::deserialize::<Event>(&payload) {
        Ok(event) => Ok(Some((event, len as u64 + FRAME_OVERHEAD))),
        Err(_) => Ok(None),
    }
}

/// `read_exact` that reports a short read as `false` instead of an error.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Result of scanning a WAL file.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Byte length of the valid prefix.
    pub valid_len: u64,
    /// Trailing bytes that did not decode.
    pub discarded: u64,
}

/// The file operations the log needs from its backing store.
pub trait LogFile: Write + Send {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Append-only write-ahead log holding every hall and booking mutation.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`.
/// A torn or corrupt tail is cut off by [`Wal::recover`] before new appends
/// land, so records written after a crash are never hidden behind garbage.
///
/// A batch is all-or-nothing: if writing or syncing it fails, the file is
/// cut back to the last synced length before the error is returned. If that
/// cut fails too the log is poisoned and refuses appends until compacted or
/// reopened.
pub struct Wal {
    file: Box<dyn LogFile>,
    path: PathBuf,
    /// Encoded frames of the batch being written.
    buf: Vec<u8>,
    /// Length of the synced prefix.
    durable_len: u64,
    poisoned: bool,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path` for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let durable_len = file.metadata()?.len();
        Ok(Self::with_file(path, Box::new(file), durable_len))
    }

    pub(crate) fn with_file(path: &Path, file: Box<dyn LogFile>, durable_len: u64) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            buf: Vec::new(),
            durable_len,
            poisoned: false,
            appends_since_compact: 0,
        }
    }

    /// Replay the log, drop any invalid tail, and open it for appending.
    pub fn recover(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let replay = Self::replay(path)?;
        if replay.discarded > 0 {
            warn!(
                "wal {}: discarding {} trailing bytes after {} valid events",
                path.display(),
                replay.discarded,
                replay.events.len()
            );
            OpenOptions::new()
                .write(true)
                .open(path)?
                .set_len(replay.valid_len)?;
        }
        let mut wal = Self::open(path)?;
        wal.appends_since_compact = replay.events.len() as u64;
        Ok((wal, replay.events))
    }

    /// Append a single event and fsync.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_batch(std::iter::once(event))
    }

    /// Write `events` with a single fsync. On error none of them are in the
    /// log and the counter is unchanged.
    pub fn append_batch<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::other(
                "wal poisoned by a failed rollback; compact or reopen to recover",
            ));
        }

        self.buf.clear();
        let mut count = 0u64;
        for event in events {
            encode_event(&mut self.buf, event)?;
            count += 1;
        }
        if count == 0 {
            return Ok(());
        }

        let written = self
            .file
            .write_all(&self.buf)
            .and_then(|()| self.file.flush())
            .and_then(|()| self.file.sync());
        if let Err(e) = written {
            self.rollback();
            return Err(e);
        }

        self.durable_len += self.buf.len() as u64;
        self.appends_since_compact += count;
        Ok(())
    }

    /// Cut the file back to the synced prefix after a failed batch.
    fn rollback(&mut self) {
        let durable_len = self.durable_len;
        let result = self
            .file
            .truncate(durable_len)
            .and_then(|()| self.file.sync());
        if let Err(e) = result {
            error!(
                "wal {}: rollback to {durable_len} bytes failed, refusing further appends: {e}",
                self.path.display()
            );
            self.poisoned = true;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Rewrite the log as exactly `events`: write a temp file, fsync, rename
    /// over the live file, reopen. Clears a poisoned log.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.durable_len = file.metadata()?.len();
        self.file = Box::new(file);
        self.poisoned = false;
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Scan the log from disk. A missing file is an empty log.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let total_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();

        while let Some((event, frame_len)) = decode_event(&mut reader)? {
            replay.events.push(event);
            replay.valid_len += frame_len;
        }
        replay.discarded = total_len - replay.valid_len;
        Ok(replay)
    }
}

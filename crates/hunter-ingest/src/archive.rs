//! Date-partitioned archive walk shared by the local and remote sources.
//!
//! Layout: `{root}/{year}/{Mon}/{prefix}-{DD}.json`, optionally gzip-compressed with a
//! `.gz` suffix. Days are visited most recent first; missing or empty days are skipped.

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};

use hunter_core::{DayRange, LogRecord};

/// Where the archive lives and how its files are named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub root: PathBuf,
    pub prefix: String,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    /// Plain and gzip candidate paths for one day.
    pub fn day_paths(&self, day: NaiveDate) -> (PathBuf, PathBuf) {
        let dir = self
            .root
            .join(day.format("%Y").to_string())
            .join(day.format("%b").to_string());
        let stem = format!("{}-{}.json", self.prefix, day.format("%d"));
        let gz = format!("{stem}.gz");
        (dir.join(stem), dir.join(gz))
    }
}

/// Minimal file access needed by the day walk.
pub trait ArchiveReader {
    /// Size in bytes, `None` when the file is absent or cannot be inspected.
    fn size(&mut self, path: &Path) -> Option<u64>;
    fn open(&mut self, path: &Path) -> io::Result<Box<dyn Read + '_>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    Gzip,
}

/// Records and accounting from walking a day range.
#[derive(Debug, Default)]
pub struct DayWalk {
    pub records: Vec<LogRecord>,
    pub days_loaded: u32,
    pub skipped_lines: u64,
}

/// Pick the file to read for a day: plain if non-empty, else gzip if non-empty.
pub fn select_file<R: ArchiveReader + ?Sized>(
    reader: &mut R,
    plain: &Path,
    gz: &Path,
) -> Option<(PathBuf, Encoding)> {
    if reader.size(plain).is_some_and(|s| s > 0) {
        return Some((plain.to_path_buf(), Encoding::Plain));
    }
    if reader.size(gz).is_some_and(|s| s > 0) {
        return Some((gz.to_path_buf(), Encoding::Gzip));
    }
    None
}

/// Walk `days` calendar days ending at `end`, most recent first.
pub fn walk_days<R: ArchiveReader + ?Sized>(
    reader: &mut R,
    layout: &ArchiveLayout,
    days: DayRange,
    end: NaiveDate,
) -> DayWalk {
    let mut walk = DayWalk::default();

    for offset in 0..u64::from(days.get()) {
        let Some(day) = end.checked_sub_days(Days::new(offset)) else {
            break;
        };
        let (plain, gz) = layout.day_paths(day);

        let Some((path, encoding)) = select_file(reader, &plain, &gz) else {
            debug!(day = %day, path = %plain.display(), "no archive for day, skipping");
            continue;
        };

        let raw = match reader.open(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open archive, skipping day");
                continue;
            }
        };

        let before = walk.records.len();
        let stream: Box<dyn Read + '_> = match encoding {
            Encoding::Plain => raw,
            Encoding::Gzip => Box::new(MultiGzDecoder::new(raw)),
        };
        match read_lines(BufReader::new(stream), &mut walk.records) {
            Ok(skipped) => walk.skipped_lines += skipped,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "archive read failed part-way, keeping parsed lines");
            }
        }

        if walk.records.len() > before {
            walk.days_loaded += 1;
        }
        debug!(
            day = %day,
            path = %path.display(),
            records = walk.records.len() - before,
            "archive day loaded"
        );
    }

    walk
}

/// Parse newline-delimited JSON objects, appending to `out`. Returns the number of
/// non-blank lines that were skipped because they did not parse.
pub fn read_lines<B: BufRead>(mut input: B, out: &mut Vec<LogRecord>) -> io::Result<u64> {
    let mut skipped = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(skipped);
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LogRecord>(line) {
            Ok(record) => out.push(record),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "skipping invalid JSON line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    /// In-memory reader keyed by path.
    #[derive(Default)]
    struct MemArchive {
        files: HashMap<PathBuf, Vec<u8>>,
        broken: Vec<PathBuf>,
    }

    impl ArchiveReader for MemArchive {
        fn size(&mut self, path: &Path) -> Option<u64> {
            self.files.get(path).map(|f| f.len() as u64)
        }

        fn open(&mut self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
            if self.broken.iter().any(|p| p == path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            let data = self
                .files
                .get(path)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            Ok(Box::new(data.as_slice()))
        }
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn layout() -> ArchiveLayout {
        ArchiveLayout::new("/archives", "ossec-archive")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_paths_follow_layout() {
        let (plain, gz) = layout().day_paths(date(2024, 3, 7));
        assert_eq!(plain, PathBuf::from("/archives/2024/Mar/ossec-archive-07.json"));
        assert_eq!(gz, PathBuf::from("/archives/2024/Mar/ossec-archive-07.json.gz"));
    }

    #[test]
    fn plain_preferred_over_gzip() {
        let (plain, gz) = layout().day_paths(date(2024, 3, 7));
        let mut mem = MemArchive::default();
        mem.files.insert(plain.clone(), b"{\"a\":1}\n".to_vec());
        mem.files.insert(gz.clone(), gzip(b"{\"b\":1}\n{\"b\":2}\n"));
        assert_eq!(select_file(&mut mem, &plain, &gz), Some((plain, Encoding::Plain)));
    }

    #[test]
    fn empty_plain_falls_back_to_gzip() {
        let (plain, gz) = layout().day_paths(date(2024, 3, 7));
        let mut mem = MemArchive::default();
        mem.files.insert(plain.clone(), Vec::new());
        mem.files.insert(gz.clone(), gzip(b"{\"b\":1}\n"));
        assert_eq!(select_file(&mut mem, &plain, &gz), Some((gz, Encoding::Gzip)));
    }

    #[test]
    fn both_empty_selects_nothing() {
        let (plain, gz) = layout().day_paths(date(2024, 3, 7));
        let mut mem = MemArchive::default();
        mem.files.insert(plain.clone(), Vec::new());
        mem.files.insert(gz.clone(), Vec::new());
        assert_eq!(select_file(&mut mem, &plain, &gz), None);
    }

    #[test]
    fn walk_covers_month_boundary_most_recent_first() {
        let end = date(2024, 3, 1);
        let mut mem = MemArchive::default();
        let (mar1, _) = layout().day_paths(end);
        let (feb29, _) = layout().day_paths(date(2024, 2, 29));
        mem.files.insert(mar1, b"{\"full_log\":\"march\"}\n".to_vec());
        mem.files.insert(feb29, b"{\"full_log\":\"february\"}\n".to_vec());

        let walk = walk_days(&mut mem, &layout(), DayRange::new(2).unwrap(), end);
        assert_eq!(walk.records.len(), 2);
        assert_eq!(walk.records[0]["full_log"], "march");
        assert_eq!(walk.records[1]["full_log"], "february");
        assert_eq!(walk.days_loaded, 2);
    }

    #[test]
    fn invalid_lines_skipped_not_fatal() {
        let end = date(2024, 5, 10);
        let (plain, _) = layout().day_paths(end);
        let mut mem = MemArchive::default();
        mem.files.insert(
            plain,
            b"{\"full_log\":\"one\"}\nnot json\n\n[1,2]\n{\"full_log\":\"two\"}\n".to_vec(),
        );

        let walk = walk_days(&mut mem, &layout(), DayRange::new(1).unwrap(), end);
        assert_eq!(walk.records.len(), 2);
        assert_eq!(walk.skipped_lines, 2);
    }

    #[test]
    fn unopenable_day_skipped_rest_continues() {
        let end = date(2024, 5, 10);
        let (today, _) = layout().day_paths(end);
        let (yesterday, _) = layout().day_paths(date(2024, 5, 9));
        let mut mem = MemArchive::default();
        mem.files.insert(today.clone(), b"{\"x\":1}\n".to_vec());
        mem.files.insert(yesterday, b"{\"x\":2}\n".to_vec());
        mem.broken.push(today);

        let walk = walk_days(&mut mem, &layout(), DayRange::new(2).unwrap(), end);
        assert_eq!(walk.records.len(), 1);
        assert_eq!(walk.records[0]["x"], 2);
        assert_eq!(walk.days_loaded, 1);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_dropped() {
        let mut out = Vec::new();
        let data: &[u8] = b"{\"full_log\":\"caf\xff\"}\n";
        let skipped = read_lines(data, &mut out).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(out.len(), 1);
        assert!(out[0]["full_log"].as_str().unwrap().starts_with("caf"));
    }

    #[test]
    fn last_line_without_newline_is_read() {
        let mut out = Vec::new();
        read_lines(&b"{\"a\":1}\n{\"a\":2}"[..], &mut out).unwrap();
        assert_eq!(out.len(), 2);
    }
}

use csv::{Reader, ReaderBuilder, StringRecord};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::SourceRecord;
use crate::error::{LoadError, Result};

const BOM: char = '\u{feff}';

/// Streaming reader over a headed CSV source.
pub struct SourceReader {
    path: PathBuf,
    headers: Vec<String>,
    inner: Reader<File>,
    record: StringRecord,
}

impl SourceReader {
    /// Open `path` and read its header line.
    ///
    /// A missing file is [`LoadError::SourceNotFound`], a file without a
    /// header row is [`LoadError::SourceEmpty`]; anything else that stops the
    /// header from being read is [`LoadError::SourceRead`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(LoadError::SourceNotFound { path });
        }

        let mut inner = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)
            .map_err(|source| LoadError::SourceRead {
                path: path.clone(),
                source,
            })?;

        let headers = inner
            .headers()
            .map_err(|source| LoadError::SourceRead {
                path: path.clone(),
                source,
            })?
            .iter()
            .enumerate()
            .map(|(i, h)| clean_header(i, h))
            .collect::<Vec<_>>();
        if headers.is_empty() {
            return Err(LoadError::SourceEmpty { path });
        }

        debug!(path = %path.display(), columns = headers.len(), "opened source");

        Ok(Self {
            path,
            headers,
            inner,
            record: StringRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Next data row, or `None` at end of file.
    pub fn next_record(&mut self) -> Result<Option<SourceRecord>> {
        let more = self
            .inner
            .read_record(&mut self.record)
            .map_err(|source| LoadError::SourceRead {
                path: self.path.clone(),
                source,
            })?;
        if !more {
            return Ok(None);
        }
        Ok(Some(SourceRecord::from_csv(&self.headers, &self.record)))
    }
}

/// Header names are kept verbatim apart from a leading byte-order mark.
fn clean_header(idx: usize, raw: &str) -> String {
    if idx == 0 {
        raw.trim_start_matches(BOM).to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source(content: &str) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        Ok(tmp)
    }

    #[test]
    fn strips_bom_from_first_header() -> Result<()> {
        let tmp = source("\u{feff}id,WHEN4_실행률(%)\n1,0.5\n")?;
        let mut rdr = SourceReader::open(tmp.path())?;
        assert_eq!(rdr.headers(), ["id", "WHEN4_실행률(%)"]);
        let rec = rdr.next_record()?.expect("one row");
        assert_eq!(rec.get("id"), Some("1"));
        assert!(rdr.next_record()?.is_none());
        Ok(())
    }

    #[test]
    fn quoted_fields_and_ragged_rows() -> Result<()> {
        let tmp = source("id,name,cost\n1,\"a, b\",\"1,200\"\n2,short\n")?;
        let mut rdr = SourceReader::open(tmp.path())?;
        let first = rdr.next_record()?.unwrap();
        assert_eq!(first.get("name"), Some("a, b"));
        assert_eq!(first.get("cost"), Some("1,200"));
        let second = rdr.next_record()?.unwrap();
        assert_eq!(second.get("name"), Some("short"));
        assert_eq!(second.get("cost"), None);
        Ok(())
    }

    #[test]
    fn headerless_file_is_rejected() -> Result<()> {
        for content in ["", "\n\n"] {
            let tmp = source(content)?;
            let err = SourceReader::open(tmp.path()).err().unwrap();
            assert!(matches!(err, LoadError::SourceEmpty { .. }));
        }
        Ok(())
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = SourceReader::open("/definitely/not/here.csv").err().unwrap();
        assert!(matches!(err, LoadError::SourceNotFound { .. }));
    }
}

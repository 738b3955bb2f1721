/*!
The output table.

```text
[class, ]filename, 0, 1, ..., N-1
[label, ]image.png, v0, v1, ..., vN-1
```

Rows are newline terminated. The header is written lazily together with the
first row, so a run without results writes nothing. When appending
to a file that already has content, exactly one blank line separates the old
content from the new rows and no header is repeated.
 */
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::features::FeatureVector;

const WRITE_BUFFER: usize = 1024 * 1024;

/// Layout of the table, independent of where it is written.
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub separator: String,
    pub class_label: Option<String>,
    pub write_header: bool,
    /// Header names for the value columns; column indices when `None`.
    pub labels: Option<Vec<String>>,
}

pub struct TableWriter<W: Write> {
    out: W,
    format: TableFormat,
    /// Written before the first row, then cleared.
    lead_in: Option<&'static str>,
    columns: Option<usize>,
    rows: usize,
    failed: bool,
}

impl TableWriter<BufWriter<File>> {
    /// Open `path` for a batch, truncating or appending.
    pub fn open(path: &Path, append: bool, mut format: TableFormat) -> Result<Self> {
        let lead_in = if append { separator_for(path)? } else { None };
        if lead_in.is_some() {
            format.write_header = false;
        }

        let file = if append {
            OpenOptions::new().create(true).append(true).open(path)?
        } else {
            OpenOptions::new().create(true).write(true).truncate(true).open(path)?
        };
        let mut writer = TableWriter::new(BufWriter::with_capacity(WRITE_BUFFER, file), format);
        writer.lead_in = lead_in;
        Ok(writer)
    }
}

/// Blank line needed before appending to the file at `path`, if it has content.
fn separator_for(path: &Path) -> Result<Option<&'static str>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(Some(if last[0] == b'\n' { "\n" } else { "\n\n" }))
}

impl<W: Write> TableWriter<W> {
    pub fn new(out: W, format: TableFormat) -> Self {
        TableWriter {
            out,
            format,
            lead_in: None,
            columns: None,
            rows: 0,
            failed: false,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Value columns fixed by the first row, if any row was written.
    pub fn columns(&self) -> Option<usize> {
        self.columns
    }

    fn header(&self, columns: usize) -> String {
        let sep = &self.format.separator;
        let mut line = String::new();
        if self.format.class_label.is_some() {
            line.push_str("class");
            line.push_str(sep);
        }
        line.push_str("filename");
        match &self.format.labels {
            Some(labels) if labels.len() == columns => {
                for label in labels {
                    line.push_str(sep);
                    line.push_str(label);
                }
            }
            _ => {
                for i in 0..columns {
                    line.push_str(sep);
                    line.push_str(&i.to_string());
                }
            }
        }
        line
    }

    fn row(&self, file_name: &str, values: &[f64]) -> String {
        let sep = &self.format.separator;
        let mut line = String::new();
        if let Some(label) = &self.format.class_label {
            line.push_str(label);
            line.push_str(sep);
        }
        line.push_str(file_name);
        for v in values {
            line.push_str(sep);
            line.push_str(&v.to_string());
        }
        line
    }

    /**
    Append every row produced for one file.

    Either all rows of the file are written or none: a row whose length
    differs from the first row ever written is rejected up front.
     */
    pub fn write_rows(&mut self, file_name: &str, rows: &[FeatureVector]) -> Result<usize> {
        if self.failed {
            return Err(ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "output table is unusable after an earlier write error",
            )));
        }
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        let expected = self.columns.unwrap_or(first.len());
        if let Some(bad) = rows.iter().find(|r| r.len() != expected) {
            return Err(ExtractError::RowLength {
                file: file_name.to_string(),
                expected,
                got: bad.len(),
            });
        }

        let mut text = String::new();
        if self.columns.is_none() {
            if let Some(lead_in) = self.lead_in.take() {
                text.push_str(lead_in);
            }
            if self.format.write_header {
                text.push_str(&self.header(expected));
                text.push('\n');
            }
        }
        for row in rows {
            text.push_str(&self.row(file_name, row));
            text.push('\n');
        }

        if let Err(err) = self.out.write_all(text.as_bytes()) {
            self.failed = true;
            return Err(err.into());
        }
        self.columns = Some(expected);
        self.rows += rows.len();
        Ok(rows.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

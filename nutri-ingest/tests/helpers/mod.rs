//! Shared fixtures for nutri-ingest integration tests

#![allow(dead_code)]

use nutri_common::db::models::Metric;
use nutri_ingest::source::{DatasetSource, InlineSource};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Builder for CSV datasets with the full 63-column header
pub struct DatasetBuilder {
    header: Vec<String>,
    lines: Vec<String>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        let mut header = vec![
            "PhoneNumber".to_string(),
            "User_ID".to_string(),
            "Sex".to_string(),
        ];
        header.extend(Metric::ALL.iter().map(|m| m.header().to_string()));
        Self {
            header,
            lines: Vec::new(),
        }
    }

    /// Rename a header column so lookups by `name` fail (rows keep their width)
    pub fn without_header(mut self, name: &str) -> Self {
        for column in self.header.iter_mut() {
            if column == name {
                *column = format!("Renamed{}", name);
            }
        }
        self
    }

    /// Full-width row; metrics default to `base`, overridden by `overrides`
    pub fn row(
        mut self,
        user_id: &str,
        phone: &str,
        sex: &str,
        base: f64,
        overrides: &[(Metric, &str)],
    ) -> Self {
        let mut fields = vec![phone.to_string(), user_id.to_string(), sex.to_string()];
        for metric in Metric::ALL {
            let value = overrides
                .iter()
                .find(|(m, _)| m == metric)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| base.to_string());
            fields.push(value);
        }
        self.lines.push(fields.join(","));
        self
    }

    /// Line with the given raw text
    pub fn raw_line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut text = self.header.join(",");
        text.push('\n');
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    pub fn source(&self) -> Arc<dyn DatasetSource> {
        Arc::new(InlineSource::new("fixture", self.build()))
    }
}

/// Three valid people: two male, one female
pub fn three_people() -> DatasetBuilder {
    DatasetBuilder::new()
        .row("1", "61400000001", "Male", 5.0, &[(Metric::HeifaTotalScoreMale, "72.5")])
        .row("2", "61400000002", "Female", 3.0, &[(Metric::HeifaTotalScoreFemale, "41")])
        .row("3", "61400000003", "male", 4.0, &[(Metric::WaterTotalMl, "2600")])
}

/// Source whose readers block on their first read until `release` is called
#[derive(Clone)]
pub struct HeldSource {
    contents: Arc<[u8]>,
    released: Arc<(Mutex<bool>, Condvar)>,
}

impl HeldSource {
    pub fn new(text: String) -> Self {
        Self {
            contents: Arc::from(text.into_bytes()),
            released: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub fn release(&self) {
        let (flag, cvar) = &*self.released;
        *flag.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn source(&self) -> Arc<dyn DatasetSource> {
        Arc::new(self.clone())
    }
}

struct HeldReader {
    inner: Cursor<Arc<[u8]>>,
    released: Arc<(Mutex<bool>, Condvar)>,
    waited: bool,
}

impl Read for HeldReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.waited {
            let (flag, cvar) = &*self.released;
            let mut released = flag.lock().unwrap();
            while !*released {
                released = cvar.wait(released).unwrap();
            }
            self.waited = true;
        }
        self.inner.read(buf)
    }
}

impl DatasetSource for HeldSource {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(HeldReader {
            inner: Cursor::new(self.contents.clone()),
            released: self.released.clone(),
            waited: false,
        }))
    }

    fn describe(&self) -> String {
        "held".to_string()
    }
}

/// Source whose first reader fails with an I/O error after `text`;
/// later opens read `text` cleanly
pub struct FlakySource {
    contents: Arc<[u8]>,
    opens: AtomicUsize,
}

impl FlakySource {
    pub fn new(text: String) -> Self {
        Self {
            contents: Arc::from(text.into_bytes()),
            opens: AtomicUsize::new(0),
        }
    }
}

struct DeadDevice;

impl Read for DeadDevice {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "device went away"))
    }
}

impl DatasetSource for FlakySource {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        let reader = Cursor::new(self.contents.clone());
        if self.opens.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Box::new(reader.chain(DeadDevice)))
        } else {
            Ok(Box::new(reader))
        }
    }

    fn describe(&self) -> String {
        "flaky".to_string()
    }
}

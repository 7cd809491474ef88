//! Streaming HAR reader.
//!
//! A capture HAR can run to multiple gigabytes because response bodies are
//! embedded base64. The reader walks `log.entries` with a `DeserializeSeed`
//! over an incremental `serde_json` deserializer, handing one entry at a
//! time to an [`EntrySink`] without ever materializing the document.
//!
//! The traversal is single-pass and not restartable; restarting means
//! re-opening the file. Entries that fail to decode are counted and skipped;
//! only a missing or malformed `log.entries` aborts the stream.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::{DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarError {
    #[error("failed to open archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a HAR archive: {0}")]
    BadArchive(String),
    #[error("entry sink failed: {0}")]
    Sink(anyhow::Error),
}

/// One request/response pair from the capture log.
#[derive(Debug, Clone)]
pub struct HarEntry {
    pub url: String,
    pub method: String,
    pub request_headers: Vec<(String, String)>,
    pub post_data: Option<String>,
    pub mime_type: String,
    pub body_text: Option<String>,
    pub body_encoding: Option<String>,
    pub status: Option<i64>,
    pub started_date_time: Option<String>,
    pub time_ms: Option<f64>,
}

impl HarEntry {
    /// Case-insensitive request header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a response body is present at all.
    pub fn has_body(&self) -> bool {
        self.body_text.is_some()
    }

    /// Response body bytes, base64-decoded when the capture says so.
    pub fn decoded_body(&self) -> Option<Vec<u8>> {
        let text = self.body_text.as_ref()?;
        if self.body_encoding.as_deref() == Some("base64") {
            BASE64.decode(text.trim()).ok()
        } else {
            Some(text.as_bytes().to_vec())
        }
    }
}

/// Receives entries as they are decoded. Returning an error aborts the
/// stream; the error is surfaced as [`HarError::Sink`].
pub trait EntrySink {
    fn entry(&mut self, entry: HarEntry) -> anyhow::Result<()>;
}

impl<F> EntrySink for F
where
    F: FnMut(HarEntry) -> anyhow::Result<()>,
{
    fn entry(&mut self, entry: HarEntry) -> anyhow::Result<()> {
        self(entry)
    }
}

/// Counters for one pass over an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryStats {
    /// Elements seen in `log.entries`.
    pub total: u64,
    /// Entries successfully decoded and delivered.
    pub emitted: u64,
    /// Entries skipped because their shape did not decode.
    pub skipped: u64,
}

/// Stream all entries of the HAR at `path` into `sink`.
pub fn stream_entries(path: &Path, sink: &mut dyn EntrySink) -> Result<EntryStats, HarError> {
    let file = File::open(path)?;
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(file));

    let mut state = StreamState {
        sink,
        stats: EntryStats::default(),
        sink_error: None,
        found_entries: false,
    };

    let result = RootSeed { state: &mut state }.deserialize(&mut de);

    if let Some(err) = state.sink_error.take() {
        return Err(HarError::Sink(err));
    }
    match result {
        Ok(()) if state.found_entries => Ok(state.stats),
        Ok(()) => Err(HarError::BadArchive(
            "log.entries array not found".to_string(),
        )),
        Err(e) => Err(HarError::BadArchive(e.to_string())),
    }
}

struct StreamState<'s> {
    sink: &'s mut dyn EntrySink,
    stats: EntryStats,
    sink_error: Option<anyhow::Error>,
    found_entries: bool,
}

struct RootSeed<'a, 's> {
    state: &'a mut StreamState<'s>,
}

impl<'de, 'a, 's> DeserializeSeed<'de> for RootSeed<'a, 's> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(RootVisitor { state: self.state })
    }
}

struct RootVisitor<'a, 's> {
    state: &'a mut StreamState<'s>,
}

impl<'de, 'a, 's> Visitor<'de> for RootVisitor<'a, 's> {
    type Value = ();

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a HAR document object")
    }

    fn visit_map<M>(self, mut map: M) -> Result<(), M::Error>
    where
        M: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            if key == "log" {
                map.next_value_seed(LogSeed {
                    state: &mut *self.state,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

struct LogSeed<'a, 's> {
    state: &'a mut StreamState<'s>,
}

impl<'de, 'a, 's> DeserializeSeed<'de> for LogSeed<'a, 's> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(LogVisitor { state: self.state })
    }
}

struct LogVisitor<'a, 's> {
    state: &'a mut StreamState<'s>,
}

impl<'de, 'a, 's> Visitor<'de> for LogVisitor<'a, 's> {
    type Value = ();

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a HAR log object")
    }

    fn visit_map<M>(self, mut map: M) -> Result<(), M::Error>
    where
        M: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            if key == "entries" {
                self.state.found_entries = true;
                map.next_value_seed(EntriesSeed {
                    state: &mut *self.state,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

struct EntriesSeed<'a, 's> {
    state: &'a mut StreamState<'s>,
}

impl<'de, 'a, 's> DeserializeSeed<'de> for EntriesSeed<'a, 's> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(EntriesVisitor { state: self.state })
    }
}

struct EntriesVisitor<'a, 's> {
    state: &'a mut StreamState<'s>,
}

impl<'de, 'a, 's> Visitor<'de> for EntriesVisitor<'a, 's> {
    type Value = ();

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("the log.entries array")
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<(), S::Error>
    where
        S: SeqAccess<'de>,
    {
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            self.state.stats.total += 1;
            match serde_json::from_value::<RawEntry>(value) {
                Ok(raw) => {
                    if let Err(err) = self.state.sink.entry(raw.into_entry()) {
                        self.state.sink_error = Some(err);
                        return Err(serde::de::Error::custom("entry sink aborted"));
                    }
                    self.state.stats.emitted += 1;
                }
                Err(err) => {
                    self.state.stats.skipped += 1;
                    tracing::debug!(entry = self.state.stats.total, error = %err, "skipping malformed HAR entry");
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawEntry {
    request: RawRequest,
    response: RawResponse,
    #[serde(default, rename = "startedDateTime")]
    started_date_time: Option<String>,
    #[serde(default)]
    time: Option<f64>,
}

#[derive(Deserialize)]
struct RawRequest {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: Vec<RawHeader>,
    #[serde(default, rename = "postData")]
    post_data: Option<RawPostData>,
}

#[derive(Deserialize)]
struct RawHeader {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct RawPostData {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    content: RawContent,
}

#[derive(Deserialize, Default)]
struct RawContent {
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> HarEntry {
        HarEntry {
            url: self.request.url,
            method: self.request.method.unwrap_or_else(|| "GET".to_string()),
            request_headers: self
                .request
                .headers
                .into_iter()
                .map(|h| (h.name, h.value))
                .collect(),
            post_data: self.request.post_data.and_then(|p| p.text),
            mime_type: self.response.content.mime_type.unwrap_or_default(),
            body_text: self.response.content.text,
            body_encoding: self.response.content.encoding,
            status: self.response.status,
            started_date_time: self.started_date_time,
            time_ms: self.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Collector(Vec<HarEntry>);

    impl EntrySink for Collector {
        fn entry(&mut self, entry: HarEntry) -> anyhow::Result<()> {
            self.0.push(entry);
            Ok(())
        }
    }

    fn write_har(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_streams_entries_in_order() {
        let har = r#"{
            "log": {
                "version": "1.2",
                "entries": [
                    {"request": {"url": "https://a.example/1", "method": "GET",
                                 "headers": [{"name": "Accept", "value": "*/*"}]},
                     "response": {"status": 200,
                                  "content": {"mimeType": "text/html", "text": "<html></html>"}}},
                    {"request": {"url": "https://a.example/2"},
                     "response": {"content": {"mimeType": "image/jpeg",
                                              "text": "aGVsbG8=", "encoding": "base64"}}}
                ]
            }
        }"#;
        let file = write_har(har);
        let mut sink = Collector(Vec::new());
        let stats = stream_entries(file.path(), &mut sink).unwrap();

        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(sink.0[0].url, "https://a.example/1");
        assert_eq!(sink.0[0].header("accept"), Some("*/*"));
        assert_eq!(sink.0[1].decoded_body().unwrap(), b"hello");
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let har = r#"{
            "log": {
                "entries": [
                    {"bogus": true},
                    {"request": {"url": "https://a.example/ok"},
                     "response": {"content": {}}}
                ]
            }
        }"#;
        let file = write_har(har);
        let mut sink = Collector(Vec::new());
        let stats = stream_entries(file.path(), &mut sink).unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].url, "https://a.example/ok");
    }

    #[test]
    fn test_missing_entries_is_bad_archive() {
        let file = write_har(r#"{"log": {"version": "1.2"}}"#);
        let mut sink = Collector(Vec::new());
        let err = stream_entries(file.path(), &mut sink).unwrap_err();
        assert!(matches!(err, HarError::BadArchive(_)));
    }

    #[test]
    fn test_non_har_document_is_bad_archive() {
        let file = write_har(r#"[1, 2, 3]"#);
        let mut sink = Collector(Vec::new());
        let err = stream_entries(file.path(), &mut sink).unwrap_err();
        assert!(matches!(err, HarError::BadArchive(_)));
    }

    #[test]
    fn test_sink_error_aborts_stream() {
        let har = r#"{"log": {"entries": [
            {"request": {"url": "https://a.example/1"}, "response": {"content": {}}},
            {"request": {"url": "https://a.example/2"}, "response": {"content": {}}}
        ]}}"#;
        let file = write_har(har);
        let mut aborting = |_entry: HarEntry| -> anyhow::Result<()> { anyhow::bail!("stop") };
        let err = stream_entries(file.path(), &mut aborting).unwrap_err();
        assert!(matches!(err, HarError::Sink(_)));
    }
}

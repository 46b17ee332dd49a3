// src/output.rs
use crate::types::{FinderError, HostEntry, OutputFormat};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

impl OutputFormat {
    /// JSONL for a `.json`/`.jsonl` path unless `force_json` is set.
    pub fn infer(path: Option<&Path>, force_json: bool) -> Self {
        if force_json {
            return OutputFormat::JsonLines;
        }
        match path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("jsonl") => {
                OutputFormat::JsonLines
            }
            _ => OutputFormat::Text,
        }
    }
}

/// Streams subdomains to stdout or a file as they are found.
pub struct OutputWriter {
    format: OutputFormat,
    writer: Box<dyn Write + Send>,
    written: usize,
}

impl OutputWriter {
    pub fn new<W: Write + Send + 'static>(writer: W, format: OutputFormat) -> Self {
        Self {
            format,
            writer: Box::new(writer),
            written: 0,
        }
    }

    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }

    /// Creates (truncating) `path` and any missing parent directories.
    pub fn file(path: &Path, format: OutputFormat) -> Result<Self, FinderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| FinderError::OutputError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| FinderError::OutputError(format!("Failed to create file: {}", e)))?;
        Ok(Self::new(BufWriter::new(file), format))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn write_host(&mut self, domain: &str, subdomain: &str, source: &str) -> Result<(), FinderError> {
        let result = match self.format {
            OutputFormat::Text => writeln!(self.writer, "{}", subdomain),
            OutputFormat::JsonLines => {
                let entry = HostEntry {
                    domain: domain.to_string(),
                    subdomain: subdomain.to_string(),
                    source: source.to_string(),
                };
                let line = serde_json::to_string(&entry)
                    .map_err(|e| FinderError::OutputError(format!("Failed to serialize JSON: {}", e)))?;
                writeln!(self.writer, "{}", line)
            }
        };
        result.map_err(|e| FinderError::OutputError(e.to_string()))?;

        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FinderError> {
        self.writer.flush().map_err(|e| FinderError::OutputError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_infer_format() {
        let json = PathBuf::from("out/hosts.JSON");
        let txt = PathBuf::from("hosts.txt");

        assert_eq!(OutputFormat::infer(Some(json.as_path()), false), OutputFormat::JsonLines);
        assert_eq!(OutputFormat::infer(Some(txt.as_path()), false), OutputFormat::Text);
        assert_eq!(OutputFormat::infer(Some(txt.as_path()), true), OutputFormat::JsonLines);
        assert_eq!(OutputFormat::infer(None, false), OutputFormat::Text);
    }

    #[test]
    fn test_text_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("hosts.txt");

        let mut writer = OutputWriter::file(&path, OutputFormat::Text).unwrap();
        writer.write_host("example.com", "www.example.com", "crtsh").unwrap();
        writer.write_host("example.com", "api.example.com", "wayback").unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.written(), 2);
        drop(writer);

        assert_eq!(fs::read_to_string(&path).unwrap(), "www.example.com\napi.example.com\n");
    }

    #[test]
    fn test_json_lines_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let mut writer = OutputWriter::file(&path, OutputFormat::JsonLines).unwrap();
        writer.write_host("example.com", "www.example.com", "crtsh").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let contents = fs::read_to_string(&path).unwrap();
        let entry: HostEntry = serde_json::from_str(contents.trim_end()).unwrap();
        assert_eq!(
            entry,
            HostEntry {
                domain: "example.com".to_string(),
                subdomain: "www.example.com".to_string(),
                source: "crtsh".to_string(),
            }
        );
        assert_eq!(contents.lines().count(), 1);
    }
}

use std::path::Path;

use exness_tickstore::config::{BackendMode, PipelineConfig, RemoteConfig};

/// A `PipelineConfig` pointed at a scratch directory and a mock archive
/// server, with the other fields left at their documented defaults.
pub fn test_config(base_dir: &Path, archive_base_url: String, default_start_date: &str) -> PipelineConfig {
    PipelineConfig {
        base_dir: base_dir.to_path_buf(),
        archive_base_url,
        default_start_date: default_start_date.to_string(),
        http_timeout_seconds: 5,
        download_parallelism: 4,
        backend_mode: BackendMode::Embedded,
        remote: RemoteConfig::default(),
    }
}

pub fn zip_archive(csv: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        writer
            .start_file("ticks.csv", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, csv.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf
}

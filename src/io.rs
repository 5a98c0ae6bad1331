use std::{
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

use bytes::Bytes;
use polars::{
    io::cloud::{BlockingCloudWriter, CloudOptions, build_object_store, object_path_from_str},
    prelude::PlPathRef,
};

use crate::error::{PipelineError, PipelineResult, StoreError};

// ================================================================================================
// Cloud Reader
// ================================================================================================

/// An async cloud file reader that can be used synchronously via `Read`.
#[derive(Default, Debug, Clone)]
pub(crate) struct CloudReader {
    inner: Cursor<Bytes>,
}

impl CloudReader {
    pub async fn new(uri: &str, cloud_options: Option<&CloudOptions>) -> PipelineResult<Self> {
        let (cloud_location, object_store) =
            build_object_store(PlPathRef::new(uri), cloud_options, false)
                .await
                .map_err(|e| StoreError::Invariant(format!("building object store: {e}")))?;

        let path = object_path_from_str(&cloud_location.prefix)
            .map_err(|e| StoreError::Invariant(format!("building object path: {e}")))?;

        let result = object_store
            .to_dyn_object_store()
            .await
            .get(&path)
            .await
            .map_err(map_object_store_err)?;

        let bytes = result.bytes().await.map_err(map_object_store_err)?;

        Ok(CloudReader {
            inner: Cursor::new(bytes),
        })
    }
}

impl Read for CloudReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

fn map_object_store_err(err: object_store::Error) -> PipelineError {
    StoreError::ObjectStore(err).into()
}

// ================================================================================================
// Storage Location
// ================================================================================================

/// Where a tick/OHLC partition physically lives.
///
/// Note: the `path` fields are **directory paths only**. Do **not** include
/// the file name; callers pass it separately to `writer`/`reader_with_size`.
#[derive(Debug, Clone)]
pub enum StorageLocation<'a> {
    /// Remote object storage (S3/GCS/Azure), addressed through `object_store`.
    Cloud {
        path: &'a str,
        options: CloudOptions,
    },
    /// Embedded, on-disk storage rooted at a local directory.
    Local(&'a Path),
}

impl<'a> StorageLocation<'a> {
    pub(crate) async fn writer(
        &self,
        file_name: &str,
        buffer_size: usize,
    ) -> PipelineResult<Box<dyn Write + Send>> {
        match self {
            Self::Cloud { path, options } => {
                let full_path = format!("{path}/{file_name}");
                BlockingCloudWriter::new(PlPathRef::new(&full_path), Some(options))
                    .await
                    .map(|writer| {
                        Box::new(BufWriter::with_capacity(buffer_size, writer))
                            as Box<dyn Write + Send>
                    })
                    .map_err(|e| {
                        PipelineError::Store(StoreError::Invariant(format!(
                            "creating cloud writer for {full_path}: {e}"
                        )))
                    })
            }
            Self::Local(path) => {
                let full_path = path.join(file_name);
                if let Some(parent) = full_path.parent() {
                    std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
                }

                std::fs::File::create(full_path)
                    .map(|file| {
                        Box::new(BufWriter::with_capacity(buffer_size, file))
                            as Box<dyn Write + Send>
                    })
                    .map_err(|e| StoreError::Io(e).into())
            }
        }
    }

    /// Returns a reader and the file size in bytes.
    ///
    /// For local files, returns the exact file size. For cloud files,
    /// returns `None` if size cannot be determined cheaply.
    pub(crate) async fn reader_with_size(
        &self,
        file_name: &str,
        buffer_size: usize,
    ) -> PipelineResult<(Box<dyn Read + Send>, Option<u64>)> {
        match self {
            Self::Cloud { path, options } => {
                let full_path = format!("{path}/{file_name}");
                let cloud_reader = CloudReader::new(&full_path, Some(options)).await?;
                Ok((
                    Box::new(BufReader::with_capacity(buffer_size, cloud_reader))
                        as Box<dyn Read + Send>,
                    None,
                ))
            }
            Self::Local(path) => {
                let full_path = path.join(file_name);
                let metadata = std::fs::metadata(&full_path).map_err(StoreError::Io)?;
                let size = metadata.len();

                let file = std::fs::File::open(full_path).map_err(StoreError::Io)?;

                Ok((
                    Box::new(BufReader::with_capacity(buffer_size, file)) as Box<dyn Read + Send>,
                    Some(size),
                ))
            }
        }
    }

    /// Directory this location is rooted at, used to compute on-demand
    /// coverage summaries (`CoverageSummary::storage_size_bytes`).
    pub(crate) fn local_root(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Cloud { .. } => None,
        }
    }
}

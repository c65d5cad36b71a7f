//! Processed file listing and download handlers.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::Path as FsPath;
use std::sync::Arc;
use ripline_core::ContainerFormat;
use tokio_util::io::ReaderStream;

use super::ErrorResponse;
use crate::state::AppState;

/// A playable file in the output directory.
#[derive(Debug, Clone, Serialize)]
pub struct MediaFile {
    pub filename: String,
    pub format: ContainerFormat,
    pub size_mb: f64,
    pub modified: DateTime<Utc>,
    pub stream_url: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub count: usize,
    pub files: Vec<MediaFile>,
}

/// Relative URL a file is streamed from.
pub fn stream_url(filename: &str) -> String {
    format!("/stream/{}", filename)
}

fn download_url(filename: &str) -> String {
    format!("/api/v1/download/{}", filename)
}

/// List `.mkv` and `.mp4` files in `dir`, newest first.
///
/// A missing directory yields an empty list.
pub async fn scan_media(dir: &FsPath) -> io::Result<Vec<MediaFile>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let filename = entry.file_name().to_string_lossy().into_owned();
        let format = match ContainerFormat::from_filename(&filename) {
            Some(format @ (ContainerFormat::Mkv | ContainerFormat::Mp4)) => format,
            _ => continue,
        };

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        files.push(MediaFile {
            format,
            size_mb: (metadata.len() as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            modified,
            stream_url: stream_url(&filename),
            download_url: download_url(&filename),
            filename,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(files)
}

/// Returns true if the name could escape the output directory.
fn is_unsafe_filename(filename: &str) -> bool {
    filename.is_empty() || filename.contains("..") || filename.contains('/') || filename.contains('\\')
}

/// List processed files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListFilesResponse>, (StatusCode, Json<ErrorResponse>)> {
    match scan_media(state.output_dir()).await {
        Ok(files) => Ok(Json(ListFilesResponse {
            count: files.len(),
            files,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Error listing files: {}", e))),
        )),
    }
}

/// Download a processed file as an attachment
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    if is_unsafe_filename(&filename) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid filename")),
        ));
    }

    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("File '{}' not found", filename))),
        )
    };

    let path = state.output_dir().join(&filename);
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(not_found()),
    };

    let file = tokio::fs::File::open(&path).await.map_err(|_| not_found())?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_filenames() {
        assert!(is_unsafe_filename(".."));
        assert!(is_unsafe_filename("../etc/passwd"));
        assert!(is_unsafe_filename("dir/clip.mp4"));
        assert!(is_unsafe_filename("dir\\clip.mp4"));
        assert!(is_unsafe_filename(""));
        assert!(!is_unsafe_filename("clip_13141002.mp4"));
    }

    #[tokio::test]
    async fn test_scan_media_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        std::fs::write(dir.path().join("segment.ts"), b"ignored").unwrap();
        std::fs::create_dir(dir.path().join("folder.mkv")).unwrap();

        let older = dir.path().join("older.mkv");
        std::fs::write(&older, vec![0u8; 1024]).unwrap();
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(past)
            .unwrap();
        std::fs::write(dir.path().join("newer.mp4"), vec![0u8; 2048]).unwrap();

        let files = scan_media(dir.path()).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["newer.mp4", "older.mkv"]);
        assert_eq!(files[0].format, ContainerFormat::Mp4);
        assert_eq!(files[0].stream_url, "/stream/newer.mp4");
        assert_eq!(files[0].download_url, "/api/v1/download/newer.mp4");
    }

    #[tokio::test]
    async fn test_scan_media_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = scan_media(&dir.path().join("absent")).await.unwrap();
        assert!(files.is_empty());
    }
}

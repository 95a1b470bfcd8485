//! JSON-lines files shared by the cli and the server.
//!
//! Writes can be cut off by a shutdown, so readers skip lines that don't decode and appends drop
//! an unfinished last line before writing. Whole-file rewrites go through a temporary file that
//! replaces the original, so a crash leaves either the old or the new content.

use std::{
    ffi::OsString,
    io::{self, ErrorKind, SeekFrom},
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{
        AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt,
        AsyncWriteExt, BufReader,
    },
};
use tracing::{debug, warn};

/// Reads every json line of a file. Missing files are treated as empty.
pub async fn read_lines<T: DeserializeOwned>(path: PathBuf) -> Result<Vec<T>> {
    async fn extract<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
        debug!("Extracting {path:?}");
        let file = File::open(path).await?;
        file.lock_shared()?;
        let mut reader = BufReader::new(file);
        let values = read_values(&mut reader, path).await;
        reader.into_inner().unlock_async().await?;
        values
    }

    match extract(&path).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
        Err(e) => Err(e)?,
    }
}

async fn read_values<T: DeserializeOwned>(
    reader: &mut (impl AsyncBufRead + Unpin),
    path: &Path,
) -> io::Result<Vec<T>> {
    let mut values = vec![];
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(values);
        }
        if let Some(v) = parse_line(path, &line) {
            values.push(v);
        }
    }
}

/// Decodes a single line. Illegal values, including broken utf-8, are skipped.
fn parse_line<T: DeserializeOwned>(path: &Path, line: &[u8]) -> Option<T> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice::<T>(line) {
        Ok(v) => Some(v),
        Err(e) => {
            // ignore illegal values. Might happen after shutdowns
            warn!(
                "During parsing in path {:?} found illegal json string {}:  {e}",
                path,
                String::from_utf8_lossy(line)
            );
            None
        }
    }
}

pub async fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buffer = serde_json::to_vec(value)?;
    buffer.push(b'\n');

    let mut file = open_locked(path, true).await?;
    let result = append_with_file(&mut file, path, &buffer).await;
    file.unlock_async().await?;
    result
}

async fn append_with_file(file: &mut File, path: &Path, buffer: &[u8]) -> Result<()> {
    if let Some(start) = torn_tail_start(file, &mut [0; 1024]).await? {
        warn!("Dropping unfinished line at the end of {path:?}");
        file.set_len(start).await?;
    }
    file.seek(SeekFrom::End(0)).await?;
    file.write_all(buffer).await?;
    file.flush().await?;
    Ok(())
}

/// Loads a file, lets `change` modify the values and writes them back if it returned something.
pub async fn rewrite_lines<T, R, F>(path: &Path, create: bool, change: F) -> Result<Option<R>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut Vec<T>) -> Option<R>,
{
    let mut file = match open_locked(path, create).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => Err(e)?,
    };

    let result = rewrite_with_file(&mut file, path, change).await;
    file.unlock_async().await?;
    result
}

async fn rewrite_with_file<T, R, F>(file: &mut File, path: &Path, change: F) -> Result<Option<R>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut Vec<T>) -> Option<R>,
{
    let mut content = Vec::new();
    file.read_to_end(&mut content).await?;
    let mut values = content
        .split(|v| *v == b'\n')
        .filter_map(|line| parse_line::<T>(path, line))
        .collect::<Vec<_>>();

    let Some(result) = change(&mut values) else {
        return Ok(None);
    };

    let mut buffer = Vec::<u8>::new();
    for value in &values {
        serde_json::to_writer(&mut buffer, value)?;
        buffer.push(b'\n');
    }

    replace_file(path, &buffer).await?;
    Ok(Some(result))
}

/// Writes `content` next to `path` and moves it over the original.
async fn replace_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let temporary = temporary_path(path);
    let mut file = File::create(&temporary).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&temporary, path).await
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Opens `path` with an exclusive lock. Rewrites replace files, so a handle that got locked
/// after its file was replaced is opened again.
async fn open_locked(path: &Path, create: bool) -> io::Result<File> {
    loop {
        let file = File::options()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .open(path)
            .await?;
        file.lock_exclusive()?;
        if is_current(&file, path).await? {
            return Ok(file);
        }
        file.unlock_async().await?;
    }
}

#[cfg(unix)]
async fn is_current(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let locked = file.metadata().await?;
    match tokio::fs::metadata(path).await {
        Ok(current) => Ok(locked.ino() == current.ino() && locked.dev() == current.dev()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
async fn is_current(_file: &File, _path: &Path) -> io::Result<bool> {
    Ok(true)
}

/// Finds where an unterminated last line starts. Returns [None] if the file is empty or ends
/// with a new line. The file is scanned backwards in chunks of `buffer` size.
async fn torn_tail_start(
    file: &mut (impl AsyncRead + AsyncSeek + Unpin),
    buffer: &mut [u8],
) -> io::Result<Option<u64>> {
    let mut end = file.seek(SeekFrom::End(0)).await?;
    let mut last_chunk = true;
    while end > 0 {
        let chunk = u64::min(end, buffer.len() as u64) as usize;
        let start = end - chunk as u64;
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(&mut buffer[..chunk]).await?;

        if last_chunk {
            if buffer[chunk - 1] == b'\n' {
                return Ok(None);
            }
            last_chunk = false;
        }
        if let Some(index) = buffer[..chunk].iter().rposition(|v| *v == b'\n') {
            return Ok(Some(start + index as u64 + 1));
        }
        end = start;
    }
    Ok(if last_chunk { None } else { Some(0) })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use tempfile::{tempdir, tempfile};

    use super::{append_line, read_lines, rewrite_lines, torn_tail_start};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: String,
    }

    fn entry(id: &str) -> Entry {
        Entry { id: id.into() }
    }

    async fn tail_of(content: &[u8], buffer_size: usize) -> Result<Option<u64>> {
        let mut file = tempfile()?;
        file.write_all(content)?;
        let mut file = tokio::fs::File::from_std(file);
        Ok(torn_tail_start(&mut file, &mut vec![0; buffer_size]).await?)
    }

    #[tokio::test]
    async fn test_torn_tail_start() -> Result<()> {
        assert_eq!(tail_of(b"", 1024).await?, None);
        assert_eq!(tail_of(b"first\nsecond\n", 1024).await?, None);
        assert_eq!(tail_of(b"first\nsec", 1024).await?, Some(6));
        assert_eq!(tail_of(b"unfinished", 1024).await?, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_torn_tail_start_small_buffer() -> Result<()> {
        assert_eq!(tail_of(b"first\nsecond\n", 2).await?, None);
        assert_eq!(tail_of(b"first\nsecond line", 2).await?, Some(6));
        assert_eq!(tail_of(b"unfinished", 3).await?, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_append_drops_unfinished_line() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("entries");
        std::fs::write(&path, "{\"id\":\"a\"}\n{\"id\":\"b")?;

        append_line(&path, &entry("c")).await?;

        assert_eq!(
            std::fs::read_to_string(&path)?,
            "{\"id\":\"a\"}\n{\"id\":\"c\"}\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_broken_utf8_line_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("entries");
        let mut content = b"{\"id\":\"a\"}\n{\"id\":\"".to_vec();
        content.extend_from_slice(&[0xe5, 0xa4]);
        content.extend_from_slice(b"\"}\n{\"id\":\"b\"}\n");
        std::fs::write(&path, content)?;

        assert_eq!(
            read_lines::<Entry>(path.clone()).await?,
            vec![entry("a"), entry("b")]
        );

        let removed = rewrite_lines(&path, false, |entries: &mut Vec<Entry>| {
            let index = entries.iter().position(|v| v.id == "a")?;
            Some(entries.remove(index))
        })
        .await?;
        assert_eq!(removed, Some(entry("a")));
        assert_eq!(read_lines::<Entry>(path.clone()).await?, vec![entry("b")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_rewrite_replaces_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("entries");
        append_line(&path, &entry("a")).await?;

        let declined = rewrite_lines(&path, false, |_: &mut Vec<Entry>| None::<()>).await?;
        assert_eq!(declined, None);

        rewrite_lines(&path, false, |entries: &mut Vec<Entry>| {
            entries.push(entry("b"));
            Some(())
        })
        .await?;

        assert_eq!(
            read_lines::<Entry>(path.clone()).await?,
            vec![entry("a"), entry("b")]
        );
        assert!(!dir.path().join("entries.tmp").exists());

        let missing = rewrite_lines(&dir.path().join("missing"), false, |_: &mut Vec<Entry>| {
            Some(())
        })
        .await?;
        assert_eq!(missing, None);
        Ok(())
    }
}

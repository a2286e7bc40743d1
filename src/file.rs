//! 远端文件句柄与溢写缓冲 / Remote file handle and spooled buffer

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// 内存缓冲上限，超过后溢写到临时文件（10MB） / In-memory limit before
/// spilling to a temp file (10 MB)
pub const SPOOL_MAX_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug)]
enum SpoolInner {
    Memory(Cursor<Vec<u8>>),
    /// 匿名临时文件，drop 时由操作系统回收 / Anonymous temp file,
    /// reclaimed on drop
    Disk(std::fs::File),
}

/// 溢写缓冲 / Spooled buffer
///
/// Small payloads stay in memory; once the written size crosses
/// `max_size` the whole content moves to an unlinked temporary file.
/// Fill it with [`write_chunk`](Self::write_chunk), then
/// [`rewind`](Self::rewind) before reading.
#[derive(Debug)]
pub struct SpooledBuffer {
    inner: SpoolInner,
    max_size: usize,
    len: u64,
}

impl SpooledBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: SpoolInner::Memory(Cursor::new(Vec::new())),
            max_size,
            len: 0,
        }
    }

    /// 已写入字节数 / Bytes written so far
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 是否已溢写到磁盘 / Whether the content spilled to disk
    pub fn is_spooled(&self) -> bool {
        matches!(self.inner, SpoolInner::Disk(_))
    }

    /// 追加一块数据 / Append a chunk, spilling to disk past the threshold
    pub fn write_chunk(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        if let SpoolInner::Memory(cursor) = &mut self.inner {
            if self.len as usize + chunk.len() > self.max_size {
                let mut file = tempfile::tempfile()?;
                file.write_all(cursor.get_ref())?;
                self.inner = SpoolInner::Disk(file);
            }
        }
        match &mut self.inner {
            SpoolInner::Memory(cursor) => cursor.get_mut().extend_from_slice(chunk),
            SpoolInner::Disk(file) => file.write_all(chunk)?,
        }
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// 回到开头，准备读取 / Seek back to the start for reading
    pub fn rewind(&mut self) -> std::io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }
}

impl Read for SpooledBuffer {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SpoolInner::Memory(cursor) => cursor.read(buf),
            SpoolInner::Disk(file) => file.read(buf),
        }
    }
}

impl Seek for SpooledBuffer {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match &mut self.inner {
            SpoolInner::Memory(cursor) => cursor.seek(pos),
            SpoolInner::Disk(file) => file.seek(pos),
        }
    }
}

/// 打开的远端文件 / A file fetched from the bucket
///
/// Owns its private buffer; dropping the handle releases the memory or the
/// spooled temp file. Re-opening goes back through the storage and
/// re-fetches from the backend.
#[derive(Debug)]
pub struct StorageFile {
    key: String,
    buf: SpooledBuffer,
}

impl StorageFile {
    pub(crate) fn new(key: String, buf: SpooledBuffer) -> Self {
        Self { key, buf }
    }

    /// 对象键 / The resolved object key this handle was opened from
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 内容大小 / Content size in bytes
    pub fn size(&self) -> u64 {
        self.buf.len()
    }

    /// 读取全部内容 / Read the full content
    pub fn read(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.buf.rewind()?;
        self.buf.read_to_end(&mut out)?;
        Ok(out)
    }
}

impl Read for StorageFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.buf.read(buf)
    }
}

impl Seek for StorageFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.buf.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_payload_stays_in_memory() {
        let mut buf = SpooledBuffer::new(SPOOL_MAX_SIZE);
        buf.write_chunk(b"hello").unwrap();
        assert!(!buf.is_spooled());
        assert_eq!(buf.len(), 5);

        buf.rewind().unwrap();
        let mut out = Vec::new();
        buf.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_spills_past_threshold() {
        let mut buf = SpooledBuffer::new(8);
        buf.write_chunk(b"12345").unwrap();
        assert!(!buf.is_spooled());
        buf.write_chunk(b"6789").unwrap();
        assert!(buf.is_spooled());
        assert_eq!(buf.len(), 9);

        buf.rewind().unwrap();
        let mut out = Vec::new();
        buf.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"123456789");
    }

    #[test]
    fn test_chunked_writes_round_trip() {
        let mut buf = SpooledBuffer::new(16);
        for chunk in [&b"abc"[..], b"def", b"ghijklmnopqrstuvwxyz"] {
            buf.write_chunk(chunk).unwrap();
        }
        buf.rewind().unwrap();
        let mut out = Vec::new();
        buf.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdefghijklmnopqrstuvwxyz");
    }
}

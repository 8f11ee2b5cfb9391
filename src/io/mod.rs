//! Random-access data sources.
//!
//! Everything above this module reads through [`ReadAt`], so the same
//! parsing code works on a local file, an in-memory buffer or a remote APK
//! fetched with HTTP Range requests.

mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use std::io;

/// Trait for blocking random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if the source ends first.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Read `len` bytes at `offset` into a freshly allocated buffer.
    fn read_vec_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }
}

impl ReadAt for [u8] {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start <= self.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let src = self
            .get(start..)
            .and_then(|rest| rest.get(..buf.len()))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl ReadAt for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_exact_at(offset, buf)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_reads_exact_range() {
        let data: Vec<u8> = (0u8..16).collect();
        let mut buf = [0u8; 4];
        data.read_exact_at(6, &mut buf).unwrap();
        assert_eq!(buf, [6, 7, 8, 9]);
        assert_eq!(data.read_vec_at(14, 2).unwrap(), vec![14, 15]);
    }

    #[test]
    fn slice_read_past_end_is_eof() {
        let data = vec![1u8, 2, 3];
        let err = data.read_vec_at(2, 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        let err = data.read_vec_at(10, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}

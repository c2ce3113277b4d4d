use std::io::{ErrorKind, Read};

use prost::Message;
use tracing::{span, trace, Level};

use crate::error::FramingError;
use crate::osm_pbf;

/// Upper bound on a serialized `BlobHeader`.
pub const MAX_BLOB_HEADER_SIZE: u32 = 64 * 1024;
/// Upper bound on a serialized `Blob`.
pub const MAX_BLOB_SIZE: i32 = 32 * 1024 * 1024;

pub const HEADER_BLOB_TYPE: &str = "OSMHeader";
pub const DATA_BLOB_TYPE: &str = "OSMData";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Header,
    Data,
}

impl BlobKind {
    fn from_type(tag: &str) -> Result<Self, FramingError> {
        match tag {
            HEADER_BLOB_TYPE => Ok(BlobKind::Header),
            DATA_BLOB_TYPE => Ok(BlobKind::Data),
            other => Err(FramingError::UnknownBlobType(other.to_string())),
        }
    }
}

/// One `(BlobHeader, Blob)` record of the container, still compressed.
#[derive(Debug)]
pub struct RawRecord {
    pub kind: BlobKind,
    pub blob: osm_pbf::Blob,
}

/// Sequential reader over the length-prefixed record stream.
#[derive(Debug)]
pub struct BlobReader<R: Read> {
    stream: R,
    bytes_consumed: u64,
    records_read: u64,
    finished: bool,
}

impl<R: Read> BlobReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            bytes_consumed: 0,
            records_read: 0,
            finished: false,
        }
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read the next record. `Ok(None)` only when the stream ends exactly on a
    /// record boundary; running dry anywhere else is a framing error.
    pub fn read_next_record(&mut self) -> Result<Option<RawRecord>, FramingError> {
        let _span = span!(Level::TRACE, "read_next_record", record = self.records_read).entered();

        let mut size_buf = [0u8; 4];
        let got = self.read_fixed(&mut size_buf)?;
        if got == 0 {
            return Ok(None);
        }
        self.expect_full(got, size_buf.len())?;
        let header_size = u32::from_be_bytes(size_buf);
        trace!("Header size: {}", header_size);
        if header_size > MAX_BLOB_HEADER_SIZE {
            return Err(FramingError::HeaderTooLarge(header_size));
        }

        let mut header_buf = vec![0u8; header_size as usize];
        let got = self.read_fixed(&mut header_buf)?;
        self.expect_full(got, header_buf.len())?;
        let blob_header = osm_pbf::BlobHeader::decode(&header_buf[..])
            .map_err(|source| FramingError::Decode { what: "BlobHeader", source })?;
        trace!("Decoded BlobHeader: type={} datasize={}", blob_header.r#type, blob_header.datasize);

        if blob_header.datasize <= 0 {
            return Err(FramingError::EmptyBlob(blob_header.datasize));
        }
        if blob_header.datasize > MAX_BLOB_SIZE {
            return Err(FramingError::BlobTooLarge(blob_header.datasize));
        }
        let mut blob_buf = vec![0u8; blob_header.datasize as usize];
        let got = self.read_fixed(&mut blob_buf)?;
        self.expect_full(got, blob_buf.len())?;
        let blob = osm_pbf::Blob::decode(&blob_buf[..])
            .map_err(|source| FramingError::Decode { what: "Blob", source })?;

        // Routing is decided only after the whole record is consumed, so the
        // byte count in any error still points at a record boundary.
        let kind = BlobKind::from_type(&blob_header.r#type)?;
        self.records_read += 1;
        Ok(Some(RawRecord { kind, blob }))
    }

    /// Fill `buf` as far as the stream allows and return how many bytes were read.
    fn read_fixed(&mut self, buf: &mut [u8]) -> Result<usize, FramingError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(FramingError::Io {
                        offset: self.bytes_consumed + filled as u64,
                        source,
                    })
                }
            }
        }
        self.bytes_consumed += filled as u64;
        Ok(filled)
    }

    fn expect_full(&self, got: usize, expected: usize) -> Result<(), FramingError> {
        if got != expected {
            return Err(FramingError::ShortRead {
                offset: self.bytes_consumed,
                got,
                expected,
            });
        }
        Ok(())
    }
}

impl<R: Read> Iterator for BlobReader<R> {
    type Item = Result<RawRecord, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.read_next_record().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.finished = true;
        }
        next
    }
}

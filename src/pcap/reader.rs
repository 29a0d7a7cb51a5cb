//! PCAP and PCAPNG file reader.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError as ParserError, PcapNGReader};
use tracing::debug;

use super::RawPacket;
use crate::error::{Error, PcapError, Result};

/// Buffer size for reading capture files (64KB).
const BUFFER_SIZE: usize = 65536;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type Source = Box<dyn Read + Send>;

/// Reader for PCAP and PCAPNG files, with optional gzip decompression.
pub struct PcapReader {
    inner: ReaderInner,
    state: ReaderState,
}

enum ReaderInner {
    Legacy(LegacyPcapReader<Source>),
    Ng(PcapNGReader<Source>),
}

/// Values carried across blocks.
struct ReaderState {
    frame_number: u64,
    link_type: u16,
    nanosecond: bool,
}

impl PcapReader {
    /// Open a capture file.
    ///
    /// Gzip compression is detected from the `.gz` extension or the magic bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_| PcapError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let mut buffered = BufReader::with_capacity(BUFFER_SIZE, file);
        let gzipped = is_gzip_extension(path)
            || io::BufRead::fill_buf(&mut buffered)?.starts_with(&GZIP_MAGIC);
        debug!(path = %path.display(), gzipped, "Opening capture");

        let source: Source = if gzipped {
            Box::new(GzDecoder::new(buffered))
        } else {
            Box::new(buffered)
        };
        Self::from_reader(source)
    }

    /// Read an uncompressed capture from any byte source.
    pub fn from_reader(mut source: Source) -> Result<Self> {
        let mut magic = [0u8; 4];
        source
            .read_exact(&mut magic)
            .map_err(|_| PcapError::invalid("File too short to read magic number"))?;

        // Put the magic back in front of the stream
        let source: Source = Box::new(io::Cursor::new(magic).chain(source));

        let inner = match magic {
            // Microsecond and nanosecond PCAP, either byte order
            [0xd4, 0xc3, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xc3, 0xd4]
            | [0x4d, 0x3c, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0x3c, 0x4d] => {
                let reader = LegacyPcapReader::new(BUFFER_SIZE, source)
                    .map_err(|e| PcapError::invalid(format!("Failed to parse PCAP header: {e}")))?;
                ReaderInner::Legacy(reader)
            }
            [0x0a, 0x0d, 0x0d, 0x0a] => {
                let reader = PcapNGReader::new(BUFFER_SIZE, source)
                    .map_err(|e| PcapError::invalid(format!("Failed to parse PCAPNG header: {e}")))?;
                ReaderInner::Ng(reader)
            }
            _ => {
                return Err(PcapError::invalid(format!("Unknown magic number: {magic:02x?}")).into())
            }
        };

        Ok(Self {
            inner,
            state: ReaderState {
                frame_number: 0,
                // Replaced by the file or interface header
                link_type: 1,
                nanosecond: false,
            },
        })
    }

    /// Link type of the most recent file or interface header.
    pub fn link_type(&self) -> u16 {
        self.state.link_type
    }

    /// Number of frames read so far.
    pub fn frame_count(&self) -> u64 {
        self.state.frame_number
    }

    /// Read the next frame.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>> {
        match &mut self.inner {
            ReaderInner::Legacy(reader) => read_legacy_packet(reader, &mut self.state),
            ReaderInner::Ng(reader) => read_pcapng_packet(reader, &mut self.state),
        }
    }
}

fn read_legacy_packet<R: Read>(
    reader: &mut LegacyPcapReader<R>,
    state: &mut ReaderState,
) -> Result<Option<RawPacket>> {
    loop {
        match reader.next() {
            Ok((offset, block)) => match block {
                PcapBlockOwned::Legacy(packet) => {
                    state.frame_number += 1;

                    let fraction = i64::from(packet.ts_usec);
                    let fraction = if state.nanosecond { fraction / 1000 } else { fraction };
                    let timestamp_us = i64::from(packet.ts_sec) * 1_000_000 + fraction;

                    let raw = RawPacket::new(
                        state.frame_number,
                        timestamp_us,
                        packet.origlen,
                        state.link_type,
                        packet.data.to_vec(),
                    );

                    reader.consume(offset);
                    return Ok(Some(raw));
                }
                PcapBlockOwned::LegacyHeader(header) => {
                    state.link_type = header.network.0 as u16;
                    state.nanosecond = header.is_nanosecond_precision();
                    debug!(link_type = state.link_type, "PCAP header");
                    reader.consume(offset);
                }
                _ => reader.consume(offset),
            },
            Err(ParserError::Eof) => return Ok(None),
            Err(ParserError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| PcapError::invalid(format!("PCAP refill error: {e}")))?;
            }
            Err(e) => return Err(PcapError::invalid(format!("PCAP parse error: {e}")).into()),
        }
    }
}

fn read_pcapng_packet<R: Read>(
    reader: &mut PcapNGReader<R>,
    state: &mut ReaderState,
) -> Result<Option<RawPacket>> {
    use pcap_parser::pcapng::Block;

    loop {
        match reader.next() {
            Ok((offset, block)) => match block {
                PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                    state.link_type = idb.linktype.0 as u16;
                    debug!(link_type = state.link_type, "PCAPNG interface");
                    reader.consume(offset);
                }
                PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                    state.frame_number += 1;

                    // Interface time units, microseconds unless the interface says otherwise
                    let timestamp_us = (i64::from(epb.ts_high) << 32) | i64::from(epb.ts_low);

                    let raw = RawPacket::new(
                        state.frame_number,
                        timestamp_us,
                        epb.origlen,
                        state.link_type,
                        epb.data.to_vec(),
                    );

                    reader.consume(offset);
                    return Ok(Some(raw));
                }
                PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                    state.frame_number += 1;

                    let raw = RawPacket::new(
                        state.frame_number,
                        0, // No timestamp in simple packets
                        spb.origlen,
                        state.link_type,
                        spb.data.to_vec(),
                    );

                    reader.consume(offset);
                    return Ok(Some(raw));
                }
                _ => reader.consume(offset),
            },
            Err(ParserError::Eof) => return Ok(None),
            Err(ParserError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| PcapError::invalid(format!("PCAPNG refill error: {e}")))?;
            }
            Err(e) => return Err(PcapError::invalid(format!("PCAPNG parse error: {e}")).into()),
        }
    }
}

/// Check if a path appears to be a gzip file by extension only.
pub fn is_gzip_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|f| f.to_str())
        .is_some_and(|name| name.to_lowercase().ends_with(".gz"))
}

impl Iterator for PcapReader {
    type Item = std::result::Result<RawPacket, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

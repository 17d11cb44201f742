//! Transport sinks: where the generated frames end up.
//!
//! The send loop only sees the [`FrameSink`] trait. Live injection goes
//! through libpcap ([`PcapSink`]) or a pnet datalink channel
//! ([`DatalinkSink`]); [`PcapFileSink`] writes the frames to a pcap file
//! instead.

use crate::error::{Error, Result};
use crate::utils::duration_to_timeval;

use pcap::{Active, Capture, Dead, Linktype, Packet, PacketHeader, Savefile};
use pnet::datalink::{self, Channel, DataLinkSender};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const SNAPLEN: i32 = 65536;

/// A single-writer channel for raw frames.
///
/// The sink is opened before being handed to the engine, and closed by
/// whoever opened it.
pub trait FrameSink {
    /// Writes one complete Ethernet frame
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Releases the underlying handle. Later writes fail.
    fn close(&mut self) {}
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

fn closed() -> Error {
    Error::TransportWrite("the sink is closed".to_string())
}

/// Live injection backend
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// libpcap live handle
    #[default]
    Pcap,
    /// pnet datalink channel
    Datalink,
}

impl Backend {
    pub fn open(&self, interface: &str) -> Result<Box<dyn FrameSink>> {
        Ok(match self {
            Backend::Pcap => Box::new(PcapSink::open(interface)?),
            Backend::Datalink => Box::new(DatalinkSink::open(interface)?),
        })
    }
}

/// Injection through a libpcap live handle
pub struct PcapSink {
    capture: Option<Capture<Active>>,
}

impl PcapSink {
    pub fn open(interface: &str) -> Result<Self> {
        let capture = Capture::from_device(interface)
            .and_then(|c| c.promisc(true).snaplen(SNAPLEN).open())
            .map_err(|e| {
                Error::Interface(format!(
                    "cannot open {interface}: {e}. Please retry with root privilege."
                ))
            })?;
        log::debug!("pcap handle opened on {interface}");
        Ok(PcapSink {
            capture: Some(capture),
        })
    }
}

impl FrameSink for PcapSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.capture
            .as_mut()
            .ok_or_else(closed)?
            .sendpacket(frame)
            .map_err(|e| Error::TransportWrite(e.to_string()))
    }

    fn close(&mut self) {
        if self.capture.take().is_some() {
            log::debug!("pcap handle closed");
        }
    }
}

/// Injection through a pnet datalink (layer 2) channel
pub struct DatalinkSink {
    tx: Option<Box<dyn DataLinkSender>>,
}

impl DatalinkSink {
    pub fn open(interface: &str) -> Result<Self> {
        let iface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface)
            .ok_or_else(|| Error::Interface(format!("interface {interface} not found")))?;
        match datalink::channel(&iface, Default::default()) {
            Ok(Channel::Ethernet(tx, _)) => {
                log::debug!("datalink channel opened on {interface}");
                Ok(DatalinkSink { tx: Some(tx) })
            }
            Ok(_) => Err(Error::Interface(format!(
                "unsupported channel type on {interface}"
            ))),
            Err(e) => Err(Error::Interface(format!(
                "cannot open {interface}: {e}. Please retry with root privilege."
            ))),
        }
    }
}

impl FrameSink for DatalinkSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        match self.tx.as_mut().ok_or_else(closed)?.send_to(frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(Error::TransportWrite(e.to_string())),
            None => Err(Error::TransportWrite(
                "not enough room in the send buffer".to_string(),
            )),
        }
    }

    fn close(&mut self) {
        if self.tx.take().is_some() {
            log::debug!("datalink channel closed");
        }
    }
}

/// Offline mode: frames are appended to a pcap file, stamped with the
/// wall-clock time of the write
pub struct PcapFileSink {
    path: PathBuf,
    savefile: Option<Savefile>,
    _capture: Capture<Dead>,
}

impl PcapFileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let capture = Capture::dead(Linktype::ETHERNET)
            .map_err(|e| Error::Interface(format!("cannot create a pcap handle: {e}")))?;
        let savefile = capture
            .savefile(&path)
            .map_err(|e| Error::Interface(format!("cannot create {}: {e}", path.display())))?;
        log::info!("Writing frames to {}", path.display());
        Ok(PcapFileSink {
            path,
            savefile: Some(savefile),
            _capture: capture,
        })
    }
}

impl FrameSink for PcapFileSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let savefile = self.savefile.as_mut().ok_or_else(closed)?;
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let header = PacketHeader {
            ts: duration_to_timeval(ts),
            caplen: frame.len() as u32,
            len: frame.len() as u32,
        };
        savefile.write(&Packet::new(&header, frame));
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut savefile) = self.savefile.take() {
            if let Err(e) = savefile.flush() {
                log::error!("Cannot flush {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pcap_file_sink() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames.pcap");
        let mut sink = PcapFileSink::create(&path).unwrap();
        sink.write_frame(&[1u8; 60]).unwrap();
        sink.write_frame(&[2u8; 64]).unwrap();
        sink.close();
        assert!(sink.write_frame(&[3u8; 60]).is_err());

        let mut capture = Capture::from_file(&path).unwrap();
        let first = capture.next_packet().unwrap();
        assert_eq!(first.header.len, 60);
        assert_eq!(first.data, &[1u8; 60][..]);
        let second = capture.next_packet().unwrap();
        assert_eq!(second.data, &[2u8; 64][..]);
        assert!(capture.next_packet().is_err());
    }

    #[test]
    fn test_unknown_interface() {
        assert!(matches!(
            DatalinkSink::open("no-such-interface-42"),
            Err(Error::Interface(_))
        ));
    }
}

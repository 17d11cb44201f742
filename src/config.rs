use crate::error::{Error, Result};
use crate::frame::{ETHERNET_HEADER_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE, VLAN_TAG_SIZE};

use pnet_packet::ethernet::EtherTypes;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Largest VLAN identifier that fits the 12 bits of the 802.1Q tag
pub const MAX_VLAN_ID: u16 = 0x0FFF;

/// Traffic shaping strategy applied at each tick
#[derive(Deserialize, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrafficMode {
    /// Replay the same frame once per tick
    #[default]
    Sequential,
    /// Replay the frame once per tick with a fresh random payload
    Random,
    /// Send the same frame several times in a row at each tick
    Burst,
}

impl fmt::Display for TrafficMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficMode::Sequential => write!(f, "sequential"),
            TrafficMode::Random => write!(f, "random"),
            TrafficMode::Burst => write!(f, "burst"),
        }
    }
}

/// Protocol label. It only selects the default EtherType: the payload is
/// never populated with protocol fields.
#[derive(Deserialize, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ipv4,
    Ipv6,
    Arp,
    Tcp,
    Udp,
}

impl Protocol {
    pub fn default_ether_type(&self) -> u16 {
        match self {
            Protocol::Ipv4 | Protocol::Tcp | Protocol::Udp => EtherTypes::Ipv4.0,
            Protocol::Ipv6 => EtherTypes::Ipv6.0,
            Protocol::Arp => EtherTypes::Arp.0,
        }
    }
}

/// How many ticks the engine performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketCount {
    /// Run until cancelled
    Continuous,
    Bounded(u64),
}

impl From<u64> for PacketCount {
    fn from(count: u64) -> Self {
        if count == 0 {
            PacketCount::Continuous
        } else {
            PacketCount::Bounded(count)
        }
    }
}

impl fmt::Display for PacketCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketCount::Continuous => write!(f, "continuous"),
            PacketCount::Bounded(n) => write!(f, "{n}"),
        }
    }
}

/// Everything the generator needs to craft and send its traffic.
///
/// MAC addresses are kept in their textual form: they are parsed and
/// validated when the frame is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfig {
    pub interface: String,
    pub src_mac: String,
    pub dst_mac: String,
    pub ether_type: u16,
    pub payload_size: usize,
    pub protocol: Protocol,
    pub rate: u64,
    pub count: PacketCount,
    pub mode: TrafficMode,
    pub vlan: Option<u16>,
    /// Pad frames shorter than 60 bytes with zeros
    pub pad: bool,
    /// Seed of the payload generator of the random mode
    pub seed: Option<u64>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        ConfigLayer::default().into_config()
    }
}

impl TrafficConfig {
    /// Checks the invariants that do not depend on address parsing.
    /// It must be called before any timer is derived from the rate.
    pub fn validate(&self) -> Result<()> {
        if self.rate == 0 {
            return Err(Error::Configuration(
                "the rate must be a positive number of packets per second".to_string(),
            ));
        }
        if let Some(vlan) = self.vlan {
            if vlan > MAX_VLAN_ID {
                return Err(Error::Configuration(format!(
                    "VLAN id {vlan} does not fit in 12 bits (max {MAX_VLAN_ID})"
                )));
            }
        }
        self.check_frame_len()
    }

    /// Fails if the frames would exceed the largest Ethernet frame
    pub fn check_frame_len(&self) -> Result<()> {
        let len = self.frame_len();
        if len > MAX_FRAME_SIZE {
            return Err(Error::Configuration(format!(
                "a payload of {} bytes makes a {len}-byte frame (max {MAX_FRAME_SIZE})",
                self.payload_size
            )));
        }
        Ok(())
    }

    /// Length of the Ethernet header, 802.1Q tag included
    pub fn header_len(&self) -> usize {
        if self.vlan.is_some() {
            ETHERNET_HEADER_SIZE + VLAN_TAG_SIZE
        } else {
            ETHERNET_HEADER_SIZE
        }
    }

    /// Length of the frames the configuration produces
    pub fn frame_len(&self) -> usize {
        let len = self.header_len().saturating_add(self.payload_size);
        if self.pad {
            len.max(MIN_FRAME_SIZE)
        } else {
            len
        }
    }

    /// Time between two ticks. Only meaningful once the rate is validated.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.rate.max(1))
    }
}

/// A partial configuration: one layer per source (file, command line).
/// Layers are stacked with [`ConfigLayer::overlay`] and the missing values
/// take their defaults in [`ConfigLayer::into_config`].
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub interface: Option<String>,
    pub src_mac: Option<String>,
    pub dst_mac: Option<String>,
    pub ether_type: Option<u16>,
    pub payload_size: Option<usize>,
    pub protocol: Option<Protocol>,
    pub rate: Option<u64>,
    pub count: Option<u64>,
    pub mode: Option<TrafficMode>,
    pub vlan: Option<u16>,
    pub pad: Option<bool>,
    pub seed: Option<u64>,
}

impl ConfigLayer {
    /// Values of `over` take precedence over the values of `self`
    pub fn overlay(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            interface: over.interface.or(self.interface),
            src_mac: over.src_mac.or(self.src_mac),
            dst_mac: over.dst_mac.or(self.dst_mac),
            ether_type: over.ether_type.or(self.ether_type),
            payload_size: over.payload_size.or(self.payload_size),
            protocol: over.protocol.or(self.protocol),
            rate: over.rate.or(self.rate),
            count: over.count.or(self.count),
            mode: over.mode.or(self.mode),
            vlan: over.vlan.or(self.vlan),
            pad: over.pad.or(self.pad),
            seed: over.seed.or(self.seed),
        }
    }

    pub fn into_config(self) -> TrafficConfig {
        let protocol = self.protocol.unwrap_or_default();
        TrafficConfig {
            interface: self.interface.unwrap_or_default(),
            src_mac: self.src_mac.unwrap_or_default(),
            dst_mac: self.dst_mac.unwrap_or_default(),
            ether_type: self
                .ether_type
                .unwrap_or_else(|| protocol.default_ether_type()),
            payload_size: self.payload_size.unwrap_or(46),
            protocol,
            rate: self.rate.unwrap_or(1000),
            count: self.count.unwrap_or(1000).into(),
            mode: self.mode.unwrap_or_default(),
            vlan: self.vlan,
            pad: self.pad.unwrap_or(false),
            seed: self.seed,
        }
    }
}

/// Parses a TOML configuration file such as
///
/// ```toml
/// interface = "eth0"
/// src_mac = "aa:bb:cc:dd:ee:01"
/// dst_mac = "aa:bb:cc:dd:ee:02"
/// ether_type = 0x0800
/// payload_size = 46
/// rate = 1000
/// count = 0
/// mode = "burst"
/// vlan = 100
/// ```
pub fn import_config(config: &str) -> Result<ConfigLayer> {
    let layer: ConfigLayer =
        toml::from_str(config).map_err(|e| Error::ConfigFile(e.to_string()))?;
    log::debug!("Configuration file: {layer:?}");
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrafficConfig::default();
        assert_eq!(config.ether_type, 0x0800);
        assert_eq!(config.payload_size, 46);
        assert_eq!(config.rate, 1000);
        assert_eq!(config.count, PacketCount::Bounded(1000));
        assert_eq!(config.mode, TrafficMode::Sequential);
        assert_eq!(config.vlan, None);
        assert_eq!(config.period(), Duration::from_millis(1));
    }

    #[test]
    fn test_count_zero_is_continuous() {
        assert_eq!(PacketCount::from(0), PacketCount::Continuous);
        assert_eq!(PacketCount::from(7), PacketCount::Bounded(7));
    }

    #[test]
    fn test_validate() {
        let mut config = TrafficConfig::default();
        assert!(config.validate().is_ok());

        config.rate = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.rate = 10;
        config.vlan = Some(MAX_VLAN_ID);
        assert!(config.validate().is_ok());
        config.vlan = Some(MAX_VLAN_ID + 1);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.vlan = None;
        config.payload_size = MAX_FRAME_SIZE;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_frame_len() {
        let mut config = TrafficConfig {
            payload_size: 10,
            ..Default::default()
        };
        assert_eq!(config.frame_len(), 24);
        config.vlan = Some(3);
        assert_eq!(config.frame_len(), 28);
        config.pad = true;
        assert_eq!(config.frame_len(), 60);
    }

    #[test]
    fn test_protocol_selects_ether_type() {
        let layer = ConfigLayer {
            protocol: Some(Protocol::Arp),
            ..Default::default()
        };
        assert_eq!(layer.into_config().ether_type, 0x0806);

        let layer = ConfigLayer {
            protocol: Some(Protocol::Ipv6),
            ether_type: Some(0x88b5),
            ..Default::default()
        };
        assert_eq!(layer.into_config().ether_type, 0x88b5);
    }

    #[test]
    fn test_import_and_overlay() {
        let file = import_config(
            r#"
interface = "eth0"
src_mac = "aa:bb:cc:dd:ee:01"
dst_mac = "aa:bb:cc:dd:ee:02"
ether_type = 0x86dd
rate = 50
count = 0
mode = "burst"
vlan = 100
"#,
        )
        .unwrap();
        let cli = ConfigLayer {
            rate: Some(200),
            mode: Some(TrafficMode::Random),
            ..Default::default()
        };
        let config = file.overlay(cli).into_config();
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.ether_type, 0x86dd);
        assert_eq!(config.rate, 200);
        assert_eq!(config.count, PacketCount::Continuous);
        assert_eq!(config.mode, TrafficMode::Random);
        assert_eq!(config.vlan, Some(100));
    }

    #[test]
    fn test_import_rejects_unknown_keys() {
        assert!(matches!(
            import_config("speed = 3"),
            Err(Error::ConfigFile(_))
        ));
        assert!(matches!(
            import_config("mode = \"zigzag\""),
            Err(Error::ConfigFile(_))
        ));
    }
}

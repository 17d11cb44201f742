use ethgen::config::{ConfigLayer, Protocol, TrafficMode};
use ethgen::sink::Backend;

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(
        short,
        long,
        required_unless_present_any = ["list", "outfile", "config"],
        help = "Network interface name"
    )]
    pub interface: Option<String>,
    #[arg(long, default_value_t = false, help = "List available network interfaces")]
    pub list: bool,
    #[arg(long, help = "Source MAC address")]
    pub src_mac: Option<String>,
    #[arg(long, help = "Destination MAC address")]
    pub dst_mac: Option<String>,
    #[arg(long, value_parser = parse_ether_type, help = "EtherType value, decimal or 0x-prefixed hexadecimal [default: depends on the protocol, 0x0800]")]
    pub ether_type: Option<u16>,
    #[arg(long, help = "Payload size in bytes [default: 46]")]
    pub payload_size: Option<usize>,
    #[arg(long, value_enum, help = "Protocol label, selects the default EtherType [default: ipv4]")]
    pub protocol: Option<Protocol>,
    #[arg(long, help = "Packets per second [default: 1000]")]
    pub rate: Option<u64>,
    #[arg(long, help = "Number of packets to send, 0 for continuous [default: 1000]")]
    pub count: Option<u64>,
    #[arg(long, help = "VLAN ID (untagged if absent)")]
    pub vlan: Option<u16>,
    #[arg(long, value_enum, help = "Traffic mode [default: sequential]")]
    pub mode: Option<TrafficMode>,
    #[arg(long, default_value_t = false, help = "Pad frames to the 60-byte Ethernet minimum")]
    pub pad: bool,
    #[arg(short, long, help = "Seed for random payload generation")]
    pub seed: Option<u64>,
    #[arg(short, long, help = "Write the frames to this pcap file instead of injecting them")]
    pub outfile: Option<String>,
    #[arg(long, value_enum, default_value_t = Backend::Pcap, help = "Injection backend")]
    pub backend: Backend,
    #[arg(short, long, help = "TOML configuration file. Command line options take precedence.")]
    pub config: Option<String>,
}

impl Args {
    /// The configuration values given on the command line
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            interface: self.interface.clone(),
            src_mac: self.src_mac.clone(),
            dst_mac: self.dst_mac.clone(),
            ether_type: self.ether_type,
            payload_size: self.payload_size,
            protocol: self.protocol,
            rate: self.rate,
            count: self.count,
            mode: self.mode,
            vlan: self.vlan,
            pad: self.pad.then_some(true),
            seed: self.seed,
        }
    }
}

fn parse_ether_type(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid EtherType {s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_ether_type() {
        assert_eq!(parse_ether_type("0x0800"), Ok(0x0800));
        assert_eq!(parse_ether_type("0X86DD"), Ok(0x86dd));
        assert_eq!(parse_ether_type("2048"), Ok(0x0800));
        assert!(parse_ether_type("0x10000").is_err());
        assert!(parse_ether_type("ipv4").is_err());
    }

    #[test]
    fn test_layer() {
        let args = Args::parse_from([
            "ethgen",
            "-i",
            "eth0",
            "--src-mac",
            "aa:bb:cc:dd:ee:01",
            "--ether-type",
            "0x88b5",
            "--mode",
            "burst",
            "--count",
            "0",
            "--vlan",
            "12",
        ]);
        let layer = args.layer();
        assert_eq!(layer.interface.as_deref(), Some("eth0"));
        assert_eq!(layer.ether_type, Some(0x88b5));
        assert_eq!(layer.mode, Some(TrafficMode::Burst));
        assert_eq!(layer.count, Some(0));
        assert_eq!(layer.vlan, Some(12));
        assert_eq!(layer.pad, None);
        assert_eq!(layer.rate, None);
    }

    #[test]
    fn test_interface_required() {
        assert!(Args::try_parse_from(["ethgen", "--rate", "10"]).is_err());
        assert!(Args::try_parse_from(["ethgen", "--list"]).is_ok());
        assert!(Args::try_parse_from(["ethgen", "-o", "out.pcap"]).is_ok());
    }
}

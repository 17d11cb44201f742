use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use pnet::util::MacAddr;
use std::fmt;

/// What the operator needs to pick an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub index: u32,
    pub name: String,
    pub mac: Option<MacAddr>,
    pub addresses: Vec<IpNetwork>,
}

impl From<NetworkInterface> for InterfaceInfo {
    fn from(iface: NetworkInterface) -> Self {
        InterfaceInfo {
            index: iface.index,
            name: iface.name,
            mac: iface.mac,
            addresses: iface.ips,
        }
    }
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.index, self.name)?;
        match &self.mac {
            Some(mac) => writeln!(f, "    MAC: {mac}")?,
            None => writeln!(f, "    MAC:")?,
        }
        let addresses: Vec<String> = self.addresses.iter().map(|a| a.to_string()).collect();
        write!(f, "    Addresses: {}", addresses.join(", "))
    }
}

/// Lists the network interfaces of the host
pub fn list_interfaces() -> Vec<InterfaceInfo> {
    datalink::interfaces()
        .into_iter()
        .map(InterfaceInfo::from)
        .collect()
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which hardware address of the configuration is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Source,
    Destination,
}

impl std::fmt::Display for AddressField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressField::Source => write!(f, "source"),
            AddressField::Destination => write!(f, "destination"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed source or destination MAC address
    #[error("invalid {field} MAC address {value:?}: {reason}")]
    InvalidAddress {
        field: AddressField,
        value: String,
        reason: String,
    },

    /// A layer could not be laid over the frame buffer
    #[error("frame serialization failed: {0}")]
    Serialization(String),

    /// A single write to the transport sink failed
    #[error("failed to write frame: {0}")]
    TransportWrite(String),

    /// Unusable configuration (null rate, VLAN id out of range...)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The transport sink could not be opened
    #[error("interface error: {0}")]
    Interface(String),

    #[error("ill-formed configuration file: {0}")]
    ConfigFile(String),

    /// The Ctrl-C handler could not be installed
    #[error("cannot set the Ctrl-C handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

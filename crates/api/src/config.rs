use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;

use cloudrelay_observability::LogFormat;

/// CloudEvents HTTP receiver.
#[derive(Debug, Clone, Parser)]
#[command(name = "cloudrelay-receiver")]
#[command(about = "Receive CloudEvents over HTTP and log their decoded payloads", long_about = None)]
#[command(version)]
pub struct ReceiverConfig {
    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Emit JSON log lines
    #[arg(long, env = "CLOUDRELAY_LOG_JSON")]
    pub log_json: bool,
}

impl ReceiverConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_json_flag(self.log_json)
    }
}

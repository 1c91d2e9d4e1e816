use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_HOST: &str = "localhost";

pub fn get_default_host() -> String {
    DEFAULT_HOST.to_string()
}

const FLEET_API_PORT: &str = "FLEET_API_PORT";

const DEFAULT_API_PORT: u16 = 8080;

pub fn get_default_api_port() -> u16 {
    DEFAULT_API_PORT
}

/// API port from the environment, if set and valid
pub fn get_api_port() -> Option<u16> {
    std::env::var(FLEET_API_PORT)
        .ok()
        .and_then(|res| res.parse().ok())
}

const FLEET_API_ADDR: &str = "FLEET_API_ADDR";

const DEFAULT_API_ADDR: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub fn get_default_api_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(DEFAULT_API_ADDR), get_default_api_port())
}

/// API bind IP from the environment, if set and valid
pub fn get_api_addr() -> Option<IpAddr> {
    std::env::var(FLEET_API_ADDR)
        .ok()
        .and_then(|res| res.parse().ok())
}

/// Apply environment overrides on top of a configured bind address
pub fn apply_env_overrides(bind_addr: SocketAddr) -> SocketAddr {
    let ip = get_api_addr().unwrap_or(bind_addr.ip());
    let port = get_api_port().unwrap_or(bind_addr.port());
    SocketAddr::new(ip, port)
}

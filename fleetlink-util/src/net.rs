// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::net::{IpAddr, Ipv4Addr, SocketAddr};

use fleetlink_error::{Code, Error, ResultExt, make_err, make_input_err};
use tokio::net::{UdpSocket, lookup_host};

/// Resolves `host` to its first IPv4 address.
pub async fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, Error> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    lookup_host((host, 0))
        .await
        .err_tip(|| format!("Could not resolve {host}"))?
        .find_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .err_tip_with_code(|_| (Code::NotFound, format!("No IPv4 address found for {host}")))
}

/// Returns the local address the kernel would pick to reach `peer`.
/// Connecting a UDP socket only selects a route, no packet is sent.
pub async fn local_ip_towards(peer: SocketAddr) -> Result<IpAddr, Error> {
    let bind_addr: SocketAddr = match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (core::net::Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .err_tip(|| "Could not bind UDP socket for route lookup")?;
    socket
        .connect(peer)
        .await
        .err_tip(|| format!("No route towards {peer}"))?;
    Ok(socket
        .local_addr()
        .err_tip(|| "Could not read local address of UDP socket")?
        .ip())
}

/// Fully qualified name of this machine as reported by the OS.
pub fn local_host_name() -> Result<String, Error> {
    let name = nix::unistd::gethostname()
        .map_err(|e| make_err!(Code::Internal, "Could not read host name: {e}"))?;
    name.into_string()
        .map_err(|name| make_input_err!("Host name {name:?} is not valid UTF-8"))
}

/// Drops the last `trailing_labels` dot-separated labels of `fqdn`.
///
/// `web-worker-01.build.us-west-2.corp.example` with 4 labels stripped
/// yields `web-worker-01`.
pub fn strip_domain_labels(fqdn: &str, trailing_labels: usize) -> Result<String, Error> {
    let labels: Vec<&str> = fqdn.split('.').collect();
    let keep = labels.len().saturating_sub(trailing_labels);
    let short_name = labels[..keep].join(".");
    if short_name.is_empty() {
        return Err(make_input_err!(
            "Host name {fqdn} has no labels left after stripping {trailing_labels} trailing ones"
        ));
    }
    Ok(short_name)
}

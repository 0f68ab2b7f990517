//! ICMP echo prober.
//!
//! Every probe dials its own transport, so a broken socket only ever affects
//! the probe that opened it. The exchange itself runs on the blocking pool.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use super::{ipv4_payload, Dialer, EchoMessage, ProbeError, Transport};
use crate::store::{Outcome, Sample};

/// Default per-probe deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const SEQUENCE: u16 = 1;
const PADDING: &[u8] = b"up or not? up or not? ";
const MAX_DATAGRAM: usize = 1500;

/// Sends one echo request per call and classifies what comes back.
#[derive(Debug)]
pub struct Prober<D> {
    dialer: Arc<D>,
    timeout: Duration,
    identifier: u16,
}

impl<D: Dialer> Prober<D> {
    pub fn new(dialer: D, timeout: Duration) -> Self {
        Self {
            dialer: Arc::new(dialer),
            timeout,
            identifier: (std::process::id() & 0xffff) as u16,
        }
    }

    /// Probe `address` once. Failures are folded into the sample's outcome.
    pub async fn probe_once(&self, address: &str) -> Sample {
        let time = Utc::now();
        let start = Instant::now();

        let result = self.exchange(address, start + self.timeout).await;
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(()) => {
                tracing::debug!("{}: {} in {:?}", address, Outcome::Ok, elapsed);
                Outcome::Ok
            }
            Err(e) => {
                let outcome = e.outcome();
                tracing::warn!("{}: {} in {:?}: {}", address, outcome, elapsed, e);
                outcome
            }
        };

        Sample::new(time, elapsed, outcome)
    }

    async fn exchange(&self, address: &str, deadline: Instant) -> Result<(), ProbeError> {
        let ip = resolve_address(address).await?;
        let dialer = self.dialer.clone();
        let identifier = self.identifier;

        tokio::task::spawn_blocking(move || ping_blocking(&*dialer, ip, deadline, identifier))
            .await
            .map_err(|e| ProbeError::Aborted(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Resolve hostname to IP address.
async fn resolve_address(address: &str) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(ip);
    }

    tokio::net::lookup_host(format!("{}:0", address))
        .await
        .map_err(ProbeError::Connect)?
        .map(|sa| sa.ip())
        .min_by_key(|ip| ip.is_ipv6())
        .ok_or_else(|| {
            ProbeError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no addresses found for {}", address),
            ))
        })
}

fn ping_blocking<D: Dialer>(
    dialer: &D,
    ip: IpAddr,
    deadline: Instant,
    identifier: u16,
) -> Result<(), ProbeError> {
    let mut transport = dialer.dial(ip).map_err(ProbeError::Connect)?;
    let result = exchange_echo(&mut transport, ip.is_ipv6(), deadline, identifier);
    if let Err(e) = transport.close() {
        tracing::debug!("failed to close transport to {}: {}", ip, e);
    }
    result
}

/// Send an echo request and wait for the first reply that is not itself a
/// request (our own packet can be looped back to us on local targets).
fn exchange_echo<T: Transport>(
    transport: &mut T,
    ipv6: bool,
    deadline: Instant,
    identifier: u16,
) -> Result<(), ProbeError> {
    transport.set_deadline(deadline).map_err(ProbeError::Connect)?;

    let request = EchoMessage::request(ipv6, identifier, SEQUENCE, PADDING.repeat(3))
        .encode()
        .map_err(ProbeError::Encode)?;
    transport.write(&request).map_err(ProbeError::Send)?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let n = transport.read(&mut buf).map_err(ProbeError::Read)?;
        // Raw ICMPv6 sockets never deliver the IP header.
        let payload = if ipv6 { &buf[..n] } else { ipv4_payload(&buf[..n]) };
        let reply = EchoMessage::decode(payload).map_err(ProbeError::Parse)?;
        if !reply.is_echo_request() {
            return Ok(());
        }
        tracing::trace!("ignoring echo request (id={:?})", reply.body.map(|b| b.identifier));
    }
}

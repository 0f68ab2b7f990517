//! Scheduler module for running probes on a fixed interval.

use crate::probe::{Dialer, Prober};
use crate::store::Monitor;

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Drives one probe loop per monitored target.
pub struct Scheduler<D> {
    prober: Arc<Prober<D>>,
    monitors: Vec<Arc<Monitor>>,
}

impl<D: Dialer> Scheduler<D> {
    pub fn new(prober: Arc<Prober<D>>, monitors: Vec<Arc<Monitor>>) -> Self {
        Self { prober, monitors }
    }

    /// Start probing every target. Each loop returns once `cancel` fires.
    pub fn start(&self, cancel: &CancellationToken) -> JoinSet<()> {
        tracing::info!("Starting scheduler with {} targets", self.monitors.len());

        let mut loops = JoinSet::new();
        for monitor in &self.monitors {
            loops.spawn(run_probe_loop(
                monitor.clone(),
                self.prober.clone(),
                cancel.clone(),
            ));
        }
        loops
    }
}

/// Run the probe loop for a single target.
///
/// Every tick spawns an independent probe, so a hung probe never holds up the
/// next one. Probes still in flight at cancellation finish on their own
/// deadline and record into the store as usual.
pub async fn run_probe_loop<D: Dialer>(
    monitor: Arc<Monitor>,
    prober: Arc<Prober<D>>,
    cancel: CancellationToken,
) {
    let target = &monitor.target;
    tracing::info!("Ping {} every {:?}", target.address, target.interval);

    let mut interval = tokio::time::interval(target.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                break;
            }
            _ = interval.tick() => {
                let monitor = monitor.clone();
                let prober = prober.clone();
                tokio::spawn(async move {
                    let sample = prober.probe_once(&monitor.target.address).await;
                    monitor.samples.add(sample);
                });
            }
        }
    }

    tracing::info!("Stopped probing {}", target.address);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Transport, ICMPV4_ECHO_REPLY};
    use crate::store::{Outcome, Target};
    use std::io;
    use std::net::IpAddr;
    use std::time::{Duration, Instant};

    /// Answers every request with an echo reply after `delay`.
    struct EchoDialer {
        delay: Duration,
    }

    struct EchoTransport {
        delay: Duration,
    }

    impl Dialer for EchoDialer {
        type Transport = EchoTransport;

        fn dial(&self, _addr: IpAddr) -> io::Result<EchoTransport> {
            Ok(EchoTransport { delay: self.delay })
        }
    }

    impl Transport for EchoTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(self.delay);
            let reply = [ICMPV4_ECHO_REPLY, 0, 0, 0, 0, 1, 0, 1];
            buf[..reply.len()].copy_from_slice(&reply);
            Ok(reply.len())
        }

        fn set_deadline(&mut self, _deadline: Instant) -> io::Result<()> {
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn setup(delay: Duration, interval: Duration) -> (Arc<Monitor>, Arc<Prober<EchoDialer>>) {
        let monitor = Arc::new(Monitor::new(Target::new("127.0.0.1", interval)));
        let prober = Arc::new(Prober::new(EchoDialer { delay }, Duration::from_secs(2)));
        (monitor, prober)
    }

    #[tokio::test]
    async fn test_loop_records_samples() {
        let (monitor, prober) = setup(Duration::ZERO, Duration::from_millis(20));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_probe_loop(monitor.clone(), prober, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let samples = monitor.samples.get();
        assert!(samples.len() >= 2, "got {} samples", samples.len());
        assert!(samples.iter().all(|s| s.outcome == Outcome::Ok));
    }

    #[tokio::test]
    async fn test_first_probe_is_immediate_and_cancel_is_prompt() {
        let (monitor, prober) = setup(Duration::ZERO, Duration::from_secs(3600));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_probe_loop(monitor.clone(), prober, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(monitor.samples.len(), 1);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop promptly")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_probes_overlap_and_finish_after_cancel() {
        let (monitor, prober) = setup(Duration::from_millis(150), Duration::from_millis(20));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_probe_loop(monitor.clone(), prober, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();
        handle.await.unwrap();

        // Probes launched every 20ms despite each taking 150ms.
        let at_cancel = monitor.samples.len();
        assert!(at_cancel >= 3, "got {} samples", at_cancel);

        // In-flight probes still land in the store after shutdown.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(monitor.samples.len() > at_cancel);
    }

    #[tokio::test]
    async fn test_scheduler_starts_one_loop_per_target() {
        let prober = Arc::new(Prober::new(
            EchoDialer {
                delay: Duration::ZERO,
            },
            Duration::from_secs(2),
        ));
        let monitors: Vec<Arc<Monitor>> = ["127.0.0.1", "127.0.0.2"]
            .into_iter()
            .map(|addr| Arc::new(Monitor::new(Target::new(addr, Duration::from_secs(3600)))))
            .collect();
        let scheduler = Scheduler::new(prober, monitors.clone());
        let cancel = CancellationToken::new();

        let mut loops = scheduler.start(&cancel);
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let mut stopped = 0;
        while let Some(res) = loops.join_next().await {
            res.unwrap();
            stopped += 1;
        }
        assert_eq!(stopped, 2);
        assert!(monitors.iter().all(|m| m.samples.len() == 1));
    }
}

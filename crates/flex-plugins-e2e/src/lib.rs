//! Eventual-consistency waiters used by end-to-end runs.
//!
//! Both waiters poll an HTTP endpoint on a fixed interval until the awaited
//! condition holds or the timeout is spent.

use std::time::Duration;

use flex_plugins_core::poll::InvalidPollPolicy;
use flex_plugins_core::{Clock, Exhaustion, PollError, PollPolicy, ProbeError};
use thiserror::Error;
use tracing::{info, instrument};

pub mod probe;

pub use probe::{ActivePlugin, HttpPluginProbe, PluginProbe};

#[derive(Debug, Error)]
pub enum WaitError<E> {
    #[error("Plugin did not start")]
    DidNotStart { url: String, attempts: u32 },
    #[error("/plugins did not contain {0}")]
    NotReleased(String),
    #[error("{0}")]
    Probe(E),
    #[error(transparent)]
    InvalidPolicy(#[from] InvalidPollPolicy),
}

/// Waits until `url` answers successfully.
///
/// On timeout the last probe failure is logged and a generic
/// [`WaitError::DidNotStart`] is returned.
#[instrument(skip(probe, clock))]
pub fn wait_for_plugin_to_start<P, C>(
    probe: &P,
    clock: &C,
    url: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), WaitError<P::Error>>
where
    P: PluginProbe,
    C: Clock,
{
    let policy = PollPolicy::new(timeout, interval, Exhaustion::SynthesizeTimeout)?;
    let outcome = policy.run(clock, || probe.get(url).map_err(ProbeError::Transient));

    match outcome {
        Ok(()) => {
            info!("plugin is up at {url}");
            Ok(())
        }
        Err(PollError::TimedOut { attempts, .. }) => Err(WaitError::DidNotStart {
            url: url.to_string(),
            attempts,
        }),
        Err(PollError::Exhausted(err) | PollError::Aborted(err)) => Err(WaitError::Probe(err)),
    }
}

/// Waits until Flex lists the plugin named `unique_name`.
///
/// On timeout the last failure is returned unchanged: either the probe's own
/// error or [`WaitError::NotReleased`].
#[instrument(skip(probe, clock))]
pub fn wait_for_plugin_to_release<P, C>(
    probe: &P,
    clock: &C,
    flex_base_url: &str,
    unique_name: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), WaitError<P::Error>>
where
    P: PluginProbe,
    C: Clock,
{
    let policy = PollPolicy::new(timeout, interval, Exhaustion::PropagateLast)?;
    let outcome = policy.run(clock, || {
        let plugins = probe
            .active_plugins(flex_base_url)
            .map_err(|err| ProbeError::Transient(WaitError::Probe(err)))?;

        if plugins.iter().any(|plugin| plugin.name == unique_name) {
            Ok(())
        } else {
            Err(ProbeError::Transient(WaitError::NotReleased(
                unique_name.to_string(),
            )))
        }
    });

    match outcome {
        Ok(()) => {
            info!("{unique_name} is live");
            Ok(())
        }
        Err(PollError::Exhausted(err) | PollError::Aborted(err)) => Err(err),
        Err(PollError::TimedOut { .. }) => Err(WaitError::NotReleased(unique_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex_plugins_core::poll::ManualClock;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct FakeProbe {
        calls: Cell<u32>,
        up_after: Option<u32>,
        released_after: Option<u32>,
        unreachable: bool,
    }

    impl FakeProbe {
        fn tick(&self) -> u32 {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            n
        }
    }

    impl PluginProbe for FakeProbe {
        type Error = String;

        fn get(&self, _url: &str) -> Result<(), String> {
            let n = self.tick();
            match self.up_after {
                Some(up) if n >= up => Ok(()),
                _ => Err("connection refused".to_string()),
            }
        }

        fn active_plugins(&self, _flex_base_url: &str) -> Result<Vec<ActivePlugin>, String> {
            let n = self.tick();
            if self.unreachable {
                return Err("503 Service Unavailable".to_string());
            }
            let mut plugins = vec![ActivePlugin {
                name: "other-plugin".to_string(),
                version: None,
                src: None,
            }];
            if matches!(self.released_after, Some(after) if n >= after) {
                plugins.push(ActivePlugin {
                    name: "my-plugin".to_string(),
                    version: Some("1.0.0".to_string()),
                    src: None,
                });
            }
            Ok(plugins)
        }
    }

    const SECOND: Duration = Duration::from_secs(1);
    const TICK: Duration = Duration::from_millis(100);

    #[test]
    fn start_waiter_returns_once_url_answers() {
        let clock = ManualClock::new();
        let probe = FakeProbe {
            up_after: Some(3),
            ..FakeProbe::default()
        };

        wait_for_plugin_to_start(&probe, &clock, "http://localhost:3000", SECOND, TICK).unwrap();
        assert_eq!(probe.calls.get(), 3);
    }

    #[test]
    fn start_waiter_synthesizes_timeout() {
        let clock = ManualClock::new();
        let probe = FakeProbe::default();

        let err = wait_for_plugin_to_start(&probe, &clock, "http://localhost:3000", SECOND, TICK)
            .unwrap_err();
        assert_eq!(err.to_string(), "Plugin did not start");
        assert_eq!(probe.calls.get(), 11);
    }

    #[test]
    fn release_waiter_returns_once_listed() {
        let clock = ManualClock::new();
        let probe = FakeProbe {
            released_after: Some(4),
            ..FakeProbe::default()
        };

        wait_for_plugin_to_release(&probe, &clock, "https://flex.twilio.com", "my-plugin", SECOND, TICK)
            .unwrap();
        assert_eq!(probe.calls.get(), 4);
    }

    #[test]
    fn release_waiter_propagates_missing_plugin() {
        let clock = ManualClock::new();
        let probe = FakeProbe::default();

        let err = wait_for_plugin_to_release(&probe, &clock, "https://flex.twilio.com", "my-plugin", SECOND, TICK)
            .unwrap_err();
        assert_eq!(err.to_string(), "/plugins did not contain my-plugin");
    }

    #[test]
    fn release_waiter_propagates_probe_error() {
        let clock = ManualClock::new();
        let probe = FakeProbe {
            unreachable: true,
            ..FakeProbe::default()
        };

        let err = wait_for_plugin_to_release(&probe, &clock, "https://flex.twilio.com", "my-plugin", SECOND, TICK)
            .unwrap_err();
        assert!(matches!(err, WaitError::Probe(ref msg) if msg.starts_with("503")));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let clock = ManualClock::new();
        let probe = FakeProbe::default();
        let err = wait_for_plugin_to_start(&probe, &clock, "http://localhost:3000", SECOND, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, WaitError::InvalidPolicy(_)));
        assert_eq!(probe.calls.get(), 0);
    }
}

//! # Pipeline Activation
//!
//! The one place that decides whether telemetry runs. The host hands in a
//! `Capability` once; when it is `Headless` (server-side rendering, a CLI
//! dry run) activation returns `None` without touching storage, spawning
//! tasks or erroring.
//!
//! ## Activation order:
//! 1.  Resolve the client id from the slot store.
//! 2.  Run the referrer tracker once.
//! 3.  Subscribe the event source to a fresh recorder.
//! 4.  Spawn the flusher, wired to the outbound channel.

use std::sync::Arc;

use super::flusher::BatchFlusher;
use super::identity::resolve_client_id;
use super::recorder::Recorder;
use super::referer::{record_referer_if_changed, RefererOutcome};
use super::source::EventSource;
use crate::configs::config_pipeline::PipelineConfig;
use crate::core::outbound::{spawn_dispatch, Outbound, UploadSink};
use crate::storage::SlotStore;

/// Where the page is and how the visitor got there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Host of the current page, e.g. `www.shop.com`.
    pub host: String,
    /// Navigation referrer, if the visitor arrived via a link.
    pub referrer: Option<String>,
}

/// An interactive client context.
#[derive(Debug, Clone)]
pub struct ClientEnv {
    /// Durable storage for the client id and referrer slots.
    pub store: Arc<dyn SlotStore>,
    /// Current location.
    pub location: Location,
}

/// # Capability
///
/// The result of probing the host once: either a fully interactive client
/// with persistent storage, or nothing.
#[derive(Debug, Clone)]
pub enum Capability {
    /// Storage and location are available; telemetry runs.
    Interactive(ClientEnv),
    /// No interactive client; telemetry is a no-op.
    Headless,
}

impl Capability {
    /// Shorthand for an interactive capability.
    pub fn interactive(
        store: Arc<dyn SlotStore>,
        host: impl Into<String>,
        referrer: Option<String>,
    ) -> Self {
        Capability::Interactive(ClientEnv {
            store,
            location: Location {
                host: host.into(),
                referrer,
            },
        })
    }

    /// Whether activation would do anything.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Capability::Interactive(_))
    }
}

/// A running activation. Dropping it does not stop anything.
#[derive(Debug, Clone)]
pub struct ActivePipeline {
    client_id: String,
    site_host: String,
    referer: RefererOutcome,
    recorder: Recorder,
}

impl ActivePipeline {
    /// The durable client id batches are tagged with.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The host batches are tagged with.
    pub fn site_host(&self) -> &str {
        &self.site_host
    }

    /// What the referrer tracker did on activation.
    pub fn referer_outcome(&self) -> RefererOutcome {
        self.referer
    }

    /// Handle to the buffer and ledger.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}

/// Entry point for activating the pipeline.
pub struct TelemetryPipeline;

impl TelemetryPipeline {
    /// Activates telemetry, uploading through `sink`.
    ///
    /// Returns `None` for a headless capability or a config that fails
    /// `PipelineConfig::validate`. Must be called from within a Tokio runtime.
    pub fn activate<E, S>(
        capability: Capability,
        config: &PipelineConfig,
        source: E,
        sink: S,
    ) -> Option<ActivePipeline>
    where
        E: EventSource,
        S: UploadSink,
    {
        let env = Self::admit(capability, config)?;
        Some(Self::start(env, config, source, spawn_dispatch(sink)))
    }

    /// Activates telemetry, handing batches to an existing `outbound` channel
    /// instead of spawning a dispatcher.
    pub fn activate_with_outbound<E>(
        capability: Capability,
        config: &PipelineConfig,
        source: E,
        outbound: Outbound,
    ) -> Option<ActivePipeline>
    where
        E: EventSource,
    {
        let env = Self::admit(capability, config)?;
        Some(Self::start(env, config, source, outbound))
    }

    /// Headless capabilities and invalid configs both turn activation into a
    /// no-op; neither is an error for the host.
    fn admit(capability: Capability, config: &PipelineConfig) -> Option<ClientEnv> {
        let env = match capability {
            Capability::Interactive(env) => env,
            Capability::Headless => {
                log::debug!("No interactive client; telemetry disabled.");
                return None;
            }
        };
        if let Err(e) = config.validate() {
            log::warn!("Telemetry disabled, invalid pipeline config: {}", e);
            return None;
        }
        Some(env)
    }

    fn start<E: EventSource>(
        env: ClientEnv,
        config: &PipelineConfig,
        source: E,
        outbound: Outbound,
    ) -> ActivePipeline {
        let ClientEnv { store, location } = env;

        // --- Phase 1: Identity ---
        let client_id = resolve_client_id(store.as_ref());

        // --- Phase 2: Referrer ---
        let referer = record_referer_if_changed(
            store.as_ref(),
            location.referrer.as_deref(),
            &location.host,
            &config.referer_tld_marker,
        );

        // --- Phase 3: Recording ---
        let recorder = Recorder::new(config.dedup.strategy());
        source.subscribe(recorder.clone());

        // --- Phase 4: Flushing ---
        BatchFlusher::new(
            recorder.clone(),
            outbound,
            client_id.clone(),
            location.host.clone(),
            config,
        )
        .spawn();

        log::info!(
            "Telemetry active for client {} on {} (referrer: {:?}).",
            client_id,
            location.host,
            referer
        );

        ActivePipeline {
            client_id,
            site_host: location.host,
            referer,
            recorder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::identity::CLIENT_ID_SLOT;
    use crate::capture::source::FnSource;
    use crate::storage::MemoryStore;

    #[test]
    fn test_headless_is_a_no_op_outside_a_runtime() {
        // Nothing may be spawned, or this would panic without a runtime.
        let (outbound, mut receiver) = Outbound::channel();
        let activated = TelemetryPipeline::activate_with_outbound(
            Capability::Headless,
            &PipelineConfig::default(),
            FnSource(|_r: Recorder| panic!("source must not be subscribed")),
            outbound,
        );
        assert!(activated.is_none());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_invalid_config_is_a_no_op() {
        // Runs outside a runtime: a spawned flusher would panic here.
        let store = Arc::new(MemoryStore::new());
        for config in [
            PipelineConfig {
                flush_interval_ms: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                collector_namespace: String::new(),
                ..PipelineConfig::default()
            },
        ] {
            let (outbound, mut receiver) = Outbound::channel();
            let activated = TelemetryPipeline::activate_with_outbound(
                Capability::interactive(store.clone(), "www.shop.com", None),
                &config,
                FnSource(|_r: Recorder| panic!("source must not be subscribed")),
                outbound,
            );
            assert!(activated.is_none());
            assert!(receiver.try_recv().is_err());
        }
        assert!(store.get(CLIENT_ID_SLOT).unwrap().is_none(), "storage untouched");
    }

    #[tokio::test]
    async fn test_interactive_resolves_identity_first() {
        let store = Arc::new(MemoryStore::with_slots([(CLIENT_ID_SLOT, "known-client")]));
        let (outbound, _receiver) = Outbound::channel();

        let active = TelemetryPipeline::activate_with_outbound(
            Capability::interactive(store, "www.shop.com", None),
            &PipelineConfig::default(),
            FnSource(|_r: Recorder| {}),
            outbound,
        )
        .expect("interactive capability activates");

        assert_eq!(active.client_id(), "known-client");
        assert_eq!(active.site_host(), "www.shop.com");
        assert_eq!(active.referer_outcome(), RefererOutcome::NoReferrer);
        assert_eq!(active.recorder().buffered(), 0);
    }
}

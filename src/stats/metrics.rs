//! Metric names, descriptions and recording helpers

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{Error, Result};

/// Active rooms (gauge)
pub const ROOM_COUNT: &str = "room_count";

/// Connected clients (gauge)
pub const CLIENT_COUNT: &str = "client_count";

/// Messages accepted by the hub for fan-out (counter)
pub const MESSAGES_RECEIVED: &str = "messages_received";

/// Frames enqueued to recipients (counter)
pub const MESSAGES_BROADCASTED: &str = "messages_broadcasted";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_gauge!(ROOM_COUNT, Unit::Count, "The number of active rooms");
    describe_gauge!(CLIENT_COUNT, Unit::Count, "The number of active clients");
    describe_counter!(
        MESSAGES_RECEIVED,
        Unit::Count,
        "The number of messages received from all connections"
    );
    describe_counter!(
        MESSAGES_BROADCASTED,
        Unit::Count,
        "The number of messages broadcasted to all connections"
    );
}

/// Install the Prometheus recorder and serve it on `addr`
///
/// Must be called from within a Tokio runtime, at most once per process.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| Error::Metrics(e.to_string()))?;

    describe_metrics();

    tracing::info!(addr = %addr, "Metrics exporter listening");
    Ok(())
}

pub(crate) fn room_opened() {
    gauge!(ROOM_COUNT).increment(1.0);
}

pub(crate) fn room_closed() {
    gauge!(ROOM_COUNT).decrement(1.0);
}

pub(crate) fn client_connected() {
    gauge!(CLIENT_COUNT).increment(1.0);
}

pub(crate) fn client_disconnected() {
    gauge!(CLIENT_COUNT).decrement(1.0);
}

pub(crate) fn message_received() {
    counter!(MESSAGES_RECEIVED).increment(1);
}

pub(crate) fn message_broadcasted() {
    counter!(MESSAGES_BROADCASTED).increment(1);
}

/// In-memory recorder for asserting on recorded values
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };

    /// Records counters and gauges into atomics keyed by metric name
    #[derive(Default)]
    pub(crate) struct TestRecorder {
        counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
        gauges: Mutex<HashMap<String, Arc<AtomicU64>>>,
    }

    impl TestRecorder {
        pub(crate) fn counter_value(&self, name: &str) -> u64 {
            self.counters
                .lock()
                .unwrap()
                .get(name)
                .map(|c| c.load(Ordering::Relaxed))
                .unwrap_or(0)
        }

        pub(crate) fn gauge_value(&self, name: &str) -> f64 {
            self.gauges
                .lock()
                .unwrap()
                .get(name)
                .map(|g| f64::from_bits(g.load(Ordering::Relaxed)))
                .unwrap_or(0.0)
        }
    }

    impl Recorder for TestRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let handle = self
                .counters
                .lock()
                .unwrap()
                .entry(key.name().to_string())
                .or_default()
                .clone();
            Counter::from_arc(handle)
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            let handle = self
                .gauges
                .lock()
                .unwrap()
                .entry(key.name().to_string())
                .or_default()
                .clone();
            Gauge::from_arc(handle)
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }
}

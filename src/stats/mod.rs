//! Hub metrics
//!
//! Counters and gauges are recorded through the `metrics` facade and served
//! in Prometheus text format by [`install_exporter`].

pub mod metrics;

pub use self::metrics::{
    describe_metrics, install_exporter, CLIENT_COUNT, MESSAGES_BROADCASTED, MESSAGES_RECEIVED,
    ROOM_COUNT,
};

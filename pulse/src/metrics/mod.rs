//! OTLP export of the metric registry

mod init;

pub use init::init_meter_provider;

//! Prometheus text exposition (format version 0.0.4) of a registry snapshot

use std::fmt::Write;

use super::{InstrumentData, RegistrySnapshot};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub fn render(snapshot: &RegistrySnapshot) -> String {
    let mut out = String::new();
    for instrument in &snapshot.instruments {
        let name = &instrument.name;
        if !instrument.description.is_empty() {
            let _ = writeln!(out, "# HELP {name} {}", escape_help(&instrument.description));
        }
        match &instrument.data {
            InstrumentData::Counter(series) => {
                let _ = writeln!(out, "# TYPE {name} counter");
                for (labels, value) in series {
                    let _ = writeln!(out, "{name}{labels} {value}");
                }
            }
            InstrumentData::Histogram(series) => {
                let _ = writeln!(out, "# TYPE {name} histogram");
                for (labels, histogram) in series {
                    for (bound, count) in &histogram.buckets {
                        let le = if bound.is_infinite() {
                            "+Inf".to_string()
                        } else {
                            bound.to_string()
                        };
                        let bucket_labels = labels.clone().with("le", le);
                        let _ = writeln!(out, "{name}_bucket{bucket_labels} {count}");
                    }
                    let _ = writeln!(out, "{name}_sum{labels} {}", histogram.sum);
                    let _ = writeln!(out, "{name}_count{labels} {}", histogram.count);
                }
            }
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

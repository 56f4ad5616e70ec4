use std::path::PathBuf;

use clap::Args;

/// Ledger settings. Each flag falls back to a `TURFSLOT_*` environment variable.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Directory holding the booking journal
    #[arg(long, env = "TURFSLOT_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "TURFSLOT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Journal appends after which the compactor rewrites the journal
    #[arg(long, env = "TURFSLOT_COMPACT_THRESHOLD", default_value_t = 1000)]
    pub compact_threshold: u64,
}

impl Config {
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("bookings.journal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn flags_override_defaults() {
        let h = Harness::try_parse_from([
            "turfslot",
            "--data-dir",
            "/var/lib/turfslot",
            "--metrics-port",
            "9100",
            "--compact-threshold",
            "50",
        ])
        .unwrap();
        assert_eq!(h.config.data_dir, PathBuf::from("/var/lib/turfslot"));
        assert_eq!(h.config.metrics_port, Some(9100));
        assert_eq!(h.config.compact_threshold, 50);
        assert_eq!(
            h.config.journal_path(),
            PathBuf::from("/var/lib/turfslot/bookings.journal")
        );
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Harness::try_parse_from(["turfslot", "--metrics-port", "http"]).is_err());
    }
}

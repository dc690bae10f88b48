#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("metrics recorder already installed")]
    AlreadyInstalled,
    /// Building or installing the Prometheus recorder failed, usually
    /// because a global recorder is already installed.
    #[cfg(feature = "prometheus")]
    #[error("prometheus recorder: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

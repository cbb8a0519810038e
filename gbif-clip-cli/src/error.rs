//! Error types emitted by the GBIF clip CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use gbif_clip_core::PipelineError;
use gbif_clip_data::ProviderBuildError;
use thiserror::Error;

/// Errors emitted by the GBIF clip CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without dashes.
        field: &'static str,
        /// Environment variable that also sets the option.
        env: &'static str,
    },
    /// An option holds a value outside its accepted range.
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        /// Flag name without dashes.
        field: &'static str,
        /// What is wrong with the value.
        reason: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag name without dashes.
        field: &'static str,
        /// Rejected path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag name without dashes.
        field: &'static str,
        /// Rejected path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name without dashes.
        field: &'static str,
        /// Path being inspected.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory {
        /// Rejected path.
        path: Utf8PathBuf,
    },
    /// The output directory could not be created or opened.
    #[error("failed to open output directory {path:?}: {source}")]
    OpenOutputDirectory {
        /// Output root.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Reading a GeoJSON layer failed.
    #[error("failed to read layer {path:?}: {source}")]
    ReadLayer {
        /// Layer file.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// A GeoJSON layer could not be decoded.
    #[error("failed to parse GeoJSON layer {path:?}: {source}")]
    ParseLayer {
        /// Layer file.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: Box<geojson::Error>,
    },
    /// Constructing the occurrence source failed.
    #[error("failed to build occurrence source for {base_url:?}: {source}")]
    BuildOccurrenceSource {
        /// Configured search endpoint.
        base_url: String,
        /// Construction failure.
        #[source]
        source: ProviderBuildError,
    },
    /// The fetch-and-clip run failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The interrupt listener could not be started.
    #[error("failed to install the interrupt handler: {0}")]
    InterruptHandler(#[source] std::io::Error),
    /// Writing the run summary failed.
    #[error("failed to write summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}

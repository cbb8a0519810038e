//! Fetch command implementation for the GBIF clip CLI.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use gbif_clip_core::{
    CancelFlag, FetchConfig, MAX_RECORDS, OccurrencePipeline, PipelineConfig, PipelineOutcome,
    ProgressChannels, SweepStatus,
};
use gbif_clip_data::{HttpOccurrenceSource, HttpOccurrenceSourceConfig};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::fs::file_is_file;
use crate::interrupt::cancel_on_interrupt;
use crate::layers::FileSelection;
use crate::progress::LogProgress;
use crate::registry::DirectoryLayerRegistry;
use crate::{
    ARG_BASE_URL, ARG_EXTENT, ARG_MAX_RECORDS, ARG_OUTPUT_DIR, ARG_OVERLAY,
    ARG_REGISTER_FETCH_LAYER, ARG_TIMEOUT_SECS, CliError, ENV_EXTENT, ENV_OVERLAY,
};

/// CLI arguments for the `fetch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Query GBIF for occurrences inside the bounding box of an \
                 extent polygon, then keep the points that fall inside an \
                 overlay polygon layer. Inputs are GeoJSON files; results \
                 are written as GeoJSON layers in a fresh group directory.",
    about = "Fetch GBIF occurrences and clip them to a polygon layer"
)]
#[ortho_config(prefix = "GBIF_CLIP")]
pub(crate) struct FetchArgs {
    /// GeoJSON file whose bounding box defines the query.
    #[arg(long = ARG_EXTENT, value_name = "geojson")]
    #[serde(default)]
    pub(crate) extent: Option<Utf8PathBuf>,
    /// GeoJSON polygon layer the occurrences are clipped against.
    #[arg(long = ARG_OVERLAY, value_name = "geojson")]
    #[serde(default)]
    pub(crate) overlay: Option<Utf8PathBuf>,
    /// Directory receiving the result group (defaults to `.`).
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// Occurrence search endpoint.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Upper bound on the number of records fetched.
    #[arg(long = ARG_MAX_RECORDS, value_name = "n")]
    #[serde(default)]
    pub(crate) max_records: Option<u64>,
    /// Per-request timeout in seconds. Requests wait indefinitely when unset.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Also write the unclipped fetch result.
    #[arg(long = ARG_REGISTER_FETCH_LAYER)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) register_fetch_layer: bool,
}

impl FetchArgs {
    pub(crate) fn into_config(self) -> Result<FetchCommandConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FetchCommandConfig::try_from(merged)
    }
}

/// Resolved `fetch` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchCommandConfig {
    /// Extent layer file.
    pub(crate) extent: Utf8PathBuf,
    /// Overlay layer file.
    pub(crate) overlay: Utf8PathBuf,
    /// Output root.
    pub(crate) output_dir: Utf8PathBuf,
    /// Occurrence search endpoint.
    pub(crate) base_url: String,
    /// Safety cap on the record count.
    pub(crate) max_records: u64,
    /// Per-request timeout.
    pub(crate) timeout: Option<Duration>,
    /// Whether the unclipped fetch result is written too.
    pub(crate) register_fetch_layer: bool,
}

impl FetchCommandConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.extent, ARG_EXTENT)?;
        Self::require_existing(&self.overlay, ARG_OVERLAY)?;
        if self.output_dir.file_name().is_some() && matches!(file_is_file(&self.output_dir), Ok(true))
        {
            return Err(CliError::OutputDirectoryNotDirectory {
                path: self.output_dir.clone(),
            });
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn source_config(&self) -> HttpOccurrenceSourceConfig {
        let mut config = HttpOccurrenceSourceConfig::new(self.base_url.clone());
        config.timeout = self.timeout;
        config
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fetch: FetchConfig::default().with_max_records(self.max_records),
            register_fetch_layer: self.register_fetch_layer,
            ..PipelineConfig::default()
        }
    }
}

impl TryFrom<FetchArgs> for FetchCommandConfig {
    type Error = CliError;

    fn try_from(args: FetchArgs) -> Result<Self, Self::Error> {
        let extent = args.extent.ok_or(CliError::MissingArgument {
            field: ARG_EXTENT,
            env: ENV_EXTENT,
        })?;
        let overlay = args.overlay.ok_or(CliError::MissingArgument {
            field: ARG_OVERLAY,
            env: ENV_OVERLAY,
        })?;
        let max_records = match args.max_records {
            Some(0) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_MAX_RECORDS,
                    reason: "must be greater than zero",
                });
            }
            Some(limit) => limit,
            None => MAX_RECORDS,
        };
        let timeout = match args.timeout_secs {
            Some(0) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_TIMEOUT_SECS,
                    reason: "must be greater than zero",
                });
            }
            secs => secs.map(Duration::from_secs),
        };
        let output_dir = args.output_dir.unwrap_or_else(|| Utf8PathBuf::from("."));
        let base_url = args
            .base_url
            .unwrap_or_else(|| HttpOccurrenceSourceConfig::default().base_url);

        Ok(Self {
            extent,
            overlay,
            output_dir,
            base_url,
            max_records,
            timeout,
            register_fetch_layer: args.register_fetch_layer,
        })
    }
}

/// What a finished `fetch` invocation produced.
#[derive(Debug)]
pub(crate) struct FetchRun {
    /// How the pipeline ended.
    pub(crate) outcome: PipelineOutcome,
    /// Layer files written, in registration order.
    pub(crate) written: Vec<Utf8PathBuf>,
}

pub(super) fn run_fetch(args: FetchArgs) -> Result<(), CliError> {
    let cancel = CancelFlag::default();
    cancel_on_interrupt(cancel.clone())?;
    let mut stdout = std::io::stdout().lock();
    run_fetch_with(args, &cancel, &mut stdout)
}

pub(super) fn run_fetch_with(
    args: FetchArgs,
    cancel: &CancelFlag,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = resolve_fetch_config(args)?;
    let run = execute_fetch(&config, cancel)?;
    write_summary(writer, &run)
}

pub(super) fn resolve_fetch_config(args: FetchArgs) -> Result<FetchCommandConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Run the pipeline for a validated configuration.
pub(super) fn execute_fetch(
    config: &FetchCommandConfig,
    cancel: &CancelFlag,
) -> Result<FetchRun, CliError> {
    let mut selection = FileSelection::read(&config.extent, &config.overlay)?;
    let source = HttpOccurrenceSource::with_config(config.source_config()).map_err(|source| {
        CliError::BuildOccurrenceSource {
            base_url: config.base_url.clone(),
            source,
        }
    })?;
    let mut registry = DirectoryLayerRegistry::open(&config.output_dir)?;
    let pipeline = OccurrencePipeline::new(source, config.pipeline_config());
    let mut fetch_progress = LogProgress::new(cancel.clone());
    let mut clip_progress = LogProgress::new(cancel.clone());

    let outcome = pipeline.run_with_selection(
        &mut selection,
        &mut registry,
        ProgressChannels {
            fetch: &mut fetch_progress,
            clip: &mut clip_progress,
        },
    )?;
    Ok(FetchRun {
        outcome,
        written: registry.written().to_vec(),
    })
}

/// Human-readable lines describing `run`.
pub(super) fn summary_lines(run: &FetchRun) -> Vec<String> {
    let mut lines = Vec::new();
    match &run.outcome {
        PipelineOutcome::FetchCancelled => {
            lines.push("fetch cancelled; no layers written".to_owned());
        }
        PipelineOutcome::Completed(report) => {
            if report.fetched == 0 {
                lines.push("no GBIF occurrences found inside the extent".to_owned());
            } else if report.is_empty() {
                lines.push(format!(
                    "none of the {} fetched GBIF occurrences fall inside the overlay",
                    report.fetched
                ));
            } else {
                lines.push(format!(
                    "{} of {} GBIF occurrences fall inside the overlay",
                    report.clipped, report.fetched
                ));
            }
            if let SweepStatus::Cancelled { visited } = report.sweep {
                lines.push(format!(
                    "clip progress cancelled after {visited} features; layer {} was kept",
                    report.clip_layer
                ));
            }
            lines.extend(run.written.iter().map(|path| format!("wrote {path}")));
        }
    }
    lines
}

fn write_summary(writer: &mut dyn Write, run: &FetchRun) -> Result<(), CliError> {
    for line in summary_lines(run) {
        writeln!(writer, "{line}").map_err(CliError::WriteSummary)?;
    }
    Ok(())
}

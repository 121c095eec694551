//! CLI for hlsdl.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hlsdl_core::config::{self, AssembleMode, HlsdlConfig};
use std::path::{Path, PathBuf};

use commands::{run_fetch, run_merge, run_remux, FetchArgs};

/// Top-level CLI for hlsdl.
#[derive(Debug, Parser)]
#[command(name = "hlsdl")]
#[command(about = "hlsdl: concurrent HLS segment downloader and assembler", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/hlsdl/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// How the fetched segments become the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Concat,
    Remux,
    Both,
}

impl From<ModeArg> for AssembleMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Concat => AssembleMode::Concat,
            ModeArg::Remux => AssembleMode::Remux,
            ModeArg::Both => AssembleMode::Both,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every segment of one or more media playlists and assemble each.
    Fetch {
        /// Media playlist (.m3u8) URLs; one job per URL.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Job i stores its segments in <PREFIX>_<i>.
        #[arg(long, default_value = "output_segments", value_name = "PREFIX")]
        output_dir_prefix: String,
        /// Job i writes <NAME>_<i>.<EXT> inside its segment directory.
        #[arg(long, default_value = "output_video", value_name = "NAME")]
        output_name_prefix: String,
        #[arg(long, default_value = "mp4")]
        ext: String,
        /// Concurrent segment downloads per job (overrides config).
        #[arg(long, value_name = "N")]
        max_concurrency: Option<usize>,
        /// Concurrent jobs (overrides config).
        #[arg(long, value_name = "N")]
        batch_concurrency: Option<usize>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// ffmpeg binary for remuxing (overrides config and PATH lookup).
        #[arg(long, value_name = "PATH")]
        ffmpeg: Option<PathBuf>,
    },

    /// Concatenate the index<N>.ts files of a directory into one file.
    Merge {
        dir: PathBuf,
        output: PathBuf,
    },

    /// Remux the index<N>.ts files of a directory with ffmpeg (stream copy).
    Remux {
        dir: PathBuf,
        output: PathBuf,
        #[arg(long, value_name = "PATH")]
        ffmpeg: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<HlsdlConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                urls,
                output_dir_prefix,
                output_name_prefix,
                ext,
                max_concurrency,
                batch_concurrency,
                mode,
                ffmpeg,
            } => {
                let args = FetchArgs {
                    urls,
                    output_dir_prefix,
                    output_name_prefix,
                    ext,
                    max_concurrency,
                    batch_concurrency,
                    mode: mode.map(Into::into),
                    ffmpeg,
                };
                run_fetch(cfg, args).await?
            }
            CliCommand::Merge { dir, output } => run_merge(&dir, &output).await?,
            CliCommand::Remux {
                dir,
                output,
                ffmpeg,
            } => {
                let ffmpeg = ffmpeg.or(cfg.ffmpeg_path);
                run_remux(&dir, &output, ffmpeg.as_deref()).await?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

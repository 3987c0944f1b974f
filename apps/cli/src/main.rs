// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! geomark - geotagged images to georeferenced IFC markers

mod cli;
mod report;

use std::io::Write;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use geomark_export::ProjectTemplate;
use geomark_geo::{lookup, supported_ranges, CrsTransform};
use geomark_processing::{
    export_records, extract_folder, load_from_path, load_settings, load_url_map, remap_urls, run,
    save_to_path, PipelineConfig, Settings, StoreError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConfigArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command) -> Result<ExitCode> {
    match command {
        Command::Extract(args) => {
            let (mut config, _) = load_config(&args.config)?;
            args.scan.apply(&mut config);
            config.validate()?;

            let batch = extract_folder(&args.folder, &config)?;
            save_to_path(&batch.records, &args.output)
                .with_context(|| format!("writing {}", args.output.display()))?;
            print!("{}", report::batch(&batch.summary));
            println!(
                "Wrote {} ({} record(s))",
                args.output.display(),
                batch.records.len()
            );
        }
        Command::Export(args) => {
            let (mut config, mut template) = load_config(&args.config)?;
            args.ifc.apply(&mut config);
            config.validate()?;
            sync_template(&mut template, &config);

            let records = match load_from_path(&args.input) {
                Ok(records) => records,
                Err(StoreError::Validation { errors, valid }) => {
                    eprint!("{}", report::invalid_records(&errors));
                    if args.strict {
                        bail!(
                            "{} contains {} invalid record(s)",
                            args.input.display(),
                            errors.len()
                        );
                    }
                    warn!(valid = valid.len(), "Continuing with valid records");
                    valid
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("reading {}", args.input.display()))
                }
            };

            let result = export_records(&records, &template, &config, &args.output)?;
            print!("{}", report::export(&result));
        }
        Command::Run(args) => {
            let (mut config, mut template) = load_config(&args.config)?;
            args.scan.apply(&mut config);
            args.ifc.apply(&mut config);
            config.validate()?;
            sync_template(&mut template, &config);

            let outcome = run(
                &args.folder,
                args.json.as_deref(),
                &args.output,
                &template,
                &config,
            )?;
            print!("{}", report::batch(&outcome.batch));
            if let Some(json) = &outcome.json_path {
                println!(
                    "Wrote {} ({} record(s))",
                    json.display(),
                    outcome.records_written
                );
            }
            print!("{}", report::export(&outcome.export));
        }
        Command::Validate(args) => {
            let validation = geomark_core::validate_file(&args.input)
                .with_context(|| format!("reading {}", args.input.display()))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&validation)?);
            } else {
                print!("{}", report::validation(&validation));
            }
            if !validation.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Template(args) => {
            let json = Settings::template().to_json();
            match &args.output {
                Some(path) => {
                    geomark_export::write_string_atomic(path, &format!("{}\n", json))
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote settings template {}", path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{}", json)?;
                }
            }
        }
        Command::Epsg(args) => match lookup(args.code) {
            Ok(crs) => print!("{}", report::crs(crs.info())),
            Err(e) => {
                eprintln!("{}", e);
                eprintln!("Supported codes:");
                eprintln!("  4326 is the only accepted source CRS");
                for (first, last, name) in supported_ranges() {
                    if first == last {
                        eprintln!("  {:<13} {}", first, name);
                    } else {
                        eprintln!("  {:<13} {}", format!("{}-{}", first, last), name);
                    }
                }
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::RemapUrls(args) => {
            let mapping = load_url_map(&args.mapping)?;
            let mut records = load_from_path(&args.input)
                .with_context(|| format!("reading {}", args.input.display()))?;
            let updated = remap_urls(&mut records, &mapping);
            let output = args.output.as_deref().unwrap_or(&args.input);
            save_to_path(&records, output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "Updated {} of {} record(s); wrote {}",
                updated,
                records.len(),
                output.display()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Defaults, then the settings file, then `GEOMARK_*` variables, then flags
fn load_config(args: &ConfigArgs) -> Result<(PipelineConfig, ProjectTemplate)> {
    let mut config = PipelineConfig::default();
    let settings = args.settings.as_deref().map(load_settings).transpose()?;
    if let Some(settings) = &settings {
        config.apply_settings(settings);
    }
    config.apply_env(|key| std::env::var(key).ok())?;
    args.apply(&mut config);

    let template = settings.map(|s| s.to_template()).unwrap_or_default();
    if let Some(path) = &args.settings {
        info!(settings = %path.display(), project = %template.project_name, "Using project settings");
    }
    Ok((config, template))
}

fn sync_template(template: &mut ProjectTemplate, config: &PipelineConfig) {
    template.schema = config.schema;
    template.target_epsg = config.target_epsg;
}

//! Command handlers

use anyhow::{bail, Context, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

use cutdata::handbook::{BatchOutcome, KienzleCorrections, Severity};
use cutdata::report::QueryResult;
use cutdata::{
    parse_script, run_script, Catalog, EvaluatorConfig, Evaluated, Handbook, Operation,
    ParseError,
};

use super::{Cli, Commands, OutputFormat};

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let owned;
    let catalog: &Catalog = match &cli.catalog {
        Some(path) => {
            owned = Catalog::from_file(path)
                .with_context(|| format!("loading catalog {}", path.display()))?;
            &owned
        }
        None => Catalog::builtin().context("loading built-in catalog")?,
    };

    let config = match &cli.config {
        Some(path) => EvaluatorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EvaluatorConfig::default(),
    };

    let handbook = Handbook::new(catalog, config);
    let format = cli.format;

    match &cli.command {
        Commands::List { alloy } => cmd_list(&handbook, alloy.as_deref(), format),

        Commands::Show { material } => {
            let record = handbook.material(material)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
                OutputFormat::Table => {
                    println!("{} {} ({})", record.id, record.name, record.designation);
                    println!("  condition    {} {:.0} HRC", record.condition, record.hardness.rockwell_c);
                    println!(
                        "  kienzle      kc1.1 {:.0} N/mm², mc {:.2}",
                        record.kienzle.kc1_1, record.kienzle.mc
                    );
                    println!(
                        "  taylor       C {:.0}, n {:.2}, coolants: {}",
                        record.taylor.c,
                        record.taylor.n,
                        record.taylor.coolants().collect::<Vec<_>>().join(", ")
                    );
                    println!(
                        "  machinability {:.0}% ({})",
                        record.machinability.aisi_rating, record.machinability.difficulty_class
                    );
                    let stored: Vec<_> = record.recommendations.keys().map(Operation::as_str).collect();
                    println!("  stored envelopes: {}", if stored.is_empty() { "none".to_string() } else { stored.join(", ") });
                }
            }
            Ok(())
        }

        Commands::Force {
            material,
            chip,
            width,
            temp,
            speed,
            geometry,
        } => {
            let corrections = KienzleCorrections {
                geometry: *geometry,
                temperature_c: *temp,
                speed_m_min: *speed,
            };
            let kc = handbook.specific_cutting_force(material, *chip, &corrections)?;
            let result = match width {
                Some(width) => handbook
                    .cutting_force(material, *chip, *width, &corrections)?
                    .map(|force_n| QueryResult::CuttingForce {
                        kc_n_mm2: kc.value,
                        force_n,
                    }),
                None => kc.map(|kc_n_mm2| QueryResult::SpecificCuttingForce { kc_n_mm2 }),
            };
            emit(format, &result)
        }

        Commands::Stress {
            material,
            strain,
            rate,
            temp,
        } => {
            let result = handbook
                .flow_stress(material, *strain, *rate, *temp)?
                .map(|stress_mpa| QueryResult::FlowStress { stress_mpa });
            emit(format, &result)
        }

        Commands::Life {
            material,
            speed,
            depth,
            coolant,
        } => {
            let result = handbook
                .tool_life(material, *speed, *depth, coolant)?
                .map(|life_min| QueryResult::ToolLife { life_min });
            emit(format, &result)
        }

        Commands::Speed {
            material,
            life,
            depth,
            coolant,
        } => {
            let speed_m_min = handbook.speed_for_tool_life(material, *life, *depth, coolant)?;
            emit(format, &Evaluated::new(QueryResult::CuttingSpeed { speed_m_min }))
        }

        Commands::Recommend {
            material,
            operation,
        } => {
            let recommendation = handbook.recommend_named(material, operation)?;
            emit(format, &recommendation)
        }

        Commands::Batch { operation } => {
            let operation: Operation = operation.parse()?;
            cmd_batch(&handbook, operation, format)
        }

        Commands::Validate => cmd_validate(&handbook, format),

        Commands::Run { script } => cmd_run(&handbook, script, format),
    }
}

/// Print a model result with its warnings
fn emit<T: Serialize + Display>(format: OutputFormat, result: &Evaluated<T>) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Table => {
            println!("{}", result.value);
            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
        }
    }
    Ok(())
}

fn cmd_list(handbook: &Handbook<'_>, alloy: Option<&str>, format: OutputFormat) -> Result<()> {
    let materials: Vec<_> = handbook
        .catalog()
        .iter()
        .filter(|m| alloy.map_or(true, |a| m.alloy.eq_ignore_ascii_case(a)))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&materials)?),
        OutputFormat::Table => {
            println!(
                "{:<10} {:<6} {:<12} {:>5} {:>8} {:>8}  {}",
                "ID", "ALLOY", "CONDITION", "HRC", "KC1.1", "TAYLOR C", "CLASS"
            );
            for m in &materials {
                println!(
                    "{:<10} {:<6} {:<12} {:>5.0} {:>8.0} {:>8.0}  {}",
                    m.id,
                    m.alloy,
                    m.condition.to_string(),
                    m.hardness.rockwell_c,
                    m.kienzle.kc1_1,
                    m.taylor.c,
                    m.machinability.difficulty_class
                );
            }
        }
    }
    Ok(())
}

fn cmd_batch(handbook: &Handbook<'_>, operation: Operation, format: OutputFormat) -> Result<()> {
    let entries = handbook.recommend_batch(operation);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Table => {
            println!(
                "{:<10} {:<8} {:>24}  {:>24}",
                "ID",
                "SOURCE",
                "SPEED m/min",
                format!("FEED {}", operation.feed_unit())
            );
            for entry in &entries {
                match &entry.outcome {
                    BatchOutcome::Ok(rec) => {
                        let env = &rec.value.envelope;
                        println!(
                            "{:<10} {:<8} {:>7.1} {:>7.1} {:>7.1}  {:>7.3} {:>7.3} {:>7.3}",
                            entry.material_id,
                            rec.value.source.to_string(),
                            env.speed.min,
                            env.speed.optimal,
                            env.speed.max,
                            env.feed.min,
                            env.feed.optimal,
                            env.feed.max
                        );
                        for warning in &rec.warnings {
                            println!("           warning: {}", warning);
                        }
                    }
                    BatchOutcome::Error(message) => {
                        println!("{:<10} error: {}", entry.material_id, message);
                    }
                }
            }
        }
    }

    let failed = entries
        .iter()
        .filter(|e| matches!(e.outcome, BatchOutcome::Error(_)))
        .count();
    if failed > 0 {
        bail!("{} of {} materials failed", failed, entries.len());
    }
    Ok(())
}

fn cmd_validate(handbook: &Handbook<'_>, format: OutputFormat) -> Result<()> {
    let issues = handbook.validate_catalog();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
        OutputFormat::Table => {
            if issues.is_empty() {
                println!("{} materials, no issues", handbook.catalog().len());
            }
            for issue in &issues {
                println!("[{}] {} {}: {}", issue.severity, issue.material, issue.code, issue.message);
                if let Some(suggestion) = &issue.suggestion {
                    println!("    {}", suggestion);
                }
            }
        }
    }

    let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
    if errors > 0 {
        bail!("catalog has {} error(s)", errors);
    }
    Ok(())
}

fn cmd_run(handbook: &Handbook<'_>, path: &Path, format: OutputFormat) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;

    let script = match parse_script(&source) {
        Ok(script) => script,
        Err(errors) => {
            let name = path.display().to_string();
            render_parse_errors(&name, &source, &errors)?;
            bail!("{} syntax error(s) in {}", errors.len(), name);
        }
    };

    let report = run_script(handbook, &script);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print!("{}", report),
    }

    if report.failed() > 0 {
        bail!("{} of {} statements failed", report.failed(), report.entries.len());
    }
    Ok(())
}

fn render_parse_errors(name: &str, source: &str, errors: &[ParseError]) -> Result<()> {
    for error in errors {
        let span = error.span();
        Report::build(ReportKind::Error, name, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((name, span))
                    .with_message(error.to_string())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((name, Source::from(source)))?;
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use rayon::prelude::*;

use gelim_core as core;
use core::config::{EliminationConfig, GeneratorOptions, RemovalPolicy};
use core::gelim::{ErrorKind, InconsistencyHandler, PedigreeModelGenerator};
use core::genetics::{Linkage, MarkerData, PedigreeGraph};

#[derive(Parser)]
#[command(name = "gelim")]
#[command(version)]
#[command(about = "Mendelian consistency checking of pedigree marker data by genotype elimination")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every marker of every pedigree for Mendelian inconsistencies
    Check {
        /// Path to the pedigree/genotype CSV
        /// (columns: [pedigree,] id, father, mother, [sex,] marker...)
        data: String,

        /// What elimination removes: "genotype" (default), "all" or "none"
        #[arg(long, default_value = "genotype")]
        removal: String,

        /// Track parent of origin for parental genotypes
        #[arg(long)]
        phased: bool,

        /// Skip collapsing absent alleles before elimination
        #[arg(long)]
        no_prior_remap: bool,

        /// Skip collapsing alleles made absent by elimination
        #[arg(long)]
        no_post_remap: bool,

        /// Markers on the X chromosome (repeatable)
        #[arg(long)]
        x_linked: Vec<String>,

        /// Markers on the Y chromosome (repeatable)
        #[arg(long)]
        y_linked: Vec<String>,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,

        /// Also list pedigrees and markers without inconsistencies
        #[arg(long)]
        all: bool,

        /// Dump valid pairs and child masks per family (needs RUST_LOG=trace)
        #[arg(long)]
        trace: bool,
    },
}

/// Everything the report needs, gathered after all markers are checked.
struct CheckReport<'a> {
    graph: &'a PedigreeGraph,
    markers: &'a MarkerData,
    errors: InconsistencyHandler,
    show_all: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            data,
            removal,
            phased,
            no_prior_remap,
            no_post_remap,
            x_linked,
            y_linked,
            format,
            all,
            trace,
        } => {
            let removal: RemovalPolicy = removal.parse().context("Invalid --removal value")?;
            let config = EliminationConfig::new()
                .removal(removal)
                .phased_parents(phased)
                .trace_families(trace);
            let options = GeneratorOptions::new()
                .prior_remap(!no_prior_remap)
                .post_remap(!no_post_remap);
            cmd_check(&data, config, options, &x_linked, &y_linked, &format, all)
        }
    }
}

fn cmd_check(
    data_path: &str,
    config: EliminationConfig,
    options: GeneratorOptions,
    x_linked: &[String],
    y_linked: &[String],
    output_format: &str,
    show_all: bool,
) -> Result<()> {
    let (graph, mut markers) = core::io::load_csv(data_path)
        .with_context(|| format!("Failed to load data from '{}'", data_path))?;

    eprintln!(
        "Loaded {} members in {} pedigrees ({} subpedigrees, {} nuclear families), {} markers from '{}'",
        graph.n_members(),
        graph.n_pedigrees(),
        graph.n_subpedigrees(),
        graph.n_families(),
        markers.marker_count(),
        data_path
    );

    set_linkage(&mut markers, x_linked, Linkage::XLinked)?;
    set_linkage(&mut markers, y_linked, Linkage::YLinked)?;

    let per_marker: Vec<InconsistencyHandler> = (0..markers.marker_count())
        .into_par_iter()
        .map(|marker| check_marker(&graph, &markers, marker, &options, &config))
        .collect::<Result<_>>()?;

    let mut errors = InconsistencyHandler::new();
    for handler in per_marker {
        errors.merge(handler);
    }

    eprintln!(
        "Checked {} markers: {} nuclear families with inconsistencies",
        markers.marker_count(),
        errors.incon_family_count()
    );

    let report = CheckReport {
        graph: &graph,
        markers: &markers,
        errors,
        show_all,
    };

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&report)?,
        "text" => print_text(&report),
        other => anyhow::bail!("Unknown format '{}'. Use 'text' (default) or 'json'.", other),
    }

    Ok(())
}

fn set_linkage(markers: &mut MarkerData, names: &[String], linkage: Linkage) -> Result<()> {
    for name in names {
        let index = markers
            .marker_index(name)
            .with_context(|| format!("Unknown marker '{}'", name))?;
        markers.set_linkage(index, linkage)?;
    }
    Ok(())
}

/// Build the model of one marker for every subpedigree.
fn check_marker(
    graph: &PedigreeGraph,
    markers: &MarkerData,
    marker: usize,
    options: &GeneratorOptions,
    config: &EliminationConfig,
) -> Result<InconsistencyHandler> {
    let mut generator =
        PedigreeModelGenerator::new(graph, markers, options.clone(), config.clone());

    for (sub, _) in graph.subpedigrees() {
        generator
            .build(sub, marker)
            .with_context(|| format!("Failed to build marker {} for subpedigree {}", marker, sub))?;
    }

    Ok(generator.take_errors())
}

fn marker_name(markers: &MarkerData, marker: usize) -> &str {
    markers.marker(marker).map_or("?", |m| m.name.as_str())
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::None => "-",
        ErrorKind::NuclearFamily => "family",
        ErrorKind::Mendelian => "mendelian",
        ErrorKind::XyLinked => "xy-linked",
    }
}

fn print_text(report: &CheckReport) {
    let graph = report.graph;
    let markers = report.markers;

    let mut families: Vec<_> = report.errors.families().collect();
    families.sort_by_key(|f| f.family);

    if !families.is_empty() {
        println!("Inconsistent nuclear families");
        println!("-----------------------------");
    }
    for fam in &families {
        let mother = fam.mother().member;
        let father = fam.father().member;
        println!(
            "Pedigree {}: mother {} x father {}",
            graph.pedigree_name(graph.member_pedigree(mother)),
            graph.member_id(mother),
            graph.member_id(father)
        );
        for marker in fam.markers() {
            let implicated: Vec<String> = fam
                .members
                .iter()
                .filter_map(|m| {
                    m.error(marker)
                        .map(|k| format!("{} ({})", graph.member_id(m.member), kind_label(k)))
                })
                .collect();
            println!("  {:<16} {}", marker_name(markers, marker), implicated.join(", "));
        }
    }
    if report.errors.has_sex_linked_errors() {
        println!("\n(xy-linked: a male with a heterozygous genotype at a sex-linked marker)");
    }

    println!("\n{:<16} {:>12} {:>12} {:>8}", "Pedigree", "Inconsistent", "Informative", "Total");
    for row in report.errors.pedigree_summaries(graph) {
        if row.inconsistent == 0 && !report.show_all {
            continue;
        }
        println!(
            "{:<16} {:>12} {:>12} {:>8}",
            row.pedigree, row.inconsistent, row.informative, row.total
        );
    }

    println!("\n{:<16} {:>12} {:>12} {:>8}", "Marker", "Inconsistent", "Informative", "Total");
    for row in report.errors.marker_summaries(markers.marker_count()) {
        if row.inconsistent == 0 && !report.show_all {
            continue;
        }
        println!(
            "{:<16} {:>12} {:>12} {:>8}",
            marker_name(markers, row.marker),
            row.inconsistent,
            row.informative,
            row.total
        );
    }
}

fn print_json(report: &CheckReport) -> Result<()> {
    let graph = report.graph;
    let markers = report.markers;
    let mut map = serde_json::Map::new();

    let mut families: Vec<_> = report.errors.families().collect();
    families.sort_by_key(|f| f.family);

    let fams: Vec<serde_json::Value> = families
        .iter()
        .map(|fam| {
            let mother = fam.mother().member;
            let records: Vec<serde_json::Value> = fam
                .markers()
                .into_iter()
                .map(|marker| {
                    let members: Vec<serde_json::Value> = fam
                        .members
                        .iter()
                        .filter_map(|m| {
                            m.error(marker).map(|k| {
                                serde_json::json!({
                                    "id": graph.member_id(m.member),
                                    "error": k,
                                })
                            })
                        })
                        .collect();
                    serde_json::json!({
                        "marker": marker_name(markers, marker),
                        "members": members,
                    })
                })
                .collect();
            serde_json::json!({
                "pedigree": graph.pedigree_name(graph.member_pedigree(mother)),
                "mother": graph.member_id(mother),
                "father": graph.member_id(fam.father().member),
                "markers": records,
            })
        })
        .collect();
    map.insert("families".to_string(), serde_json::json!(fams));

    let peds: Vec<_> = report
        .errors
        .pedigree_summaries(graph)
        .into_iter()
        .filter(|r| report.show_all || r.inconsistent > 0)
        .collect();
    map.insert("pedigrees".to_string(), serde_json::to_value(peds)?);

    let marks: Vec<serde_json::Value> = report
        .errors
        .marker_summaries(markers.marker_count())
        .into_iter()
        .filter(|r| report.show_all || r.inconsistent > 0)
        .map(|r| {
            serde_json::json!({
                "marker": marker_name(markers, r.marker),
                "inconsistent": r.inconsistent,
                "informative": r.informative,
                "total": r.total,
            })
        })
        .collect();
    map.insert("markers".to_string(), serde_json::json!(marks));
    map.insert(
        "sex_linked_errors".to_string(),
        serde_json::Value::Bool(report.errors.has_sex_linked_errors()),
    );

    let json_str = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
    println!("{}", json_str);
    Ok(())
}

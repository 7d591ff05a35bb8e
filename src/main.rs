use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use inspecta::analysis::{self, ClientConfig};
use inspecta::cli::{
    AnalyzeArgs, AnswerArgs, Command, CommentArgs, ExportArgs, HeaderArgs, NoteArgs, PhotoAddArgs,
    PhotoCommand, PhotoRmArgs, ResetArgs, RootArgs, ScoreArgs, StatusArgs,
};
use inspecta::photos::{PhotoStore, MAX_PHOTOS_PER_ITEM};
use inspecta::prompt::build_summary_input;
use inspecta::report::render_report;
use inspecta::schema;
use inspecta::scoring::{overall_score, section_scores};
use inspecta::store::{DataPaths, FormStore};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    let paths = resolve_data_paths(args.data_dir)?;

    match args.command {
        Command::Status(args) => cmd_status(paths, &args),
        Command::Answer(args) => cmd_answer(paths, &args),
        Command::Note(args) => cmd_note(paths, &args),
        Command::Header(args) => cmd_header(paths, &args),
        Command::Comment(args) => cmd_comment(paths, &args),
        Command::Photo(PhotoCommand::Add(args)) => cmd_photo_add(paths, &args),
        Command::Photo(PhotoCommand::Rm(args)) => cmd_photo_rm(paths, &args),
        Command::Score(args) => cmd_score(paths, &args),
        Command::Prompt => cmd_prompt(paths),
        Command::Analyze(args) => cmd_analyze(paths, &args),
        Command::Export(args) => cmd_export(paths, &args),
        Command::Reset(args) => cmd_reset(paths, &args),
    }
}

fn resolve_data_paths(override_dir: Option<std::path::PathBuf>) -> Result<DataPaths> {
    if let Some(dir) = override_dir {
        return Ok(DataPaths::new(dir));
    }
    let base = dirs::data_dir().ok_or_else(|| anyhow!("no platform data directory available"))?;
    Ok(DataPaths::new(base.join("inspecta")))
}

fn cmd_status(paths: DataPaths, args: &StatusArgs) -> Result<()> {
    let store = FormStore::open(paths);
    let snapshot = store.snapshot();
    let answered: usize = snapshot
        .answers
        .values()
        .filter(|answer| answer.status.is_some())
        .count();

    if args.json {
        let sections: Vec<serde_json::Value> = schema::sections()
            .iter()
            .map(|section| {
                let done = section
                    .items
                    .iter()
                    .filter(|item| {
                        snapshot
                            .answers
                            .get(item.id)
                            .and_then(|answer| answer.status)
                            .is_some()
                    })
                    .count();
                serde_json::json!({
                    "section_id": section.id,
                    "title": section.title,
                    "answered": done,
                    "total": section.items.len(),
                })
            })
            .collect();
        let value = serde_json::json!({
            "property": snapshot.header.property,
            "date": snapshot.header.date,
            "answered": answered,
            "total": schema::item_count(),
            "sections": sections,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "Inspection of {} on {} ({}/{} items answered)",
        display_or_unset(&snapshot.header.property),
        snapshot.header.date,
        answered,
        schema::item_count()
    );
    for section in schema::sections() {
        let done = section
            .items
            .iter()
            .filter(|item| {
                snapshot
                    .answers
                    .get(item.id)
                    .and_then(|answer| answer.status)
                    .is_some()
            })
            .count();
        println!("  {}: {}/{}", section.title, done, section.items.len());
    }
    Ok(())
}

fn cmd_answer(paths: DataPaths, args: &AnswerArgs) -> Result<()> {
    let mut store = FormStore::open(paths);
    let status = if args.clear {
        None
    } else {
        args.status.map(Into::into)
    };
    store.set_status(&args.item, status)?;
    store.flush().context("persist form snapshot")?;
    match status {
        Some(status) => println!("{}: {}", args.item, status.label()),
        None => println!("{}: cleared", args.item),
    }
    Ok(())
}

fn cmd_note(paths: DataPaths, args: &NoteArgs) -> Result<()> {
    let mut store = FormStore::open(paths);
    store.set_observation(&args.item, &args.text)?;
    store.flush().context("persist form snapshot")?;
    println!("{}: observation recorded", args.item);
    Ok(())
}

fn cmd_header(paths: DataPaths, args: &HeaderArgs) -> Result<()> {
    let mut store = FormStore::open(paths);
    store.edit_header(|header| {
        if let Some(date) = &args.date {
            header.date = date.clone();
        }
        if let Some(auditor) = &args.auditor {
            header.auditor = auditor.clone();
        }
        if let Some(email) = &args.auditor_email {
            header.auditor_email = email.clone();
        }
        if let Some(manager) = &args.manager {
            header.manager = manager.clone();
        }
        if let Some(email) = &args.manager_email {
            header.manager_email = email.clone();
        }
        if let Some(property) = &args.property {
            header.property = property.clone();
        }
    });
    store.flush().context("persist form snapshot")?;
    println!("header updated");
    Ok(())
}

fn cmd_comment(paths: DataPaths, args: &CommentArgs) -> Result<()> {
    let mut store = FormStore::open(paths);
    store.set_comments(&args.text);
    store.flush().context("persist form snapshot")?;
    println!("closing comments updated");
    Ok(())
}

fn cmd_photo_add(paths: DataPaths, args: &PhotoAddArgs) -> Result<()> {
    let photos = PhotoStore::new(paths.photos_dir());
    let mut store = FormStore::open(paths);
    if store.photo_count(&args.item) >= MAX_PHOTOS_PER_ITEM {
        return Err(anyhow!(
            "item {} already has {MAX_PHOTOS_PER_ITEM} photos",
            args.item
        ));
    }
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let key = photos.put(&args.item, &bytes)?;
    store.push_photo_ref(&args.item, &key)?;
    store.flush().context("persist form snapshot")?;
    println!("{key}");
    Ok(())
}

fn cmd_photo_rm(paths: DataPaths, args: &PhotoRmArgs) -> Result<()> {
    let photos = PhotoStore::new(paths.photos_dir());
    let mut store = FormStore::open(paths);
    if !store.remove_photo_ref(&args.item, &args.key)? {
        return Err(anyhow!("no photo {} on item {}", args.key, args.item));
    }
    photos.delete(&args.key)?;
    store.flush().context("persist form snapshot")?;
    println!("removed {}", args.key);
    Ok(())
}

fn cmd_score(paths: DataPaths, args: &ScoreArgs) -> Result<()> {
    let store = FormStore::open(paths);
    let scores = section_scores(store.snapshot(), schema::sections());
    let overall = overall_score(store.snapshot(), schema::sections());

    if args.json {
        let value = serde_json::json!({ "sections": scores, "overall": overall });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for score in &scores {
        println!(
            "{}: {}% ({} compliant, {} non-compliant, {} N/A, {} unanswered)",
            score.section_title,
            score.percent,
            score.compliant,
            score.non_compliant,
            score.not_applicable,
            score.total - score.compliant - score.non_compliant - score.not_applicable
        );
    }
    println!("Overall: {overall}%");
    Ok(())
}

fn cmd_prompt(paths: DataPaths) -> Result<()> {
    let store = FormStore::open(paths);
    print!("{}", build_summary_input(store.snapshot(), schema::sections()));
    Ok(())
}

fn cmd_analyze(paths: DataPaths, args: &AnalyzeArgs) -> Result<()> {
    let store = FormStore::open(paths);
    let prompt = build_summary_input(store.snapshot(), schema::sections());
    let overall = overall_score(store.snapshot(), schema::sections());

    let config = ClientConfig::from_env()?;
    let result = analysis::request_analysis(&config, &prompt)?;
    if !result.matches_local_score(overall) {
        tracing::warn!(
            local = overall,
            reported = result.compliance_percent,
            "AI compliance percentage disagrees with the local score; the local score is authoritative"
        );
    }
    analysis::write_analysis(&store.paths().analysis_path(), &result)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    println!("Risk level: {}", result.risk_level.label());
    println!();
    println!("{}", result.executive_summary);
    if !result.critical_findings.is_empty() {
        println!();
        println!("Critical findings:");
        for finding in &result.critical_findings {
            println!("  - {finding}");
        }
    }
    if !result.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for (idx, recommendation) in result.recommendations.iter().enumerate() {
            println!("  {}. {recommendation}", idx + 1);
        }
    }
    Ok(())
}

fn cmd_export(paths: DataPaths, args: &ExportArgs) -> Result<()> {
    let store = FormStore::open(paths);
    let scores = section_scores(store.snapshot(), schema::sections());
    let overall = overall_score(store.snapshot(), schema::sections());
    let stored_analysis = analysis::load_analysis(&store.paths().analysis_path())?;
    let rendered = render_report(
        store.snapshot(),
        schema::sections(),
        &scores,
        overall,
        stored_analysis.as_ref(),
    );

    match &args.out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("write {}", path.display()))?;
            println!("wrote report to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_reset(paths: DataPaths, args: &ResetArgs) -> Result<()> {
    if !args.force {
        return Err(anyhow!(
            "reset discards the inspection and its photos; pass --force to confirm"
        ));
    }
    let photos = PhotoStore::new(paths.photos_dir());
    let mut store = FormStore::open(paths);
    store.reset(&photos)?;
    println!("inspection reset");
    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "<unset>"
    } else {
        value
    }
}

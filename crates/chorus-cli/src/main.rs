use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chorus_contracts::events::EventWriter;
use chorus_contracts::metaphor::{
    export_framework_report, Framework, FrameworkRegistry, LoadMode, TemplateId,
};
use chorus_contracts::metrics::{export_analysis, MetricsCalculator, Vocabularies};
use chorus_contracts::social::{
    publish, react, DryrunDriver, MentionMonitor, Reaction, SocialSelectors,
};
use chorus_engine::{FusionEngine, DEFAULT_MAX_CHARS};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "chorus-rs", version, about = "Two-voice text fusion and metaphor toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score three texts and export a fusion report.
    Analyze(AnalyzeArgs),
    /// Generate both voices and their synthesis for a prompt.
    Fuse(FuseArgs),
    /// Render a concept through a metaphor framework.
    Apply(ApplyArgs),
    /// Pick the framework whose mappings best match a text.
    Suggest(SuggestArgs),
    /// List, save or extend framework documents.
    #[command(subcommand)]
    Frameworks(FrameworksCommand),
    /// Post text through the dryrun browser driver.
    Publish(PublishArgs),
    /// Like, reply to or repost a post through the dryrun browser driver.
    React(ReactArgs),
    /// Read unseen mentions through the dryrun browser driver.
    Mentions(SocialArgs),
}

#[derive(Debug, Subcommand)]
enum FrameworksCommand {
    List(FrameworkSourceArgs),
    Save(FrameworksSaveArgs),
    Add(FrameworksAddArgs),
    Report(FrameworksReportArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    /// First voice text, or `@path` to read it from a file.
    #[arg(long)]
    first: String,
    #[arg(long)]
    second: String,
    #[arg(long)]
    fused: String,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,
    #[arg(long)]
    vocab: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct FuseArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, default_value = "dryrun-text-1")]
    first_model: String,
    #[arg(long, default_value = "dryrun-text-1")]
    second_model: String,
    #[arg(long)]
    fusion_model: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
    max_chars: usize,
    #[arg(long)]
    vocab: Option<PathBuf>,
    #[command(flatten)]
    source: FrameworkSourceArgs,
    /// Also render the fused text through the best matching framework.
    #[arg(long)]
    apply_suggested: bool,
}

#[derive(Debug, Clone, Parser)]
struct FrameworkSourceArgs {
    /// Framework document to load on top of the built-ins.
    #[arg(long)]
    frameworks: Option<PathBuf>,
    /// Drop the built-ins and keep only the loaded document.
    #[arg(long, requires = "frameworks")]
    replace: bool,
}

#[derive(Debug, Parser)]
struct ApplyArgs {
    #[arg(long)]
    framework: String,
    #[arg(long)]
    concept: String,
    #[command(flatten)]
    source: FrameworkSourceArgs,
}

#[derive(Debug, Parser)]
struct SuggestArgs {
    #[arg(long)]
    text: String,
    #[command(flatten)]
    source: FrameworkSourceArgs,
}

#[derive(Debug, Parser)]
struct FrameworksSaveArgs {
    #[arg(long)]
    out: PathBuf,
    #[command(flatten)]
    source: FrameworkSourceArgs,
}

#[derive(Debug, Parser)]
struct FrameworksAddArgs {
    /// Document to update; created with the built-ins when missing.
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    name: String,
    #[arg(long)]
    core_metaphor: String,
    /// `element=meaning`, repeatable.
    #[arg(long = "mapping", required = true)]
    mappings: Vec<String>,
    #[arg(long, default_value = "")]
    example: String,
    /// garden, fire, deep or generic.
    #[arg(long)]
    template: Option<String>,
}

#[derive(Debug, Parser)]
struct FrameworksReportArgs {
    #[arg(long)]
    framework: String,
    /// Concept to check against the framework, repeatable.
    #[arg(long = "concept")]
    concepts: Vec<String>,
    #[arg(long)]
    out: PathBuf,
    #[command(flatten)]
    source: FrameworkSourceArgs,
}

#[derive(Debug, Clone, Parser)]
struct SocialArgs {
    /// Directory receiving `events.jsonl`.
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    selectors: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct PublishArgs {
    /// Post text, or `@path` to read it from a file.
    #[arg(long)]
    text: String,
    #[command(flatten)]
    social: SocialArgs,
    #[arg(long)]
    screenshot: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ReactArgs {
    #[arg(long)]
    url: String,
    #[arg(long, conflicts_with_all = ["reply", "repost"])]
    like: bool,
    /// Reply text, or `@path`.
    #[arg(long, conflicts_with = "repost")]
    reply: Option<String>,
    #[arg(long)]
    repost: bool,
    /// Quote text for `--repost`.
    #[arg(long, requires = "repost")]
    quote: Option<String>,
    #[command(flatten)]
    social: SocialArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("chorus-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Fuse(args) => run_fuse(args),
        Command::Apply(args) => run_apply(args),
        Command::Suggest(args) => run_suggest(args),
        Command::Frameworks(FrameworksCommand::List(args)) => run_frameworks_list(args),
        Command::Frameworks(FrameworksCommand::Save(args)) => run_frameworks_save(args),
        Command::Frameworks(FrameworksCommand::Add(args)) => run_frameworks_add(args),
        Command::Frameworks(FrameworksCommand::Report(args)) => run_frameworks_report(args),
        Command::Publish(args) => run_publish(args),
        Command::React(args) => run_react(args),
        Command::Mentions(args) => run_mentions(args),
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let calculator = MetricsCalculator::new(load_vocabularies(args.vocab.as_deref())?);
    let analysis = calculator.analyze_fusion(
        &read_text_arg(&args.first)?,
        &read_text_arg(&args.second)?,
        &read_text_arg(&args.fused)?,
    );
    let report_path = export_analysis(&analysis, args.out.as_deref(), &args.report_dir)?;
    println!("{}", serde_json::to_string_pretty(&analysis.ratios)?);
    println!("Report saved to {}", report_path.display());
    Ok(0)
}

fn run_fuse(args: FuseArgs) -> Result<i32> {
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let mut engine = FusionEngine::new(
        &args.out,
        &events_path,
        Some(args.first_model.clone()),
        Some(args.second_model.clone()),
        args.fusion_model.clone(),
    )?
    .with_vocabularies(load_vocabularies(args.vocab.as_deref())?)
    .with_frameworks(load_registry(&args.source)?);

    let result = fuse_and_print(&mut engine, &args);
    engine.finish()?;
    result?;
    Ok(0)
}

fn fuse_and_print(engine: &mut FusionEngine, args: &FuseArgs) -> Result<()> {
    let outcome = engine.fuse(&args.prompt, args.max_chars)?;
    println!("Session {}", engine.session_id());
    println!();
    println!("[{}] {}", outcome.first.model, outcome.first.text);
    println!();
    println!("[{}] {}", outcome.second.model, outcome.second.text);
    println!();
    println!("Fused: {}", outcome.fused.text);
    println!("{}", serde_json::to_string_pretty(&outcome.analysis.ratios)?);
    println!("Report saved to {}", outcome.report_path.display());

    if args.apply_suggested {
        match engine.suggest_framework(&outcome.fused.text)? {
            Some(key) => {
                println!();
                println!("{}", engine.apply_framework(&key, &outcome.fused.text)?);
            }
            None => println!("No framework matched the fused text."),
        }
    }
    Ok(())
}

fn run_apply(args: ApplyArgs) -> Result<i32> {
    let registry = load_registry(&args.source)?;
    println!("{}", registry.apply(&args.framework, &args.concept)?);
    Ok(0)
}

fn run_suggest(args: SuggestArgs) -> Result<i32> {
    let registry = load_registry(&args.source)?;
    match registry.suggest(&args.text) {
        Some(key) => {
            println!("{key}");
            Ok(0)
        }
        None => {
            eprintln!("No framework matched.");
            Ok(2)
        }
    }
}

fn run_frameworks_list(args: FrameworkSourceArgs) -> Result<i32> {
    let registry = load_registry(&args)?;
    for (key, framework) in registry.iter() {
        println!("{key}: {} ({})", framework.name, framework.core_metaphor);
    }
    Ok(0)
}

fn run_frameworks_save(args: FrameworksSaveArgs) -> Result<i32> {
    let registry = load_registry(&args.source)?;
    registry.save(&args.out)?;
    println!("Saved {} frameworks to {}", registry.len(), args.out.display());
    Ok(0)
}

fn run_frameworks_add(args: FrameworksAddArgs) -> Result<i32> {
    let mut registry = if args.file.exists() {
        FrameworkRegistry::load(&args.file, LoadMode::Replace)?
    } else {
        FrameworkRegistry::new()
    };
    let framework = build_framework(&args)?;
    let key = framework.key();
    registry.add(framework);
    registry.save(&args.file)?;
    println!("Added '{key}' to {}", args.file.display());
    Ok(0)
}

fn run_frameworks_report(args: FrameworksReportArgs) -> Result<i32> {
    let registry = load_registry(&args.source)?;
    let Some(framework) = registry.get(&args.framework) else {
        bail!("Framework '{}' not found", args.framework);
    };
    let path = export_framework_report(framework, &args.concepts, &args.out)?;
    println!("Framework report saved to {}", path.display());
    Ok(0)
}

fn build_framework(args: &FrameworksAddArgs) -> Result<Framework> {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for raw in &args.mappings {
        let Some((element, meaning)) = raw.split_once('=') else {
            bail!("mapping '{raw}' must look like element=meaning");
        };
        let (element, meaning) = (element.trim(), meaning.trim());
        if element.is_empty() || meaning.is_empty() {
            bail!("mapping '{raw}' has an empty element or meaning");
        }
        pairs.push((element, meaning));
    }
    let mut framework = Framework::new(
        args.name.trim(),
        args.core_metaphor.trim(),
        &pairs,
        args.example.trim(),
    );
    if let Some(template) = args.template.as_deref() {
        framework = framework.with_template(parse_template(template)?);
    }
    Ok(framework)
}

fn parse_template(raw: &str) -> Result<TemplateId> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase())).with_context(|| {
        format!("unknown template '{raw}' (expected garden, fire, deep or generic)")
    })
}

fn run_publish(args: PublishArgs) -> Result<i32> {
    let text = read_text_arg(&args.text)?;
    let (selectors, events) = social_session(&args.social)?;
    let mut driver = DryrunDriver::new(events.clone());

    let receipt = publish(&mut driver, &selectors, &text, args.screenshot.as_deref())?;
    events.emit_json("post_published", serde_json::to_value(&receipt)?)?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(0)
}

fn run_react(args: ReactArgs) -> Result<i32> {
    let reaction = reaction_from_args(&args)?;
    let (selectors, events) = social_session(&args.social)?;
    let mut driver = DryrunDriver::new(events.clone());

    let receipt = react(&mut driver, &selectors, &args.url, &reaction)?;
    events.emit_json("post_reacted", serde_json::to_value(&receipt)?)?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(0)
}

fn reaction_from_args(args: &ReactArgs) -> Result<Reaction> {
    if args.like {
        return Ok(Reaction::Like);
    }
    if let Some(reply) = args.reply.as_deref() {
        return Ok(Reaction::Reply {
            text: read_text_arg(reply)?,
        });
    }
    if args.repost {
        return Ok(Reaction::Repost {
            quote: args.quote.as_deref().map(read_text_arg).transpose()?,
        });
    }
    bail!("choose one of --like, --reply or --repost")
}

fn run_mentions(args: SocialArgs) -> Result<i32> {
    let (selectors, events) = social_session(&args)?;
    let mut driver = DryrunDriver::new(events.clone());
    let mentions = MentionMonitor::new().poll(&mut driver, &selectors)?;
    events.emit_json("mentions_polled", serde_json::json!({ "count": mentions.len() }))?;
    for mention in &mentions {
        println!("{mention}");
    }
    Ok(0)
}

fn social_session(args: &SocialArgs) -> Result<(SocialSelectors, EventWriter)> {
    let selectors = match args.selectors.as_deref() {
        Some(path) => SocialSelectors::load(path)?,
        None => SocialSelectors::default(),
    };
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed creating {}", args.out.display()))?;
    let events = EventWriter::new(args.out.join("events.jsonl"), session_label(&args.out));
    Ok((selectors, events))
}

fn load_registry(source: &FrameworkSourceArgs) -> Result<FrameworkRegistry> {
    match source.frameworks.as_deref() {
        Some(path) => {
            let mode = if source.replace {
                LoadMode::Replace
            } else {
                LoadMode::Overlay
            };
            FrameworkRegistry::load(path, mode)
        }
        None => Ok(FrameworkRegistry::new()),
    }
}

fn load_vocabularies(path: Option<&Path>) -> Result<Vocabularies> {
    match path {
        Some(path) => Vocabularies::load(path),
        None => Ok(Vocabularies::default()),
    }
}

fn read_text_arg(raw: &str) -> Result<String> {
    match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed reading {path}")),
        None => Ok(raw.to_string()),
    }
}

fn session_label(dir: &Path) -> String {
    dir.file_name()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("session-rs")
        .to_string()
}

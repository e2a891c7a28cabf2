use anyhow::Context;
use bugscan::ScanEngine;
use bugscan::catalog::Catalog;
use bugscan::cli::{Args, Command, OutputFormat, ScanArgs};
use bugscan::config::{self, BugscanConfig};
use bugscan::diagnostics::Diagnostic;
use bugscan::fixer::{self, FixOptions, FixPolicy};
use bugscan::host;
use bugscan::level::SeverityLevel;
use bugscan::rule::RuleSettings;
use bugscan::unit::CompilationUnit;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

fn main() -> ExitCode {
    bugscan::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules()?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Scan(scan)) => scan_command(scan),
        None => scan_command(args.scan),
    }
}

fn list_rules() -> anyhow::Result<()> {
    let catalog = Catalog::default_rules()?;
    let mut rules: Vec<_> = catalog.descriptors().collect();
    rules.sort_by_key(|d| d.name);

    for d in rules {
        let fix_status = if d.fix.available {
            format!(" [fix: {}]", d.fix.safety.as_str())
        } else {
            String::new()
        };
        println!(
            "{}\t{}\t{}\t{}{}",
            d.name,
            d.category.as_str(),
            d.severity,
            d.summary,
            fix_status
        );
    }
    Ok(())
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let catalog = Catalog::default_rules()?;
    let Some(d) = catalog.find_descriptor(rule) else {
        anyhow::bail!("unknown rule: {rule}");
    };

    println!("name: {}", d.name);
    println!("category: {}", d.category.as_str());
    println!("severity: {}", d.severity);
    println!("summary: {}", d.summary);
    if d.fix.available {
        println!("fix: available ({})", d.fix.safety.as_str());
        if !d.fix.description.is_empty() {
            println!("fix description: {}", d.fix.description);
        }
    } else {
        println!("fix: not available");
    }
    if let Some(link) = d.link {
        println!("see: {link}");
    }
    Ok(())
}

fn scan_command(args: ScanArgs) -> anyhow::Result<ExitCode> {
    let start_dir = infer_start_dir(&args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;
    let cfg = loaded_cfg.map(|(_path, cfg)| cfg).unwrap_or_default();

    let all_rules = Catalog::default_rules()?;
    for name in args.only.iter().chain(&args.skip) {
        if all_rules.find_descriptor(name).is_none() {
            anyhow::bail!("unknown rule: {name}");
        }
    }
    let settings: RuleSettings = cfg.rule_settings().disable(args.skip.iter().cloned());
    let catalog = all_rules.filtered(&settings, &args.only);
    let engine = ScanEngine::new_with_settings(catalog, settings);

    let (units, parse_failures) = load_units(&args.paths)?;
    let findings = engine.scan_batch(&units);

    if args.fix {
        return fix_command(&engine, &args, &cfg, &units, &findings, parse_failures);
    }

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut suppressed = 0usize;
    for (unit, unit_findings) in units.iter().zip(&findings) {
        suppressed += engine.report(unit, unit_findings, &mut diagnostics).suppressed;
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diagnostics)?),
        OutputFormat::Pretty => {
            for diag in &diagnostics {
                println!("{}", diag.render());
            }
            println!(
                "{} diagnostics in {} files ({} suppressed)",
                diagnostics.len(),
                units.len(),
                suppressed
            );
        }
        OutputFormat::Github => {
            for diag in &diagnostics {
                let kind = if diag.severity == SeverityLevel::Error
                    || (args.deny_warnings && diag.severity == SeverityLevel::Warning)
                {
                    "error"
                } else {
                    "warning"
                };
                println!(
                    "::{} file={},line={},col={},title={}::{}",
                    kind,
                    github_escape(diag.file.as_deref().unwrap_or("stdin")),
                    diag.span.start.line,
                    diag.span.start.column,
                    diag.rule,
                    github_escape(&diag.message)
                );
            }
        }
    }

    let has_error = parse_failures > 0
        || diagnostics
            .iter()
            .any(|d| d.severity == SeverityLevel::Error);
    if has_error || (args.deny_warnings && !diagnostics.is_empty()) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Handle --fix mode: apply the non-conflicting subset of unsuppressed fixes
/// per file.
fn fix_command(
    engine: &ScanEngine,
    args: &ScanArgs,
    cfg: &BugscanConfig,
    units: &[CompilationUnit],
    findings: &[Vec<bugscan::diagnostics::Finding>],
    parse_failures: usize,
) -> anyhow::Result<ExitCode> {
    if args.write && args.paths.is_empty() {
        anyhow::bail!("--write requires file paths (stdin not supported)");
    }

    let options = FixOptions {
        policy: FixPolicy::NonConflicting,
        allow_unsafe: args.unsafe_fixes,
        rules: cfg.refactor.only.clone(),
    };

    let mut total_fixed = 0usize;
    let mut total_skipped = 0usize;
    let mut files_modified = 0usize;

    for (unit, unit_findings) in units.iter().zip(findings) {
        let fixable = engine.fixable(unit, unit_findings);
        let result = fixer::apply_fixes(unit, &fixable, &options)
            .with_context(|| format!("failed to apply fixes to {}", unit.display_name()))?;
        for conflict in &result.conflicts {
            eprintln!("{}: skipped fix: {conflict}", unit.display_name());
        }
        total_skipped += result.fixes_skipped;
        if !result.changed() {
            continue;
        }
        total_fixed += result.fixes_applied;
        files_modified += 1;

        match unit.path() {
            Some(path) if args.write => {
                std::fs::write(path, &result.fixed_source)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            path => {
                let path = path.unwrap_or_else(|| Path::new("stdin"));
                print!("{}", fixer::format_diff(unit.text(), &result.fixed_source, path));
            }
        }
    }

    eprintln!(
        "fixed {total_fixed} issue(s) in {files_modified} file(s), {total_skipped} fix(es) skipped"
    );

    if parse_failures > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Parse every input. Files that fail to parse are reported on stderr and
/// counted; stdin that fails to parse is an error.
fn load_units(paths: &[PathBuf]) -> anyhow::Result<(Vec<CompilationUnit>, usize)> {
    if paths.is_empty() {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        let unit = host::parse_java(&source).context("failed to parse stdin")?;
        return Ok((vec![unit], 0));
    }

    let mut units = Vec::new();
    let mut failures = 0usize;
    for path in collect_java_files(paths)? {
        match host::parse_java_file(&path) {
            Ok(unit) => units.push(unit),
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                failures += 1;
            }
        }
    }
    Ok((units, failures))
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn collect_java_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if !path.is_dir() {
            std::fs::metadata(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            out.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| !should_skip_dir(e.path()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("java")
            {
                out.push(entry.into_path());
            }
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    path.is_dir() && matches!(name, ".git" | "target" | "build" | "out")
}

fn infer_start_dir(args: &ScanArgs) -> anyhow::Result<PathBuf> {
    let base = match args.paths.first() {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}

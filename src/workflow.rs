use crate::agents::{DesktopOpener, ModuleManager, ModulePicker, ModuleRegistry, Outcome};
use crate::cli::Cli;
use crate::config::Settings;
use crate::diagnostics::{self, DiagnosticLog, EventSender};
use crate::error::{ModManError, Result};
use crate::host::{CommandExecutor, PwshHost, scripts};
use crate::model::{DiagnosticEvent, PendingUpdate, Severity, format_date};
use crate::notify::ConsoleNotifier;
use crate::utils::pattern::PatternMatcher;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything one CLI invocation needs: the log, the executor and the manager.
pub struct App {
    log: Arc<DiagnosticLog>,
    events: EventSender,
    manager: ModuleManager,
    progress: MultiProgress,
    save_log: Option<PathBuf>,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut settings = Settings::load(cli.config.as_deref())?;
        if let Some(program) = &cli.host_program {
            settings.host.program = program.clone();
            settings.validate()?;
        }
        debug!(?settings, "Settings loaded");

        let progress = MultiProgress::new();
        let log = Arc::new(DiagnosticLog::new());
        let (events, pump) = diagnostics::channel(settings.runtime.event_buffer, log.clone());
        let pump = if cli.quiet_log {
            pump
        } else {
            let progress = progress.clone();
            pump.with_observer(Box::new(move |event: &DiagnosticEvent| {
                progress.suspend(|| eprintln!("{}", paint(event)));
            }))
        };
        pump.spawn();

        let host = Arc::new(PwshHost::new(&settings.host));
        let mut executor = CommandExecutor::new(host, events.clone());
        if settings.runtime.provision {
            executor = executor.with_provisioning(scripts::provision_script(&settings.gallery));
        }

        let manager = ModuleManager::new(
            executor,
            Arc::new(ModuleRegistry::new()),
            Arc::new(ConsoleNotifier),
            Arc::new(DesktopOpener),
            &settings,
        );

        Ok(Self {
            log,
            events,
            manager,
            progress,
            save_log: cli.save_log.clone(),
        })
    }

    /// Drains pending diagnostics and writes the log file if one was requested.
    pub async fn finish(self) -> Result<()> {
        self.events.flush().await;
        if let Some(path) = &self.save_log {
            self.log.save_to(path)?;
            println!(
                "{}",
                format!(
                    "✓ Diagnostic log ({} entries) saved to {}",
                    self.log.len(),
                    path.display()
                )
                .green()
            );
        }
        Ok(())
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let pb = self.progress.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Refreshing is only offered while no other operation is in flight.
fn ensure_idle(app: &App) -> bool {
    let idle = app.manager.registry().actions().refresh;
    if !idle {
        println!("{}", "⚠ Another operation is still running".yellow());
    }
    idle
}

fn paint(event: &DiagnosticEvent) -> String {
    let line = event.render();
    match event.severity {
        Severity::Error => line.red().to_string(),
        Severity::Warning => line.yellow().to_string(),
        Severity::Verbose | Severity::Info => line.dimmed().to_string(),
    }
}

/// Execute the check workflow - list pending updates without applying them
pub async fn execute_check(app: &App) -> Result<Outcome> {
    println!("{}", "Checking for module updates...".cyan().bold());
    if !ensure_idle(app) {
        return Ok(Outcome::Failed);
    }

    let pb = app.spinner("Checking for updates...");
    let outcome = app.manager.refresh_all().await;
    pb.finish_and_clear();
    if outcome == Outcome::Failed {
        return Ok(outcome);
    }

    let registry = app.manager.registry();
    print_pending_updates(&registry.updates());
    if registry.actions().update_all {
        println!("\n{}", "To apply these updates, run:".dimmed());
        println!("  {}", "psmodman update --all".cyan());
    }
    println!("\n{}", registry.status().dimmed());
    Ok(outcome)
}

fn print_pending_updates(updates: &[PendingUpdate]) {
    if updates.is_empty() {
        println!("\n{}", "✨ All modules are up to date!".green().bold());
        return;
    }

    println!("\n{}", "📦 Available Updates:".cyan().bold());
    println!(
        "{}",
        format!("Found {} update(s)", updates.len()).yellow()
    );
    for update in updates {
        println!(
            "  • {} {} → {} {}",
            update.name.white().bold(),
            update.current_version.red(),
            update.new_version.green().bold(),
            format!("(published {})", format_date(update.published_date)).dimmed()
        );
    }
}

/// Execute the list workflow - display installed modules
pub async fn execute_list(app: &App) -> Result<Outcome> {
    println!("{}", "Listing installed modules...".cyan().bold());

    let pb = app.spinner("Loading installed modules...");
    let outcome = app.manager.refresh_installed().await;
    pb.finish_and_clear();
    if outcome == Outcome::Failed {
        return Ok(outcome);
    }

    let modules = app.manager.registry().installed();
    println!("\n{}", "📦 Installed Modules:".cyan().bold());
    for module in modules.iter() {
        let author = module.author.as_deref().unwrap_or("unknown author");
        println!(
            "  • {} {} {} {}",
            module.name.white().bold(),
            module.version.green(),
            format!("by {author}").dimmed(),
            format!("(installed {})", format_date(module.installed_date)).dimmed()
        );
        if let Some(location) = &module.location {
            println!("    {}", location.display().to_string().dimmed());
        }
    }

    println!("\n{}", "Summary:".cyan().bold());
    println!("  {} modules", modules.len().to_string().yellow());
    Ok(outcome)
}

/// Execute the update workflow
pub async fn execute_update(
    app: &App,
    names: &[String],
    all: bool,
    interactive: bool,
) -> Result<Outcome> {
    println!("{}", "Starting module update process...".cyan().bold());
    if !ensure_idle(app) {
        return Ok(Outcome::Failed);
    }

    println!("\n{}", "1. Checking for available updates...".yellow());
    let pb = app.spinner("Checking for updates...");
    let outcome = app.manager.refresh_updates().await;
    pb.finish_and_clear();
    if outcome == Outcome::Failed {
        return Ok(outcome);
    }

    let registry = app.manager.registry();
    let updates = registry.updates();
    if updates.is_empty() {
        println!("\n{}", "✨ All modules are up to date!".green().bold());
        return Ok(Outcome::Completed);
    }
    println!(
        "{}",
        format!("✓ Found {} pending update(s)", updates.len()).green()
    );

    if all {
        println!("\n{}", "2. Updating all modules...".yellow());
        for update in updates.iter() {
            println!("   • {}", update.name.bright_cyan());
        }
        let pb = app.spinner(&format!("Updating {} module(s)...", updates.len()));
        let outcome = app.manager.update_all().await;
        pb.finish_and_clear();
        let requested: Vec<String> = updates.iter().map(|u| u.name.clone()).collect();
        report_update(outcome, &requested, &registry.updates());
        return Ok(outcome);
    }

    println!("\n{}", "2. Selecting modules...".yellow());
    if interactive {
        let pending = updates.clone();
        let picked = tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            ModulePicker::new(stdin.lock(), io::stdout()).pick(&pending)
        })
        .await
        .map_err(|e| ModManError::Execution(format!("Prompt task failed: {e}")))?;
        match picked {
            Ok(picked) => {
                for name in &picked {
                    registry.select(name);
                }
            }
            Err(ModManError::UserCancelled) => {
                println!("\n{}", "Update cancelled by user.".yellow());
                return Ok(Outcome::Completed);
            }
            Err(e) => return Err(e),
        }
    } else {
        let (matched, unmatched) = resolve_requested(&updates, names)?;
        for pattern in &unmatched {
            println!(
                "   {}",
                format!("⚠ No pending update matches '{pattern}'").yellow()
            );
        }
        for name in &matched {
            registry.select(name);
        }
    }

    let selected = registry.selected_names();
    for name in &selected {
        println!("   • {}", name.bright_cyan());
    }

    println!("\n{}", "3. Updating modules...".yellow());
    let outcome = if registry.actions().update {
        let pb = app.spinner(&format!("Updating {} module(s)...", selected.len()));
        let outcome = app.manager.update_selection().await;
        pb.finish_and_clear();
        outcome
    } else {
        // Nothing selected; the manager reports it without running anything.
        app.manager.update_selection().await
    };
    report_update(outcome, &selected, &registry.updates());
    Ok(outcome)
}

fn report_update(outcome: Outcome, requested: &[String], remaining: &[PendingUpdate]) {
    match outcome {
        Outcome::Completed => {
            println!("{}", "✓ Update completed".green());
            print_update_summary(requested, remaining);
            println!(
                "\n{}",
                "✨ Update process completed successfully!".green().bold()
            );
        }
        Outcome::NoSelection => println!("\n{}", "No updates were applied".yellow()),
        Outcome::Failed => {}
    }
}

/// Splits requested names into pending updates they match and patterns matching nothing.
fn resolve_requested(
    updates: &[PendingUpdate],
    patterns: &[String],
) -> Result<(Vec<String>, Vec<String>)> {
    let mut matched: Vec<String> = Vec::new();
    let mut unmatched = Vec::new();

    for pattern in patterns {
        let matcher = PatternMatcher::new(pattern)?;
        let mut hit = false;
        for update in updates.iter().filter(|u| matcher.matches(&u.name)) {
            hit = true;
            if !matched.iter().any(|m| m.eq_ignore_ascii_case(&update.name)) {
                matched.push(update.name.clone());
            }
        }
        if !hit {
            unmatched.push(pattern.clone());
        }
    }
    Ok((matched, unmatched))
}

fn print_update_summary(requested: &[String], remaining: &[PendingUpdate]) {
    println!("\n{}", "Update Summary:".cyan().bold());
    for name in requested {
        match remaining.iter().find(|u| u.name.eq_ignore_ascii_case(name)) {
            Some(still) => println!(
                "  • {} {} {}",
                name.white().bold(),
                still.current_version.red(),
                "(still pending, see the diagnostic log)".yellow()
            ),
            None => println!("  • {} {}", name.white().bold(), "updated".green()),
        }
    }
}

/// Execute the notes workflow - show release notes of one pending update
pub async fn execute_notes(app: &App, name: &str) -> Result<Outcome> {
    let pb = app.spinner("Checking for updates...");
    let outcome = app.manager.refresh_updates().await;
    pb.finish_and_clear();
    if outcome == Outcome::Failed {
        return Ok(outcome);
    }

    let registry = app.manager.registry();
    if !registry.select(name) || !registry.actions().view_notes {
        println!(
            "{}",
            format!("⚠ '{name}' has no pending update").yellow()
        );
        return Ok(Outcome::Failed);
    }

    match app.manager.release_notes() {
        Some(notes) => {
            println!("{}", notes.title.cyan().bold());
            println!("\n{}", notes.text);
            Ok(Outcome::Completed)
        }
        None => Ok(Outcome::NoSelection),
    }
}

/// Execute the open workflow - show an installed module's folder
pub async fn execute_open(app: &App, name: &str) -> Result<Outcome> {
    let pb = app.spinner("Loading installed modules...");
    let outcome = app.manager.refresh_installed().await;
    pb.finish_and_clear();
    if outcome == Outcome::Failed {
        return Ok(outcome);
    }

    if app.manager.open_location(name).await {
        Ok(Outcome::Completed)
    } else {
        println!(
            "{}",
            format!("⚠ Could not open the location of '{name}'").yellow()
        );
        Ok(Outcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updates(names: &[&str]) -> Vec<PendingUpdate> {
        names
            .iter()
            .map(|name| PendingUpdate {
                name: name.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn resolves_exact_names_and_globs() {
        let pending = updates(&["Az.Accounts", "Az.Storage", "Pester"]);
        let requested = vec!["pester".to_string(), "Az.*".to_string()];

        let (matched, unmatched) = resolve_requested(&pending, &requested).unwrap();

        assert_eq!(matched, vec!["Pester", "Az.Accounts", "Az.Storage"]);
        assert!(unmatched.is_empty());
    }

    #[test]
    fn reports_patterns_without_matches() {
        let pending = updates(&["Pester"]);
        let requested = vec!["PSReadLine".to_string(), "Pester".to_string()];

        let (matched, unmatched) = resolve_requested(&pending, &requested).unwrap();

        assert_eq!(matched, vec!["Pester"]);
        assert_eq!(unmatched, vec!["PSReadLine"]);
    }

    #[test]
    fn overlapping_patterns_select_once() {
        let pending = updates(&["Az.Accounts"]);
        let requested = vec!["Az.*".to_string(), "az.accounts".to_string()];

        let (matched, _) = resolve_requested(&pending, &requested).unwrap();

        assert_eq!(matched, vec!["Az.Accounts"]);
    }

    #[test]
    fn blank_pattern_is_rejected() {
        assert!(resolve_requested(&updates(&["Az"]), &[" ".to_string()]).is_err());
    }
}

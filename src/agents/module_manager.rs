use crate::agents::location_opener::LocationOpener;
use crate::agents::registry::ModuleRegistry;
use crate::config::{GallerySettings, Settings};
use crate::diagnostics::EventSender;
use crate::error::ModManError;
use crate::host::{CommandExecutor, scripts};
use crate::mapper::map_records;
use crate::model::{InstalledModule, PendingUpdate, Severity};
use crate::notify::Notifier;
use crate::utils::umbrella::UmbrellaFilter;
use jiff::Zoned;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// How a user-triggered operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Nothing was selected; the user was told and nothing ran.
    NoSelection,
    /// A fault was logged and reported to the user.
    Failed,
}

impl Outcome {
    fn and(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Failed, _) | (_, Outcome::Failed) => Outcome::Failed,
            (Outcome::NoSelection, _) | (_, Outcome::NoSelection) => Outcome::NoSelection,
            _ => Outcome::Completed,
        }
    }
}

/// Release notes of one pending update, as shown in the details view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotes {
    pub title: String,
    pub text: String,
}

/// Drives refreshes and updates through the executor and keeps the registry current.
///
/// Every operation catches its own fault: the error is logged, reported once
/// through the [`Notifier`], and the operation returns [`Outcome::Failed`].
pub struct ModuleManager {
    executor: CommandExecutor,
    registry: Arc<ModuleRegistry>,
    notifier: Arc<dyn Notifier>,
    opener: Arc<dyn LocationOpener>,
    gallery: GallerySettings,
    umbrellas: UmbrellaFilter,
    settle_delay: Duration,
}

impl ModuleManager {
    pub fn new(
        executor: CommandExecutor,
        registry: Arc<ModuleRegistry>,
        notifier: Arc<dyn Notifier>,
        opener: Arc<dyn LocationOpener>,
        settings: &Settings,
    ) -> Self {
        Self {
            executor,
            registry,
            notifier,
            opener,
            gallery: settings.gallery.clone(),
            umbrellas: UmbrellaFilter::new(&settings.gallery.umbrellas),
            settle_delay: settings.runtime.settle_delay(),
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    fn events(&self) -> &EventSender {
        self.executor.events()
    }

    /// Replaces the pending-update collection with a fresh check.
    pub async fn refresh_updates(&self) -> Outcome {
        let _busy = self.registry.begin_operation();
        self.registry.set_status("Checking for updates...");

        let script = scripts::list_updates_script(&self.gallery);
        match self.executor.execute(script).await {
            Ok(records) => {
                let updates: Vec<PendingUpdate> = map_records(&records);
                info!(count = updates.len(), "Pending updates refreshed");
                self.registry.replace_updates(updates);
                self.registry.set_status(format!(
                    "Last checked: {}",
                    Zoned::now().strftime("%Y-%m-%d %H:%M")
                ));
                Outcome::Completed
            }
            Err(err) => {
                self.registry.set_status("Error checking for updates");
                self.fail("Error checking for updates", &err).await
            }
        }
    }

    /// Replaces the installed-module collection, hiding umbrella submodules.
    pub async fn refresh_installed(&self) -> Outcome {
        let _busy = self.registry.begin_operation();

        match self.executor.execute(scripts::list_installed_script()).await {
            Ok(records) => {
                let modules: Vec<InstalledModule> = map_records(&records);
                let modules = self.umbrellas.apply(modules);
                info!(count = modules.len(), "Installed modules refreshed");
                self.registry.replace_installed(modules);
                Outcome::Completed
            }
            Err(err) => self.fail("Error loading installed modules", &err).await,
        }
    }

    /// Runs both refreshes concurrently and waits for both.
    pub async fn refresh_all(&self) -> Outcome {
        let (updates, installed) = tokio::join!(self.refresh_updates(), self.refresh_installed());
        updates.and(installed)
    }

    /// Updates the named modules with one batched command, then refreshes.
    ///
    /// The refresh runs whether or not each module updated; per-module
    /// results only appear in the diagnostic log.
    pub async fn update_selected<S: AsRef<str>>(&self, names: &[S]) -> Outcome {
        let mut seen = HashSet::new();
        let names: Vec<&str> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .collect();

        if names.is_empty() {
            self.notifier
                .notice("No Selection", "Please select at least one module to update.");
            return Outcome::NoSelection;
        }

        // Held through the settle delay and the follow-up refresh.
        let _busy = self.registry.begin_operation();
        self.events()
            .info(format!("Updating modules: {}", names.join(", ")))
            .await;
        let result = self
            .executor
            .execute(scripts::update_script(&self.gallery, &names))
            .await;

        match result {
            Ok(_) => {
                self.events().info("Update Complete").await;
                if !self.settle_delay.is_zero() {
                    tokio::time::sleep(self.settle_delay).await;
                }
                self.refresh_all().await
            }
            Err(err) => self.fail("Error updating modules", &err).await,
        }
    }

    /// Updates whatever is currently selected in the registry.
    pub async fn update_selection(&self) -> Outcome {
        let names = self.registry.selected_names();
        self.update_selected(&names).await
    }

    /// Selects every pending update and updates them all.
    pub async fn update_all(&self) -> Outcome {
        self.registry.select_all();
        self.update_selection().await
    }

    /// Release notes for the selected pending update.
    pub fn release_notes(&self) -> Option<ReleaseNotes> {
        self.registry.selected_update().map(|update| ReleaseNotes {
            title: format!("Release Notes: {}", update.name),
            text: update.release_notes_text().to_string(),
        })
    }

    /// Opens an installed module's location. Failures are only logged.
    pub async fn open_location(&self, name: &str) -> bool {
        let Some(module) = self.registry.find_installed(name) else {
            self.events()
                .emit(Severity::Warning, format!("{name} is not an installed module"))
                .await;
            return false;
        };
        let Some(location) = module.location else {
            self.events()
                .emit(
                    Severity::Warning,
                    format!("{} has no recorded location", module.name),
                )
                .await;
            return false;
        };

        self.events()
            .info(format!("Selected: {}", location.display()))
            .await;
        match self.opener.open(&location) {
            Ok(()) => true,
            Err(err) => {
                self.events()
                    .error(format!("Could not open {}: {err}", location.display()))
                    .await;
                false
            }
        }
    }

    async fn fail(&self, title: &str, err: &ModManError) -> Outcome {
        error!("{title}: {err}");
        self.events().error(format!("{title}: {err}")).await;
        self.notifier.error(title, &err.to_string());
        Outcome::Failed
    }
}

//! Command registry: built-in and custom commands behind one alias table.
//!
//! Reads are synchronous and lock-free in practice (an uncontended
//! `parking_lot::RwLock`). Mutations are serialized by an async writer lock,
//! persisted to the [`CommandStore`] first, and only then applied to the
//! in-memory catalog, so a failed write leaves the catalog untouched. Each
//! mutation runs to completion on its own task once started.

use crate::command::{BuiltinCommand, Command, CommandKind, CommandRecord, Handler};
use crate::error::{RegistryError, ServiceError};
use crate::template::Template;
use crate::traits::CommandStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, Clone)]
struct Catalog {
    commands: HashMap<String, Command>,
    /// Every name and alias, mapped to its canonical name.
    lookup: HashMap<String, String>,
}

impl Catalog {
    fn seeded() -> Self {
        let mut catalog = Self::default();
        for builtin in BuiltinCommand::ALL {
            catalog.insert(Command::builtin(builtin));
        }
        catalog
    }

    fn insert(&mut self, command: Command) {
        self.lookup.insert(command.name.clone(), command.name.clone());
        for alias in &command.aliases {
            self.lookup.insert(alias.clone(), command.name.clone());
        }
        self.commands.insert(command.name.clone(), command);
    }

    fn remove(&mut self, name: &str) -> Option<Command> {
        let command = self.commands.remove(name)?;
        self.lookup.remove(&command.name);
        for alias in &command.aliases {
            self.lookup.remove(alias);
        }
        Some(command)
    }

    fn apply_record(&mut self, record: CommandRecord) {
        match record.kind {
            CommandKind::Builtin => {
                let Some(mut command) = self.commands.get(&record.name).cloned() else {
                    warn!(name = %record.name, "Stored aliases for unknown built-in; skipping");
                    return;
                };
                for alias in record.aliases {
                    if self.lookup.contains_key(&alias) {
                        warn!(%alias, "Stored alias conflicts with an existing name; skipping");
                    } else {
                        command.aliases.push(alias);
                    }
                }
                self.insert(command);
            }
            CommandKind::Custom => {
                if self.lookup.contains_key(&record.name) {
                    warn!(name = %record.name, "Stored command conflicts with an existing name; skipping");
                    return;
                }
                let Some(template) = record.response else {
                    warn!(name = %record.name, "Stored custom command has no response; skipping");
                    return;
                };
                let mut command = Command {
                    name: record.name,
                    handler: Handler::Template(template),
                    permission: record.permission,
                    user_cooldown_secs: record.user_cooldown_secs,
                    global_cooldown_secs: record.global_cooldown_secs,
                    aliases: Vec::new(),
                };
                for alias in record.aliases {
                    if self.lookup.contains_key(&alias) || alias == command.name {
                        warn!(%alias, "Stored alias conflicts with an existing name; skipping");
                    } else {
                        command.aliases.push(alias);
                    }
                }
                self.insert(command);
            }
        }
    }
}

/// Catalog sizes, for `!stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    /// Built-in commands.
    pub builtin: usize,
    /// Custom commands.
    pub custom: usize,
    /// Aliases of any command.
    pub aliases: usize,
}

struct Shared {
    catalog: RwLock<Catalog>,
    writer: tokio::sync::Mutex<()>,
    store: Arc<dyn CommandStore>,
}

impl Shared {
    fn lookup(&self, token: &str) -> Option<Command> {
        let catalog = self.catalog.read();
        let name = catalog.lookup.get(token)?;
        catalog.commands.get(name).cloned()
    }

    fn ensure_available(&self, name: &str) -> Result<(), RegistryError> {
        if is_builtin_name(name) {
            return Err(RegistryError::ProtectedCommand(name.to_string()));
        }
        if self.catalog.read().lookup.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn custom_command(&self, name: &str) -> Result<Command, RegistryError> {
        if is_builtin_name(name) {
            return Err(RegistryError::ProtectedCommand(name.to_string()));
        }
        match self.catalog.read().commands.get(name) {
            Some(command) if command.kind() == CommandKind::Custom => Ok(command.clone()),
            Some(_) => Err(RegistryError::ProtectedCommand(name.to_string())),
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }
}

/// The command catalog.
pub struct CommandRegistry {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("counts", &self.counts())
            .finish_non_exhaustive()
    }
}

impl CommandRegistry {
    /// Builds the catalog from the built-ins and the store's records.
    ///
    /// A store failure is returned as-is; the bot cannot start without its catalog.
    pub async fn load(store: Arc<dyn CommandStore>) -> Result<Self, RegistryError> {
        let records = store.load().await?;
        let mut catalog = Catalog::seeded();
        for record in records {
            catalog.apply_record(record);
        }
        let registry = Self {
            shared: Arc::new(Shared {
                catalog: RwLock::new(catalog),
                writer: tokio::sync::Mutex::new(()),
                store,
            }),
        };
        let counts = registry.counts();
        info!(
            builtin = counts.builtin,
            custom = counts.custom,
            aliases = counts.aliases,
            "Command registry loaded"
        );
        Ok(registry)
    }

    /// Canonical name for a typed token.
    pub fn resolve(&self, token: &str) -> Option<String> {
        let token = token.to_lowercase();
        self.shared.catalog.read().lookup.get(&token).cloned()
    }

    /// Command definition by canonical name.
    pub fn get(&self, name: &str) -> Option<Command> {
        self.shared.catalog.read().commands.get(name).cloned()
    }

    /// Resolve and fetch in one step.
    pub fn lookup(&self, token: &str) -> Option<Command> {
        self.shared.lookup(&token.to_lowercase())
    }

    /// Every canonical name, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.catalog.read().commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Catalog sizes.
    pub fn counts(&self) -> RegistryCounts {
        let catalog = self.shared.catalog.read();
        let custom = catalog
            .commands
            .values()
            .filter(|c| c.kind() == CommandKind::Custom)
            .count();
        RegistryCounts {
            builtin: catalog.commands.len() - custom,
            custom,
            aliases: catalog.lookup.len() - catalog.commands.len(),
        }
    }

    /// Creates a custom command.
    pub async fn add_command(
        &self,
        name: &str,
        template: &str,
        user_cooldown_secs: u64,
        global_cooldown_secs: u64,
    ) -> Result<Command, RegistryError> {
        let name = normalize_name(name)?;
        Template::parse(template)?;
        let command = Command::custom(&name, template, user_cooldown_secs, global_cooldown_secs);

        self.commit(move |shared| async move {
            shared.ensure_available(&command.name)?;
            shared.store.persist(&command.to_record()).await?;
            shared.catalog.write().insert(command.clone());
            info!(command = %command.name, "Custom command added");
            Ok(command)
        })
        .await
    }

    /// Replaces a custom command's template.
    pub async fn edit_command(&self, name: &str, template: &str) -> Result<Command, RegistryError> {
        let name = normalize_name(name)?;
        Template::parse(template)?;
        let template = template.to_string();

        self.commit(move |shared| async move {
            let mut command = shared.custom_command(&name)?;
            command.handler = Handler::Template(template);
            shared.store.persist(&command.to_record()).await?;
            shared.catalog.write().insert(command.clone());
            info!(command = %name, "Custom command edited");
            Ok(command)
        })
        .await
    }

    /// Deletes a custom command and every alias pointing at it.
    pub async fn delete_command(&self, name: &str) -> Result<Command, RegistryError> {
        let name = normalize_name(name)?;

        self.commit(move |shared| async move {
            let command = shared.custom_command(&name)?;
            shared.store.remove(&command.name).await?;
            shared.catalog.write().remove(&command.name);
            info!(command = %name, aliases = command.aliases.len(), "Custom command deleted");
            Ok(command)
        })
        .await
    }

    /// Adds `alias` for the command `target` resolves to. Returns the canonical name.
    pub async fn add_alias(&self, alias: &str, target: &str) -> Result<String, RegistryError> {
        let alias = normalize_name(alias)?;
        let target = normalize_name(target)?;

        self.commit(move |shared| async move {
            let mut command = shared
                .lookup(&target)
                .ok_or_else(|| RegistryError::NotFound(target.clone()))?;
            shared.ensure_available(&alias)?;
            command.aliases.push(alias.clone());
            shared.store.persist(&command.to_record()).await?;
            shared.catalog.write().insert(command.clone());
            info!(%alias, command = %command.name, "Alias added");
            Ok(command.name)
        })
        .await
    }

    /// Runs one mutation under the writer lock on its own task.
    ///
    /// The store write and the catalog update finish together even if the
    /// caller stops waiting, so the two never disagree.
    async fn commit<T, F, Fut>(&self, mutation: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Shared>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RegistryError>> + Send + 'static,
    {
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let _guard = shared.writer.lock().await;
            mutation(shared.clone()).await
        });
        task.await.map_err(|e| {
            RegistryError::Store(ServiceError::Storage(format!("registry write task failed: {e}")))
        })?
    }
}

/// Whether `name` is a built-in's canonical name or shipped alias.
fn is_builtin_name(name: &str) -> bool {
    BuiltinCommand::ALL
        .iter()
        .any(|b| b.name() == name || b.default_aliases().contains(&name))
}

fn normalize_name(name: &str) -> Result<String, RegistryError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RegistryError::InvalidName(name));
    }
    Ok(name)
}

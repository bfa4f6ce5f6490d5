//! CLI command handlers

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use kube::api::{Api, DeleteParams, PostParams};
use serde::de::DeserializeOwned;

use crate::cleanup::ResourceCleaner;
use crate::kube::{create_client, DynamicClient};
use crate::models::{
    package_install_description, package_repository_description, ImgpkgBundle, ObservedResource,
    PackageInstall, PackageInstallSpec, PackageRef, PackageRepository, PackageRepositorySpec,
    RepositoryFetch, VersionSelection,
};
use crate::wait::{
    await_terminal_state, MessageDeduper, StdoutSink, TerminalConditions, WaitConfig,
};

/// Namespace selection shared by every command
#[derive(Args, Debug)]
pub struct NamespaceFlags {
    /// Namespace of the resource
    #[arg(short = 'n', long = "namespace", default_value = "default")]
    pub namespace: String,
}

/// Wait behavior shared by every command
#[derive(Args, Debug)]
pub struct WaitFlags {
    /// Wait for the operation to reach a terminal state
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub wait: bool,

    /// Seconds between status checks while waiting
    #[arg(long = "wait-check-interval", default_value_t = 1)]
    pub wait_check_interval: u64,

    /// Seconds before the wait gives up
    #[arg(long = "wait-timeout", default_value_t = 300)]
    pub wait_timeout: u64,
}

impl WaitFlags {
    pub fn config(&self) -> WaitConfig {
        WaitConfig {
            interval: Duration::from_secs(self.wait_check_interval),
            timeout: Duration::from_secs(self.wait_timeout),
            enabled: self.wait,
        }
    }
}

/// Installed package subcommands
#[derive(Subcommand, Debug)]
pub enum InstalledCommand {
    /// Install a package
    Create {
        /// Name of the package install
        #[arg(short = 'i', long = "package-install")]
        name: String,
        /// Name of the package to install
        #[arg(short = 'p', long = "package")]
        package: String,
        /// Version constraint for the package (e.g. "1.5.3")
        #[arg(long)]
        version: Option<String>,
        /// Service account the controller deploys the package with
        #[arg(long = "service-account")]
        service_account: String,
        #[command(flatten)]
        namespace: NamespaceFlags,
        #[command(flatten)]
        wait: WaitFlags,
    },
    /// Update an installed package
    Update {
        /// Name of the package install
        #[arg(short = 'i', long = "package-install")]
        name: String,
        /// New version constraint for the package
        #[arg(long)]
        version: Option<String>,
        #[command(flatten)]
        namespace: NamespaceFlags,
        #[command(flatten)]
        wait: WaitFlags,
    },
    /// Uninstall a package and clean up the resources created for it
    Delete {
        /// Name of the package install
        #[arg(short = 'i', long = "package-install")]
        name: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
        #[command(flatten)]
        namespace: NamespaceFlags,
        #[command(flatten)]
        wait: WaitFlags,
    },
}

/// Package repository subcommands
#[derive(Subcommand, Debug)]
pub enum RepositoryCommand {
    /// Add a package repository
    Add {
        /// Name of the package repository
        #[arg(short = 'r', long = "repository")]
        name: String,
        /// Image URL the repository bundle is fetched from
        #[arg(long)]
        url: String,
        #[command(flatten)]
        namespace: NamespaceFlags,
        #[command(flatten)]
        wait: WaitFlags,
    },
    /// Update a package repository
    Update {
        /// Name of the package repository
        #[arg(short = 'r', long = "repository")]
        name: String,
        /// Image URL the repository bundle is fetched from
        #[arg(long)]
        url: String,
        /// Create the repository when it does not exist
        #[arg(long)]
        create: bool,
        #[command(flatten)]
        namespace: NamespaceFlags,
        #[command(flatten)]
        wait: WaitFlags,
    },
    /// Delete a package repository
    Delete {
        /// Name of the package repository
        #[arg(short = 'r', long = "repository")]
        name: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
        #[command(flatten)]
        namespace: NamespaceFlags,
        #[command(flatten)]
        wait: WaitFlags,
    },
}

/// Handle installed package subcommands
pub async fn handle_installed_command(cmd: InstalledCommand) -> Result<()> {
    match cmd {
        InstalledCommand::Create {
            name,
            package,
            version,
            service_account,
            namespace,
            wait,
        } => {
            create_package_install(
                &name,
                &package,
                version,
                &service_account,
                &namespace.namespace,
                &wait.config(),
            )
            .await
        }
        InstalledCommand::Update {
            name,
            version,
            namespace,
            wait,
        } => update_package_install(&name, version, &namespace.namespace, &wait.config()).await,
        InstalledCommand::Delete {
            name,
            yes,
            namespace,
            wait,
        } => delete_package_install(&name, &namespace.namespace, yes, &wait.config()).await,
    }
}

/// Handle package repository subcommands
pub async fn handle_repository_command(cmd: RepositoryCommand) -> Result<()> {
    match cmd {
        RepositoryCommand::Add {
            name,
            url,
            namespace,
            wait,
        } => add_package_repository(&name, &url, &namespace.namespace, &wait.config()).await,
        RepositoryCommand::Update {
            name,
            url,
            create,
            namespace,
            wait,
        } => {
            update_package_repository(&name, &url, create, &namespace.namespace, &wait.config())
                .await
        }
        RepositoryCommand::Delete {
            name,
            yes,
            namespace,
            wait,
        } => delete_package_repository(&name, &namespace.namespace, yes, &wait.config()).await,
    }
}

async fn create_package_install(
    name: &str,
    package: &str,
    version: Option<String>,
    service_account: &str,
    namespace: &str,
    config: &WaitConfig,
) -> Result<()> {
    let client = create_client().await?;
    let api: Api<PackageInstall> = Api::namespaced(client, namespace);
    let description = package_install_description(name, namespace);

    let pkgi = PackageInstall::new(
        name,
        PackageInstallSpec {
            service_account_name: service_account.to_string(),
            package_ref: PackageRef {
                ref_name: package.to_string(),
                version_selection: version.map(|constraints| VersionSelection { constraints }),
            },
            paused: false,
        },
    );
    api.create(&PostParams::default(), &pkgi)
        .await
        .with_context(|| format!("Creating {}", description))?;
    println!("Created {}", description);

    wait_until_reconciled(&api, name, &description, config).await
}

async fn update_package_install(
    name: &str,
    version: Option<String>,
    namespace: &str,
    config: &WaitConfig,
) -> Result<()> {
    let client = create_client().await?;
    let api: Api<PackageInstall> = Api::namespaced(client, namespace);
    let description = package_install_description(name, namespace);

    let mut pkgi = api
        .get(name)
        .await
        .with_context(|| format!("Fetching {}", description))?;
    if let Some(constraints) = version {
        pkgi.spec.package_ref.version_selection = Some(VersionSelection { constraints });
    }
    api.replace(name, &PostParams::default(), &pkgi)
        .await
        .with_context(|| format!("Updating {}", description))?;
    println!("Updated {}", description);

    wait_until_reconciled(&api, name, &description, config).await
}

async fn delete_package_install(
    name: &str,
    namespace: &str,
    yes: bool,
    config: &WaitConfig,
) -> Result<()> {
    let client = create_client().await?;
    let api: Api<PackageInstall> = Api::namespaced(client.clone(), namespace);
    let description = package_install_description(name, namespace);
    let dynamic = DynamicClient::new(client);
    let cleaner = ResourceCleaner::new(&dynamic, name, namespace);
    let mut sink = StdoutSink;

    let Some(existing) = api
        .get_opt(name)
        .await
        .with_context(|| format!("Fetching {}", description))?
    else {
        // The install is already gone but its side effects may not be;
        // fall back to probing deterministically-named candidates.
        println!(
            "Could not find package install '{}' in namespace '{}'. Cleaning up created resources.",
            name, namespace
        );
        return cleaner.delete_orphaned_resources(&mut sink).await;
    };

    if !yes
        && !confirmed(&format!(
            "Delete package install '{}' from namespace '{}'?",
            name, namespace
        ))?
    {
        println!("Aborted");
        return Ok(());
    }

    // Snapshot the provenance record before the delete removes it
    let annotations: BTreeMap<String, String> = existing.metadata.annotations.unwrap_or_default();

    api.delete(name, &DeleteParams::default())
        .await
        .with_context(|| format!("Deleting {}", description))?;
    println!("Deleting {}", description);

    if !config.enabled {
        println!("Delete issued without waiting; created resources were not cleaned up");
        return Ok(());
    }

    wait_until_terminal(&api, name, &description, &TerminalConditions::delete(), config).await?;

    cleaner.delete_created_resources(&annotations, &mut sink).await
}

async fn add_package_repository(
    name: &str,
    url: &str,
    namespace: &str,
    config: &WaitConfig,
) -> Result<()> {
    let client = create_client().await?;
    let api: Api<PackageRepository> = Api::namespaced(client, namespace);
    let description = package_repository_description(name, namespace);

    let repo = PackageRepository::new(name, repository_spec(url));
    api.create(&PostParams::default(), &repo)
        .await
        .with_context(|| format!("Creating {}", description))?;
    println!("Added {}", description);

    wait_until_reconciled(&api, name, &description, config).await
}

async fn update_package_repository(
    name: &str,
    url: &str,
    create: bool,
    namespace: &str,
    config: &WaitConfig,
) -> Result<()> {
    let client = create_client().await?;
    let api: Api<PackageRepository> = Api::namespaced(client, namespace);
    let description = package_repository_description(name, namespace);

    match api
        .get_opt(name)
        .await
        .with_context(|| format!("Fetching {}", description))?
    {
        Some(mut repo) => {
            repo.spec = repository_spec(url);
            api.replace(name, &PostParams::default(), &repo)
                .await
                .with_context(|| format!("Updating {}", description))?;
            println!("Updated {}", description);
        }
        None if create => {
            let repo = PackageRepository::new(name, repository_spec(url));
            api.create(&PostParams::default(), &repo)
                .await
                .with_context(|| format!("Creating {}", description))?;
            println!("Added {}", description);
        }
        None => {
            bail!(
                "Package repository '{}' not found in namespace '{}' (pass --create to add it)",
                name,
                namespace
            );
        }
    }

    wait_until_reconciled(&api, name, &description, config).await
}

async fn delete_package_repository(
    name: &str,
    namespace: &str,
    yes: bool,
    config: &WaitConfig,
) -> Result<()> {
    let client = create_client().await?;
    let api: Api<PackageRepository> = Api::namespaced(client, namespace);
    let description = package_repository_description(name, namespace);

    if !yes
        && !confirmed(&format!(
            "Delete package repository '{}' from namespace '{}'?",
            name, namespace
        ))?
    {
        println!("Aborted");
        return Ok(());
    }

    api.delete(name, &DeleteParams::default())
        .await
        .with_context(|| format!("Deleting {}", description))?;
    println!("Deleting {}", description);

    if !config.enabled {
        return Ok(());
    }
    wait_until_terminal(&api, name, &description, &TerminalConditions::delete(), config).await
}

fn repository_spec(url: &str) -> PackageRepositorySpec {
    PackageRepositorySpec {
        fetch: RepositoryFetch {
            imgpkg_bundle: Some(ImgpkgBundle {
                image: url.to_string(),
            }),
        },
    }
}

async fn wait_until_reconciled<K>(
    api: &Api<K>,
    name: &str,
    description: &str,
    config: &WaitConfig,
) -> Result<()>
where
    K: ObservedResource + Clone + Debug + DeserializeOwned,
{
    wait_until_terminal(api, name, description, &TerminalConditions::reconcile(), config).await
}

/// Poll the resource through the typed API until the wait terminates.
async fn wait_until_terminal<K>(
    api: &Api<K>,
    name: &str,
    description: &str,
    terminal: &TerminalConditions,
    config: &WaitConfig,
) -> Result<()>
where
    K: ObservedResource + Clone + Debug + DeserializeOwned,
{
    if !config.enabled {
        return Ok(());
    }

    let mut progress = MessageDeduper::new(StdoutSink);
    let fetch = {
        let api = api.clone();
        let name = name.to_string();
        move || fetch_optional(api.clone(), name.clone())
    };
    await_terminal_state(description, terminal, config, &mut progress, fetch).await?;
    Ok(())
}

fn fetch_optional<K>(
    api: Api<K>,
    name: String,
) -> impl Future<Output = Result<Option<K>, kube::Error>>
where
    K: Clone + Debug + DeserializeOwned,
{
    async move { api.get_opt(&name).await }
}

fn confirmed(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().context("Flushing prompt")?;

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("Reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

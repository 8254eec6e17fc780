use crate::{
    clone::{bulk_clone, BulkCloneOptions, CloneSummary, Cloner, ConflictPolicy, ResolveConflict},
    config::{CloneSettings, Settings},
    display::{OutcomeLine, RepositoryRow, SummaryLine},
    filter::{filter_repositories, FilterCriterion},
    github::{requests::CreateRepository, GhClient, RepositoryDescriptor},
    PartialRepositoryId, RepositoryId,
};
use anyhow::{Context, Error};
use console::Term;
use dialoguer::{Confirm, Select};
use std::{
    io::{self, Write},
    path::Path,
};
use tabwriter::TabWriter;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct App<'a, C> {
    settings: &'a Settings,
    github_client: GhClient,
    cloner: C,
}

impl<'a, C> App<'a, C>
where
    C: Cloner,
{
    pub fn new(settings: &'a Settings, github_client: GhClient, cloner: C) -> Self {
        Self { settings, github_client, cloner }
    }

    /// Fetches the whole listing of the owner, then keeps what `filter` selects.
    async fn fetch_repositories(
        &self,
        filter: FilterCriterion,
    ) -> Result<Vec<RepositoryDescriptor>, Error> {
        let owner = self.settings.owner.as_str();
        let repos = self
            .github_client
            .repos()
            .fetch_all_repositories(owner)
            .await
            .with_context(|| format!("Failed to list repositories of {owner}."))?;
        let total = repos.len();
        let repos = filter_repositories(repos, filter);
        info!(owner, total, selected = repos.len(), %filter, "listed repositories");
        Ok(repos)
    }

    pub async fn list_repositories(&self, filter: FilterCriterion) -> Result<(), Error> {
        let repos = self.fetch_repositories(filter).await?;

        let mut stdout = TabWriter::new(io::stdout().lock());
        writeln!(stdout, "{}", RepositoryRow::HEADER)?;
        for repo in &repos {
            writeln!(stdout, "{}", RepositoryRow(repo))?;
        }
        stdout.flush()?;

        Ok(())
    }

    /// Clones every selected repository of the owner under `<workspace>/<owner>`.
    pub async fn clone_all(&self, options: CloneSettings) -> Result<CloneSummary, Error> {
        let CloneSettings { method, filter, depth, on_conflict } = options;
        let owner = self.settings.owner.as_str();
        let workspace_root_dir = self.settings.workspace_root_dir.as_path();

        let repos = self.fetch_repositories(filter).await?;

        let stdout = Term::stdout();
        stdout.write_line(&format!(
            "Cloning {count} repositories of {owner} into {path}.",
            count = repos.len(),
            path = workspace_root_dir.join(owner).display()
        ))?;

        let mut resolver: Box<dyn ResolveConflict> = match on_conflict.policy() {
            Some(policy) => Box::new(policy),
            None => Box::new(Prompt),
        };
        debug!(%method, ?depth, %on_conflict, "starting bulk clone");

        let options = BulkCloneOptions { owner, workspace_root_dir, method, depth };
        let summary =
            bulk_clone(&self.cloner, &repos, options, resolver.as_mut(), |repo, outcome| {
                if let Err(err) = stdout.write_line(&OutcomeLine(repo, outcome).to_string()) {
                    warn!(%err, "failed to print progress");
                }
            })
            .await?;

        stdout.write_line(&SummaryLine(&summary).to_string())?;
        Ok(summary)
    }

    pub async fn create_repository(
        &self,
        name: &str,
        private: bool,
        description: Option<String>,
    ) -> Result<(), Error> {
        let fields =
            CreateRepository { name: name.to_owned(), description, private, auto_init: None };
        let created = self
            .github_client
            .repos()
            .create_repository(&fields)
            .await
            .with_context(|| format!("Failed to create repository {name}."))?;
        println!("Created {} at {}.", created.full_name, created.html_url);
        Ok(())
    }

    pub async fn delete_repository(
        &self,
        repo_id: PartialRepositoryId,
        confirmed: bool,
    ) -> Result<(), Error> {
        let repo_id = repo_id.complete(&self.settings.owner);

        if !confirmed
            && !Confirm::new()
                .with_prompt(format!("Delete {repo_id}? This can not be undone."))
                .default(false)
                .show_default(true)
                .wait_for_newline(true)
                .interact()?
        {
            return Ok(());
        }

        let RepositoryId { owner, name } = &repo_id;
        self.github_client
            .repos()
            .delete_repository(owner, name)
            .await
            .with_context(|| format!("Failed to delete repository {repo_id}."))?;
        println!("Deleted {repo_id}.");
        Ok(())
    }
}

/// Asks on the terminal what to do with each existing destination.
struct Prompt;

impl ResolveConflict for Prompt {
    fn resolve(
        &mut self,
        repo: &RepositoryDescriptor,
        path: &Path,
    ) -> Result<ConflictPolicy, Error> {
        const CHOICES: [(ConflictPolicy, &str); 3] = [
            (ConflictPolicy::Skip, "Skip"),
            (ConflictPolicy::Overwrite, "Overwrite"),
            (ConflictPolicy::Abort, "Abort remaining"),
        ];
        let items: Vec<_> = CHOICES.iter().map(|(_, label)| *label).collect();
        let choice = Select::new()
            .with_prompt(format!("{} already exists at `{}`", repo.name, path.display()))
            .items(&items)
            .default(0)
            .interact()?;
        Ok(CHOICES[choice].0)
    }
}

use crate::error::AppError;
use async_trait::async_trait;
use git2::build::CheckoutBuilder;
use git2::Repository;
use std::path::{Path, PathBuf};

/// Brings the content root up to date and reports the version it now holds.
#[async_trait]
pub trait ContentSync: Send + Sync {
    async fn refresh(&self) -> Result<String, AppError>;
}

/// Syncs a git checkout through libgit2; the version is the HEAD commit hash.
pub struct GitSync {
    root: PathBuf,
    repo_url: Option<String>,
}

impl GitSync {
    pub fn new(root: impl Into<PathBuf>, repo_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            repo_url,
        }
    }
}

/// Clone `url` into `target`.
pub fn clone_repo(url: &str, target: &Path) -> Result<Repository, AppError> {
    log::info!("Cloning {} into {:?}", url, target);
    let repo = Repository::clone(url, target)?;
    log::info!("Clone complete: {:?}", target);
    Ok(repo)
}

/// Fetch the checked-out branch from `origin` and fast-forward to it.
pub fn pull(repo: &Repository) -> Result<(), AppError> {
    let head = repo.head()?;
    let branch = head
        .shorthand()
        .filter(|_| head.is_branch())
        .ok_or_else(|| AppError::Sync("HEAD is not on a branch".into()))?
        .to_string();

    log::info!("Pulling branch {} of {:?}...", branch, repo.workdir());
    repo.find_remote("origin")?.fetch(&[branch.as_str()], None, None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetched = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetched])?;

    if analysis.is_up_to_date() {
        log::debug!("Branch {} is up to date", branch);
        return Ok(());
    }
    if !analysis.is_fast_forward() {
        return Err(AppError::Sync(format!(
            "branch {} has diverged from origin and cannot be fast-forwarded",
            branch
        )));
    }

    let refname = format!("refs/heads/{}", branch);
    repo.find_reference(&refname)?
        .set_target(fetched.id(), "fast-forward from origin")?;
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    log::info!("Fast-forwarded {} to {}", branch, fetched.id());
    Ok(())
}

pub fn head_commit(repo: &Repository) -> Result<String, AppError> {
    Ok(repo.head()?.peel_to_commit()?.id().to_string())
}

fn sync_checkout(root: &Path, repo_url: Option<&str>) -> Result<String, AppError> {
    let repo = if root.exists() {
        let repo = Repository::open(root)?;
        if let Err(e) = pull(&repo) {
            // stale content still builds
            log::error!("git pull failed, serving existing checkout: {}", e);
        }
        repo
    } else {
        match repo_url {
            Some(url) => clone_repo(url, root)?,
            None => {
                return Err(AppError::Sync(format!(
                    "content root {:?} does not exist and no repo_url is configured",
                    root
                )))
            }
        }
    };

    let commit = head_commit(&repo)?;
    log::info!("Content is at commit {}", commit);
    Ok(commit)
}

#[async_trait]
impl ContentSync for GitSync {
    async fn refresh(&self) -> Result<String, AppError> {
        let root = self.root.clone();
        let repo_url = self.repo_url.clone();
        tokio::task::spawn_blocking(move || sync_checkout(&root, repo_url.as_deref())).await?
    }
}

/// Leaves the content root untouched and reports a fixed version.
pub struct StaticSync {
    version: String,
}

impl StaticSync {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

#[async_trait]
impl ContentSync for StaticSync {
    async fn refresh(&self) -> Result<String, AppError> {
        Ok(self.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_sync_reports_its_version() {
        let sync = StaticSync::new("unversioned");
        assert_eq!(sync.refresh().await.unwrap(), "unversioned");
    }

    fn commit_file(repo: &Repository, name: &str) -> String {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), name).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = git2::Signature::now("Content Bot", "bot@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, name, &tree, &parents)
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn clones_then_fast_forwards_to_origin() {
        let dir = tempfile::tempdir().unwrap();
        let origin_path = dir.path().join("origin");
        let origin = Repository::init(&origin_path).unwrap();
        let first = commit_file(&origin, "a.toml");

        let checkout = dir.path().join("assets/repo");
        let sync = GitSync::new(&checkout, Some(origin_path.to_string_lossy().into_owned()));

        assert_eq!(sync.refresh().await.unwrap(), first);
        assert!(checkout.join("a.toml").exists());

        let second = commit_file(&origin, "b.toml");
        assert_eq!(sync.refresh().await.unwrap(), second);
        assert!(checkout.join("b.toml").exists());

        // nothing new upstream
        assert_eq!(sync.refresh().await.unwrap(), second);
    }

    #[tokio::test]
    async fn checkout_without_remote_keeps_its_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let commit = commit_file(&repo, "a.toml");

        let sync = GitSync::new(dir.path(), None);
        assert_eq!(sync.refresh().await.unwrap(), commit);
    }

    #[tokio::test]
    async fn missing_root_without_remote_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sync = GitSync::new(dir.path().join("absent"), None);
        assert!(matches!(sync.refresh().await, Err(AppError::Sync(_))));
    }
}

use std::{
    fs as std_fs, io,
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::debug;

/// A symlink that lives until [`LinkGuard::release`] or drop.
///
/// Whatever already sits at the link path, an `npm link` included, is moved
/// aside on acquire and put back on release.
#[derive(Debug)]
pub struct LinkGuard {
    link: PathBuf,
    backup: Option<PathBuf>,
    released: bool,
}

#[cfg(unix)]
async fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    fs::symlink(target, link).await
}

#[cfg(windows)]
async fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    fs::symlink_dir(target, link).await
}

fn backup_path(link: &Path) -> PathBuf {
    let mut name = link
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.bak", cuid2::create_id()));
    link.with_file_name(name)
}

fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = std_fs::symlink_metadata(path)?;
    if meta.is_dir() {
        return std_fs::remove_dir(path);
    }
    match std_fs::remove_file(path) {
        // Directory symlinks on Windows need remove_dir.
        Err(_) if cfg!(windows) => std_fs::remove_dir(path),
        other => other,
    }
}

fn cleanup(link: &Path, backup: Option<&Path>) -> io::Result<()> {
    let removed = match remove_entry(link) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    };
    if let Some(backup) = backup {
        std_fs::rename(backup, link)?;
    }
    removed
}

impl LinkGuard {
    /// Creates `link` pointing at `target`, making parent directories as needed.
    pub async fn acquire(target: &Path, link: &Path) -> io::Result<Self> {
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).await?;
        }

        let backup = match fs::symlink_metadata(link).await {
            Ok(_) => {
                let backup = backup_path(link);
                debug!(path=%link.display(), backup=%backup.display(), "Moving entry aside.");
                fs::rename(link, &backup).await?;
                Some(backup)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        if let Err(e) = make_link(target, link).await {
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, link).await;
            }
            return Err(e);
        }

        debug!(target=%target.display(), link=%link.display(), "Link created.");
        Ok(Self {
            link: link.to_path_buf(),
            backup,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.link
    }

    /// Removes the link and restores whatever it replaced.
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        let link = self.link.clone();
        let backup = self.backup.take();
        tokio::task::spawn_blocking(move || cleanup(&link, backup.as_deref()))
            .await
            .map_err(io::Error::other)?
    }
}

impl Drop for LinkGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = cleanup(&self.link, self.backup.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("pkg");
        std_fs::create_dir(&target).unwrap();
        std_fs::write(target.join("index.d.ts"), "export {}").unwrap();
        let link = dir.path().join("node_modules/pkg");

        let guard = LinkGuard::acquire(&target, &link).await.unwrap();
        assert!(link.is_symlink());
        assert!(link.join("index.d.ts").exists());

        guard.release().await.unwrap();
        assert!(!link.exists() && !link.is_symlink());
        assert!(target.join("index.d.ts").exists());
    }

    #[tokio::test]
    async fn existing_entry_is_restored() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("pkg");
        std_fs::create_dir(&target).unwrap();
        let link = dir.path().join("node_modules/pkg");
        std_fs::create_dir_all(&link).unwrap();
        std_fs::write(link.join("installed.txt"), "v1").unwrap();

        let guard = LinkGuard::acquire(&target, &link).await.unwrap();
        assert!(link.is_symlink());
        assert!(!link.join("installed.txt").exists());

        guard.release().await.unwrap();
        assert!(!link.is_symlink());
        assert_eq!(std_fs::read_to_string(link.join("installed.txt")).unwrap(), "v1");
        let leftovers = std_fs::read_dir(dir.path().join("node_modules"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_link_is_restored() {
        let dir = TempDir::new().unwrap();
        let linked = dir.path().join("linked");
        let target = dir.path().join("pkg");
        std_fs::create_dir(&linked).unwrap();
        std_fs::create_dir(&target).unwrap();
        let link = dir.path().join("node_modules/pkg");
        std_fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::os::unix::fs::symlink(&linked, &link).unwrap();

        let guard = LinkGuard::acquire(&target, &link).await.unwrap();
        assert_eq!(std_fs::read_link(&link).unwrap(), target);
        guard.release().await.unwrap();
        assert_eq!(std_fs::read_link(&link).unwrap(), linked);
    }

    #[tokio::test]
    async fn drop_cleans_up() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("pkg");
        std_fs::create_dir(&target).unwrap();
        let link = dir.path().join("node_modules/pkg");

        {
            let _guard = LinkGuard::acquire(&target, &link).await.unwrap();
            assert!(link.is_symlink());
        }
        assert!(!link.is_symlink());
    }

    #[tokio::test]
    async fn release_tolerates_missing_link() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("pkg");
        std_fs::create_dir(&target).unwrap();
        let link = dir.path().join("node_modules/pkg");

        let guard = LinkGuard::acquire(&target, &link).await.unwrap();
        std_fs::remove_file(&link).unwrap_or_else(|_| std_fs::remove_dir(&link).unwrap());
        guard.release().await.unwrap();
    }
}

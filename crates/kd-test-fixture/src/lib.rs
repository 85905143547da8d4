use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn fixtures_root() -> PathBuf {
    workspace_root().join("fixtures")
}

pub fn fixture_dir(name: &str) -> PathBuf {
    fixtures_root().join(name)
}

/// Minimal manifest for a skin with the given resolution folders.
pub fn skin_manifest(id: &str, folders: &[&str]) -> String {
    let res = folders
        .iter()
        .map(|folder| format!("    <res width=\"1920\" height=\"1080\" folder=\"{}\"/>\n", folder))
        .collect::<String>();
    format!(
        "<addon id=\"{}\" version=\"1.0.0\" name=\"{}\">\n  <requires><import addon=\"xbmc.gui\" version=\"5.15.0\"/></requires>\n  <extension point=\"xbmc.gui.skin\">\n{}  </extension>\n</addon>\n",
        id, id, res
    )
}

/// Scratch project directory removed on drop.
#[derive(Debug)]
pub struct TempProject {
    root: PathBuf,
}

impl TempProject {
    pub fn new(label: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);
        let root = std::env::temp_dir().join(format!(
            "kd-{}-{}-{}-{}",
            label,
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed),
            nanos
        ));
        fs::create_dir_all(&root).expect("temp project dir should be creatable");
        Self { root }
    }

    /// Skin project with `addon.xml` declaring `folders`.
    pub fn skin(label: &str, folders: &[&str]) -> Self {
        let project = Self::new(label);
        project.write("addon.xml", &skin_manifest(&format!("skin.{}", label), folders));
        for folder in folders {
            fs::create_dir_all(project.root.join(folder)).expect("xml folder should be creatable");
        }
        project
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be creatable");
        }
        fs::write(&path, contents).expect("fixture file should be writable");
        path
    }

    pub fn write_bytes(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be creatable");
        }
        fs::write(&path, contents).expect("fixture file should be writable");
        path
    }
}

impl Drop for TempProject {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

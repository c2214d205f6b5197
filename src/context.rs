use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::debug;

use crate::tree::Tree;

pub const SOURCE_EXTENSION: &str = "plume";

/// The source text of every file read during a compilation, by file name.
#[derive(Debug, Default)]
pub struct FileCache {
    files: HashMap<Rc<str>, Rc<str>>,
}

impl FileCache {
    /// Reads `path`, caching its contents. Returns the cached name and text.
    pub fn load(&mut self, path: &Path) -> io::Result<(Rc<str>, Rc<str>)> {
        let name: Rc<str> = path.to_string_lossy().into();
        if let Some(text) = self.files.get(&name) {
            return Ok((name, Rc::clone(text)));
        }
        let text: Rc<str> = fs::read_to_string(path)?.into();
        self.files.insert(Rc::clone(&name), Rc::clone(&text));
        Ok((name, text))
    }

    /// Registers an in-memory source under `name`.
    pub fn insert(&mut self, name: &str, text: &str) -> (Rc<str>, Rc<str>) {
        let name: Rc<str> = name.into();
        let text: Rc<str> = text.into();
        self.files.insert(Rc::clone(&name), Rc::clone(&text));
        (name, text)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|text| &**text)
    }

    /// Returns the 1-based `line` of `name`, without its line break.
    pub fn line(&self, name: &str, line: u32) -> Option<&str> {
        let text = self.get(name)?;
        let line = text.lines().nth(line.checked_sub(1)? as usize)?;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Where imports not found relative to the working directory are looked
    /// up.
    pub stdlib_dir: PathBuf,
    pub extension: &'static str,
}

impl Default for Config {
    /// The standard library lives in `lib/`, next to the compiler executable.
    fn default() -> Self {
        let stdlib_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("lib")))
            .unwrap_or_else(|| PathBuf::from("lib"));
        Config {
            stdlib_dir,
            extension: SOURCE_EXTENSION,
        }
    }
}

impl Config {
    /// Maps an import to a relative file name: `a.b` becomes `a/b.plume`, a
    /// quoted import is taken literally.
    pub fn module_file(&self, import: &Import) -> PathBuf {
        match import {
            Import::Module(path) => {
                let mut file: PathBuf = path.split('.').collect();
                file.set_extension(self.extension);
                file
            }
            Import::File(path) => PathBuf::from(&**path),
        }
    }

    /// Finds the file an import refers to, first relative to the working
    /// directory and then in the standard library.
    pub fn resolve(&self, import: &Import) -> Option<PathBuf> {
        let file = self.module_file(import);
        if file.is_file() {
            return Some(file);
        }
        let in_stdlib = self.stdlib_dir.join(&file);
        debug!(module = %file.display(), stdlib = %self.stdlib_dir.display(), "looking up stdlib");
        in_stdlib.is_file().then_some(in_stdlib)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Import {
    /// `import a.b`
    Module(Box<str>),
    /// `import "a/b.plume"`
    File(Box<str>),
}

impl std::fmt::Display for Import {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Import::Module(path) => f.write_str(path),
            Import::File(path) => write!(f, "{path:?}"),
        }
    }
}

/// Everything a compilation shares: the files read so far, the configuration
/// and the tree being built.
#[derive(Debug)]
pub struct Context {
    pub files: FileCache,
    pub config: Config,
    pub tree: Tree,
}

impl Context {
    pub fn new(config: Config) -> Context {
        Context {
            files: FileCache::default(),
            config,
            tree: Tree::new(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_file_names() {
        let config = Config {
            stdlib_dir: PathBuf::from("/opt/plume/lib"),
            extension: SOURCE_EXTENSION,
        };
        assert_eq!(
            config.module_file(&Import::Module("net.tcp".into())),
            Path::new("net").join("tcp.plume")
        );
        assert_eq!(
            config.module_file(&Import::File("x/y.plume".into())),
            PathBuf::from("x/y.plume")
        );
    }

    #[test]
    fn resolves_in_stdlib() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("collections_for_test.plume"), "").unwrap();
        let config = Config {
            stdlib_dir: dir.path().to_path_buf(),
            extension: SOURCE_EXTENSION,
        };
        let import = Import::Module("collections_for_test".into());
        assert_eq!(
            config.resolve(&import),
            Some(dir.path().join("collections_for_test.plume"))
        );
        assert_eq!(config.resolve(&Import::Module("missing_module".into())), None);
    }

    #[test]
    fn file_cache_lines() {
        let mut files = FileCache::default();
        files.insert("a.plume", "one\r\ntwo\nthree");
        assert_eq!(files.line("a.plume", 2), Some("two"));
        assert_eq!(files.line("a.plume", 1), Some("one"));
        assert_eq!(files.line("a.plume", 4), None);
        assert_eq!(files.line("a.plume", 0), None);
    }
}

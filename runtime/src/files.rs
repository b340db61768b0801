//! File access for packaging and rendering.

use std::fs;
use std::path::{Component, Path, PathBuf};

use automate_core::{
    CodeTemplate, CodeTemplateFile, Pattern, ToolkitDefinition, VersionInstruction, package,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, RuntimeError};

/// Locates, reads and writes files on behalf of automation.
pub trait FilePathResolver {
    fn exists_at_path(&self, path: &Path) -> bool;

    fn get_file_at_path(&self, path: &Path) -> Result<Vec<u8>>;

    /// Joins a `/` or `\` separated relative path onto `root`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::PathOutsideRoot`] for absolute paths and for
    /// paths with a `..` component.
    fn create_path(&self, root: &Path, relative: &str) -> Result<PathBuf>;

    /// Final component of `path`, or an empty string.
    fn get_filename(&self, path: &Path) -> String;

    fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>>;

    /// Writes `contents`, creating missing parent directories.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;
}

/// [`FilePathResolver`] over the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FilePathResolver for LocalFileSystem {
    fn exists_at_path(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get_file_at_path(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| RuntimeError::io(path, e))
    }

    fn create_path(&self, root: &Path, relative: &str) -> Result<PathBuf> {
        let outside = |reason: &str| RuntimeError::PathOutsideRoot {
            path: relative.to_string(),
            reason: reason.to_string(),
        };
        if relative.starts_with(['/', '\\']) {
            return Err(outside("absolute path"));
        }

        let mut path = root.to_path_buf();
        for part in relative.split(['/', '\\']) {
            match Path::new(part).components().next() {
                None | Some(Component::CurDir) => {}
                Some(Component::ParentDir) => return Err(outside("parent directory component")),
                Some(Component::RootDir | Component::Prefix(_)) => {
                    return Err(outside("absolute path"));
                }
                Some(Component::Normal(_)) => path.push(part),
            }
        }
        Ok(path)
    }

    fn get_filename(&self, path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| RuntimeError::io(path, e))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RuntimeError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| RuntimeError::io(path, e))?;
        debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
        Ok(())
    }
}

/// Reads the source of every code template declared in `pattern`.
///
/// Each template's `original_file_path` is resolved against `source_root`.
///
/// # Errors
///
/// Returns [`RuntimeError::Io`] for a template whose source cannot be read.
pub fn read_code_templates(
    pattern: &Pattern,
    source_root: &Path,
    files: &impl FilePathResolver,
) -> Result<Vec<CodeTemplateFile>> {
    let mut templates: Vec<&CodeTemplate> = Vec::new();
    pattern
        .root
        .walk(&mut |element| templates.extend(element.code_templates.iter()));

    templates
        .into_iter()
        .map(|template| {
            let path = files.create_path(source_root, &template.original_file_path)?;
            let contents = files.get_file_at_path(&path)?;
            let modified = files.modified_at(&path)?;
            Ok(CodeTemplateFile::new(template.id.clone(), contents, modified))
        })
        .collect()
}

/// Packages `pattern` with template sources read from `source_root`.
///
/// # Errors
///
/// Fails like [`read_code_templates`] and [`package`].
pub fn package_toolkit(
    pattern: &mut Pattern,
    source_root: &Path,
    files: &impl FilePathResolver,
    instruction: VersionInstruction,
) -> Result<ToolkitDefinition> {
    let templates = read_code_templates(pattern, source_root, files)?;
    let toolkit = package(pattern, templates, instruction)?;
    debug!(
        pattern = %toolkit.name(),
        version = %toolkit.version,
        templates = toolkit.code_template_files.len(),
        "Packaged toolkit"
    );
    Ok(toolkit)
}

// Declaration sources: where content-type declarations come from

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use super::declaration::{Attributes, ContentTypeDeclaration};

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("Declarations directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Duplicate content type identifier: {0}")]
    Duplicate(String),

    #[error("Declaration loading task failed: {0}")]
    Task(String),
}

/// Ordered, identifier-unique set of declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSet {
    declarations: Vec<ContentTypeDeclaration>,
}

impl DeclarationSet {
    pub fn new(declarations: Vec<ContentTypeDeclaration>) -> Result<Self, DeclarationError> {
        for (i, decl) in declarations.iter().enumerate() {
            if declarations[..i].iter().any(|d| d.identifier == decl.identifier) {
                return Err(DeclarationError::Duplicate(decl.identifier.clone()));
            }
        }
        Ok(Self { declarations })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentTypeDeclaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&ContentTypeDeclaration> {
        self.declarations.iter().find(|d| d.identifier == identifier)
    }

    /// Look a declaration up by identifier or by its physical table name
    pub fn find(&self, name: &str) -> Option<&ContentTypeDeclaration> {
        self.get(name)
            .or_else(|| self.declarations.iter().find(|d| d.physical_table_name() == name))
    }

    /// Physical table of the content type `identifier`
    pub fn physical_table(&self, identifier: &str) -> Option<String> {
        self.get(identifier).map(ContentTypeDeclaration::physical_table_name)
    }

    /// SHA-256 over the canonical serialization; changes whenever any
    /// declaration, attribute or attribute order changes.
    pub fn version(&self) -> String {
        let mut hasher = Sha256::new();
        for decl in &self.declarations {
            // Serializing plain data structures into a Vec cannot fail
            let bytes = serde_json::to_vec(decl).unwrap_or_default();
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(&bytes);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Read-only source of the global content model
#[async_trait]
pub trait DeclarationSource: Send + Sync {
    /// All declarations, in a stable order. Assumed not to change for the
    /// duration of one provisioning run.
    async fn list_declarations(&self) -> Result<DeclarationSet, DeclarationError>;
}

/// Fixed in-memory declarations
#[derive(Debug, Clone, Default)]
pub struct StaticDeclarationSource {
    set: DeclarationSet,
}

impl StaticDeclarationSource {
    pub fn new(declarations: Vec<ContentTypeDeclaration>) -> Result<Self, DeclarationError> {
        Ok(Self { set: DeclarationSet::new(declarations)? })
    }
}

#[async_trait]
impl DeclarationSource for StaticDeclarationSource {
    async fn list_declarations(&self) -> Result<DeclarationSet, DeclarationError> {
        Ok(self.set.clone())
    }
}

/// Declarations stored as JSON/YAML documents below a directory
#[derive(Debug, Clone)]
pub struct FileDeclarationSource {
    root: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentOptions {
    #[serde(default, rename = "draftAndPublish")]
    draft_and_publish: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DeclarationDocument {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default, alias = "collectionName")]
    table_name: Option<String>,
    #[serde(default, alias = "draftAndPublish")]
    draft_and_publish: Option<bool>,
    #[serde(default)]
    options: DocumentOptions,
    #[serde(default)]
    attributes: Attributes,
}

impl FileDeclarationSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(root: &Path) -> Result<DeclarationSet, DeclarationError> {
        if !root.is_dir() {
            return Err(DeclarationError::MissingDirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();
        collect_documents(root, &mut files)?;
        files.sort();

        let declarations = files
            .iter()
            .map(|path| Self::parse_document(root, path))
            .collect::<Result<Vec<_>, _>>()?;

        DeclarationSet::new(declarations)
    }

    fn parse_document(root: &Path, path: &Path) -> Result<ContentTypeDeclaration, DeclarationError> {
        let text = std::fs::read_to_string(path).map_err(|source| DeclarationError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| DeclarationError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let document: DeclarationDocument = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
            _ => serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        };

        let identifier = match document.identifier {
            Some(id) if !id.trim().is_empty() => id,
            _ => derive_identifier(root, path)
                .ok_or_else(|| parse_error("cannot derive a content type identifier".to_string()))?,
        };

        Ok(ContentTypeDeclaration {
            identifier,
            table_name: document.table_name,
            draft_and_publish: document
                .draft_and_publish
                .or(document.options.draft_and_publish)
                .unwrap_or(false),
            attributes: document.attributes,
        })
    }
}

#[async_trait]
impl DeclarationSource for FileDeclarationSource {
    async fn list_declarations(&self) -> Result<DeclarationSet, DeclarationError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::load(&root))
            .await
            .map_err(|e| DeclarationError::Task(e.to_string()))?
    }
}

fn collect_documents(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DeclarationError> {
    let io_error = |source| DeclarationError::Io { path: dir.to_path_buf(), source };

    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect_documents(&path, files)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("yaml") | Some("yml")
        ) {
            files.push(path);
        }
    }
    Ok(())
}

/// `api/<api>/content-types/<type>/schema.json` -> `api::<api>.<type>`,
/// anything else -> the file stem.
fn derive_identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    if let [.., "api", api, "content-types", content_type, _file] = parts.as_slice() {
        return Some(format!("api::{}.{}", api, content_type));
    }

    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

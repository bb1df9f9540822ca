//! Trial Planner
//!
//! Builds the execution plan: the codec configurations to run and the corpus
//! they run over.
//!
//! Filtering options:
//! - Regex pattern matching on configuration labels
//! - Restriction to a single corpus category
//!
//! Ordering: configurations keep declaration order, categories keep
//! configuration-file order, files are sorted lexicographically within a
//! category.

use crate::config::CorpusConfig;
use codecbench_core::{CodecConfiguration, CodecError, Label, SourceFile};
use codecbench_stats::{AggregateError, ensure_unique_labels};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while building a plan
#[derive(Debug, Error)]
pub enum PlanError {
    /// A corpus glob pattern is malformed
    #[error("invalid pattern \"{pattern}\" for category \"{category}\": {source}")]
    Pattern {
        /// Category owning the pattern
        category: String,
        /// Offending pattern
        pattern: String,
        /// Underlying error
        #[source]
        source: glob::PatternError,
    },

    /// A directory could not be read while expanding a pattern
    #[error("failed to expand corpus pattern: {0}")]
    Walk(#[from] glob::GlobError),

    /// One file is matched by the patterns of two categories
    #[error("{path} belongs to both \"{first}\" and \"{second}\"")]
    SharedFile {
        /// Matched file
        path: String,
        /// Category that claimed it first
        first: String,
        /// Category that matched it again
        second: String,
    },

    /// `--category` names a category the configuration does not declare
    #[error("unknown category \"{0}\"")]
    UnknownCategory(String),

    /// A codec configuration is unusable
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Labels collide
    #[error(transparent)]
    Labels(#[from] AggregateError),
}

/// One corpus category with its discovered files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Category name
    pub name: String,
    /// Files in lexicographic order
    pub files: Vec<SourceFile>,
}

/// Categorized reference files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    /// Categories in enumeration order
    pub categories: Vec<Category>,
}

impl Corpus {
    /// Category names in order
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Every file, category by category
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.categories.iter().flat_map(|c| c.files.iter())
    }

    /// Total number of files
    pub fn file_count(&self) -> usize {
        self.categories.iter().map(|c| c.files.len()).sum()
    }
}

/// Expand the configured patterns into a corpus.
///
/// Relative patterns are resolved against `base`. Matches are normalized to
/// `/` separators, sorted and deduplicated; a category without matches stays
/// in the corpus with no files. A file may belong to one category only.
pub fn discover_corpus(
    corpus: &[CorpusConfig],
    base: &Path,
    only: Option<&str>,
) -> Result<Corpus, PlanError> {
    if let Some(name) = only {
        if !corpus.iter().any(|c| c.name == name) {
            return Err(PlanError::UnknownCategory(name.to_string()));
        }
    }

    let mut owners: HashMap<String, String> = HashMap::new();
    let mut categories = Vec::with_capacity(corpus.len());
    for entry in corpus {
        if only.is_some_and(|name| name != entry.name) {
            continue;
        }

        let mut paths: Vec<String> = Vec::new();
        for pattern in &entry.patterns {
            let full = if Path::new(pattern).is_absolute() {
                pattern.clone()
            } else {
                format!(
                    "{}/{}",
                    glob::Pattern::escape(&base.to_string_lossy()),
                    pattern
                )
            };
            let matches = glob::glob(&full).map_err(|source| PlanError::Pattern {
                category: entry.name.clone(),
                pattern: pattern.clone(),
                source,
            })?;
            for path in matches {
                let path = path?;
                if path.is_file() {
                    paths.push(path.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        paths.sort();
        paths.dedup();
        for path in &paths {
            if let Some(first) = owners.insert(path.clone(), entry.name.clone()) {
                return Err(PlanError::SharedFile {
                    path: path.clone(),
                    first,
                    second: entry.name.clone(),
                });
            }
        }

        tracing::debug!(category = %entry.name, files = paths.len(), "discovered corpus category");
        categories.push(Category {
            name: entry.name.clone(),
            files: paths
                .into_iter()
                .map(|p| SourceFile::new(p, entry.name.clone()))
                .collect(),
        });
    }

    Ok(Corpus { categories })
}

/// A configuration selected for execution
#[derive(Debug, Clone)]
pub struct PlannedCodec {
    /// Table label
    pub label: Label,
    /// Configuration the adapter is built from
    pub config: CodecConfiguration,
}

/// Execution plan for a run
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Configurations in declaration order
    pub codecs: Vec<PlannedCodec>,
    /// Corpus to run every configuration over
    pub corpus: Corpus,
}

impl ExecutionPlan {
    /// Labels of the selected configurations
    pub fn labels(&self) -> Vec<Label> {
        self.codecs.iter().map(|c| c.label.clone()).collect()
    }

    /// Number of trials the plan will run
    pub fn trial_count(&self) -> usize {
        self.codecs.len() * self.corpus.file_count()
    }
}

/// Build execution plan from the declared configurations.
///
/// Label uniqueness is checked over every declared configuration, before the
/// filter is applied, so a configuration file is either valid or not
/// independent of the command line.
pub fn build_plan(
    codecs: &[CodecConfiguration],
    filter: Option<&regex::Regex>,
    corpus: Corpus,
) -> Result<ExecutionPlan, PlanError> {
    let planned = codecs
        .iter()
        .map(|config| {
            Ok(PlannedCodec {
                label: config.label()?,
                config: config.clone(),
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    ensure_unique_labels(planned.iter().map(|p| &p.label))?;

    let selected = planned
        .into_iter()
        .filter(|p| filter.map_or(true, |re| re.is_match(p.label.as_str())))
        .collect();

    Ok(ExecutionPlan {
        codecs: selected,
        corpus,
    })
}

//! Loading descriptor catalogs from YAML, JSON or TOML with `${param}` substitution

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::{collections::HashMap, path::Path};

use datafusion::sql::sqlparser::parser::ParserError;
use datafusion::sql::{parser::DFParser, sqlparser::dialect::RedshiftSqlDialect};
use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use qbo_mirror_schemas::{Catalog, SchemaError};
use regex::Regex;
use tracing::debug;

use crate::loader::LoadPlan;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum TemplateError {
    #[error("Catalog file not found: '{file_path}'")]
    #[diagnostic(
        code(qbo_mirror::template::file_not_found),
        help("Check that the file path is correct and the file exists")
    )]
    NotFound {
        #[source]
        source: std::io::Error,
        file_path: String,
    },

    #[error("Unsupported catalog format: '{0}'")]
    #[diagnostic(
        code(qbo_mirror::template::unknown_format),
        help(
            "The catalog format '{0}' is not supported in this build.\n\
             \n\
             Available formats in this build:\n\
             {}\n\
             \n\
             Other formats need the matching feature flag: json, yaml or toml",
            Self::available_formats()
        )
    )]
    UnknownFormat(TemplateFormat),

    #[error("Missing template parameters: {0:?}")]
    #[diagnostic(
        code(qbo_mirror::template::missing_params),
        help(
            "Provide the missing parameters using the -p flag.\n\
              \n\
              Example:\n\
              qbo-mirror run -f descriptors/quickbooks.yml -p bucket=datalake -p prefix=to_redshift -p schema=finance"
        )
    )]
    MissingParams(HashSet<String>),

    #[cfg(feature = "json")]
    #[error("JSON parsing error")]
    #[diagnostic(code(qbo_mirror::template::json_parse_error))]
    ParseJson {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[label("{}", error)]
        span: SourceSpan,
        #[source]
        error: serde_json::Error,
    },

    #[cfg(feature = "yaml")]
    #[error("YAML parsing error")]
    #[diagnostic(code(qbo_mirror::template::yaml_parse_error))]
    ParseYaml {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[label("{}", error)]
        span: SourceSpan,
        #[source]
        error: serde_yml::Error,
    },

    #[cfg(feature = "toml")]
    #[error(transparent)]
    #[diagnostic(code(qbo_mirror::template::toml_serialize_error))]
    ParseSerToml(#[from] toml::ser::Error),

    #[cfg(feature = "toml")]
    #[error("TOML parsing error")]
    #[diagnostic(code(qbo_mirror::template::toml_parse_error))]
    ParseDeToml {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[label("{}", error)]
        span: SourceSpan,
        #[source]
        error: toml::de::Error,
    },

    #[error("Invalid descriptor catalog: {0}")]
    #[diagnostic(
        code(qbo_mirror::template::invalid_catalog),
        help("Every produced column needs a warehouse column and a declared type, and table names and object paths may not be shared between datasets")
    )]
    InvalidCatalog(#[from] SchemaError),

    #[error("SQL syntax error in generated warehouse statement")]
    #[diagnostic(
        code(qbo_mirror::template::sql_validation_error),
        help(
            "Check the warehouse column types and cast expressions of dataset '{name}'"
        )
    )]
    SqlValidation {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[source]
        error: ParserError,
        #[label("syntax error in dataset '{name}'")]
        span: SourceSpan,
        name: String,
    },
}

impl TemplateError {
    fn available_formats() -> String {
        let mut formats = vec![];

        #[cfg(feature = "json")]
        formats.push("• JSON (.json)");

        #[cfg(feature = "yaml")]
        formats.push("• YAML (.yaml, .yml)");

        #[cfg(feature = "toml")]
        formats.push("• TOML (.toml)");

        if formats.is_empty() {
            "No formats are currently enabled".to_string()
        } else {
            formats.join("\n")
        }
    }
}

/// Serialization format of a descriptor catalog, usually inferred from the file extension
#[derive(Debug, Clone)]
pub enum TemplateFormat {
    Json,
    Toml,
    Yaml,
    Unknown(String),
}

impl std::fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateFormat::Json => write!(f, "json"),
            TemplateFormat::Toml => write!(f, "toml"),
            TemplateFormat::Yaml => write!(f, "yaml"),
            TemplateFormat::Unknown(format) => write!(f, "{format}"),
        }
    }
}

/// Loads a [`Catalog`] and checks it before anything touches the network.
///
/// Template parameters use the `${parameter_name}` syntax and are substituted after
/// the document has been parsed once, so syntax errors point at the original text.
/// A loaded catalog has passed descriptor validation and every generated `CREATE`,
/// replace and `INSERT` statement parses with the Redshift dialect.
pub trait TemplateLoader {
    fn from_file<P: AsRef<Path>>(
        path: P,
        format: TemplateFormat,
        params: HashMap<String, String>,
    ) -> Result<Catalog, TemplateError>;

    fn from_str<T: AsRef<str>>(
        value: T,
        format: TemplateFormat,
        params: HashMap<String, String>,
    ) -> Result<Catalog, TemplateError>;

    /// Replace every `${name}` with its value, fails listing all names left unresolved
    fn substitute_params(
        raw: &str,
        params: HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
        let mut definition = raw.to_string();

        params.into_iter().for_each(|(name, value)| {
            let template = format!("${{{name}}}");
            definition = definition.replace(template.as_str(), value.as_str());
        });

        let missing_params = PARAM_REGEX
            .get_or_init(|| Regex::new("\\$\\{([a-zA-Z0-9_]+)\\}").expect("invalid regex"))
            .captures_iter(definition.as_str())
            .filter_map(|capture| capture.get(1))
            .map(|param| param.as_str().to_string())
            .collect::<HashSet<String>>();

        if !missing_params.is_empty() {
            return Err(TemplateError::MissingParams(missing_params));
        }

        Ok(definition)
    }

    /// Parse the warehouse statements every dataset will run
    fn validate_sql(catalog: &Catalog) -> Result<(), TemplateError> {
        let dialect = RedshiftSqlDialect {};

        for descriptor in &catalog.datasets {
            let strategy = descriptor.replace_strategy.unwrap_or_default();
            let plan = LoadPlan::new(descriptor, "", strategy);

            for sql in [&plan.create_staging, &plan.replace, &plan.insert] {
                DFParser::parse_sql_with_dialect(sql, &dialect).map_err(|error| {
                    let span = match Self::try_extract_error_position(&error.to_string()) {
                        Some((line, column)) => {
                            let offset = SourceOffset::from_location(sql, line, column);
                            SourceSpan::new(offset, 1)
                        }
                        None => SourceSpan::new(0.into(), sql.len()),
                    };

                    TemplateError::SqlValidation {
                        source_code: Arc::new(
                            NamedSource::new(descriptor.name(), sql.clone()).with_language("SQL"),
                        ),
                        error,
                        span,
                        name: descriptor.name().to_string(),
                    }
                })?;
            }
        }

        Ok(())
    }

    // sqlparser only reports positions inside the error message
    fn try_extract_error_position(error_msg: &str) -> Option<(usize, usize)> {
        static ERROR_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = ERROR_REGEX.get_or_init(|| {
            Regex::new(r"(?:at\s+)?Line:\s*(\d+),\s*Column:\s*(\d+)").expect("invalid regex")
        });

        let captures = regex.captures(error_msg)?;
        let line = captures.get(1)?.as_str().parse::<usize>().ok()?;
        let column = captures.get(2)?.as_str().parse::<usize>().ok()?;
        Some((line, column))
    }
}

impl TemplateLoader for Catalog {
    fn from_file<T: AsRef<Path>>(
        path: T,
        format: TemplateFormat,
        params: HashMap<String, String>,
    ) -> Result<Catalog, TemplateError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| TemplateError::NotFound {
            source: e,
            file_path: path.display().to_string(),
        })?;
        Self::from_str(contents, format, params)
    }

    fn from_str<T: AsRef<str>>(
        value: T,
        format: TemplateFormat,
        params: HashMap<String, String>,
    ) -> Result<Catalog, TemplateError> {
        let contents = value.as_ref();

        debug!("Parsing catalog with format: {format:?}");

        let catalog = match format {
            TemplateFormat::Toml => {
                #[cfg(feature = "toml")]
                {
                    let toml_error = |source: &str, error: toml::de::Error| {
                        let offset = error
                            .span()
                            .map(|span| SourceOffset::from(span.start))
                            .unwrap_or_else(|| SourceOffset::from(0));
                        TemplateError::ParseDeToml {
                            source_code: Arc::new(NamedSource::new(
                                "catalog.toml",
                                source.to_string(),
                            )),
                            span: SourceSpan::new(offset, 1),
                            error,
                        }
                    };

                    let parsed = toml::from_str::<toml::Value>(contents)
                        .map_err(|error| toml_error(contents, error))?;
                    let parsed = toml::to_string(&parsed)?;
                    let definition = Self::substitute_params(parsed.as_str(), params)?;
                    toml::from_str::<Catalog>(definition.as_str())
                        .map_err(|error| toml_error(&definition, error))?
                }
                #[cfg(not(feature = "toml"))]
                {
                    return Err(TemplateError::UnknownFormat(TemplateFormat::Toml));
                }
            }
            TemplateFormat::Json => {
                #[cfg(feature = "json")]
                {
                    let json_error = |source: &str, error: serde_json::Error| {
                        let offset =
                            SourceOffset::from_location(source, error.line(), error.column());
                        TemplateError::ParseJson {
                            source_code: Arc::new(NamedSource::new(
                                "catalog.json",
                                source.to_string(),
                            )),
                            span: SourceSpan::new(offset, 1),
                            error,
                        }
                    };

                    let parsed = serde_json::from_str::<serde_json::Value>(contents)
                        .map_err(|error| json_error(contents, error))?;
                    let parsed = serde_json::to_string(&parsed)
                        .map_err(|error| json_error(contents, error))?;
                    let definition = Self::substitute_params(parsed.as_str(), params)?;
                    serde_json::from_str::<Catalog>(definition.as_str())
                        .map_err(|error| json_error(&definition, error))?
                }
                #[cfg(not(feature = "json"))]
                {
                    return Err(TemplateError::UnknownFormat(TemplateFormat::Json));
                }
            }
            TemplateFormat::Yaml => {
                #[cfg(feature = "yaml")]
                {
                    let yaml_error = |source: &str, error: serde_yml::Error| {
                        let offset = error
                            .location()
                            .map(|location| {
                                SourceOffset::from_location(
                                    source,
                                    location.line(),
                                    location.column(),
                                )
                            })
                            .unwrap_or_else(|| SourceOffset::from(0));
                        TemplateError::ParseYaml {
                            source_code: Arc::new(NamedSource::new(
                                "catalog.yml",
                                source.to_string(),
                            )),
                            span: SourceSpan::new(offset, 1),
                            error,
                        }
                    };

                    let parsed = serde_yml::from_str::<serde_yml::Value>(contents)
                        .map_err(|error| yaml_error(contents, error))?;
                    let parsed = serde_yml::to_string(&parsed)
                        .map_err(|error| yaml_error(contents, error))?;
                    let definition = Self::substitute_params(parsed.as_str(), params)?;
                    serde_yml::from_str::<Catalog>(definition.as_str())
                        .map_err(|error| yaml_error(&definition, error))?
                }
                #[cfg(not(feature = "yaml"))]
                {
                    return Err(TemplateError::UnknownFormat(TemplateFormat::Yaml));
                }
            }
            fmt @ TemplateFormat::Unknown(_) => return Err(TemplateError::UnknownFormat(fmt)),
        };

        catalog.validate()?;
        Self::validate_sql(&catalog)?;

        Ok(catalog)
    }
}

pub fn format_from_path<P: AsRef<Path>>(path: P) -> TemplateFormat {
    let path = path.as_ref();
    let ext = path.extension().and_then(|s| s.to_str());

    match ext {
        Some("toml") => TemplateFormat::Toml,
        Some("json") => TemplateFormat::Json,
        Some("yml") | Some("yaml") => TemplateFormat::Yaml,
        ext => TemplateFormat::Unknown(ext.unwrap_or("unknown_ext").to_string()),
    }
}

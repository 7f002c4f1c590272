//! Command-line arguments
//!
//! Values given on the command line (or through their environment
//! variables) override the TOML config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_client::{ClientConfig, ClientError};

/// Survey - field survey endpoint from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "survey")]
#[command(about = "Query and record field survey data from the command line")]
pub struct Args {
    /// TOML config file
    #[arg(long, env = "SURVEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Endpoint URL override
    #[arg(long, env = "SURVEY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Session file override
    #[arg(long, env = "SURVEY_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Request timeout in seconds (no timeout when unset)
    #[arg(long, env = "SURVEY_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Concurrent village lookups when computing counts (0 = unbounded)
    #[arg(long, env = "SURVEY_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Log in and store the user record
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "SURVEY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored user
    Logout,

    /// Show the stored user and where they land
    Whoami,

    /// All rows of a table
    List {
        table: String,
        /// Case-insensitive name filter
        #[arg(long)]
        name: Option<String>,
    },

    /// Rows of a table where a field equals a value
    Read {
        table: String,
        field: String,
        value: String,
    },

    /// Panchayats for the logged-in user, with recorded counts
    Panchayats {
        /// List one district instead of the user's CLF
        #[arg(long)]
        district: Option<String>,
        /// Resolve this CLF instead of the user's assignment
        #[arg(long, conflicts_with = "district")]
        clf: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Villages of a panchayat
    Villages {
        panchayat_id: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Self-help groups of a village
    Shgs {
        village_id: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Beneficiaries of a self-help group
    Beneficiaries {
        shg_id: String,
        /// Only beneficiaries with a saved enterprise record
        #[arg(long)]
        recorded: bool,
        #[arg(long)]
        name: Option<String>,
    },

    /// District-level analytics
    Analytics,

    /// Enterprise records
    #[command(subcommand)]
    Enterprise(EnterpriseCommands),

    /// Upload image files and print their URLs
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Target folder id
        #[arg(long)]
        folder: Option<String>,
        /// MIME type for every file (guessed from the extension otherwise)
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum EnterpriseCommands {
    /// Show the saved record of a beneficiary
    Show { beneficiary_id: String },

    /// Create or update the record of a beneficiary
    Save {
        beneficiary_id: String,
        /// Field assignment, repeatable (e.g. --set enterprise_name=Tailoring)
        #[arg(long = "set", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record by its own id
    Delete { id: String },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got '{}'", raw)),
    }
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn client_config(&self) -> Result<ClientConfig, ClientError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(session_file) = &self.session_file {
            config.session_file = session_file.clone();
        }
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
        if let Some(limit) = self.max_concurrent {
            config.max_concurrent_lookups = limit;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate arguments that do not depend on the config file.
    pub fn validate(&self) -> Result<(), String> {
        if let Commands::Login { username, password } = &self.command {
            if username.trim().is_empty() || password.is_empty() {
                return Err("username and password must not be empty".to_string());
            }
        }
        if let Commands::Upload { files, .. } = &self.command {
            if let Some(missing) = files.iter().find(|f| !f.is_file()) {
                return Err(format!("not a file: {}", missing.display()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("survey.toml");
        std::fs::write(
            &path,
            "endpoint = \"http://file.test/exec\"\nmax_concurrent_lookups = 2\n",
        )
        .unwrap();

        let args = parse(&[
            "survey",
            "--config",
            path.to_str().unwrap(),
            "--endpoint",
            "http://flag.test/exec",
            "analytics",
        ]);
        let config = args.client_config().unwrap();
        assert_eq!(config.endpoint, "http://flag.test/exec");
        assert_eq!(config.max_concurrent_lookups, 2);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let args = parse(&["survey", "--endpoint", "ftp://nope", "analytics"]);
        assert!(args.client_config().is_err());
    }

    #[test]
    fn test_enterprise_save_assignments() {
        let args = parse(&[
            "survey",
            "enterprise",
            "save",
            "ben-1",
            "--set",
            "enterprise_name=Leaf plates",
            "--set",
            "monthly_sales=1200",
        ]);
        match args.command {
            Commands::Enterprise(EnterpriseCommands::Save { beneficiary_id, fields }) => {
                assert_eq!(beneficiary_id, "ben-1");
                assert_eq!(fields[0], ("enterprise_name".into(), "Leaf plates".into()));
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bad_assignment_rejected() {
        assert!(parse_assignment("no_equals").is_err());
        assert!(parse_assignment("=value").is_err());
        assert_eq!(parse_assignment("a=b=c").unwrap(), ("a".into(), "b=c".into()));
    }

    #[test]
    fn test_district_conflicts_with_clf() {
        let result =
            Args::try_parse_from(["survey", "panchayats", "--district", "3", "--clf", "7"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_upload_requires_existing_files() {
        let args = parse(&["survey", "upload", "/definitely/not/here.jpg"]);
        assert!(args.validate().is_err());
    }
}

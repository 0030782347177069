mod commands;
mod display;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use leadlist_core::FieldSchema;
use leadlist_sync::{Credentials, HttpAuthenticator, RetryPolicy, Submitter, SubmitterConfig};

#[derive(Parser)]
#[command(
    name = "leadlist",
    version,
    about = "Validate leads and submit them to a remote contact list"
)]
struct Cli {
    /// Base URL of the remote list service.
    #[arg(long, env = "LEADLIST_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    #[arg(long, env = "LEADLIST_USERNAME", default_value = "")]
    username: String,

    #[arg(long, env = "LEADLIST_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// JSON field schema; the built-in lead schema when omitted.
    #[arg(long, env = "LEADLIST_SCHEMA")]
    schema: Option<PathBuf>,

    /// Records carrying this field go to `--member-list`.
    #[arg(long, env = "LEADLIST_MEMBER_KEY", default_value = "member_id")]
    member_key: String,

    #[arg(long, env = "LEADLIST_MEMBER_LIST", default_value = "members-oep")]
    member_list: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "LEADLIST_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Attempts per remote call, including the first.
    #[arg(long, env = "LEADLIST_ATTEMPTS", default_value_t = 3)]
    attempts: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrub a record offline and show the column mapping
    Scrub {
        /// JSON object with the lead's fields
        #[arg(long)]
        record: PathBuf,
    },
    /// Submit one lead
    Submit {
        /// Target list (member records are rerouted)
        #[arg(long)]
        list: String,
        /// JSON object with the lead's fields
        #[arg(long, conflicts_with = "fields", required_unless_present = "fields")]
        record: Option<PathBuf>,
        /// Field as name=value; repeatable
        #[arg(long = "field", value_parser = commands::parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Import many leads as one CSV upload
    ImportCsv {
        #[arg(long)]
        list: String,
        /// JSON array of lead objects
        #[arg(long)]
        records: PathBuf,
    },
    /// Create an empty list
    CreateList { name: String },
}

impl Cli {
    fn load_schema(&self) -> anyhow::Result<FieldSchema> {
        match &self.schema {
            Some(path) => FieldSchema::load(path)
                .with_context(|| format!("loading schema from {}", path.display())),
            None => Ok(FieldSchema::lead_default()),
        }
    }

    fn submitter(&self, schema: FieldSchema) -> anyhow::Result<Submitter<HttpAuthenticator>> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let authenticator = HttpAuthenticator::new(self.base_url.clone(), timeout)
            .context("building HTTP client")?;
        let config = SubmitterConfig {
            member_key: self.member_key.clone(),
            member_list: self.member_list.clone(),
            retry: RetryPolicy {
                max_attempts: self.attempts,
                timeout,
                ..RetryPolicy::default()
            },
            ..SubmitterConfig::default()
        };
        Ok(Submitter::new(
            Arc::new(schema),
            authenticator,
            Credentials::new(self.username.clone(), self.password.clone()),
            config,
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("leadlist v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let schema = cli.load_schema()?;

    match &cli.command {
        Command::Scrub { record } => commands::scrub(&schema, record),
        Command::Submit {
            list,
            record,
            fields,
        } => {
            let raw = commands::read_record(record.as_deref(), fields)?;
            let submitter = cli.submitter(schema)?;
            commands::submit(&submitter, &raw, list).await
        }
        Command::ImportCsv { list, records } => {
            let submitter = cli.submitter(schema)?;
            commands::import_csv(&submitter, records, list).await
        }
        Command::CreateList { name } => {
            let submitter = cli.submitter(schema)?;
            commands::create_list(&submitter, name).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn submit_accepts_repeated_fields() {
        let cli = Cli::try_parse_from([
            "leadlist",
            "--username",
            "agent",
            "submit",
            "--list",
            "leads",
            "--field",
            "first_name=Grace",
            "--field",
            "zip=10001",
        ])
        .unwrap();
        match cli.command {
            Command::Submit { list, record, fields } => {
                assert_eq!(list, "leads");
                assert!(record.is_none());
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1], ("zip".to_string(), "10001".to_string()));
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn submit_requires_record_or_fields() {
        let result = Cli::try_parse_from(["leadlist", "submit", "--list", "leads"]);
        assert!(result.is_err());
    }

    #[test]
    fn record_and_fields_conflict() {
        let result = Cli::try_parse_from([
            "leadlist",
            "submit",
            "--list",
            "leads",
            "--record",
            "lead.json",
            "--field",
            "state=NY",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn default_schema_when_no_schema_file() {
        let mut cli = Cli::try_parse_from(["leadlist", "create-list", "spring"]).unwrap();
        cli.schema = None;
        assert_eq!(cli.load_schema().unwrap(), FieldSchema::lead_default());
    }

    #[test]
    fn schema_flag_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"[{"name": "email", "kind": "text", "min_length": 3, "max_length": 80}]"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();
        let cli =
            Cli::try_parse_from(["leadlist", "--schema", path, "create-list", "spring"]).unwrap();
        let schema = cli.load_schema().unwrap();
        assert_eq!(schema.len(), 1);
        assert!(schema.contains("email"));
    }
}

//! attach: run an attachment upload session from the command line.
//!
//! Files go to local storage (ATTACH_STORAGE_PATH). Purge and description
//! calls go to the form server when ATTACH_SERVER_URL is set, otherwise they
//! are served from the same storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use attach_api_client::ApiClient;
use attach_cli::{candidate_for, describe_error, init_tracing, log_error, Field, FileArg};
use attach_core::models::{ControlState, TriggerAttributes, UploadPolicy};
use attach_core::{
    Admission, AttachConfig, AttachError, AttachmentServer, TracingAnalytics, TracingUi,
};
use attach_session::{SessionCoordinator, SessionDeps};
use attach_storage::{
    sign_params, LocalStorage, PathSource, Storage, StorageAttachmentServer,
    StorageUploaderFactory,
};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "attach", about = "Attachment upload session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files with descriptions to one attachment control
    Upload {
        /// Usage identifier of the control
        #[arg(long)]
        usage_id: String,
        /// Upload category: image, pdf-and-image, custom
        #[arg(long, default_value = "image")]
        upload_type: String,
        /// Extensions accepted by the custom category (comma separated)
        #[arg(long, value_delimiter = ',')]
        whitelist: Vec<String>,
        /// The control already holds files (form server mode only)
        #[arg(long)]
        prior_uploads: bool,
        /// Replace previous uploads without asking
        #[arg(long)]
        yes: bool,
        /// Files as PATH=DESCRIPTION
        #[arg(required = true)]
        files: Vec<FileArg>,
    },
    /// Print the restriction object for an upload category
    Restrictions {
        #[arg(long, default_value = "image")]
        upload_type: String,
        #[arg(long, value_delimiter = ',')]
        whitelist: Vec<String>,
    },
    /// Sign transport assembly parameters
    Sign {
        #[arg(long)]
        template_id: String,
        /// Assembly field as KEY=VALUE
        #[arg(long = "field")]
        fields: Vec<Field>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn trigger_attributes(upload_type: String, whitelist: Vec<String>) -> TriggerAttributes {
    TriggerAttributes {
        upload_type: Some(upload_type),
        white_listed_file_types: whitelist,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        log_error(&err);
        eprintln!("{}", describe_error(&err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AttachConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Upload {
            usage_id,
            upload_type,
            whitelist,
            prior_uploads,
            yes,
            files,
        } => {
            let attributes = trigger_attributes(upload_type, whitelist);
            upload(&config, usage_id, attributes, prior_uploads, yes, files).await?;
        }
        Commands::Restrictions {
            upload_type,
            whitelist,
        } => {
            let attributes = trigger_attributes(upload_type, whitelist);
            let policy = UploadPolicy::from_trigger(&attributes, &config.limits)?;
            print_json(&policy.map(|p| p.restrictions()))?;
        }
        Commands::Sign {
            template_id,
            fields,
        } => {
            let credentials = config
                .transport
                .as_ref()
                .context("Set ATTACH_TRANSPORT_KEY and ATTACH_TRANSPORT_SECRET")?;
            let fields: BTreeMap<String, String> =
                fields.into_iter().map(|f| (f.key, f.value)).collect();
            let signed = sign_params(
                credentials,
                serde_json::json!({ "template_id": template_id, "fields": fields }),
                config.transport_signature_ttl_secs,
                chrono::Utc::now(),
            )?;
            print_json(&signed)?;
        }
    }

    Ok(())
}

async fn upload(
    config: &AttachConfig,
    usage_id: String,
    attributes: TriggerAttributes,
    prior_uploads: bool,
    yes: bool,
    files: Vec<FileArg>,
) -> anyhow::Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(config.storage_path.clone(), config.storage_base_url.clone())
            .await
            .context("Failed to open local storage")?,
    );
    let source = Arc::new(PathSource::new());

    let (server, has_prior_uploads): (Arc<dyn AttachmentServer>, bool) = match &config.server_url
    {
        Some(url) => {
            tracing::info!(server_url = %url, "Using form server");
            (Arc::new(ApiClient::from_config(config)?), prior_uploads)
        }
        None => {
            let server = StorageAttachmentServer::new(storage.clone(), config.key_prefix.clone());
            let prior = server.has_prior_uploads(&usage_id).await?;
            (Arc::new(server), prior)
        }
    };

    let deps = SessionDeps {
        server,
        uploaders: Arc::new(StorageUploaderFactory::new(
            storage,
            source.clone(),
            config.key_prefix.clone(),
        )),
        ui: Arc::new(TracingUi),
        analytics: Arc::new(TracingAnalytics),
    };

    let control = ControlState {
        attributes,
        has_prior_uploads,
        trigger_enabled: true,
    };
    let mut session = SessionCoordinator::new(usage_id.clone(), &control, config.limits, deps)?;

    if !session.open()? {
        anyhow::bail!("The upload type does not accept any files");
    }

    for arg in &files {
        let candidate = candidate_for(arg).await?;
        source.register(candidate.id, &arg.path);
        if let Admission::Reject(violation) = session.add_file(candidate)? {
            anyhow::bail!("{}: {}", arg.path.display(), violation);
        }
    }
    session.finalize_selection()?;

    let summary = match session.upload().await {
        Err(AttachError::ConfirmationRequired) if yes => session.upload().await?,
        Err(AttachError::ConfirmationRequired) => anyhow::bail!(
            "Files were uploaded for {} before. Run again with --yes to replace them",
            usage_id
        ),
        other => other?,
    };

    print_json(&serde_json::json!({
        "usage_id": session.usage_id(),
        "state": session.state(),
        "receipts": summary.receipts,
        "descriptions": session.descriptions(),
        "descriptions_saved": summary.descriptions_saved,
    }))
}

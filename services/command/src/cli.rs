//! Operator commands.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use smsgate_command::{
    db::Database, id_generator::UlidGenerator, CommandContext, Commands, ObjectDetails,
    TwilioConfig, TwilioConfigChange,
};
use smsgate_crypto::AesGcmKeyring;
use smsgate_events::ActorType;
use smsgate_id::{InstanceId, RequestId};
use tracing::info;

use smsgate_command::config::Config;

/// smsgate - manage tenant SMS provider configuration.
#[derive(Debug, Parser)]
#[command(name = "smsgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tenant instance the command applies to.
    #[arg(long, global = true, env = "SMSGATE_INSTANCE_ID")]
    instance: Option<InstanceId>,

    /// Actor recorded on the written events.
    #[arg(long, global = true, env = "SMSGATE_ACTOR", default_value = "smsgate-cli")]
    actor: String,

    /// Request ID recorded on the written events (generated if omitted).
    #[arg(long, global = true, env = "SMSGATE_REQUEST_ID")]
    request_id: Option<RequestId>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Add a Twilio configuration (created inactive).
    Add(AddArgs),

    /// Change the sid and sender number of a Twilio configuration.
    Change(ChangeArgs),

    /// Replace the Twilio auth token.
    ChangeToken(ChangeTokenArgs),

    /// Activate a Twilio configuration.
    Activate(IdArgs),

    /// Deactivate a configuration.
    Deactivate(IdArgs),

    /// Remove a configuration.
    Remove(IdArgs),

    /// Show a configuration (without secrets).
    Show(IdArgs),
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Twilio account sid.
    #[arg(long)]
    sid: String,

    /// Sender phone number.
    #[arg(long)]
    sender_number: String,

    /// Twilio auth token.
    #[arg(long, env = "SMSGATE_TWILIO_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Debug, Args)]
struct ChangeArgs {
    /// SMS configuration ID.
    id: String,

    /// Twilio account sid.
    #[arg(long)]
    sid: String,

    /// Sender phone number.
    #[arg(long)]
    sender_number: String,
}

#[derive(Debug, Args)]
struct ChangeTokenArgs {
    /// SMS configuration ID.
    id: String,

    /// New Twilio auth token.
    #[arg(long, env = "SMSGATE_TWILIO_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Debug, Args)]
struct IdArgs {
    /// SMS configuration ID.
    id: String,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        let db = Database::connect(&config.database).await?;

        if let Command::Migrate = self.command {
            db.run_migrations().await?;
            return Ok(());
        }

        let instance_id = self
            .instance
            .ok_or_else(|| anyhow::anyhow!("--instance (or SMSGATE_INSTANCE_ID) is required"))?;
        let mut ctx = CommandContext::new(instance_id, ActorType::User, self.actor);
        if let Some(request_id) = self.request_id {
            ctx = ctx.with_request_id(request_id);
        }

        let keyring = AesGcmKeyring::from_config(&config.sms_keys)?;
        let commands = Commands::new(
            Arc::new(db.event_store()),
            Arc::new(UlidGenerator),
            Arc::new(keyring),
        );

        info!(
            instance_id = %ctx.instance_id,
            request_id = %ctx.request_id,
            "Running command"
        );

        match self.command {
            Command::Migrate => {}
            Command::Add(args) => {
                let (id, details) = commands
                    .add_sms_config_twilio(
                        &ctx,
                        TwilioConfig {
                            sid: args.sid,
                            sender_number: args.sender_number,
                            token: args.token,
                        },
                    )
                    .await?;
                print_json(&serde_json::json!({ "id": id, "details": details }))?;
            }
            Command::Change(args) => {
                let details = commands
                    .change_sms_config_twilio(
                        &ctx,
                        &args.id,
                        TwilioConfigChange {
                            sid: args.sid,
                            sender_number: args.sender_number,
                        },
                    )
                    .await?;
                print_details(&details)?;
            }
            Command::ChangeToken(args) => {
                let details = commands
                    .change_sms_config_twilio_token(&ctx, &args.id, &args.token)
                    .await?;
                print_details(&details)?;
            }
            Command::Activate(args) => {
                print_details(&commands.activate_sms_config_twilio(&ctx, &args.id).await?)?;
            }
            Command::Deactivate(args) => {
                print_details(&commands.deactivate_sms_config(&ctx, &args.id).await?)?;
            }
            Command::Remove(args) => {
                print_details(&commands.remove_sms_config(&ctx, &args.id).await?)?;
            }
            Command::Show(args) => {
                let model = commands.sms_config(&ctx, &args.id).await?;
                print_json(&model)?;
            }
        }

        Ok(())
    }
}

fn print_details(details: &ObjectDetails) -> Result<()> {
    print_json(details)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

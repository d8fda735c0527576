//! Command line
//!
//! ``serve`` runs the admin api, the other commands run the device flows
//! against the same backend.
use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use crate::{
    auth::{signup::SignUpForm, token::decode_access_token},
    backend::Backend,
    config::Config,
    device::{
        biometric::{icon, label},
        bootstrap::{login_form, logout},
        BiometricGate, Bootstrapper, CommandBiometrics, CredentialStore, Destination,
        Enrollment, FilePreferences, HeadlessBiometrics, Outcome,
    },
    receipt::{share_receipt, DesktopShare, Receipt, ShareOutcome, SvgRenderer},
};

#[derive(Parser)]
#[command(name = "kasirq-admin")]
#[command(about = "KasirQ administration api and device tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the GraphQL admin api
    Serve,
    /// Login with an email address or a username
    Login {
        identifier: String,
        #[arg(long, env = "KASIRQ_PASSWORD", hide_env_values = true)]
        password: String,
        /// Stay logged in and remember the identifier
        #[arg(long, default_value_t = false)]
        remember_me: bool,
    },
    /// Login with the credentials of the last remembered login
    BiometricLogin,
    /// Forget everything saved on this device
    Logout,
    /// Show the saved session and login preferences
    Whoami,
    /// Request an account. It has to be approved by an admin.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        whatsapp: String,
        #[arg(long, env = "KASIRQ_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "KASIRQ_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    /// Send a receipt (json) to a WhatsApp number
    ShareReceipt {
        receipt: PathBuf,
        #[arg(long)]
        phone: String,
        /// Name printed on the receipt, defaults to the configured one
        #[arg(long)]
        store: Option<String>,
    },
}

fn biometrics(config: &Config) -> Box<dyn BiometricGate> {
    let settings = &config.biometrics;
    match CommandBiometrics::new(&settings.command, settings.args.clone(), settings.kind) {
        Some(gate) => Box::new(gate),
        None => Box::new(HeadlessBiometrics),
    }
}

fn report(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Redirect(redirect) => {
            match redirect.enrollment {
                Enrollment::Enrolled => println!("Biometrik diaktifkan untuk login cepat!"),
                Enrollment::Failed => println!("Biometrik tidak dapat diaktifkan"),
                _ => {}
            }
            match redirect.destination {
                Destination::Dashboard(store) => println!("Masuk ke dashboard {}", store.name),
                Destination::SelectStore => println!("Belum ada toko, silakan buat toko"),
            }
            println!(
                "Sesi berlaku hingga {}",
                redirect.tokens.session.expires_at
            );
            Ok(())
        }
        Outcome::WaitingApproval => {
            println!("Akun Anda masih menunggu persetujuan admin");
            Ok(())
        }
        Outcome::Cancelled => {
            println!("Dibatalkan");
            Ok(())
        }
        Outcome::Failed { message } => Err(anyhow!(message)),
    }
}

impl Command {
    /// Whether the command talks to the backend. The others work offline.
    pub fn needs_backend(&self) -> bool {
        matches!(
            self,
            Self::Serve | Self::Login { .. } | Self::BiometricLogin | Self::Signup { .. }
        )
    }
}

fn credentials(config: &Config) -> anyhow::Result<CredentialStore<FilePreferences>> {
    Ok(CredentialStore::new(FilePreferences::new(
        config.preferences_path()?,
    )))
}

/// Runs a command that signs in or up
pub async fn run(command: Command, config: &Config, backend: Arc<dyn Backend>) -> anyhow::Result<()> {
    let bootstrapper = Bootstrapper::new(backend, credentials(config)?, biometrics(config));

    match command {
        Command::Login {
            identifier,
            password,
            remember_me,
        } => report(bootstrapper.login(&identifier, &password, remember_me).await),
        Command::BiometricLogin => report(bootstrapper.biometric_login().await),
        Command::Signup {
            email,
            username,
            whatsapp,
            password,
            confirm_password,
        } => {
            let form = SignUpForm {
                email,
                username,
                password,
                confirm_password,
                whatsapp,
            };
            report(bootstrapper.sign_up(form).await)
        }
        Command::Serve | Command::Logout | Command::Whoami | Command::ShareReceipt { .. } => {
            Err(anyhow!("not a sign in command"))
        }
    }
}

/// Runs a command that only touches the device
pub async fn run_offline(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Logout => {
            logout(&credentials(config)?).await?;
            println!("Data login di perangkat ini telah dihapus");
            Ok(())
        }
        Command::Whoami => {
            let credentials = credentials(config)?;
            let form = login_form(&credentials, biometrics(config).as_ref()).await?;
            if form.biometric_available {
                println!(
                    "{} {}: {}",
                    icon(form.biometry_type),
                    label(form.biometry_type),
                    if form.biometric_enabled { "aktif" } else { "tidak aktif" }
                );
            }
            if let Some(identifier) = form.identifier {
                println!("Diingat: {}", identifier);
            }
            let token = credentials.session().await?;
            let claims = token
                .as_deref()
                .and_then(|token| decode_access_token(token, &config.jwt_secret.1));
            match claims {
                Some(claims) => println!("Masuk sebagai {}", claims.user_id()),
                None => println!("Belum login"),
            }
            Ok(())
        }
        Command::ShareReceipt {
            receipt,
            phone,
            store,
        } => {
            let json = fs::read(&receipt)
                .with_context(|| format!("cannot read {}", receipt.display()))?;
            let receipt: Receipt = serde_json::from_slice(&json).context("invalid receipt")?;
            let store_name = store.or_else(|| config.share.store_name.clone());
            let target = DesktopShare::new(config.download_dir()?, &config.share.opener);
            let outcome = share_receipt(
                &receipt,
                &phone,
                store_name.as_deref(),
                &SvgRenderer,
                &target,
            )?;
            match outcome {
                ShareOutcome::Shared { file_name } => {
                    println!("Gambar nota {} berhasil dibagikan!", file_name)
                }
                ShareOutcome::Fallback { downloaded, .. } => {
                    if let Some(path) = downloaded {
                        println!(
                            "Gambar nota berhasil diunduh ke {}! Silakan kirim manual via WhatsApp",
                            path.display()
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Serve
        | Command::Login { .. }
        | Command::BiometricLogin
        | Command::Signup { .. } => Err(anyhow!("this command needs the backend")),
    }
}

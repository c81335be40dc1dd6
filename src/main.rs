use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use hellomolar::auth::{StaffUser, StaticAuth};
use hellomolar::config::{load_config, Config};
use hellomolar::core::queue::QueueRow;
use hellomolar::db::ClinicStore;
use hellomolar::models::{
    AppointmentFilter, ContactMethod, Dentist, EmergencyIntake, NewContactLog,
    NewRegisteredPatient, PreferredTime, QueueFilter, StatusFilter, TriageInput, TriageLevel, Weekday,
};
use hellomolar::Clinic;

#[derive(Parser)]
#[command(name = "hellomolar", about = "Emergency dental queue for the HelloMolar clinic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Staff user id, overrides `staff.user_id` from config
    #[arg(long, global = true)]
    user_id: Option<Uuid>,
    #[arg(long, global = true)]
    email: Option<String>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score severity inputs without storing anything
    Triage {
        #[arg(long, default_value_t = 0)]
        pain: u8,
        #[arg(long, default_value_t = 0)]
        symptom: u8,
        #[arg(long, default_value_t = 0)]
        systemic: u8,
        #[arg(long)]
        existing_patient: bool,
    },
    /// Put a registered patient on the emergency queue
    Admit {
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        reason: String,
        #[arg(long, value_delimiter = ',')]
        preferred_time: Vec<PreferredTime>,
        #[arg(long, value_delimiter = ',')]
        availability: Vec<Weekday>,
        #[arg(long)]
        dentist: Option<Dentist>,
        #[arg(long)]
        existing_patient: bool,
        #[arg(long, default_value_t = 0)]
        pain: u8,
        #[arg(long, default_value_t = 0)]
        symptom: u8,
        #[arg(long, default_value_t = 0)]
        systemic: u8,
    },
    /// Show the emergency queue
    Queue {
        #[command(flatten)]
        filter: FilterArgs,
        /// Apply a saved preset instead of the filter flags
        #[arg(long)]
        preset: Option<Uuid>,
    },
    LogContact {
        patient_id: Uuid,
        #[arg(long, default_value = "Phone")]
        method: ContactMethod,
        #[arg(long)]
        notes: String,
    },
    /// Book a waiting emergency patient
    Book {
        patient_id: Uuid,
        /// RFC 3339 timestamp
        #[arg(long)]
        at: DateTime<Utc>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Archive a scheduled emergency patient
    Discharge { patient_id: Uuid },
    Appointments {
        #[arg(long)]
        patient: Option<Uuid>,
        /// YYYY-MM-DD (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    CancelAppointment { appointment_id: Uuid },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long = "patient-email")]
        email: Option<String>,
    },
    /// Search registered patients by name
    Patients { query: Option<String> },
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    List,
    Save {
        name: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    Load { preset_id: Uuid },
    Delete { preset_id: Uuid },
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    #[arg(long, value_delimiter = ',')]
    preferred_time: Vec<PreferredTime>,
    #[arg(long, value_delimiter = ',')]
    availability: Vec<Weekday>,
    #[arg(long)]
    status: Option<StatusFilter>,
    /// 1 (critical) to 5 (routine)
    #[arg(long)]
    triage_level: Option<TriageLevel>,
    #[arg(long)]
    dentist: Option<Dentist>,
}

impl From<FilterArgs> for QueueFilter {
    fn from(args: FilterArgs) -> Self {
        QueueFilter {
            preferred_time: args.preferred_time.into_iter().collect(),
            availability: args.availability.into_iter().collect(),
            status: args.status,
            triage_level: args.triage_level,
            preferred_dentist: args.dentist,
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(feature = "sqlite")]
async fn open_store(config: &Config) -> Result<Arc<dyn ClinicStore>> {
    let store = hellomolar::db::SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_store(_config: &Config) -> Result<Arc<dyn ClinicStore>> {
    tracing::warn!("built without the sqlite feature, records last for this run only");
    Ok(Arc::new(hellomolar::db::MemoryStore::new()))
}

fn build_auth(config: &Config, cli: &Cli) -> StaticAuth {
    match cli.user_id {
        Some(id) => StaticAuth::signed_in(StaffUser {
            id,
            email: cli.email.clone().or_else(|| config.staff.email.clone()),
        }),
        None => StaticAuth::from_config(&config.staff),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

fn queue_table(rows: &[QueueRow]) -> String {
    if rows.is_empty() {
        return "No emergency patients match.".to_string();
    }
    rows.iter()
        .map(|row| {
            format!(
                "{}  {:<24} {:<18} {:<20} {:<10} attempts={} {}",
                row.patient.id,
                row.patient.name,
                row.patient.triage_level().label(),
                row.preferred_time_display(),
                row.status.as_str(),
                row.attempts,
                row.patient.reason,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = load_config().context("failed to load configuration")?;
    init_tracing(&config);

    let cli = Cli::parse();

    if let Commands::Triage {
        pain,
        symptom,
        systemic,
        existing_patient,
    } = cli.command
    {
        let assessment = TriageInput::new(pain, symptom, systemic, existing_patient)?.assess();
        return emit(cli.json, &assessment, |a| format!("score {} -> {}", a.score, a.level.label()));
    }

    let store = open_store(&config).await?;
    let clinic = Clinic::new(store, Arc::new(build_auth(&config, &cli)));
    info!("hellomolar ready");

    match cli.command {
        Commands::Triage { .. } => Ok(()),
        Commands::Admit {
            patient,
            name,
            phone,
            reason,
            preferred_time,
            availability,
            dentist,
            existing_patient,
            pain,
            symptom,
            systemic,
        } => {
            let intake = EmergencyIntake {
                user_id: patient,
                name,
                phone,
                reason,
                preferred_time: preferred_time.into_iter().collect::<BTreeSet<_>>(),
                availability: availability.into_iter().collect::<BTreeSet<_>>(),
                preferred_dentist: dentist,
                existing_patient,
                pain,
                symptom,
                systemic,
            };
            let admitted = clinic.admit(intake).await.context("admission failed")?;
            emit(cli.json, &admitted, |p| {
                format!("{} admitted at {} (score {})", p.id, p.triage_level().label(), p.triage_score())
            })
        }
        Commands::Queue { filter, preset } => {
            let filter = match preset {
                Some(id) => clinic.load_preset(id).await.context("failed to load preset")?,
                None => QueueFilter::from(filter),
            };
            let rows = clinic.queue(&filter).await?;
            emit(cli.json, &rows, |rows| queue_table(rows))
        }
        Commands::LogContact {
            patient_id,
            method,
            notes,
        } => {
            let entry = clinic
                .log_contact(NewContactLog {
                    patient_id,
                    method,
                    notes,
                })
                .await
                .context("failed to log contact")?;
            emit(cli.json, &entry, |e| format!("logged {} contact at {}", e.method, e.timestamp))
        }
        Commands::Book {
            patient_id,
            at,
            location,
            notes,
        } => {
            let appointment = clinic
                .book_emergency(patient_id, at, location, notes)
                .await
                .context("booking failed")?;
            emit(cli.json, &appointment, |a| format!("appointment {} at {}", a.id, a.appointment_time))
        }
        Commands::Discharge { patient_id } => {
            let archived = clinic.discharge(patient_id).await.context("discharge failed")?;
            emit(cli.json, &archived, |p| format!("{} discharged", p.name))
        }
        Commands::Appointments { patient, date } => {
            let filter = AppointmentFilter {
                patient_id: patient,
                date,
            };
            let appointments = clinic.appointments(&filter).await?;
            emit(cli.json, &appointments, |list| {
                list.iter()
                    .map(|a| {
                        format!(
                            "{}  {}  patient={} {} {}",
                            a.id,
                            a.appointment_time,
                            a.patient_id,
                            a.location.as_deref().unwrap_or("-"),
                            a.notes.as_deref().unwrap_or(""),
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::CancelAppointment { appointment_id } => {
            clinic
                .cancel_appointment(appointment_id)
                .await
                .context("failed to cancel appointment")?;
            println!("cancelled {}", appointment_id);
            Ok(())
        }
        Commands::Register { name, phone, email } => {
            let patient = clinic
                .register_patient(NewRegisteredPatient {
                    full_name: name,
                    phone_number: phone,
                    email,
                })
                .await
                .context("registration failed")?;
            emit(cli.json, &patient, |p| format!("registered {} as {}", p.full_name, p.id))
        }
        Commands::Patients { query } => {
            let found = clinic.find_registered(query.as_deref().unwrap_or("")).await?;
            emit(cli.json, &found, |list| {
                list.iter()
                    .map(|p| format!("{}  {}  {}", p.id, p.full_name, p.phone_number))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Presets { command } => match command {
            PresetCommands::List => {
                let presets = clinic.presets().await?;
                emit(cli.json, &presets, |list| {
                    list.iter()
                        .map(|p| format!("{}  {}  {}", p.id, p.name, p.created_at))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
            }
            PresetCommands::Save { name, filter } => {
                let preset = clinic
                    .save_preset(&name, filter.into())
                    .await
                    .context("failed to save preset")?;
                emit(cli.json, &preset, |p| format!("saved preset {} ({})", p.name, p.id))
            }
            PresetCommands::Load { preset_id } => {
                let filter = clinic.load_preset(preset_id).await?;
                println!("{}", serde_json::to_string_pretty(&filter)?);
                Ok(())
            }
            PresetCommands::Delete { preset_id } => {
                clinic.delete_preset(preset_id).await.context("failed to delete preset")?;
                println!("deleted {}", preset_id);
                Ok(())
            }
        },
    }
}

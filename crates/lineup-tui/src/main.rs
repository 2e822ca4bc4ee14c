// Lineup editor entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the backend (local SQLite, seeded from CSV, or the REST API)
// 4. Load the lineup record and build the editor session
// 5. Create mpsc channels
// 6. Spawn app logic task
// 7. Run the TUI until the user quits
// 8. Cleanup on exit

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use lineup_core::config::{self, BackendKind, Config};
use lineup_core::db::Database;
use lineup_core::lineup::LineupEditor;
use lineup_core::remote::RestBackend;
use lineup_core::roster_import;
use lineup_core::store::{LineupStore, RosterProvider};
use lineup_tui::{app, tui};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Lineup editor starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: club={}, team={}, backend={:?}",
        config.club.name, config.session.team_id, config.backend.kind
    );

    // 3. Open the backend
    let (store, roster_provider) = open_backend(&config)?;

    // 4. Load the lineup record
    let target = config.lineup_target();
    let record = store
        .load_lineup(&target)
        .await
        .with_context(|| format!("failed to load {target}"))?
        .with_context(|| format!("{target} does not exist"))?;

    let editor = LineupEditor::from_record(
        &record,
        config.untagged_team_default(),
        config.editor.formation_switch,
    );
    info!("Editing {} with formation {}", target, editor.formation());

    // 5. Create mpsc channels
    let (task_tx, task_rx) = mpsc::channel(32);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(64);

    let app_state = app::AppState::new(
        editor,
        &record,
        config.club.name.clone(),
        store,
        roster_provider,
        task_tx,
    );

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, task_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Run the TUI (blocks until the user quits)
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 8. Cleanup: wait for the app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Lineup editor shut down cleanly");
    Ok(())
}

type Backend = (Arc<dyn LineupStore>, Arc<dyn RosterProvider>);

fn open_backend(config: &Config) -> anyhow::Result<Backend> {
    match config.backend.kind {
        BackendKind::Sqlite => {
            let db = open_local(config)?;
            let store: Arc<dyn LineupStore> = db.clone();
            let roster: Arc<dyn RosterProvider> = db;
            Ok((store, roster))
        }
        BackendKind::Rest => {
            let rest = Arc::new(RestBackend::from_config(config).context("failed to set up REST backend")?);
            info!("Using REST backend at {:?}", config.backend.rest_url);
            let store: Arc<dyn LineupStore> = rest.clone();
            let roster: Arc<dyn RosterProvider> = rest;
            Ok((store, roster))
        }
    }
}

/// Open the local database, seed the roster CSV and make sure the session's
/// team and match exist.
fn open_local(config: &Config) -> anyhow::Result<Arc<Database>> {
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = Database::open(&db_path.to_string_lossy()).context("failed to open database")?;
    info!("Database opened at {}", db_path.display());

    if let Some(roster) = &config.data_paths.roster {
        let count = roster_import::seed_database(&db, Path::new(roster))
            .context("failed to import roster")?;
        info!("Roster seeded with {} rows", count);
    }

    let session = &config.session;
    db.ensure_team(&session.team_id, session.team_tag.as_deref())?;
    if let Some(match_id) = &session.match_id {
        let opponent = session.opponent.as_deref().unwrap_or("TBD");
        let today = chrono::Local::now().date_naive();
        let formation = db.ensure_match(match_id, &session.team_id, opponent, today)?;
        info!("Match {} ready ({})", match_id, formation);
    }
    Ok(Arc::new(db))
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("lineup.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lineup=info,lineup_tui=info,lineup_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

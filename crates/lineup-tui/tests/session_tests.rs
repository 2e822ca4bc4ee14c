// End-to-end tests: shipped defaults, and a full editing session driven
// through the app loop against a local database.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;

use lineup_core::config::{load_config_from, BackendKind};
use lineup_core::db::Database;
use lineup_core::formation::FormationId;
use lineup_core::lineup::{FormationSwitchPolicy, LineupEditor, MemberId, RosterStatus, SaveStatus};
use lineup_core::roster_import;
use lineup_core::store::{LineupStore, LineupTarget};
use lineup_tui::app::{self, AppState};
use lineup_tui::protocol::{EditorSnapshot, UiUpdate, UserCommand};

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn shipped_defaults_load_and_validate() {
    let dir = std::env::temp_dir().join("lineup_shipped_defaults");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("config")).unwrap();
    std::fs::copy(
        repo_root().join("defaults/club.toml"),
        dir.join("config/club.toml"),
    )
    .unwrap();

    let config = load_config_from(&dir).unwrap();
    assert_eq!(config.club.name, "CF Demo");
    assert_eq!(config.backend.kind, BackendKind::Sqlite);
    assert_eq!(config.editor.default_formation, FormationId::F7);
    assert_eq!(config.editor.formation_switch, FormationSwitchPolicy::Hide);
    assert_eq!(
        config.lineup_target(),
        LineupTarget::Match("alevi-a-2026-10-25".into())
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn shipped_roster_seeds_the_session_team() {
    let db = Database::open(":memory:").unwrap();
    let count = roster_import::seed_database(&db, &repo_root().join("data/roster.csv")).unwrap();
    assert_eq!(count, 10);
    assert_eq!(db.roster_for_team("alevi-a").unwrap().len(), 10);
}

async fn next_snapshot(
    ui_rx: &mut mpsc::Receiver<UiUpdate>,
    mut done: impl FnMut(&EditorSnapshot) -> bool,
) -> EditorSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ui_rx.recv().await {
                Some(UiUpdate::Snapshot(snap)) if done(&snap) => return *snap,
                Some(_) => continue,
                None => panic!("app loop ended early"),
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

#[tokio::test]
async fn edit_and_save_a_match_lineup() {
    let db = Database::open(":memory:").unwrap();
    roster_import::seed_database(&db, &repo_root().join("data/roster.csv")).unwrap();
    db.ensure_team("alevi-a", Some("Aleví F7")).unwrap();
    let formation = db
        .ensure_match(
            "m1",
            "alevi-a",
            "CE Veïns",
            NaiveDate::from_ymd_opt(2026, 10, 25).unwrap(),
        )
        .unwrap();
    assert_eq!(formation, FormationId::F7);
    let db = Arc::new(db);

    let target = LineupTarget::Match("m1".into());
    let record = db.load_lineup(&target).await.unwrap().unwrap();
    let editor = LineupEditor::from_record(&record, None, FormationSwitchPolicy::Hide);

    let (task_tx, task_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(64);
    let state = AppState::new(editor, &record, "CF Demo", db.clone(), db.clone(), task_tx);
    let handle = tokio::spawn(app::run(cmd_rx, task_rx, ui_tx, state));

    let ready = next_snapshot(&mut ui_rx, |s| s.roster_status == RosterStatus::Ready).await;
    assert_eq!(ready.available.len(), 10);
    assert_eq!(ready.slots.len(), 7);
    assert!(!ready.saved_view.is_available());

    cmd_tx
        .send(UserCommand::PickUpMember(MemberId::new("p-001")))
        .await
        .unwrap();
    cmd_tx.send(UserCommand::DropOnSlot(1)).await.unwrap();
    let placed = next_snapshot(&mut ui_rx, |s| s.filled_count() == 1).await;
    assert_eq!(placed.available.len(), 9);

    cmd_tx.send(UserCommand::Save).await.unwrap();
    let saved = next_snapshot(&mut ui_rx, |s| s.save_status == SaveStatus::Saved).await;
    let pitch = saved.saved_view.pitch().unwrap();
    assert_eq!(pitch.filled_count(), 1);
    assert_eq!(pitch.marker(1).unwrap().occupant.as_ref().unwrap().name, "Anna Puig");

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let stored = db.load_lineup(&target).await.unwrap().unwrap();
    assert_eq!(stored.formation, FormationId::F7);
    assert_eq!(stored.lineup.unwrap()["positions"]["1"]["id"], "p-001");
}

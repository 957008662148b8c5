use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bridge_report::config::{ReportConfig, SourcesConfig};
use bridge_report::loader::load_decisions;
use bridge_report::{DatePolicy, DecisionSelection, ReportError, ReportOptions, ReportSession, SourceConfig};

const DECISIONS_CSV: &str = "\
Quando,Decisão,Conseguiu fazer contato?,Idade,Bairro,Chave
05/01/2025,Aceitou,Sim,5,Copacabana,21990000001
12/01/2025,Aceitou,Não,9,Copacabana\u{00A0},21990000002
02/03/2025,Reconciliou,sim,15,,21990000003
20/03/2025,Reconciliou,,,--,21990000004
data errada,Aceitou,NAO,45,Tijuca,21990000005
";

const PARTICIPANTS_CSV: &str = "\
Telefone,Nome
21990000001,Ana
21990000003,Caio
21990000099,Zeca
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn config(decisions: PathBuf, participants: Option<PathBuf>) -> ReportConfig {
    ReportConfig {
        sources: SourcesConfig {
            decisions: SourceConfig::new(decisions),
            participants: participants.map(SourceConfig::new),
        },
        report: ReportOptions::default(),
    }
}

#[test]
fn full_report_from_csv_sources() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);
    let participants = write(dir.path(), "start.csv", PARTICIPANTS_CSV);

    let mut session = ReportSession::new(config(decisions, Some(participants)));
    let report = session.report(&DecisionSelection::default()).unwrap();

    assert_eq!(report.contacts.total, 5);
    assert_eq!(report.contacts.successes, 2);
    assert_eq!(report.contacts.success_pct, 40);

    assert_eq!(report.top_neighborhoods[0].label, "Copacabana");
    assert_eq!(report.top_neighborhoods[0].count, 2);
    assert!(report
        .top_neighborhoods
        .iter()
        .all(|g| g.label != "Não informado"));

    let months: Vec<&str> = report.monthly_series.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(months, vec!["2025-01", "2025-03"]);

    let period = report.period.unwrap();
    assert_eq!(period.start.to_string(), "2025-01-05");
    assert_eq!(period.end.to_string(), "2025-03-20");

    // 5, 9, 15, 45 are valid ages; the blank one is not
    assert_eq!(report.age_distribution.total, 4);
    assert_eq!(report.age_distribution.buckets.len(), 8);

    let funnel = report.funnel.expect("funnel present with participants");
    assert_eq!(funnel.participants_total, 3);
    assert_eq!(funnel.matched, 2);
    assert_eq!(funnel.matched_successes, 2);
    assert_eq!(funnel.contacted_rate_pct, 100);
    assert_eq!(funnel.participant_coverage_pct, 67);
}

#[test]
fn selection_narrows_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);

    let mut session = ReportSession::new(config(decisions, None));
    let report = session
        .report(&DecisionSelection::new(["Reconciliou"]))
        .unwrap();

    assert_eq!(report.contacts.total, 2);
    assert_eq!(report.contacts.successes, 1);
    assert_eq!(report.contacts.success_pct, 50);
    assert!(report.top_neighborhoods.is_empty());
    assert_eq!(report.decision_breakdown.len(), 1);
    assert!(report.funnel.is_none());
    // the period always reflects the whole log
    assert_eq!(report.period.unwrap().start.to_string(), "2025-01-05");
}

#[test]
fn missing_participants_file_only_disables_funnel() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);
    let absent = dir.path().join("nao_existe.csv");

    let mut session = ReportSession::new(config(decisions, Some(absent)));
    let report = session.report(&DecisionSelection::default()).unwrap();
    assert!(report.funnel.is_none());
    assert_eq!(report.contacts.total, 5);
}

#[test]
fn missing_decisions_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ReportSession::new(config(dir.path().join("nada.csv"), None));
    assert!(matches!(
        session.report(&DecisionSelection::default()),
        Err(ReportError::NotLoaded(_))
    ));
}

#[test]
fn missing_decisions_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(
        dir.path(),
        "decisoes.csv",
        "Quando,Decisão,Idade,Bairro\n05/01/2025,Aceitou,30,Lapa\n",
    );
    let mut session = ReportSession::new(config(decisions, None));
    let err = session.report(&DecisionSelection::default()).unwrap_err();
    assert!(matches!(err, ReportError::MissingColumn(c) if c == "Conseguiu fazer contato?"));
}

#[test]
fn semicolon_separated_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "decisoes.csv",
        "Quando;Decisão;Conseguiu fazer contato?;Idade;Bairro\n05/01/2025;Aceitou;Sim;30;Lapa\n",
    );
    let source = SourceConfig {
        separator: b';',
        ..SourceConfig::new(path)
    };
    let df = load_decisions(&source, DatePolicy::Retain).unwrap();
    assert_eq!(df.height(), 1);
}

#[test]
fn drop_policy_removes_undated_rows_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);
    let mut cfg = config(decisions, None);
    cfg.report.date_policy = DatePolicy::Drop;

    let mut session = ReportSession::new(cfg);
    let report = session.report(&DecisionSelection::default()).unwrap();
    assert_eq!(report.contacts.total, 4);
}

#[test]
fn cache_reuses_frames_until_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);

    let mut session = ReportSession::new(config(decisions.clone(), None));
    session.report(&DecisionSelection::default()).unwrap();
    session.report(&DecisionSelection::new(["Aceitou"])).unwrap();
    assert_eq!(session.cache().loads(), 1);

    let extra = format!("{DECISIONS_CSV}21/04/2025,Aceitou,Sim,30,Lapa,21990000006\n");
    fs::write(&decisions, extra).unwrap();
    let bumped = SystemTime::now() + Duration::from_secs(60);
    File::options()
        .write(true)
        .open(&decisions)
        .unwrap()
        .set_modified(bumped)
        .unwrap();

    let report = session.report(&DecisionSelection::default()).unwrap();
    assert_eq!(session.cache().loads(), 2);
    assert_eq!(session.cache().len(), 1);
    assert_eq!(report.contacts.total, 6);

    session.clear_cache();
    assert!(session.cache().is_empty());
}

#[test]
fn preloaded_frames_skip_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);
    let df = load_decisions(&SourceConfig::new(decisions), DatePolicy::Retain).unwrap();

    let mut session = ReportSession::from_frames(df, None, ReportOptions::default());
    let options = session.decision_options().unwrap();
    assert_eq!(options, vec!["Aceitou", "Reconciliou"]);
    assert!(session.participants().is_none());
    assert_eq!(session.cache().loads(), 0);
}

#[test]
fn report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);
    let mut session = ReportSession::new(config(decisions, None));
    let report = session.report(&DecisionSelection::default()).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["contacts"]["total"], 5);
    assert_eq!(json["monthly_series"][0]["key"], "2025-01");
    assert_eq!(json["age_distribution"]["buckets"][0]["label"], "Kids");
    assert!(json["funnel"].is_null());
}

#[test]
fn matched_detail_rows_follow_the_selection() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(dir.path(), "decisoes.csv", DECISIONS_CSV);
    let participants = write(dir.path(), "start.csv", PARTICIPANTS_CSV);

    let mut session = ReportSession::new(config(decisions, Some(participants)));
    let all = session.matched(&DecisionSelection::default()).unwrap().unwrap();
    assert_eq!(all.height(), 2);

    let accepted = session
        .matched(&DecisionSelection::new(["Aceitou"]))
        .unwrap()
        .unwrap();
    assert_eq!(accepted.height(), 1);
    assert_eq!(session.cache().loads(), 2);
}

#[test]
fn decisions_without_key_skip_the_funnel_only() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write(
        dir.path(),
        "decisoes.csv",
        "Quando,Decisão,Conseguiu fazer contato?,Idade,Bairro\n\
         05/01/2025,Aceitou,Sim,30,Lapa\n\
         06/01/2025,Aceitou,Não,41,Centro\n",
    );
    let participants = write(dir.path(), "start.csv", "Telefone\n1\n");

    let mut session = ReportSession::new(config(decisions, Some(participants)));
    let report = session.report(&DecisionSelection::default()).unwrap();
    assert!(report.funnel.is_none());
    assert_eq!(report.contacts.total, 2);
    assert_eq!(report.contacts.successes, 1);
    assert_eq!(report.top_neighborhoods.len(), 2);
}

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use transit_ridership::config::{DayAxis, SeriesConfig, TurnstileConfig, ZeroVariancePolicy};
use transit_ridership::output;
use transit_ridership::ridership::report::{TOTAL_LABEL, daily_report};
use transit_ridership::ridership::sheet::{COUNT_FIELDS, RidershipRow};
use transit_ridership::ridership::store::RidershipStore;
use transit_ridership::turnstile::pipeline::{TOTAL_LABEL as TURNSTILE_TOTAL, discover_inputs, run};

const USAGE_2016: &str = include_str!("fixtures/Turnstile_Usage_Data__2016.csv");
const USAGE_2017: &str = include_str!("fixtures/Turnstile_Usage_Data__2017.csv");

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("Turnstile_Usage_Data__2016.csv"), USAGE_2016).unwrap();
    fs::write(dir.join("Turnstile_Usage_Data__2017.csv"), USAGE_2017).unwrap();
    fs::write(dir.join("notes.csv"), "not,a,dump\n").unwrap();
    fs::write(dir.join("README.txt"), "ignored").unwrap();
    dir
}

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, d).unwrap()
}

#[test]
fn test_turnstile_pipeline() {
    let dir = fixture_dir("transit_ridership_it_pipeline");
    let paths = discover_inputs(&dir).unwrap();
    assert_eq!(paths.len(), 3);

    let result = run(&paths, &TurnstileConfig::default()).unwrap();

    assert_eq!(result.files_processed.len(), 2);
    assert_eq!(result.files_skipped, vec![dir.join("notes.csv")]);

    // The reset on 02-00-01 is dropped; the 2017 file's overlap replaces 01/02.
    assert_eq!(result.stations.days, vec![jan(1), jan(2)]);
    assert_eq!(result.stations.get("59 ST", jan(1)), Some(155.0));
    assert_eq!(result.stations.get("59 ST", jan(2)), Some(15.0));

    // Constant deltas are rejected by default.
    assert_eq!(result.stations.rows.len(), 1);

    assert_eq!(result.total.get(TURNSTILE_TOTAL, jan(1)), Some(155.0));
    let chg = result.total_yoy.row("total_chg_yoy").unwrap();
    assert!(chg.values.iter().all(Option::is_none));
    assert_eq!(result.total_yoy.get(TURNSTILE_TOTAL, jan(2)), Some(15.0));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_turnstile_pipeline_keeps_constant_turnstiles() {
    let dir = fixture_dir("transit_ridership_it_keep");
    let config = TurnstileConfig {
        zero_variance: ZeroVariancePolicy::Keep,
        ..Default::default()
    };
    let result = run(&discover_inputs(&dir).unwrap(), &config).unwrap();

    assert_eq!(result.stations.get("BOWLING GREEN", jan(1)), Some(200.0));
    assert_eq!(result.total.get(TURNSTILE_TOTAL, jan(1)), Some(355.0));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_turnstile_exports() {
    let dir = fixture_dir("transit_ridership_it_exports");
    let out = dir.join("out");
    let result = run(&discover_inputs(&dir).unwrap(), &TurnstileConfig::default()).unwrap();

    let written = output::export_all(
        &out,
        &[
            (output::DAILY_STATIONS, "station", &result.stations),
            (output::DAILY_TOTAL, "series", &result.total),
        ],
    )
    .unwrap();

    assert_eq!(written.len(), 2);
    let stations = fs::read_to_string(out.join(output::DAILY_STATIONS)).unwrap();
    assert_eq!(stations, "station,2016-01-01,2016-01-02\n59 ST,155,15\n");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_ridership_store_and_report() {
    let db = std::env::temp_dir().join("transit_ridership_it.db");
    let _ = fs::remove_file(&db);

    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let rows: Vec<RidershipRow> = (0..400)
        .map(|i| {
            let mut counts = [0; COUNT_FIELDS.len()];
            counts[13] = 50_000;
            RidershipRow {
                date: start + chrono::Duration::days(i),
                kind: "ÔNIBUS".into(),
                area: "AREA 4".into(),
                company: "SAMBAÍBA".into(),
                line: "1012-10".into(),
                counts,
            }
        })
        .collect();

    // Two batches through separate connections, as collector workers do.
    let (first, second) = rows.split_at(200);
    RidershipStore::open(&db).unwrap().insert_batch(first).unwrap();
    RidershipStore::open(&db).unwrap().insert_batch(second).unwrap();

    let store = RidershipStore::open(&db).unwrap();
    assert_eq!(store.row_count().unwrap(), 400);

    let config = SeriesConfig {
        day_axis: DayAxis::Calendar,
        ..Default::default()
    };
    let report = daily_report(&store, &config).unwrap();

    assert_eq!(report.daily.get(TOTAL_LABEL, start), Some(50_000.0));
    assert_eq!(
        report.yoy.get("total_passengers_ma7d", start + chrono::Duration::days(6)),
        Some(50_000.0)
    );
    let yoy = &report.yoy.row("total_passengers_chg_yoy").unwrap().values;
    assert!(yoy[..371].iter().all(Option::is_none));
    assert!(yoy[371..].iter().all(|v| *v == Some(0.0)));

    drop(store);
    fs::remove_file(&db).unwrap();
}

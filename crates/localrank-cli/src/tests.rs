use super::*;
use crate::lookup::RangeMode;

#[test]
fn parses_search_command() {
    let cli = Cli::try_parse_from(["localrank-cli", "search", "pizza Warsaw"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Search { ref query } if query == "pizza Warsaw"));
}

#[test]
fn parses_rating_command() {
    let cli = Cli::try_parse_from(["localrank-cli", "rating", "biz123"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Rating { ref place_id } if place_id == "biz123"));
}

#[test]
fn parses_scan_with_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "localrank-cli",
        "scan",
        "--place-id",
        "biz123",
        "--keyword",
        "pizza",
        "--lat",
        "40.7",
        "--lng",
        "-73.9",
        "--points",
        "20",
        "--seed",
        "7",
        "--json",
    ])
    .expect("expected valid cli args");

    let Commands::Scan(args) = cli.command else {
        panic!("expected scan command");
    };
    assert_eq!(args.place_id, "biz123");
    assert!((args.lng + 73.9).abs() < f64::EPSILON);
    assert_eq!(args.points, Some(20));
    assert_eq!(args.radius, None);
    assert_eq!(args.seed, Some(7));
    assert!(args.json);
}

#[test]
fn scan_requires_center() {
    let result = Cli::try_parse_from([
        "localrank-cli",
        "scan",
        "--place-id",
        "biz123",
        "--keyword",
        "pizza",
    ]);
    assert!(result.is_err());
}

#[test]
fn parses_keywords_command() {
    let cli = Cli::try_parse_from([
        "localrank-cli",
        "keywords",
        "--place-id",
        "biz123",
        "--address",
        "Warsaw",
        "pizza",
        "pasta",
        "calzone",
    ])
    .expect("expected valid cli args");

    let Commands::Keywords(args) = cli.command else {
        panic!("expected keywords command");
    };
    assert_eq!(args.address.as_deref(), Some("Warsaw"));
    assert_eq!(args.keywords, ["pizza", "pasta", "calzone"]);
}

#[test]
fn parses_metrics_month_mode() {
    let cli = Cli::try_parse_from([
        "localrank-cli",
        "metrics",
        "--location-id",
        "555",
        "--mode",
        "month",
        "--offset",
        "2",
        "--access-token",
        "ya29.token",
    ])
    .expect("expected valid cli args");

    let Commands::Metrics(args) = cli.command else {
        panic!("expected metrics command");
    };
    assert_eq!(args.mode, RangeMode::Month);
    assert_eq!(args.offset, 2);
    assert_eq!(args.days, 30);
    assert_eq!(args.access_token, "ya29.token");
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["localrank-cli"]).is_err());
}

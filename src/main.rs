use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use ttmirror::config::Config;
use ttmirror::db::SqliteStore;
use ttmirror::rebuild::rebuild_teacher_index;
use ttmirror::source::HttpSource;
use ttmirror::sync::{sync_dates, DayOutcome};

const USAGE: &str = "\
usage: ttmirror [--config PATH] <command>

commands:
  sync                      mirror today plus the configured window
  sync --from A --to B      mirror an explicit date range (YYYY-MM-DD)
  sync --days N             mirror today plus N-1 days
  rebuild-teachers          recompute the teachers index from stored entries
";

struct Args {
    command: String,
    config_path: Option<PathBuf>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    days: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;
    let cfg = Config::load(args.config_path.as_deref())?;
    let corrections = cfg.corrections()?;
    let mut store = SqliteStore::open(&cfg.db_path)?;

    match args.command.as_str() {
        "sync" => {
            let dates = match (args.from, args.to) {
                (Some(from), Some(to)) => {
                    anyhow::ensure!(from <= to, "--from must not be after --to");
                    date_range(from, to)
                }
                (None, None) => {
                    let days = args.days.unwrap_or(cfg.days_ahead).max(1);
                    let today = cfg.source_today()?;
                    date_range(today, today + chrono::Duration::days(i64::from(days) - 1))
                }
                _ => anyhow::bail!("--from and --to must be given together"),
            };

            let source = HttpSource::new(
                &cfg.base_url,
                &cfg.area,
                Duration::from_secs(cfg.http_timeout_secs),
            )?;
            let reports = sync_dates(&source, &mut store, &corrections, &dates);

            let mut upserted = 0;
            let mut deleted = 0;
            for report in &reports {
                if let DayOutcome::Done {
                    upserted: u,
                    deleted: d,
                } = report.outcome
                {
                    upserted += u;
                    deleted += d;
                }
            }
            println!(
                "synced {} dates: {} entries upserted, {} deleted",
                reports.len(),
                upserted,
                deleted
            );
            Ok(())
        }
        "rebuild-teachers" => {
            let count = rebuild_teacher_index(&mut store, &corrections)?;
            println!("teachers index rebuilt: {count} distinct names");
            Ok(())
        }
        other => anyhow::bail!("unknown command {other:?}\n{USAGE}"),
    }
}

fn parse_args() -> Result<Args> {
    let mut command = None;
    let mut config_path = None;
    let mut from = None;
    let mut to = None;
    let mut days = None;

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            "--config" => {
                let v = argv.next().context("--config needs a path")?;
                config_path = Some(PathBuf::from(v));
            }
            "--from" => from = Some(parse_date(&argv.next().context("--from needs a date")?)?),
            "--to" => to = Some(parse_date(&argv.next().context("--to needs a date")?)?),
            "--days" => {
                let v = argv.next().context("--days needs a number")?;
                days = Some(v.parse::<u32>().with_context(|| format!("bad --days {v:?}"))?);
            }
            other if command.is_none() && !other.starts_with('-') => {
                command = Some(other.to_string());
            }
            other => anyhow::bail!("unexpected argument {other:?}\n{USAGE}"),
        }
    }

    Ok(Args {
        command: command.unwrap_or_else(|| "sync".to_string()),
        config_path,
        from,
        to,
        days,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date {s:?}"))
}

fn date_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut d = from;
    while d <= to {
        dates.push(d);
        d = d + chrono::Duration::days(1);
    }
    dates
}

use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::simulation::{EpisodeMetrics, StrategyAggregate};

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    episodes: &'a [EpisodeMetrics],
    aggregates: &'a [StrategyAggregate],
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    records: &[EpisodeMetrics],
    aggregates: &[StrategyAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Episode Results".bright_cyan().bold())?;
    writeln!(writer, "{}", "==================".cyan())?;

    for record in records {
        let status = match record.outcome.as_str() {
            "won" => "🏆 WON ".green(),
            "step_cap" => "⏱  CAP ".yellow(),
            _ => "💀 DIED".red(),
        };
        writeln!(
            writer,
            "{} {} seed {:<6} steps {:>5}  days {:>6.2}  explored {:>5}{}",
            status,
            record.strategy.bold(),
            record.seed,
            record.survived_steps,
            record.survived_days,
            record.explored_cells,
            record
                .cause_of_death
                .as_ref()
                .map_or_else(String::new, |c| format!("  cause {c}")),
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "{}", "⚡ Strategy Summary".bright_yellow().bold())?;
    writeln!(writer, "{}", "===================".yellow())?;
    for agg in aggregates {
        writeln!(writer, "{}", agg.strategy.bold())?;
        writeln!(writer, "   Episodes: {}", agg.episodes)?;
        writeln!(
            writer,
            "   Mean survival: {:.1} steps ({:.2} days)",
            agg.mean_survival_steps, agg.mean_survival_days
        )?;
        writeln!(
            writer,
            "   Win rate: {}",
            format!("{:.1}%", agg.win_rate * 100.0).green()
        )?;
        writeln!(writer, "   Mean exploration rate: {:.3}", agg.mean_exploration_rate)?;
        writeln!(writer, "   Near-death steps: {}", agg.total_near_death)?;
        if !agg.causes.is_empty() {
            writeln!(writer, "   Causes of death:")?;
            for (cause, count) in &agg.causes {
                writeln!(writer, "     • {cause}: {}", count.to_string().red())?;
            }
        }
    }
    writeln!(writer)?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    Ok(())
}

pub fn generate_json_report(
    writer: &mut dyn Write,
    records: &[EpisodeMetrics],
    aggregates: &[StrategyAggregate],
) -> Result<()> {
    let report = JsonReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        episodes: records,
        aggregates,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_markdown_report(
    writer: &mut dyn Write,
    records: &[EpisodeMetrics],
    aggregates: &[StrategyAggregate],
) -> Result<()> {
    writeln!(writer, "# Earth2D Episode Results\n")?;
    writeln!(
        writer,
        "_Generated {}_\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    )?;

    writeln!(writer, "## Summary\n")?;
    writeln!(
        writer,
        "| Strategy | Episodes | Mean steps | Mean days | Win rate | Exploration |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|")?;
    for agg in aggregates {
        writeln!(
            writer,
            "| {} | {} | {:.1} | {:.2} | {:.1}% | {:.3} |",
            agg.strategy,
            agg.episodes,
            agg.mean_survival_steps,
            agg.mean_survival_days,
            agg.win_rate * 100.0,
            agg.mean_exploration_rate
        )?;
    }

    writeln!(writer, "\n## Causes of death\n")?;
    for agg in aggregates {
        if agg.causes.is_empty() {
            writeln!(writer, "- **{}**: none", agg.strategy)?;
            continue;
        }
        let causes: Vec<String> = agg
            .causes
            .iter()
            .map(|(cause, count)| format!("{cause} × {count}"))
            .collect();
        writeln!(writer, "- **{}**: {}", agg.strategy, causes.join(", "))?;
    }

    writeln!(writer, "\n## Episodes\n")?;
    writeln!(writer, "| Seed | Strategy | Outcome | Cause | Steps | Encounters | Near-death |")?;
    writeln!(writer, "|---|---|---|---|---|---|---|")?;
    for r in records {
        writeln!(
            writer,
            "| {} | {} | {} | {} | {} | {} | {} |",
            r.seed,
            r.strategy,
            r.outcome,
            r.cause_of_death.as_deref().unwrap_or("-"),
            r.survived_steps,
            r.encounter_count,
            r.near_death_count
        )?;
    }
    Ok(())
}

pub fn generate_csv_report(writer: &mut dyn Write, records: &[EpisodeMetrics]) -> Result<()> {
    writeln!(
        writer,
        "seed,strategy,outcome,cause_of_death,survived_steps,survived_hours,survived_days,trophy_found,explored_cells,unique_cells_visited,exploration_rate,avg_risk_exposure,encounter_count,near_death_count,invalid_action_count"
    )?;
    for r in records {
        writeln!(
            writer,
            "{},{},{},{},{},{},{:.4},{},{},{},{:.4},{:.4},{},{},{}",
            r.seed,
            r.strategy,
            r.outcome,
            r.cause_of_death.as_deref().unwrap_or(""),
            r.survived_steps,
            r.survived_hours,
            r.survived_days,
            r.trophy_found,
            r.explored_cells,
            r.unique_cells_visited,
            r.exploration_rate,
            r.avg_risk_exposure,
            r.encounter_count,
            r.near_death_count,
            r.invalid_action_count
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> (Vec<EpisodeMetrics>, Vec<StrategyAggregate>) {
        let record = EpisodeMetrics {
            seed: 7,
            strategy: "rest".into(),
            survived_steps: 90,
            survived_hours: 90,
            survived_days: 3.75,
            outcome: "died".into(),
            cause_of_death: Some("DEHYDRATION".into()),
            trophy_found: false,
            explored_cells: 49,
            unique_cells_visited: 1,
            exploration_rate: 1.0 / 90.0,
            avg_risk_exposure: 0.02,
            encounter_count: 2,
            near_death_count: 12,
            invalid_action_count: 0,
            replay_path: None,
        };
        let agg = StrategyAggregate {
            strategy: "rest".into(),
            episodes: 1,
            mean_survival_steps: 90.0,
            mean_survival_days: 3.75,
            win_rate: 0.0,
            step_cap_rate: 0.0,
            mean_exploration_rate: 1.0 / 90.0,
            total_near_death: 12,
            causes: BTreeMap::from([("DEHYDRATION".to_string(), 1)]),
        };
        (vec![record], vec![agg])
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_has_one_row_per_episode() {
        let (records, _) = sample();
        let csv = render(|w| generate_csv_report(w, &records));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("7,rest,died,DEHYDRATION,90,"));
        assert_eq!(lines[0].split(',').count(), lines[1].split(',').count());
    }

    #[test]
    fn json_report_parses_back() {
        let (records, aggs) = sample();
        let json = render(|w| generate_json_report(w, &records, &aggs));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["episodes"][0]["seed"], 7);
        assert_eq!(value["aggregates"][0]["causes"]["DEHYDRATION"], 1);
    }

    #[test]
    fn markdown_lists_causes() {
        let (records, aggs) = sample();
        let md = render(|w| generate_markdown_report(w, &records, &aggs));
        assert!(md.contains("# Earth2D Episode Results"));
        assert!(md.contains("DEHYDRATION × 1"));
    }
}

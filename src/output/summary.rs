use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::analysis::duration::format_duration;
use crate::insights::{ParallelizationInsights, RunInsights, SeriesStats, SigningInsights};

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{budget_cell, create_table, duration_cell};

/// Prints a human-readable summary of the collected statistics to stdout.
///
/// Each report is a table with one row per series and the 25th, 50th, 75th
/// and 100th percentiles, mean and standard deviation rendered as `h:mm:ss`.
pub fn print_summary(insights: &RunInsights) {
    println!("{}", render_summary(insights));
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn series_table(series: &[&SeriesStats]) -> String {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Series", "25th", "50th", "75th", "100th", "Mean", "Std Dev",
    ]));

    for entry in series {
        let stats = &entry.stats;
        table.add_row(vec![
            Cell::new(&entry.label),
            duration_cell(stats.p25),
            duration_cell(stats.p50),
            duration_cell(stats.p75),
            duration_cell(stats.p100),
            duration_cell(stats.mean),
            duration_cell(stats.std_dev),
        ]);
    }

    table.to_string()
}

fn render_signing(output: &mut String, signing: &SigningInsights) {
    add_section_header(output, "✍️", "Signing");

    let _ = writeln!(
        output,
        "{}\n",
        series_table(&[
            &signing.signing,
            &signing.validation,
            &signing.promotion,
            &signing.build_without_signing,
            &signing.publishing,
        ])
    );

    let mut budget = create_table();
    budget.set_header(create_cyan_header(&["Publishing budget", "Remaining"]));
    budget.add_row(vec![
        Cell::new(format!(
            "{} min",
            crate::analysis::batch::PUBLISHING_BUDGET_MINUTES
        )),
        budget_cell(signing.publishing_budget_remaining),
    ]);
    let _ = writeln!(output, "{budget}");

    if signing.publishing_budget_remaining < chrono::Duration::zero() {
        let _ = writeln!(
            output,
            "  {}",
            bright_red("Mean publishing time exceeds the publishing budget.")
        );
    }

    let _ = writeln!(
        output,
        "  {} {}\n",
        dim("Product build estimate (without signing, validation and publishing):"),
        bright_yellow(format_duration(signing.product_build_estimate))
    );
}

fn render_parallelization(output: &mut String, parallelization: &ParallelizationInsights) {
    add_section_header(output, "🧮", "Speculative Parallelization");

    let _ = writeln!(
        output,
        "{}\n",
        series_table(&[
            &parallelization.current_build,
            &parallelization.fixed_category,
            &parallelization.inferred_platform,
        ])
    );

    let saving = parallelization.current_build.stats.mean
        - parallelization.inferred_platform.stats.mean;
    let saving_text = format_duration(saving);
    let _ = writeln!(
        output,
        "  {} {}\n",
        dim("Mean saving with inferred platform parallelization:"),
        if saving > chrono::Duration::zero() {
            bright_green(saving_text)
        } else {
            bright_red(saving_text)
        }
    );
}

fn render_summary(insights: &RunInsights) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Organization:"),
        cyan(&insights.organization),
        dim("Project:"),
        cyan(&insights.project),
        dim("Definition:"),
        cyan(&insights.definition),
        dim("Branch:"),
        cyan(&insights.branch),
        dim("Runs analyzed:"),
        bright_yellow(insights.total_runs),
        dim("Analysis date:"),
        dim(insights.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if let Some(signing) = &insights.signing {
        render_signing(&mut output, signing);
    }

    if let Some(parallelization) = &insights.parallelization {
        render_parallelization(&mut output, parallelization);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::DurationSample;
    use chrono::{Duration, Utc};

    fn series(label: &str, minutes: &[i64]) -> SeriesStats {
        let sample: DurationSample = minutes.iter().map(|&m| Duration::minutes(m)).collect();
        SeriesStats::new(label, sample.summarize().unwrap())
    }

    fn insights(signing: Option<SigningInsights>) -> RunInsights {
        RunInsights {
            provider: "Azure DevOps".to_string(),
            organization: "https://dev.azure.com/dnceng".to_string(),
            project: "internal".to_string(),
            definition: "dotnet-runtime-official".to_string(),
            branch: "refs/heads/master".to_string(),
            collected_at: Utc::now(),
            total_runs: 2,
            signing,
            parallelization: Some(ParallelizationInsights {
                current_build: series("Current product build times", &[120, 150]),
                fixed_category: series("Fixed category estimate", &[90, 100]),
                inferred_platform: series("Inferred platform estimate", &[80, 95]),
            }),
        }
    }

    fn signing(budget_minutes: i64) -> SigningInsights {
        SigningInsights {
            signing: series("Time spent signing in the build", &[20, 30]),
            validation: series("Time spent validating", &[10, 10]),
            promotion: series("Time spent signing and validating", &[30, 40]),
            build_without_signing: series("Build time without signing/validation", &[140, 150]),
            publishing: series("Time spent publishing", &[25, 25]),
            publishing_budget_remaining: Duration::minutes(budget_minutes),
            product_build_estimate: Duration::minutes(120),
        }
    }

    #[test]
    fn test_summary_renders_h_mm_ss() {
        let output = render_summary(&insights(Some(signing(20))));

        assert!(output.contains("dotnet-runtime-official"));
        assert!(output.contains("Time spent signing in the build"));
        // signing p100 and build-without-signing p25
        assert!(output.contains("0:30:00"));
        assert!(output.contains("2:20:00"));
        assert!(output.contains("2:00:00"));
        assert!(output.contains("Inferred platform estimate"));
        assert!(!output.contains("exceeds the publishing budget"));
    }

    #[test]
    fn test_summary_flags_overrun_budget() {
        let output = render_summary(&insights(Some(signing(-5))));

        assert!(output.contains("-0:05:00"));
        assert!(output.contains("exceeds the publishing budget"));
    }

    #[test]
    fn test_summary_without_signing() {
        let output = render_summary(&insights(None));

        assert!(!output.contains("Time spent signing"));
        assert!(output.contains("Speculative Parallelization"));
    }
}

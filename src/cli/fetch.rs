use super::ui;
use crate::ingest::{IngestionPipeline, TickReport};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Table};

/// Runs a single ingestion tick and prints what it stored.
pub async fn run(pipeline: &IngestionPipeline) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices");
    let report = pipeline.run_once().await;
    pb.finish_and_clear();
    let report = report?;

    println!(
        "\n{}",
        ui::style_text("Fetch summary", ui::StyleType::Title)
    );
    println!("{}", report_table(&report));

    println!(
        "{} {} stored, {} failed in {:.2}s",
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        ui::style_text(&report.succeeded().to_string(), ui::StyleType::TotalValue),
        report.failed(),
        report.elapsed.as_secs_f64()
    );

    if !report.unknown_pairs.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!("Unknown pairs skipped: {}", report.unknown_pairs.join(", ")),
                ui::StyleType::Error
            )
        );
    }
    for source in &report.missing_endpoints {
        println!(
            "{}",
            ui::style_text(
                &format!("{source} skipped: no endpoint configured"),
                ui::StyleType::Error
            )
        );
    }
    for failure in &report.failures {
        println!(
            "{}",
            ui::style_text(
                &format!("{} @ {}: {}", failure.pair, failure.source, failure.kind),
                ui::StyleType::Subtle
            )
        );
    }

    Ok(())
}

fn report_table(report: &TickReport) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Source"),
        ui::header_cell("Stored"),
        ui::header_cell("Fetch failed"),
        ui::header_cell("Store failed"),
    ]);

    for (source, tally) in &report.sources {
        table.add_row(vec![
            Cell::new(source),
            ui::count_cell(tally.succeeded, false),
            ui::count_cell(tally.fetch_failures, true),
            ui::count_cell(tally.store_failures, true),
        ]);
    }

    table.add_row(vec![
        Cell::new(ui::style_text("Pairs", ui::StyleType::TotalLabel)),
        Cell::new(report.pairs).set_alignment(CellAlignment::Right),
        Cell::new(""),
        Cell::new(""),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::Source;
    use crate::ingest::SourceTally;
    use std::time::Duration;

    #[test]
    fn test_report_table_lists_sources_with_endpoints() {
        let report = TickReport {
            pairs: 2,
            sources: [
                (
                    Source::Binance,
                    SourceTally {
                        succeeded: 2,
                        fetch_failures: 0,
                        store_failures: 0,
                    },
                ),
            ]
            .into_iter()
            .collect(),
            failures: vec![],
            unknown_pairs: vec![],
            missing_endpoints: vec![Source::Bybit],
            elapsed: Duration::from_millis(120),
        };

        let rendered = report_table(&report).to_string();
        assert!(rendered.contains("Binance"));
        assert!(!rendered.contains("Bybit"));
        assert!(rendered.contains("Pairs"));
    }
}

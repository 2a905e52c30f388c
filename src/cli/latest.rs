use super::ui;
use crate::core::price::PriceObservation;
use crate::query::LatestPriceService;
use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};

pub async fn run(service: &LatestPriceService, pair: &str) -> Result<()> {
    let latest = service
        .get_latest_price(pair)
        .await
        .with_context(|| format!("Failed to read latest price for {pair}"))?;

    match latest {
        Some(observation) => {
            println!("\n{}", ui::style_text(pair, ui::StyleType::Title));
            println!("{}", observation_table(&observation));
        }
        None => println!(
            "{}",
            ui::style_text(&format!("No price stored for {pair}"), ui::StyleType::Subtle)
        ),
    }
    Ok(())
}

fn observation_table(observation: &PriceObservation) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair ID"),
        ui::header_cell("Price"),
        ui::header_cell("Source"),
        ui::header_cell("Observed At"),
    ]);
    table.add_row(vec![
        Cell::new(observation.pair_id),
        Cell::new(observation.price).set_alignment(CellAlignment::Right),
        Cell::new(observation.source),
        Cell::new(observation.observed_at.to_rfc3339()),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::{PairId, Source};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn test_observation_table_keeps_exact_price() {
        let observation = PriceObservation {
            pair_id: PairId(3),
            price: Decimal::new(6123450, 4),
            source: Source::Bybit,
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let rendered = observation_table(&observation).to_string();
        assert!(rendered.contains("612.3450"));
        assert!(rendered.contains("Bybit"));
        assert!(rendered.contains("2024-05-01T12:00:00+00:00"));
    }
}

//! Full trade log export as CSV.

use std::io::Write;

use crate::domain::error::SimtraderError;
use crate::domain::position::Trade;
use crate::domain::session_config::SessionConfig;
use crate::ports::report_port::ReportPort;
use crate::session::SessionSnapshot;

pub struct CsvTradeLogAdapter;

/// One row per trade in execution order, headers from the `Trade` fields.
pub fn write_trades<W: Write>(writer: W, trades: &[Trade]) -> Result<(), SimtraderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if trades.is_empty() {
        wtr.write_record([
            "id",
            "position_id",
            "symbol",
            "side",
            "amount",
            "price",
            "total",
            "fee",
            "profit",
            "profit_percentage",
            "timestamp",
        ])?;
    }
    for trade in trades {
        wtr.serialize(trade)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvTradeLogAdapter {
    fn write(
        &self,
        _snapshot: &SessionSnapshot,
        trades: &[Trade],
        _config: &SessionConfig,
        output_path: &str,
    ) -> Result<(), SimtraderError> {
        let file = std::fs::File::create(output_path).map_err(|e| SimtraderError::Report {
            reason: format!("failed to create {output_path}: {e}"),
        })?;
        write_trades(file, trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::TradeSide;
    use chrono::{TimeZone, Utc};

    fn trade(id: u64, side: TradeSide, profit: Option<f64>) -> Trade {
        Trade {
            id,
            position_id: 1,
            symbol: "BTC".into(),
            side,
            amount: 0.01,
            price: 6_500_000.0,
            total: 65_065.0,
            fee: 65.0,
            profit,
            profit_percentage: profit.map(|p| p / 65_065.0 * 100.0),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn header_and_rows() {
        let mut buf = Vec::new();
        write_trades(
            &mut buf,
            &[trade(1, TradeSide::Buy, None), trade(3, TradeSide::Sell, Some(259.675))],
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,position_id,symbol,side,amount,price,total,fee,profit"));
        assert!(lines[1].starts_with("1,1,BTC,buy,"));
        assert!(lines[1].contains(",,"));
        assert!(lines[2].starts_with("3,1,BTC,sell,"));
        assert!(lines[2].contains("259.675"));
    }

    #[test]
    fn empty_log_still_has_header() {
        let mut buf = Vec::new();
        write_trades(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("id,"));
    }
}

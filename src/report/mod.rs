//! Reporting utilities: KPI cards and formatted terminal output.
//!
//! Both the text report and the TUI render KPIs through [`kpi_cards`], so the
//! "no data" placeholder and number formatting stay identical everywhere.

pub mod format;

pub use format::*;

use crate::domain::KpiSummary;

/// Placeholder shown for any KPI without data.
pub const NO_DATA: &str = "-";

/// One rendered KPI card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiCard {
    pub label: String,
    pub value: String,
    pub delta: Option<String>,
    pub note: Option<String>,
}

/// Render the four dashboard KPI cards.
pub fn kpi_cards(kpis: &KpiSummary) -> [KpiCard; 4] {
    let total = KpiCard {
        label: "총 구매금액".to_string(),
        value: fmt_won(kpis.total_amount),
        delta: None,
        note: None,
    };

    let latest = match &kpis.latest {
        Some(m) => KpiCard {
            label: format!("{}년 구매금액", m.year),
            value: fmt_won(m.amount),
            delta: m.yoy_delta_pct.map(fmt_delta_pct),
            note: None,
        },
        None => KpiCard {
            label: "최신 연도 구매금액".to_string(),
            value: NO_DATA.to_string(),
            delta: None,
            note: None,
        },
    };

    let average = KpiCard {
        label: "연평균 구매금액".to_string(),
        value: kpis.average_amount.map(fmt_won).unwrap_or_else(|| NO_DATA.to_string()),
        delta: None,
        note: None,
    };

    let cycle = KpiCard {
        label: "평균 입고 주기 (추정)".to_string(),
        value: kpis
            .average_cycle_days
            .map(|d| format!("약 {d:.0}일"))
            .unwrap_or_else(|| NO_DATA.to_string()),
        delta: None,
        note: Some("*입고 일자 데이터가 없어 구매금액 기반 추정치".to_string()),
    };

    [total, latest, average, cycle]
}
